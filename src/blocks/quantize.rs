//! Complex to integer quantizer.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use num_complex::Complex64;

/// `out = round(re(in) * scale)`, saturating at the `i32` range.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "quantize",
    generics: &["scale"],
    results: &[],
    inputs: &[PortSpec::complex("in", 1)],
    outputs: &[PortSpec::int("out", 1)],
};

#[derive(Debug)]
struct Quantize {
    scale: f64,
}

impl Block for Quantize {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        self.scale = cx.get_or("scale", 1.0)?.0;
        if !self.scale.is_finite() {
            return Err(BlockError::InvalidGeneric {
                name: "scale".into(),
                expected: "a finite float",
                found: if self.scale.is_nan() { "NaN" } else { "an infinite float" },
            });
        }
        Ok(())
    }
}

impl TypedStep<Complex64, i32> for Quantize {
    fn step_one(
        &mut self,
        inputs: &[Complex64],
        outputs: &mut [i32],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        // `as` saturates and maps NaN to zero.
        outputs[0] = (inputs[0].re * self.scale).round() as i32;
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::complex_to_int(Quantize { scale: 1.0 })
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::error::{BlockError, SimError};
    use crate::graph::Graph;
    use crate::registry::Registry;
    use crate::rt::Simulation;
    use crate::value::Value;
    use std::collections::BTreeMap;

    fn setup(scale: f64) -> crate::error::Result<Simulation> {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let src = graph.add_component(
            &registry,
            "src",
            "constant",
            BTreeMap::from([("value".to_owned(), Value::Float(0.5))]),
        )?;
        let q = graph.add_component(
            &registry,
            "q",
            "quantize",
            BTreeMap::from([("scale".to_owned(), Value::Float(scale))]),
        )?;
        let out = graph.add_component(&registry, "out", "probe", BTreeMap::new())?;
        graph.connect(src, "out", q, "in", 0)?;
        graph.connect(q, "out", out, "in", 0)?;
        Simulation::new(&graph, &registry, &SimConfig::default())
    }

    #[test]
    fn non_finite_scale_is_an_invalid_generic() {
        for scale in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            match setup(scale).unwrap_err() {
                SimError::Block {
                    component,
                    source: BlockError::InvalidGeneric { name, .. },
                } => {
                    assert_eq!(component, "q");
                    assert_eq!(name, "scale");
                }
                other => panic!("unexpected error {other}"),
            }
        }
    }

    #[test]
    fn finite_scale_is_accepted() {
        assert!(setup(1e6).is_ok());
    }
}
