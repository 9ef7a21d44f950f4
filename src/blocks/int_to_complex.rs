//! Integer to complex conversion.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use num_complex::Complex64;

/// `out = in * scale + 0i`.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "int_to_complex",
    generics: &["scale"],
    results: &[],
    inputs: &[PortSpec::int("in", 1)],
    outputs: &[PortSpec::complex("out", 1)],
};

#[derive(Debug)]
struct IntToComplex {
    scale: f64,
}

impl Block for IntToComplex {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        self.scale = cx.get_or("scale", 1.0)?.0;
        Ok(())
    }
}

impl TypedStep<i32, Complex64> for IntToComplex {
    fn step(
        &mut self,
        count: usize,
        inputs: &[&[i32]],
        outputs: &mut [&mut [Complex64]],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        for (out, &v) in outputs[0][..count].iter_mut().zip(&inputs[0][..count]) {
            *out = Complex64::new(f64::from(v) * self.scale, 0.0);
        }
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::int_to_complex(IntToComplex { scale: 1.0 })
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
