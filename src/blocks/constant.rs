//! Constant source.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use num_complex::Complex64;

/// Emits `value` on every tick.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "constant",
    generics: &["value"],
    results: &[],
    inputs: &[],
    outputs: &[PortSpec::complex("out", 1)],
};

#[derive(Debug, Default)]
struct Constant {
    value: Complex64,
}

impl Block for Constant {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        self.value = cx.get("value")?;
        Ok(())
    }
}

impl TypedStep<Complex64, Complex64> for Constant {
    fn step_one(
        &mut self,
        _inputs: &[Complex64],
        outputs: &mut [Complex64],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        outputs[0] = self.value;
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::complex(Constant::default())
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
