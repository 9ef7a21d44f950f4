//! Sum of any number of complex inputs.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{CheckContext, StepContext};
use crate::descriptor::{BlockPrototype, ElementType, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use num_complex::Complex64;

/// `out = in[0] + in[1] + ...`. With a delayed self-loop this is an
/// accumulator.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "sum",
    generics: &[],
    results: &[],
    inputs: &[PortSpec::multi("in", ElementType::COMPLEX, 1)],
    outputs: &[PortSpec::complex("out", 1)],
};

struct Sum;

impl Block for Sum {
    fn check(&mut self, cx: &mut CheckContext<'_>) -> Result<(), BlockError> {
        if cx.n_in() == 0 {
            cx.check_error("sum needs at least one input");
        }
        Ok(())
    }
}

impl TypedStep<Complex64, Complex64> for Sum {
    fn step_one(
        &mut self,
        inputs: &[Complex64],
        outputs: &mut [Complex64],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        outputs[0] = inputs.iter().sum();
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::complex(Sum)
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
