//! Gain: multiplies every sample by a complex factor.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;
use num_complex::Complex64;
use tracing::debug;

/// `out = in * gain`; `gain` defaults to 1.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "gain",
    generics: &["gain"],
    results: &[],
    inputs: &[PortSpec::complex("in", 1)],
    outputs: &[PortSpec::complex("out", 1)],
};

#[derive(Debug)]
struct Gain {
    gain: Complex64,
}

impl Block for Gain {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        let (gain, defaulted) = cx.get_or("gain", Complex64::new(1.0, 0.0))?;
        if defaulted {
            debug!(component = cx.name(), "gain defaults to unity");
        }
        self.gain = gain;
        Ok(())
    }
}

impl TypedStep<Complex64, Complex64> for Gain {
    fn step(
        &mut self,
        count: usize,
        inputs: &[&[Complex64]],
        outputs: &mut [&mut [Complex64]],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        for (out, sample) in outputs[0][..count].iter_mut().zip(&inputs[0][..count]) {
            *out = *sample * self.gain;
        }
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::complex(Gain {
        gain: Complex64::new(1.0, 0.0),
    })
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
