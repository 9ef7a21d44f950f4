//! Tee: copies its input to every output without decoding it.

use crate::block::{Block, ByteStep, ComponentKind};
use crate::context::{CheckContext, StepContext};
use crate::descriptor::{BlockPrototype, ElementType, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;

/// One complex input, any number of copies out.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "tee",
    generics: &[],
    results: &[],
    inputs: &[PortSpec::complex("in", 1)],
    outputs: &[PortSpec::multi("out", ElementType::COMPLEX, 1)],
};

struct Tee;

impl Block for Tee {
    fn check(&mut self, cx: &mut CheckContext<'_>) -> Result<(), BlockError> {
        if cx.n_out() == 0 {
            cx.check_error("tee output is not connected");
        }
        for output in 0..cx.n_out() {
            cx.check_homogeneous_types(0, output)?;
        }
        Ok(())
    }
}

impl ByteStep for Tee {
    fn step(
        &mut self,
        _count: usize,
        inputs: &[&[u8]],
        outputs: &mut [&mut [u8]],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        for out in outputs.iter_mut() {
            out.copy_from_slice(inputs[0]);
        }
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::bytes(Tee)
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
