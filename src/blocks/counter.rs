//! Integer ramp source.

use crate::block::{Block, ComponentKind, TypedStep};
use crate::context::{InitContext, StepContext};
use crate::descriptor::{BlockPrototype, PortSpec};
use crate::error::BlockError;
use crate::plugin::BlockEntry;

/// Emits `start`, `start + step`, ... wrapping on overflow.
pub static PROTOTYPE: BlockPrototype = BlockPrototype {
    name: "counter",
    generics: &["start", "step"],
    results: &[],
    inputs: &[],
    outputs: &[PortSpec::int("out", 1)],
};

#[derive(Debug, Default)]
struct Counter {
    next: i32,
    step: i32,
}

impl Block for Counter {
    fn init(&mut self, cx: &mut InitContext<'_>) -> Result<(), BlockError> {
        self.next = cx.get_or("start", 0)?.0;
        self.step = cx.get_or("step", 1)?.0;
        Ok(())
    }
}

impl TypedStep<i32, i32> for Counter {
    fn step_one(
        &mut self,
        _inputs: &[i32],
        outputs: &mut [i32],
        _cx: &mut StepContext<'_>,
    ) -> Result<(), BlockError> {
        outputs[0] = self.next;
        self.next = self.next.wrapping_add(self.step);
        Ok(())
    }
}

fn create() -> ComponentKind {
    ComponentKind::int(Counter::default())
}

/// Module entry.
pub static ENTRY: BlockEntry = BlockEntry::new(&PROTOTYPE, create);
