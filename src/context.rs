//! Views of a component handed to block hooks, one per lifecycle phase.
//!
//! Each context only exposes what its phase may touch: generics are read in
//! [`InitContext`], results are written in [`EpilogContext`], and the finish
//! flag is raised from [`StepContext`].

use crate::component::{ResourceArena, ResourceId};
use crate::descriptor::{BlockDescriptor, ElementType, PortDescriptor};
use crate::error::BlockError;
use crate::value::{FromValue, Value};
use std::any::Any;
use std::fmt;
use tracing::{debug, warn};

/// Check-phase view: port layout and the batched error channel.
pub struct CheckContext<'a> {
    pub(crate) component: &'a str,
    pub(crate) descriptor: &'a BlockDescriptor,
    pub(crate) input_ports: &'a [usize],
    pub(crate) output_ports: &'a [usize],
    pub(crate) failures: &'a mut Vec<String>,
}

impl<'a> CheckContext<'a> {
    /// Component name.
    pub fn name(&self) -> &str {
        self.component
    }

    /// Block descriptor.
    pub fn descriptor(&self) -> &BlockDescriptor {
        self.descriptor
    }

    /// Number of physical inputs.
    pub fn n_in(&self) -> usize {
        self.input_ports.len()
    }

    /// Number of physical outputs.
    pub fn n_out(&self) -> usize {
        self.output_ports.len()
    }

    /// Descriptor of the port behind physical input `index`.
    pub fn input(&self, index: usize) -> Option<&PortDescriptor> {
        let port = *self.input_ports.get(index)?;
        self.descriptor.inputs().get(port)
    }

    /// Descriptor of the port behind physical output `index`.
    pub fn output(&self, index: usize) -> Option<&PortDescriptor> {
        let port = *self.output_ports.get(index)?;
        self.descriptor.outputs().get(port)
    }

    /// Record a defect without aborting the check phase.
    pub fn check_error(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        warn!(component = self.component, %message, "check error");
        self.failures.push(message);
    }

    /// Number of defects recorded so far.
    pub fn check_errors(&self) -> usize {
        self.failures.len()
    }

    /// Fail unless physical input `input` and output `output` carry the same
    /// element type.
    pub fn check_homogeneous_types(&self, input: usize, output: usize) -> Result<(), BlockError> {
        let i = self.input(input).ok_or(BlockError::PortOutOfRange {
            direction: "input",
            index: input,
            count: self.n_in(),
        })?;
        let o = self.output(output).ok_or(BlockError::PortOutOfRange {
            direction: "output",
            index: output,
            count: self.n_out(),
        })?;
        if i.same_type(o) {
            Ok(())
        } else {
            Err(BlockError::TypeMismatch {
                port: o.name.clone(),
                expected: i.type_name.clone(),
                found: o.type_name.clone(),
            })
        }
    }

    pub(crate) fn require_element_types(
        &self,
        input: ElementType,
        output: ElementType,
    ) -> Result<(), BlockError> {
        let mismatch = |port: &PortDescriptor, expected: ElementType| BlockError::TypeMismatch {
            port: port.name.clone(),
            expected: expected.name().to_owned(),
            found: port.type_name.clone(),
        };
        if let Some(port) = self.descriptor.inputs().iter().find(|p| !p.carries(input)) {
            return Err(mismatch(port, input));
        }
        if let Some(port) = self.descriptor.outputs().iter().find(|p| !p.carries(output)) {
            return Err(mismatch(port, output));
        }
        Ok(())
    }
}

/// Init-phase view: typed generic access, chunk requests and owned resources.
pub struct InitContext<'a> {
    pub(crate) component: &'a str,
    pub(crate) descriptor: &'a BlockDescriptor,
    pub(crate) generics: &'a [Option<Value>],
    pub(crate) in_chunks: &'a mut [usize],
    pub(crate) out_chunks: &'a mut [usize],
    pub(crate) arena: &'a mut ResourceArena,
}

impl<'a> InitContext<'a> {
    /// Component name.
    pub fn name(&self) -> &str {
        self.component
    }

    /// Number of physical inputs.
    pub fn n_in(&self) -> usize {
        self.in_chunks.len()
    }

    /// Number of physical outputs.
    pub fn n_out(&self) -> usize {
        self.out_chunks.len()
    }

    /// Raw configured value of a declared generic.
    pub fn value(&self, name: &str) -> Result<Option<&Value>, BlockError> {
        let index = self
            .descriptor
            .generic_index(name)
            .ok_or_else(|| BlockError::UndeclaredGeneric(name.to_owned()))?;
        Ok(self.generics[index].as_ref())
    }

    /// Required generic. Fails with [`BlockError::MissingGeneric`] if unset.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, BlockError> {
        match self.value(name)? {
            Some(value) => convert(name, value),
            None => Err(BlockError::MissingGeneric(name.to_owned())),
        }
    }

    /// Optional generic. Returns the value and whether `default` was used.
    pub fn get_or<T: FromValue>(&self, name: &str, default: T) -> Result<(T, bool), BlockError> {
        match self.value(name)? {
            Some(value) => convert(name, value).map(|v| (v, false)),
            None => Ok((default, true)),
        }
    }

    /// Require at least `chunk` elements of buffer depth on physical input `input`.
    pub fn set_in_chunk(&mut self, input: usize, chunk: usize) -> Result<(), BlockError> {
        let count = self.in_chunks.len();
        let slot = self.in_chunks.get_mut(input).ok_or(BlockError::PortOutOfRange {
            direction: "input",
            index: input,
            count,
        })?;
        *slot = (*slot).max(chunk);
        debug!(component = self.component, input, chunk, "input chunk requested");
        Ok(())
    }

    /// Require at least `chunk` elements of buffer depth on physical output `output`.
    pub fn set_out_chunk(&mut self, output: usize, chunk: usize) -> Result<(), BlockError> {
        let count = self.out_chunks.len();
        let slot = self.out_chunks.get_mut(output).ok_or(BlockError::PortOutOfRange {
            direction: "output",
            index: output,
            count,
        })?;
        *slot = (*slot).max(chunk);
        debug!(component = self.component, output, chunk, "output chunk requested");
        Ok(())
    }

    /// Hand `value` to the component; it is dropped at teardown, after every
    /// resource registered later.
    pub fn register<T: Any>(&mut self, value: T) -> ResourceId {
        self.arena.register(value)
    }

    /// Borrow a registered resource.
    pub fn resource<T: Any>(&self, id: ResourceId) -> Option<&T> {
        self.arena.get(id)
    }
}

fn convert<T: FromValue>(name: &str, value: &Value) -> Result<T, BlockError> {
    T::from_value(value).ok_or_else(|| BlockError::InvalidGeneric {
        name: name.to_owned(),
        expected: T::expected(),
        found: value.type_name(),
    })
}

/// Step-phase view.
pub struct StepContext<'a> {
    pub(crate) component: &'a str,
    pub(crate) tick: u64,
    pub(crate) finish_trigger: &'a mut bool,
    pub(crate) input_sizes: &'a [usize],
    pub(crate) output_sizes: &'a [usize],
}

impl<'a> StepContext<'a> {
    /// Component name.
    pub fn name(&self) -> &str {
        self.component
    }

    /// Zero-based tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Ask the driver to stop after this tick. Idempotent.
    pub fn finish(&mut self) {
        *self.finish_trigger = true;
    }

    /// Whether this component has asked to stop.
    pub fn finish_requested(&self) -> bool {
        *self.finish_trigger
    }

    /// Element size in bytes of each physical input.
    pub fn input_sizes(&self) -> &[usize] {
        self.input_sizes
    }

    /// Element size in bytes of each physical output.
    pub fn output_sizes(&self) -> &[usize] {
        self.output_sizes
    }
}

/// Completion-phase view: the only place results can be written.
pub struct EpilogContext<'a> {
    pub(crate) component: &'a str,
    pub(crate) descriptor: &'a BlockDescriptor,
    pub(crate) results: &'a mut [Option<Value>],
    pub(crate) ticks: u64,
    pub(crate) finished: bool,
}

impl<'a> EpilogContext<'a> {
    /// Component name.
    pub fn name(&self) -> &str {
        self.component
    }

    /// Number of ticks the run lasted.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether this component raised the finish flag.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Set a declared result.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), BlockError> {
        let index = self
            .descriptor
            .result_index(name)
            .ok_or_else(|| BlockError::UndeclaredResult(name.to_owned()))?;
        self.results[index] = Some(value.into());
        Ok(())
    }
}
