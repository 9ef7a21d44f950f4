//! Error types.
//!
//! [`BlockError`] is what block code returns from its hooks; it does not know
//! which component it came from. The engine wraps it into [`SimError`] with the
//! component name attached.

use crate::component::Lifecycle;
use crate::descriptor::ParsePrototypeError;
use crate::graph::GraphError;
use std::fmt;
use std::path::PathBuf;

/// Errors raised by block code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    /// A required generic has no value.
    #[error("missing required generic `{0}`")]
    MissingGeneric(String),
    /// A generic has a value of the wrong shape.
    #[error("generic `{name}` expects {expected}, found {found}")]
    InvalidGeneric {
        /// Generic name.
        name: String,
        /// What the accessor wanted.
        expected: &'static str,
        /// What the configuration held.
        found: &'static str,
    },
    /// The block asked for a generic it does not declare.
    #[error("no generic named `{0}` is declared")]
    UndeclaredGeneric(String),
    /// The block tried to set a result it does not declare.
    #[error("no result named `{0}` is declared")]
    UndeclaredResult(String),
    /// Two ports, or a port and the block's kind, disagree on element type.
    #[error("port `{port}` carries {found}, expected {expected}")]
    TypeMismatch {
        /// Offending port.
        port: String,
        /// Required element type.
        expected: String,
        /// Actual element type.
        found: String,
    },
    /// A physical port index is out of range.
    #[error("{direction} index {index} out of range (have {count})")]
    PortOutOfRange {
        /// `input` or `output`.
        direction: &'static str,
        /// Requested index.
        index: usize,
        /// Number of physical ports.
        count: usize,
    },
    /// Neither step form was overridden.
    #[error("step is not implemented")]
    StepNotImplemented,
    /// Run-halting failure.
    #[error("{0}")]
    Runtime(String),
}

impl BlockError {
    /// Run-halting failure with a formatted message.
    pub fn runtime(message: impl Into<String>) -> Self {
        BlockError::Runtime(message.into())
    }
}

/// One batched check-phase defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Component that reported it.
    pub component: String,
    /// Formatted message.
    pub message: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}

fn join_failures(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A plugin module could not be loaded.
    #[error(
        "cannot load block module {}: {reason} (version {}, expected {expected})",
        .path.display(),
        .detected.map_or_else(|| "unknown".to_owned(), |v| v.to_string())
    )]
    PluginLoad {
        /// Module path.
        path: PathBuf,
        /// Version found in the module, if it could be read.
        detected: Option<u32>,
        /// Version this engine expects.
        expected: u32,
        /// What went wrong.
        reason: String,
    },
    /// No block of that name is registered.
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    /// A block of that name is already registered.
    #[error("block `{0}` is already registered")]
    DuplicateBlock(String),
    /// Check phase found defects.
    #[error("{} check error(s): {}", .0.len(), join_failures(.0))]
    Check(Vec<CheckFailure>),
    /// A required generic has no value.
    #[error("{component}: missing required generic `{generic}`")]
    MissingGeneric {
        /// Component name.
        component: String,
        /// Generic name.
        generic: String,
    },
    /// Port element types disagree.
    #[error("{component}: port `{port}` carries {found}, expected {expected}")]
    TypeMismatch {
        /// Component name.
        component: String,
        /// Offending port.
        port: String,
        /// Required element type.
        expected: String,
        /// Actual element type.
        found: String,
    },
    /// The component's block overrides no step form.
    #[error("{component}: step is not implemented")]
    StepNotImplemented {
        /// Component name.
        component: String,
    },
    /// Run-halting failure raised by a block.
    #[error("{component}: {message}")]
    Runtime {
        /// Component name.
        component: String,
        /// Formatted message.
        message: String,
    },
    /// Other block errors.
    #[error("{component}: {source}")]
    Block {
        /// Component name.
        component: String,
        /// Underlying error.
        source: BlockError,
    },
    /// Invalid topology.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Zero-delay edges form a cycle.
    #[error("zero-delay cycle through {}", .0.join(", "))]
    ZeroDelayCycle(Vec<String>),
    /// A feedback edge is read before its producer runs but delays less than a tick.
    #[error("feedback edge {from} -> {to} has delay {delay}, needs at least {chunk}")]
    FeedbackDelayTooShort {
        /// Producing component.
        from: String,
        /// Consuming component.
        to: String,
        /// Edge delay.
        delay: usize,
        /// Elements per tick.
        chunk: usize,
    },
    /// A buffer would need more capacity than allowed.
    #[error("{component}.{port} needs a buffer of {required} elements, limit is {limit}")]
    InsufficientCapacity {
        /// Producing component.
        component: String,
        /// Producing port.
        port: String,
        /// Capacity needed.
        required: usize,
        /// Configured limit.
        limit: usize,
    },
    /// An operation was attempted in the wrong lifecycle state.
    #[error("{component}: expected state {expected:?}, found {found:?}")]
    Lifecycle {
        /// Component name.
        component: String,
        /// Required state.
        expected: Lifecycle,
        /// Actual state.
        found: Lifecycle,
    },
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Textual prototype could not be parsed.
    #[error(transparent)]
    Prototype(#[from] ParsePrototypeError),
    /// JSON configuration or topology could not be decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// File access failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Attach a component name to a block error.
    pub fn from_block(component: &str, err: BlockError) -> Self {
        let component = component.to_owned();
        match err {
            BlockError::MissingGeneric(generic) => SimError::MissingGeneric { component, generic },
            BlockError::TypeMismatch {
                port,
                expected,
                found,
            } => SimError::TypeMismatch {
                component,
                port,
                expected,
                found,
            },
            BlockError::StepNotImplemented => SimError::StepNotImplemented { component },
            BlockError::Runtime(message) => SimError::Runtime { component, message },
            source => SimError::Block { component, source },
        }
    }
}

/// Engine result.
pub type Result<T, E = SimError> = std::result::Result<T, E>;
