//! sdflow: a deterministic, block-based synchronous dataflow simulator.
//!
//! Blocks declare typed ports, generics and results in a static
//! [`BlockPrototype`](descriptor::BlockPrototype). A [`Graph`](graph::Graph)
//! wires named components together; edges may carry delay, which is what
//! makes feedback loops legal. [`Simulation`](rt::Simulation) compiles the
//! graph into a fixed tick order, sizes one circular buffer per output and
//! steps every component once per tick until one of them finishes.
//!
//! ```no_run
//! use sdflow::{Registry, Simulation, Topology};
//!
//! let topology = Topology::from_path("chain.json")?;
//! let registry = Registry::with_builtins();
//! let graph = topology.build(&registry)?;
//! let report = Simulation::new(&graph, &registry, &topology.config)?.run()?;
//! println!("{:?}", report.result("probe", "peak"));
//! # Ok::<(), sdflow::SimError>(())
//! ```

pub mod block;
pub mod blocks;
pub mod component;
pub mod config;
pub mod connection;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod graph;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod plan;
pub mod plugin;
pub mod registry;
pub mod rt;
pub mod topology;
pub mod value;

pub use block::{Block, ByteStep, ComponentKind, Sample, TypedStep};
pub use component::{Component, Lifecycle};
pub use config::SimConfig;
pub use context::{CheckContext, EpilogContext, InitContext, StepContext};
pub use descriptor::{BlockDescriptor, BlockPrototype, ElementType, PortDescriptor, PortSpec};
pub use error::{BlockError, CheckFailure, Result, SimError};
pub use graph::{ComponentId, Graph, GraphError};
pub use plugin::{BlockEntry, BlockModule, ABI_VERSION};
pub use registry::Registry;
pub use rt::{RunReport, Simulation, StopReason};
pub use topology::Topology;
pub use value::{FromValue, Value};
