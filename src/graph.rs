//! Graph module: topology of named components and typed, delayed edges.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use crate::descriptor::BlockDescriptor;
use crate::error::Result;
use crate::registry::Registry;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unique identifier for a component within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

/// An edge from a declared output port to a declared input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Producing component.
    pub from: ComponentId,
    /// Declared output port index on the producer.
    pub from_port: usize,
    /// Consuming component.
    pub to: ComponentId,
    /// Declared input port index on the consumer.
    pub to_port: usize,
    /// Delay in elements; the consumer first sees `delay` zeros.
    pub delay: usize,
    /// Explicit buffer capacity in elements, if the caller wants one.
    pub capacity: Option<usize>,
}

/// A component as declared in the graph, before instantiation.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    /// Unique component name.
    pub name: String,
    /// Registered block name.
    pub block: String,
    /// Block descriptor, resolved when the component was added.
    pub descriptor: Arc<BlockDescriptor>,
    /// Generic values by name.
    pub generics: BTreeMap<String, Value>,
}

/// The signal graph. Cycles are allowed as long as every cycle carries delay;
/// that is checked when the graph is compiled into a plan.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All components, indexed by [`ComponentId`].
    pub components: Vec<ComponentSpec>,
    /// All edges, in insertion order.
    pub edges: Vec<Edge>,
}

/// Errors that can occur when building the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Component id out of range.
    #[error("no component with id {0}")]
    InvalidComponent(usize),
    /// No component of that name.
    #[error("no component named `{0}`")]
    UnknownComponent(String),
    /// Port does not exist on the component.
    #[error("{component} has no {direction} port `{port}`")]
    UnknownPort {
        /// Component name.
        component: String,
        /// `input` or `output`.
        direction: &'static str,
        /// Port name or index.
        port: String,
    },
    /// Connected ports carry different element types.
    #[error("{from} ({from_type}) cannot feed {to} ({to_type})")]
    PortTypeMismatch {
        /// Producer endpoint.
        from: String,
        /// Producer element type.
        from_type: String,
        /// Consumer endpoint.
        to: String,
        /// Consumer element type.
        to_type: String,
    },
    /// Single input port already has a connection.
    #[error("input {0} is already connected")]
    PortAlreadyConnected(String),
    /// Single input port has no connection.
    #[error("input {0} is not connected")]
    UnconnectedInput(String),
    /// Two components share a name.
    #[error("component name `{0}` is already used")]
    DuplicateName(String),
    /// Endpoint is not of the form `component.port`.
    #[error("malformed endpoint `{0}`, expected component.port")]
    MalformedEndpoint(String),
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component of a registered block.
    pub fn add_component(
        &mut self,
        registry: &Registry,
        name: impl Into<String>,
        block: &str,
        generics: BTreeMap<String, Value>,
    ) -> Result<ComponentId> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(GraphError::DuplicateName(name).into());
        }
        let descriptor = registry.descriptor(block)?;
        let id = ComponentId(self.components.len());
        self.components.push(ComponentSpec {
            name,
            block: block.to_owned(),
            descriptor,
            generics,
        });
        Ok(id)
    }

    /// Look a component up by name.
    pub fn find(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|c| c.name == name)
            .map(ComponentId)
    }

    /// Declared component.
    pub fn component(&self, id: ComponentId) -> Option<&ComponentSpec> {
        self.components.get(id.0)
    }

    /// Connect output `from_port` of `from` to input `to_port` of `to`.
    pub fn connect(
        &mut self,
        from: ComponentId,
        from_port: &str,
        to: ComponentId,
        to_port: &str,
        delay: usize,
    ) -> Result<(), GraphError> {
        let producer = self.spec(from)?;
        let from_index = producer
            .descriptor
            .output_index(from_port)
            .ok_or_else(|| unknown_port(producer, "output", from_port))?;
        let consumer = self.spec(to)?;
        let to_index = consumer
            .descriptor
            .input_index(to_port)
            .ok_or_else(|| unknown_port(consumer, "input", to_port))?;
        self.add_edge(Edge {
            from,
            from_port: from_index,
            to,
            to_port: to_index,
            delay,
            capacity: None,
        })
    }

    /// Add an edge, validating ports and element types.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let producer = self.spec(edge.from)?;
        let consumer = self.spec(edge.to)?;
        let out = producer
            .descriptor
            .outputs()
            .get(edge.from_port)
            .ok_or_else(|| unknown_port(producer, "output", &edge.from_port.to_string()))?;
        let input = consumer
            .descriptor
            .inputs()
            .get(edge.to_port)
            .ok_or_else(|| unknown_port(consumer, "input", &edge.to_port.to_string()))?;

        if !out.same_type(input) {
            return Err(GraphError::PortTypeMismatch {
                from: format!("{}.{}", producer.name, out.name),
                from_type: out.type_name.clone(),
                to: format!("{}.{}", consumer.name, input.name),
                to_type: input.type_name.clone(),
            });
        }

        if !input.multi
            && self
                .edges
                .iter()
                .any(|e| e.to == edge.to && e.to_port == edge.to_port)
        {
            return Err(GraphError::PortAlreadyConnected(format!(
                "{}.{}",
                consumer.name, input.name
            )));
        }

        self.edges.push(edge);
        Ok(())
    }

    /// Check that every single input port has exactly one connection.
    /// Multi-ports may have none.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (index, spec) in self.components.iter().enumerate() {
            for (port, input) in spec.descriptor.inputs().iter().enumerate() {
                let connected = self
                    .edges
                    .iter()
                    .any(|e| e.to.0 == index && e.to_port == port);
                if !input.multi && !connected {
                    return Err(GraphError::UnconnectedInput(format!(
                        "{}.{}",
                        spec.name, input.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn spec(&self, id: ComponentId) -> Result<&ComponentSpec, GraphError> {
        self.components
            .get(id.0)
            .ok_or(GraphError::InvalidComponent(id.0))
    }
}

fn unknown_port(spec: &ComponentSpec, direction: &'static str, port: &str) -> GraphError {
    GraphError::UnknownPort {
        component: spec.name.clone(),
        direction,
        port: port.to_owned(),
    }
}
