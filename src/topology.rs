//! Topology descriptions: components and connections as plain data.
//!
//! ```json
//! {
//!   "components": [
//!     { "name": "src", "block": "constant", "generics": { "value": { "float": 1.0 } } },
//!     { "name": "out", "block": "probe" }
//!   ],
//!   "connections": [ { "from": "src.out", "to": "out.in" } ]
//! }
//! ```

use crate::config::SimConfig;
use crate::error::Result;
use crate::graph::{ComponentId, Edge, Graph, GraphError};
use crate::registry::Registry;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDecl {
    /// Unique name.
    pub name: String,
    /// Registered block name.
    pub block: String,
    /// Generic values.
    #[serde(default)]
    pub generics: BTreeMap<String, Value>,
}

/// One connection between `component.port` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDecl {
    /// Producer endpoint.
    pub from: String,
    /// Consumer endpoint.
    pub to: String,
    /// Delay in elements.
    #[serde(default)]
    pub delay: usize,
    /// Explicit buffer capacity in elements.
    #[serde(default)]
    pub capacity: Option<usize>,
}

/// A whole topology, optionally with its engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Engine configuration.
    #[serde(default)]
    pub config: SimConfig,
    /// Components, in insertion order.
    pub components: Vec<ComponentDecl>,
    /// Connections.
    #[serde(default)]
    pub connections: Vec<ConnectionDecl>,
}

impl Topology {
    /// Parse from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let topology: Self = serde_json::from_str(json)?;
        topology.config.validate()?;
        Ok(topology)
    }

    /// Read from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Resolve every component against `registry` and wire the connections.
    pub fn build(&self, registry: &Registry) -> Result<Graph> {
        let mut graph = Graph::new();
        for decl in &self.components {
            graph.add_component(registry, decl.name.as_str(), &decl.block, decl.generics.clone())?;
        }
        for conn in &self.connections {
            let (from, from_port) = endpoint(&graph, &conn.from, Direction::Output)?;
            let (to, to_port) = endpoint(&graph, &conn.to, Direction::Input)?;
            graph.add_edge(Edge {
                from,
                from_port,
                to,
                to_port,
                delay: conn.delay,
                capacity: conn.capacity,
            })?;
        }
        Ok(graph)
    }
}

enum Direction {
    Input,
    Output,
}

fn endpoint(
    graph: &Graph,
    text: &str,
    direction: Direction,
) -> Result<(ComponentId, usize), GraphError> {
    let (component, port) = text
        .rsplit_once('.')
        .filter(|(c, p)| !c.is_empty() && !p.is_empty())
        .ok_or_else(|| GraphError::MalformedEndpoint(text.to_owned()))?;
    let id = graph
        .find(component)
        .ok_or_else(|| GraphError::UnknownComponent(component.to_owned()))?;
    let descriptor = &graph.components[id.0].descriptor;
    let (index, direction) = match direction {
        Direction::Input => (descriptor.input_index(port), "input"),
        Direction::Output => (descriptor.output_index(port), "output"),
    };
    let index = index.ok_or_else(|| GraphError::UnknownPort {
        component: component.to_owned(),
        direction,
        port: port.to_owned(),
    })?;
    Ok((id, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    const CHAIN: &str = r#"{
        "config": { "chunk": 2 },
        "components": [
            { "name": "src", "block": "constant", "generics": { "value": { "float": 1.5 } } },
            { "name": "amp", "block": "gain", "generics": { "gain": { "int": 2 } } },
            { "name": "out", "block": "probe" }
        ],
        "connections": [
            { "from": "src.out", "to": "amp.in" },
            { "from": "amp.out", "to": "out.in", "delay": 1, "capacity": 8 }
        ]
    }"#;

    #[test]
    fn topology_builds_a_graph() {
        let topology = Topology::from_json_str(CHAIN).unwrap();
        assert_eq!(topology.config.chunk, 2);
        let graph = topology.build(&Registry::with_builtins()).unwrap();
        assert_eq!(graph.components.len(), 3);
        assert_eq!(graph.edges[1].delay, 1);
        assert_eq!(graph.edges[1].capacity, Some(8));
        assert_eq!(graph.components[1].generics["gain"], Value::Int(2));
    }

    #[test]
    fn endpoints_must_name_component_and_port() {
        let registry = Registry::with_builtins();
        let mut topology = Topology::from_json_str(CHAIN).unwrap();
        topology.connections[0].from = "src".into();
        assert!(matches!(
            topology.build(&registry),
            Err(SimError::Graph(GraphError::MalformedEndpoint(_)))
        ));
        topology.connections[0].from = "nobody.out".into();
        assert!(matches!(
            topology.build(&registry),
            Err(SimError::Graph(GraphError::UnknownComponent(_)))
        ));
        topology.connections[0].from = "src.in".into();
        assert!(matches!(
            topology.build(&registry),
            Err(SimError::Graph(GraphError::UnknownPort { .. }))
        ));
    }
}
