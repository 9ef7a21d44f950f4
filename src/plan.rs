//! Plan module: compile a graph into a tick order and physical port layout.

use crate::error::{Result, SimError};
use crate::graph::{ComponentId, Edge, Graph};
use crate::invariant_ppt::{assert_invariant, FEEDBACK_DELAY_COVERS_CHUNK, ORDER_TOPOLOGICAL};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

/// One physical input: the declared port it expands from and its edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    /// Declared input port index.
    pub port: usize,
    /// Index into [`Plan::edges`].
    pub edge: usize,
}

/// One physical output: the declared port it expands from and the edges
/// reading its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSlot {
    /// Declared output port index.
    pub port: usize,
    /// Indices into [`Plan::edges`]; empty for an unconnected single output.
    pub edges: Vec<usize>,
}

/// The compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Tick order.
    pub order: Vec<ComponentId>,
    /// Elements moved per component per tick.
    pub chunk: usize,
    /// Physical inputs per component.
    pub inputs: Vec<Vec<InputSlot>>,
    /// Physical outputs per component.
    pub outputs: Vec<Vec<OutputSlot>>,
    /// Edges, as in the graph.
    pub edges: Vec<Edge>,
}

impl Plan {
    /// Compile a graph for `chunk` elements per tick.
    ///
    /// An edge delaying less than one chunk is read in the same tick it is
    /// written, so its producer must tick first. Those edges must form a DAG;
    /// a cycle through them is a [`SimError::ZeroDelayCycle`] when every edge
    /// on it is undelayed and [`SimError::FeedbackDelayTooShort`] otherwise.
    /// Edges delaying a full chunk or more do not constrain the order.
    pub fn compile(graph: &Graph, chunk: usize) -> Result<Self> {
        if chunk == 0 {
            return Err(SimError::InvalidConfig("chunk must be non-zero".into()));
        }
        graph.validate()?;

        let order = topo_sort(graph, chunk)?;
        let mut position = vec![0; order.len()];
        for (pos, id) in order.iter().enumerate() {
            position[id.0] = pos;
        }
        for edge in graph.edges.iter().filter(|e| e.delay < chunk) {
            assert_invariant(
                ORDER_TOPOLOGICAL,
                position[edge.from.0] < position[edge.to.0],
                "same-tick producer ticks before its consumer",
                Some("Plan::compile"),
            );
        }
        assert_invariant(
            FEEDBACK_DELAY_COVERS_CHUNK,
            graph
                .edges
                .iter()
                .filter(|e| position[e.to.0] <= position[e.from.0])
                .all(|e| e.delay >= chunk),
            "every feedback edge delays by at least one chunk",
            Some("Plan::compile"),
        );

        let (inputs, outputs) = expand_ports(graph);
        debug!(components = order.len(), edges = graph.edges.len(), chunk, "plan compiled");
        Ok(Self {
            order,
            chunk,
            inputs,
            outputs,
            edges: graph.edges.clone(),
        })
    }

    /// Declared port index behind each physical input of `id`.
    pub fn input_ports(&self, id: ComponentId) -> Vec<usize> {
        self.inputs[id.0].iter().map(|s| s.port).collect()
    }

    /// Declared port index behind each physical output of `id`.
    pub fn output_ports(&self, id: ComponentId) -> Vec<usize> {
        self.outputs[id.0].iter().map(|s| s.port).collect()
    }

    /// Consumer and physical input index for each edge.
    pub fn edge_targets(&self) -> Vec<(ComponentId, usize)> {
        let mut targets = vec![(ComponentId(0), 0); self.edges.len()];
        for (component, slots) in self.inputs.iter().enumerate() {
            for (index, slot) in slots.iter().enumerate() {
                targets[slot.edge] = (ComponentId(component), index);
            }
        }
        targets
    }
}

/// Multi-ports get one physical slot per edge, in edge order. A single input
/// maps to its one edge; a single output is one buffer shared by every edge
/// leaving it.
fn expand_ports(graph: &Graph) -> (Vec<Vec<InputSlot>>, Vec<Vec<OutputSlot>>) {
    let mut inputs = Vec::with_capacity(graph.components.len());
    let mut outputs = Vec::with_capacity(graph.components.len());
    for (index, spec) in graph.components.iter().enumerate() {
        let mut ins = Vec::new();
        for (port, _) in spec.descriptor.inputs().iter().enumerate() {
            ins.extend(
                graph
                    .edges
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.to.0 == index && e.to_port == port)
                    .map(|(edge, _)| InputSlot { port, edge }),
            );
        }
        let mut outs = Vec::new();
        for (port, desc) in spec.descriptor.outputs().iter().enumerate() {
            let edges: Vec<usize> = graph
                .edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.from.0 == index && e.from_port == port)
                .map(|(edge, _)| edge)
                .collect();
            if desc.multi {
                outs.extend(edges.into_iter().map(|edge| OutputSlot {
                    port,
                    edges: vec![edge],
                }));
            } else {
                outs.push(OutputSlot { port, edges });
            }
        }
        inputs.push(ins);
        outputs.push(outs);
    }
    (inputs, outputs)
}

/// Stable topological sort over edges with `delay < chunk`: among ready
/// components the lowest id goes first.
fn topo_sort(graph: &Graph, chunk: usize) -> Result<Vec<ComponentId>> {
    let (order, stuck) = kahn(graph, |e| e.delay < chunk);
    if stuck.is_empty() {
        return Ok(order);
    }

    let (_, zero_stuck) = kahn(graph, |e| e.delay == 0);
    if !zero_stuck.is_empty() {
        let names = zero_stuck
            .iter()
            .map(|&i| graph.components[i].name.clone())
            .collect();
        return Err(SimError::ZeroDelayCycle(names));
    }

    // Every remaining cycle has a delayed edge on it.
    let cyclic = graph
        .edges
        .iter()
        .filter(|e| e.delay > 0 && e.delay < chunk)
        .find(|e| reaches(graph, e.to.0, e.from.0, chunk));
    match cyclic {
        Some(edge) => Err(SimError::FeedbackDelayTooShort {
            from: graph.components[edge.from.0].name.clone(),
            to: graph.components[edge.to.0].name.clone(),
            delay: edge.delay,
            chunk,
        }),
        None => Err(SimError::ZeroDelayCycle(
            stuck.iter().map(|&i| graph.components[i].name.clone()).collect(),
        )),
    }
}

/// Kahn's algorithm over the edges selected by `keep`. Returns the order and
/// the components left with unresolved predecessors.
fn kahn(graph: &Graph, keep: impl Fn(&Edge) -> bool) -> (Vec<ComponentId>, Vec<usize>) {
    let n = graph.components.len();
    let mut in_degree = vec![0usize; n];
    let mut adj: Vec<Vec<usize>> = vec![vec![]; n];

    for edge in graph.edges.iter().filter(|e| keep(*e)) {
        adj[edge.from.0].push(edge.to.0);
        in_degree[edge.to.0] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(node)) = ready.pop() {
        order.push(ComponentId(node));
        for &next in &adj[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    let stuck = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg > 0)
        .map(|(i, _)| i)
        .collect();
    (order, stuck)
}

/// Whether `to` is reachable from `from` over edges with `delay < chunk`.
fn reaches(graph: &Graph, from: usize, to: usize, chunk: usize) -> bool {
    let mut seen = vec![false; graph.components.len()];
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if std::mem::replace(&mut seen[node], true) {
            continue;
        }
        stack.extend(
            graph
                .edges
                .iter()
                .filter(|e| e.from.0 == node && e.delay < chunk)
                .map(|e| e.to.0),
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::collections::BTreeMap;

    fn graph_of(blocks: &[(&str, &str)]) -> (Graph, Vec<ComponentId>) {
        let registry = Registry::with_builtins();
        let mut graph = Graph::new();
        let ids = blocks
            .iter()
            .map(|(name, block)| {
                graph
                    .add_component(&registry, *name, block, BTreeMap::new())
                    .unwrap()
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn plan_stability() {
        let (mut graph, ids) = graph_of(&[("src", "constant"), ("amp", "gain"), ("out", "probe")]);
        graph.connect(ids[0], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[2], "in", 0).unwrap();
        let plan1 = Plan::compile(&graph, 4).unwrap();
        let plan2 = Plan::compile(&graph, 4).unwrap();
        assert_eq!(plan1, plan2);
        assert_eq!(plan1.order, ids);
    }

    #[test]
    fn plan_orders_consumers_after_producers() {
        // Insertion order is reversed relative to data flow.
        let (mut graph, ids) = graph_of(&[("out", "probe"), ("amp", "gain"), ("src", "constant")]);
        graph.connect(ids[2], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[0], "in", 0).unwrap();
        let plan = Plan::compile(&graph, 1).unwrap();
        assert_eq!(plan.order, vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn plan_rejects_zero_delay_cycle() {
        let (mut graph, ids) = graph_of(&[("a", "gain"), ("b", "gain")]);
        graph.connect(ids[0], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[0], "in", 0).unwrap();
        let err = Plan::compile(&graph, 1).unwrap_err();
        assert!(matches!(err, SimError::ZeroDelayCycle(ref names) if names.len() == 2));
    }

    #[test]
    fn plan_feedback_delay_must_cover_chunk() {
        let (mut graph, ids) = graph_of(&[("src", "constant"), ("acc", "sum")]);
        graph.connect(ids[0], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[1], "in", 2).unwrap();
        assert!(Plan::compile(&graph, 2).is_ok());
        let err = Plan::compile(&graph, 4).unwrap_err();
        assert!(matches!(
            err,
            SimError::FeedbackDelayTooShort { delay: 2, chunk: 4, .. }
        ));
    }

    #[test]
    fn plan_orders_short_delay_edges_regardless_of_declaration() {
        let (mut graph, ids) = graph_of(&[("out", "probe"), ("src", "constant")]);
        graph.connect(ids[1], "out", ids[0], "in", 1).unwrap();
        let plan = Plan::compile(&graph, 4).unwrap();
        assert_eq!(plan.order, vec![ids[1], ids[0]]);
        // A full chunk of delay leaves declaration order alone.
        let plan = Plan::compile(&graph, 1).unwrap();
        assert_eq!(plan.order, ids);
    }

    #[test]
    fn plan_rejects_short_delay_only_on_a_cycle() {
        let (mut graph, ids) = graph_of(&[("src", "constant"), ("mix", "sum"), ("fade", "gain")]);
        graph.connect(ids[0], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[2], "in", 0).unwrap();
        graph.connect(ids[2], "out", ids[1], "in", 3).unwrap();
        assert!(Plan::compile(&graph, 3).is_ok());
        match Plan::compile(&graph, 4).unwrap_err() {
            SimError::FeedbackDelayTooShort { from, to, delay, chunk } => {
                assert_eq!((from.as_str(), to.as_str()), ("fade", "mix"));
                assert_eq!((delay, chunk), (3, 4));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn plan_expands_multi_ports() {
        let (mut graph, ids) = graph_of(&[
            ("a", "constant"),
            ("b", "constant"),
            ("mix", "sum"),
            ("split", "tee"),
            ("p", "probe"),
            ("q", "probe"),
        ]);
        graph.connect(ids[0], "out", ids[2], "in", 0).unwrap();
        graph.connect(ids[1], "out", ids[2], "in", 0).unwrap();
        graph.connect(ids[2], "out", ids[3], "in", 0).unwrap();
        graph.connect(ids[3], "out", ids[4], "in", 0).unwrap();
        graph.connect(ids[3], "out", ids[5], "in", 3).unwrap();
        let plan = Plan::compile(&graph, 1).unwrap();
        assert_eq!(plan.input_ports(ids[2]), vec![0, 0]);
        assert_eq!(plan.output_ports(ids[3]), vec![0, 0]);
        assert_eq!(plan.outputs[ids[3].0][1].edges, vec![4]);
        assert_eq!(plan.edge_targets()[4], (ids[5], 0));
    }

    #[test]
    fn plan_single_output_fans_out_to_one_buffer() {
        let (mut graph, ids) = graph_of(&[("src", "constant"), ("p", "probe"), ("q", "probe")]);
        graph.connect(ids[0], "out", ids[1], "in", 0).unwrap();
        graph.connect(ids[0], "out", ids[2], "in", 1).unwrap();
        let plan = Plan::compile(&graph, 1).unwrap();
        assert_eq!(plan.outputs[0].len(), 1);
        assert_eq!(plan.outputs[0][0].edges, vec![0, 1]);
    }
}
