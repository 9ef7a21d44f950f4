use sdflow::graph::{ComponentId, Graph, GraphError};
use sdflow::plan::Plan;
use sdflow::{Registry, SimError, Value};
use std::collections::BTreeMap;

fn no_generics() -> BTreeMap<String, Value> {
    BTreeMap::new()
}

fn constant(value: f64) -> BTreeMap<String, Value> {
    BTreeMap::from([("value".to_owned(), Value::Float(value))])
}

#[test]
fn consumers_tick_after_producers_whatever_the_insertion_order() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let out = graph.add_component(&registry, "out", "probe", no_generics()).unwrap();
    let amp = graph.add_component(&registry, "amp", "gain", no_generics()).unwrap();
    let src = graph.add_component(&registry, "src", "constant", constant(1.0)).unwrap();
    graph.connect(src, "out", amp, "in", 0).unwrap();
    graph.connect(amp, "out", out, "in", 0).unwrap();

    let plan = Plan::compile(&graph, 4).unwrap();
    assert_eq!(plan.order, vec![src, amp, out]);
}

#[test]
fn independent_components_keep_insertion_order() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let a = graph.add_component(&registry, "a", "constant", constant(1.0)).unwrap();
    let b = graph.add_component(&registry, "b", "constant", constant(2.0)).unwrap();
    let pa = graph.add_component(&registry, "pa", "probe", no_generics()).unwrap();
    let pb = graph.add_component(&registry, "pb", "probe", no_generics()).unwrap();
    graph.connect(b, "out", pb, "in", 0).unwrap();
    graph.connect(a, "out", pa, "in", 0).unwrap();

    let plan = Plan::compile(&graph, 1).unwrap();
    assert_eq!(plan.order, vec![a, b, pa, pb]);
}

#[test]
fn only_short_delays_constrain_order() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let out = graph.add_component(&registry, "out", "probe", no_generics()).unwrap();
    let src = graph.add_component(&registry, "src", "constant", constant(1.0)).unwrap();
    graph.connect(src, "out", out, "in", 3).unwrap();

    let plan = Plan::compile(&graph, 2).unwrap();
    assert_eq!(plan.order, vec![out, src]);

    // Under a larger chunk the edge is read in the tick it is written, so
    // the producer has to move first.
    let plan = Plan::compile(&graph, 4).unwrap();
    assert_eq!(plan.order, vec![src, out]);
}

#[test]
fn zero_delay_cycle_names_its_members() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let src = graph.add_component(&registry, "src", "constant", constant(1.0)).unwrap();
    let mix = graph.add_component(&registry, "mix", "sum", no_generics()).unwrap();
    let amp = graph.add_component(&registry, "amp", "gain", no_generics()).unwrap();
    let out = graph.add_component(&registry, "out", "probe", no_generics()).unwrap();
    graph.connect(src, "out", mix, "in", 0).unwrap();
    graph.connect(mix, "out", amp, "in", 0).unwrap();
    graph.connect(amp, "out", mix, "in", 0).unwrap();
    graph.connect(amp, "out", out, "in", 0).unwrap();

    match Plan::compile(&graph, 1).unwrap_err() {
        SimError::ZeroDelayCycle(names) => {
            assert!(names.contains(&"mix".to_owned()));
            assert!(names.contains(&"amp".to_owned()));
            assert!(!names.contains(&"src".to_owned()));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn wiring_errors_are_caught_at_connect() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let ramp = graph.add_component(&registry, "ramp", "counter", no_generics()).unwrap();
    let src = graph.add_component(&registry, "src", "constant", constant(1.0)).unwrap();
    let amp = graph.add_component(&registry, "amp", "gain", no_generics()).unwrap();

    assert!(matches!(
        graph.connect(ramp, "out", amp, "in", 0),
        Err(GraphError::PortTypeMismatch { .. })
    ));
    assert!(matches!(
        graph.connect(src, "nope", amp, "in", 0),
        Err(GraphError::UnknownPort { direction: "output", .. })
    ));
    assert!(matches!(
        graph.connect(src, "out", ComponentId(9), "in", 0),
        Err(GraphError::InvalidComponent(9))
    ));

    graph.connect(src, "out", amp, "in", 0).unwrap();
    assert_eq!(
        graph.connect(src, "out", amp, "in", 1),
        Err(GraphError::PortAlreadyConnected("amp.in".into()))
    );
}

#[test]
fn unconnected_single_input_fails_compilation() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    graph.add_component(&registry, "amp", "gain", no_generics()).unwrap();
    let err = Plan::compile(&graph, 1).unwrap_err();
    assert!(matches!(
        err,
        SimError::Graph(GraphError::UnconnectedInput(ref port)) if port == "amp.in"
    ));
}

#[test]
fn duplicate_names_and_unknown_blocks_are_rejected() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    graph.add_component(&registry, "amp", "gain", no_generics()).unwrap();
    assert!(matches!(
        graph.add_component(&registry, "amp", "gain", no_generics()),
        Err(SimError::Graph(GraphError::DuplicateName(_)))
    ));
    assert!(matches!(
        graph.add_component(&registry, "x", "no_such_block", no_generics()),
        Err(SimError::UnknownBlock(_))
    ));
}
