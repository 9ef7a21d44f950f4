//! Echo built in code: a source feeds a sum whose output is faded and fed
//! back with a delay.
//!
//! ```text
//! RUST_LOG=sdflow=debug cargo run --example feedback_loop
//! ```

use sdflow::graph::Graph;
use sdflow::{Registry, SimConfig, SimError, Simulation, Value};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

fn generics(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let src = graph.add_component(&registry, "src", "constant", generics(&[("value", Value::Float(1.0))]))?;
    let mix = graph.add_component(&registry, "mix", "sum", BTreeMap::new())?;
    let fade = graph.add_component(&registry, "fade", "gain", generics(&[("gain", Value::Float(0.5))]))?;
    let out = graph.add_component(&registry, "out", "probe", generics(&[("limit", Value::Int(64))]))?;
    graph.connect(src, "out", mix, "in", 0)?;
    graph.connect(mix, "out", fade, "in", 0)?;
    graph.connect(fade, "out", mix, "in", 8)?;
    graph.connect(mix, "out", out, "in", 0)?;

    let config = SimConfig::default().with_chunk(8);
    let mut sim = Simulation::new(&graph, &registry, &config)?;
    println!("tick order: {}", sim.order().join(" -> "));
    let report = sim.run()?;
    println!("{} ticks, stopped by {:?}", report.ticks, report.stop);
    for name in ["count", "last", "peak"] {
        if let Some(value) = report.result("out", name) {
            println!("out.{name} = {value}");
        }
    }
    Ok(())
}
