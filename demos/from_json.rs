//! Run a topology file and print the report as JSON.
//!
//! ```text
//! cargo run --example from_json -- demos/chain.json
//! ```

use sdflow::{Registry, SimError, Simulation, Topology};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sdflow=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/chain.json".to_owned());
    let topology = Topology::from_path(&path)?;

    let mut registry = Registry::with_builtins();
    for block in registry.load_plugins(&topology.config)? {
        info!(%block, "plugin block available");
    }
    let graph = topology.build(&registry)?;
    let report = Simulation::new(&graph, &registry, &topology.config)?.run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
