use num_complex::Complex64;
use sdflow::{Registry, SimConfig, SimError, Simulation, StopReason, Topology, Value};

fn run(json: &str) -> Result<sdflow::RunReport, SimError> {
    let topology = Topology::from_json_str(json)?;
    let registry = Registry::with_builtins();
    let graph = topology.build(&registry)?;
    Simulation::new(&graph, &registry, &topology.config)?.run()
}

fn complex(re: f64, im: f64) -> Value {
    Value::Complex(Complex64::new(re, im))
}

#[test]
fn gains_compose_along_a_chain() {
    let report = run(r#"{
        "config": { "chunk": 4 },
        "components": [
            { "name": "src", "block": "constant", "generics": { "value": { "complex": [1.0, 1.0] } } },
            { "name": "g2", "block": "gain", "generics": { "gain": { "int": 2 } } },
            { "name": "g3", "block": "gain", "generics": { "gain": { "float": 3.0 } } },
            { "name": "out", "block": "probe", "generics": { "limit": { "int": 10 } } }
        ],
        "connections": [
            { "from": "src.out", "to": "g2.in" },
            { "from": "g2.out", "to": "g3.in" },
            { "from": "g3.out", "to": "out.in" }
        ]
    }"#)
    .unwrap();

    assert_eq!(report.ticks, 3);
    assert_eq!(report.stop, StopReason::Finished("out".into()));
    assert_eq!(report.result("out", "count"), Some(&Value::Int(10)));
    assert_eq!(report.result("out", "last"), Some(&complex(6.0, 6.0)));
    assert_eq!(report.result("out", "sum"), Some(&complex(60.0, 60.0)));
}

#[test]
fn delayed_self_loop_accumulates() {
    let report = run(r#"{
        "config": { "max_ticks": 5 },
        "components": [
            { "name": "one", "block": "constant", "generics": { "value": { "float": 1.0 } } },
            { "name": "acc", "block": "sum" },
            { "name": "out", "block": "probe" }
        ],
        "connections": [
            { "from": "one.out", "to": "acc.in" },
            { "from": "acc.out", "to": "acc.in", "delay": 1 },
            { "from": "acc.out", "to": "out.in" }
        ]
    }"#)
    .unwrap();

    assert_eq!(report.stop, StopReason::MaxTicks);
    assert_eq!(report.result("out", "last"), Some(&complex(5.0, 0.0)));
    assert_eq!(report.result("out", "sum"), Some(&complex(15.0, 0.0)));
}

#[test]
fn loop_delay_of_two_interleaves_two_accumulators() {
    // Each lane of a two-element chunk feeds back into itself.
    let report = run(r#"{
        "config": { "chunk": 2, "max_ticks": 3 },
        "components": [
            { "name": "one", "block": "constant", "generics": { "value": { "float": 1.0 } } },
            { "name": "acc", "block": "sum" },
            { "name": "out", "block": "probe" }
        ],
        "connections": [
            { "from": "one.out", "to": "acc.in" },
            { "from": "acc.out", "to": "acc.in", "delay": 2 },
            { "from": "acc.out", "to": "out.in" }
        ]
    }"#)
    .unwrap();

    assert_eq!(report.result("out", "count"), Some(&Value::Int(6)));
    assert_eq!(report.result("out", "last"), Some(&complex(3.0, 0.0)));
    assert_eq!(report.result("out", "sum"), Some(&complex(12.0, 0.0)));
}

#[test]
fn short_loop_delay_is_rejected_before_anything_runs() {
    let err = run(r#"{
        "config": { "chunk": 4 },
        "components": [
            { "name": "one", "block": "constant", "generics": { "value": { "float": 1.0 } } },
            { "name": "acc", "block": "sum" },
            { "name": "out", "block": "probe" }
        ],
        "connections": [
            { "from": "one.out", "to": "acc.in" },
            { "from": "acc.out", "to": "acc.in", "delay": 1 },
            { "from": "acc.out", "to": "out.in" }
        ]
    }"#)
    .unwrap_err();
    match err {
        SimError::FeedbackDelayTooShort { from, to, delay, chunk } => {
            assert_eq!((from.as_str(), to.as_str()), ("acc", "acc"));
            assert_eq!((delay, chunk), (1, 4));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn explicit_capacity_below_requirement_is_rejected() {
    let err = run(r#"{
        "config": { "chunk": 2 },
        "components": [
            { "name": "src", "block": "constant", "generics": { "value": { "float": 1.0 } } },
            { "name": "out", "block": "probe" }
        ],
        "connections": [ { "from": "src.out", "to": "out.in", "delay": 3, "capacity": 4 } ]
    }"#)
    .unwrap_err();
    assert!(matches!(
        err,
        SimError::InsufficientCapacity { required: 5, limit: 4, .. }
    ));
}

#[test]
fn stepping_by_hand_matches_run() {
    let topology = Topology::from_json_str(
        r#"{
            "components": [
                { "name": "ramp", "block": "counter" },
                { "name": "conv", "block": "int_to_complex" },
                { "name": "out", "block": "probe" }
            ],
            "connections": [
                { "from": "ramp.out", "to": "conv.in" },
                { "from": "conv.out", "to": "out.in" }
            ]
        }"#,
    )
    .unwrap();
    let registry = Registry::with_builtins();
    let graph = topology.build(&registry).unwrap();
    let config = SimConfig::default().with_chunk(3);
    let mut sim = Simulation::new(&graph, &registry, &config).unwrap();
    assert_eq!(sim.order(), vec!["ramp", "conv", "out"]);

    assert!(sim.tick().unwrap());
    assert!(sim.tick().unwrap());
    sim.component_mut("ramp").unwrap().finish();
    let report = sim.run().unwrap();

    // Finishing between ticks stops the run before another tick.
    assert_eq!(report.ticks, 2);
    assert_eq!(report.stop, StopReason::Finished("ramp".into()));
    assert_eq!(report.result("out", "count"), Some(&Value::Int(6)));
    assert_eq!(report.result("out", "sum"), Some(&complex(15.0, 0.0)));
}

#[test]
fn report_serializes_to_json() {
    let report = run(r#"{
        "config": { "max_ticks": 2 },
        "components": [
            { "name": "src", "block": "constant", "generics": { "value": { "float": 2.0 } } },
            { "name": "out", "block": "probe" }
        ],
        "connections": [ { "from": "src.out", "to": "out.in" } ]
    }"#)
    .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["ticks"], 2);
    assert_eq!(json["stop"]["reason"], "max_ticks");
    assert_eq!(json["results"]["out"]["count"]["int"], 2);
}
