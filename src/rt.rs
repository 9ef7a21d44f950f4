//! RT module: the simulation driver.
//!
//! Setup runs every component through name, configure, check, init and
//! connect, then [`Simulation::tick`] steps each component once in plan order.
//! The tick loop never records invariants.

use crate::component::Component;
use crate::config::SimConfig;
use crate::connection::Connection;
use crate::error::{Result, SimError};
use crate::graph::{ComponentId, Graph};
use crate::invariant_ppt::{assert_invariant, CAPACITY_SUFFICIENT, CHECK_ERRORS_BATCHED};
use crate::plan::Plan;
use crate::registry::Registry;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, trace, warn};

/// Why the tick loop stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "component", rename_all = "snake_case")]
pub enum StopReason {
    /// A component called `finish`.
    Finished(String),
    /// `max_ticks` was reached.
    MaxTicks,
    /// The host predicate returned true.
    Predicate,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Number of ticks executed.
    pub ticks: u64,
    /// What ended the run.
    pub stop: StopReason,
    /// Results by component, then by result name.
    pub results: BTreeMap<String, BTreeMap<String, Value>>,
}

impl RunReport {
    /// One result.
    pub fn result(&self, component: &str, name: &str) -> Option<&Value> {
        self.results.get(component)?.get(name)
    }
}

type StopPredicate = Box<dyn FnMut(u64) -> bool>;

/// A ready-to-run simulation.
pub struct Simulation {
    plan: Plan,
    components: Vec<Component>,
    max_ticks: Option<u64>,
    stop_when: Option<StopPredicate>,
    stopped: Option<StopReason>,
    ticks: u64,
}

impl Simulation {
    /// Instantiate, check, initialize and connect every component of `graph`.
    ///
    /// Check errors from all components are collected before failing, so one
    /// run reports every wiring defect at once.
    pub fn new(graph: &Graph, registry: &Registry, config: &SimConfig) -> Result<Self> {
        config.validate()?;
        let plan = Plan::compile(graph, config.chunk)?;

        let mut components = Vec::with_capacity(graph.components.len());
        for (index, spec) in graph.components.iter().enumerate() {
            let id = ComponentId(index);
            let mut component = registry.instantiate(&spec.block, &spec.name)?;
            component.bind_ports(plan.input_ports(id), plan.output_ports(id))?;
            component.set_generics(&spec.generics)?;
            components.push(component);
        }

        let mut failures = Vec::new();
        let mut checked = 0;
        for id in &plan.order {
            failures.extend(components[id.0].check()?);
            checked += 1;
        }
        assert_invariant(
            CHECK_ERRORS_BATCHED,
            checked == components.len(),
            "every component is checked before check errors are reported",
            Some("Simulation::new"),
        );
        if !failures.is_empty() {
            warn!(count = failures.len(), "check phase failed");
            return Err(SimError::Check(failures));
        }

        for id in &plan.order {
            components[id.0].init(plan.chunk)?;
        }

        connect(&plan, &mut components, config.max_buffer)?;

        for component in &mut components {
            component.start(plan.chunk)?;
        }

        info!(
            components = components.len(),
            chunk = plan.chunk,
            "simulation ready"
        );
        Ok(Self {
            plan,
            components,
            max_ticks: config.max_ticks,
            stop_when: None,
            stopped: None,
            ticks: 0,
        })
    }

    /// Stop once `predicate(ticks)` returns true, checked after each tick.
    pub fn stop_when(&mut self, predicate: impl FnMut(u64) -> bool + 'static) {
        self.stop_when = Some(Box::new(predicate));
    }

    /// Step every component once. Returns `Ok(true)` while the run should
    /// continue.
    pub fn tick(&mut self) -> Result<bool> {
        let tick = self.ticks;
        for id in &self.plan.order {
            if let Err(err) = self.components[id.0].tick(self.plan.chunk, tick) {
                error!(tick, %err, "run halted");
                return Err(err);
            }
        }
        self.ticks += 1;
        trace!(tick, "tick complete");
        self.stopped = self.stop_reason();
        Ok(self.stopped.is_none())
    }

    /// First component in tick order with a pending finish request.
    fn finish_requested(&self) -> Option<StopReason> {
        self.plan
            .order
            .iter()
            .find(|id| self.components[id.0].finished_trigger())
            .map(|id| StopReason::Finished(self.components[id.0].name().to_owned()))
    }

    fn stop_reason(&mut self) -> Option<StopReason> {
        if let Some(reason) = self.finish_requested() {
            return Some(reason);
        }
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            return Some(StopReason::MaxTicks);
        }
        let ticks = self.ticks;
        if self.stop_when.as_mut().is_some_and(|pred| pred(ticks)) {
            return Some(StopReason::Predicate);
        }
        None
    }

    /// Tick until a component finishes or a stop condition holds, then run
    /// every epilog in tick order.
    ///
    /// With no `max_ticks`, no predicate and no block that finishes, this
    /// does not return.
    pub fn run(&mut self) -> Result<RunReport> {
        info!(ticks = self.ticks, "run started");
        let stop = loop {
            if let Some(reason) = self.stopped.clone().or_else(|| self.finish_requested()) {
                break reason;
            }
            if self.max_ticks.is_some_and(|max| self.ticks >= max) {
                break StopReason::MaxTicks;
            }
            self.tick()?;
        };
        for id in &self.plan.order {
            self.components[id.0].mark_finishing()?;
        }
        for id in &self.plan.order {
            self.components[id.0].epilog(self.ticks)?;
        }
        let results = self
            .components
            .iter()
            .map(|c| (c.name().to_owned(), c.results()))
            .collect();
        info!(ticks = self.ticks, ?stop, "run finished");
        Ok(RunReport {
            ticks: self.ticks,
            stop,
            results,
        })
    }

    /// Ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The compiled plan.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Component names in tick order.
    pub fn order(&self) -> Vec<&str> {
        self.plan
            .order
            .iter()
            .map(|id| self.components[id.0].name())
            .collect()
    }

    /// Component by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Mutable component by name, e.g. to call [`Component::finish`] from
    /// the host.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("components", &self.components)
            .field("chunk", &self.plan.chunk)
            .field("ticks", &self.ticks)
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Allocate one writer per physical output and bind a reader per edge.
///
/// Capacity is the deepest chunk requested by the producer or any reader,
/// plus the longest reader delay.
fn connect(plan: &Plan, components: &mut [Component], max_buffer: Option<usize>) -> Result<()> {
    let targets = plan.edge_targets();
    for (producer, slots) in plan.outputs.iter().enumerate() {
        for (index, slot) in slots.iter().enumerate() {
            let source = &components[producer];
            let desc = source
                .descriptor()
                .ok_or_else(|| SimError::InvalidConfig(format!("{} has no descriptor", source.name())))?;
            let port = &desc.outputs()[slot.port];
            let element_size = port.element_size;
            let port_name = port.name.clone();
            let component_name = source.name().to_owned();

            let mut depth = source.out_chunk(index).unwrap_or(plan.chunk);
            let mut delay = 0;
            let mut explicit: Option<usize> = None;
            for &edge in &slot.edges {
                let (consumer, input) = targets[edge];
                let wanted = components[consumer.0].in_chunk(input).unwrap_or(plan.chunk);
                depth = depth.max(wanted);
                delay = delay.max(plan.edges[edge].delay);
                if let Some(cap) = plan.edges[edge].capacity {
                    explicit = Some(explicit.map_or(cap, |e: usize| e.max(cap)));
                }
            }
            let required = depth + delay;

            let insufficient = |limit| SimError::InsufficientCapacity {
                component: component_name.clone(),
                port: port_name.clone(),
                required,
                limit,
            };
            for &edge in &slot.edges {
                if let Some(cap) = plan.edges[edge].capacity {
                    if cap < required {
                        return Err(insufficient(cap));
                    }
                }
            }
            let capacity = explicit.map_or(required, |e| e.max(required));
            if let Some(limit) = max_buffer {
                if capacity > limit {
                    return Err(insufficient(limit));
                }
            }
            assert_invariant(
                CAPACITY_SUFFICIENT,
                capacity >= required,
                "buffer holds the deepest chunk plus the longest delay",
                Some("Simulation::connect"),
            );

            let writer = Connection::writer(capacity, element_size);
            for &edge in &slot.edges {
                let (consumer, input) = targets[edge];
                let reader = Connection::reader(&writer, plan.edges[edge].delay);
                components[consumer.0].attach_input(input, reader)?;
            }
            debug!(
                component = %component_name,
                port = %port_name,
                capacity,
                readers = slot.edges.len(),
                "buffer allocated"
            );
            components[producer].attach_output(index, writer)?;
        }
    }
    Ok(())
}
