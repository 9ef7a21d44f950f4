//! Built-in blocks, one per step kind and a few structural helpers.
//!
//! | block            | kind           | ports                         |
//! |------------------|----------------|-------------------------------|
//! | `constant`       | complex        | `out`                         |
//! | `gain`           | complex        | `in` -> `out`                 |
//! | `sum`            | complex        | multi `in` -> `out`           |
//! | `probe`          | complex        | `in`                          |
//! | `counter`        | int            | `out`                         |
//! | `quantize`       | complex-to-int | `in` -> `out`                 |
//! | `int_to_complex` | int-to-complex | `in` -> `out`                 |
//! | `tee`            | bytes          | `in` -> multi `out`           |

use crate::plugin::BlockEntry;

pub mod constant;
pub mod counter;
pub mod gain;
pub mod int_to_complex;
pub mod probe;
pub mod quantize;
pub mod sum;
pub mod tee;

/// Entries registered by [`Registry::with_builtins`](crate::registry::Registry::with_builtins).
pub static BUILTINS: &[&BlockEntry] = &[
    &constant::ENTRY,
    &counter::ENTRY,
    &gain::ENTRY,
    &int_to_complex::ENTRY,
    &probe::ENTRY,
    &quantize::ENTRY,
    &sum::ENTRY,
    &tee::ENTRY,
];

#[cfg(test)]
pub(crate) fn run_json(json: &str) -> crate::error::Result<crate::rt::RunReport> {
    let topology = crate::topology::Topology::from_json_str(json)?;
    let registry = crate::registry::Registry::with_builtins();
    let graph = topology.build(&registry)?;
    crate::rt::Simulation::new(&graph, &registry, &topology.config)?.run()
}
