//! Signal-level verification harness for an SPI register-file target.
//!
//! This crate implements the pieces a register-access regression needs:
//! 1. **Kernel:** A deterministic event-driven signal simulator with delta cycles and clocks.
//! 2. **Probes:** Structural, read-only aliases exposing internal unit signals at top level.
//! 3. **DUT:** Behavioral SPI interface and register file units wired into a top design.
//! 4. **Verification:** Frame codec, driver, monitor, scoreboard, coverage, and testbench.
//! 5. **Capture:** VCD waveform output of the probe namespace and run statistics.

/// Common types (hierarchical paths, values, time, errors).
pub mod common;
/// Harness configuration (defaults, hierarchical config structures).
pub mod config;
/// Behavioral design under test (SPI interface, register file, top-level elaboration).
pub mod dut;
/// Elaboration, reset sequencing, and session driver tying everything together.
pub mod harness;
/// Probe binder and the sealed alias namespace.
pub mod probe;
/// Event-driven signal kernel (design database, units, scheduler).
pub mod sim;
/// Per-register run statistics and reporting.
pub mod stats;
/// Verification components (frames, register map, driver, monitor, scoreboard, coverage).
pub mod verif;
/// VCD waveform capture.
pub mod wave;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Umbrella error and result types.
pub use crate::common::error::{Error, Result};
/// Session driver; construct with `Harness::new`.
pub use crate::harness::Harness;
/// Probe binder and namespace.
pub use crate::probe::{ProbeBinder, ProbeNamespace};
/// Signal simulator.
pub use crate::sim::Simulator;
