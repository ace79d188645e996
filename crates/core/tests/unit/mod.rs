//! # Unit Components
//!
//! Tests grouped by the component they exercise.


/// Cover points, crosses, and reports.
pub mod coverage;

/// Request and response frame layout.
pub mod frame;

/// SPI interface and register file behavior at the pins.
pub mod dut;

/// Complete seeded regressions through the session driver.
pub mod harness;

/// Event kernel: scheduling, delta cycles, clocks, and observers.
pub mod kernel;


/// Register map parsing and expansion.
pub mod regmap;

/// Scoreboard ordering and verdicts.
pub mod scoreboard;

/// Run statistics.
pub mod stats;
