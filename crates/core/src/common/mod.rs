//! Common utilities and types used throughout the harness.
//!
//! This module provides the building blocks shared by the kernel, the probe
//! binder, and the verification components:
//! 1. **Paths:** Dot-separated hierarchical names for units and signals.
//! 2. **Values:** Four-state-lite signal values (unknown, word, text).
//! 3. **Time:** Picosecond simulation time and unit conversion.
//! 4. **Errors:** Per-concern error enums and the umbrella `Error`.

/// Error types for binding, simulation, configuration, and testbench checks.
pub mod error;

/// Hierarchical path type.
pub mod path;

/// Simulation time and time units.
pub mod time;

/// Signal values and widths.
pub mod value;

pub use error::{BindError, ConfigError, Error, Result, SimError, TbError};
pub use path::HierPath;
pub use time::{SimTime, TimeUnit};
pub use value::{Value, Width};
