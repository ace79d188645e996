//! Probe binding.
//!
//! Internal unit signals are exposed as flat, prefixed, read-only aliases so
//! that waveform capture and test logic can observe them without the units
//! changing their own interfaces. Binding happens once, during elaboration.

/// Alias construction with collision and width checks.
pub mod binder;

/// Sealed alias namespace.
pub mod namespace;

pub use binder::{ProbeBinder, ProbeSpec};
pub use namespace::{ProbeAlias, ProbeNamespace};
