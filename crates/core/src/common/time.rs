//! Simulation time.
//!
//! Time is an absolute count of picoseconds from the start of the run. All
//! configuration is given in friendlier units and converted once, at the edge.

use serde::Deserialize;
use std::fmt;

/// Absolute simulation time in picoseconds.
pub type SimTime = u64;

/// Picoseconds per nanosecond.
pub const PS_PER_NS: SimTime = 1_000;

/// Picoseconds per microsecond.
pub const PS_PER_US: SimTime = 1_000_000;

/// Time units accepted by configuration and helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Picoseconds.
    Ps,
    /// Nanoseconds.
    #[default]
    Ns,
    /// Microseconds.
    Us,
    /// Milliseconds.
    Ms,
}

impl TimeUnit {
    /// Returns the number of picoseconds in one unit.
    pub const fn scale(self) -> SimTime {
        match self {
            Self::Ps => 1,
            Self::Ns => PS_PER_NS,
            Self::Us => PS_PER_US,
            Self::Ms => 1_000 * PS_PER_US,
        }
    }

    /// Converts `amount` of this unit to picoseconds, rounding to the nearest picosecond.
    ///
    /// Negative and non-finite amounts clamp to zero.
    pub fn to_ps(self, amount: f64) -> SimTime {
        if !amount.is_finite() || amount <= 0.0 {
            return 0;
        }
        (amount * self.scale() as f64).round() as SimTime
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ps => "ps",
            Self::Ns => "ns",
            Self::Us => "us",
            Self::Ms => "ms",
        };
        f.write_str(s)
    }
}

/// Converts nanoseconds to picoseconds.
pub fn ns(amount: f64) -> SimTime {
    TimeUnit::Ns.to_ps(amount)
}

/// Converts microseconds to picoseconds.
pub fn us(amount: f64) -> SimTime {
    TimeUnit::Us.to_ps(amount)
}

/// Formats a picosecond timestamp as nanoseconds for log lines.
pub fn fmt_ns(t: SimTime) -> String {
    format!("{:.3} ns", t as f64 / PS_PER_NS as f64)
}
