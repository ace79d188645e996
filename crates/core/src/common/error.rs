//! Error definitions.
//!
//! Errors are grouped by the phase that produces them:
//! 1. **Binding:** Probe alias construction during elaboration (`BindError`).
//! 2. **Simulation:** Design construction and kernel scheduling (`SimError`).
//! 3. **Configuration:** Loading and validating JSON inputs (`ConfigError`).
//! 4. **Testbench:** Transaction checks, protocol violations, and scoreboard results (`TbError`).
//!
//! All of them convert into the umbrella [`Error`].

use std::path::PathBuf;

use thiserror::Error;

use super::path::HierPath;
use super::time::SimTime;
use super::value::Width;

/// Probe binding failures. All are fatal to environment construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The named unit instance does not exist.
    #[error("unresolved reference: no unit `{unit}`")]
    UnresolvedUnit {
        /// Requested unit path.
        unit: HierPath,
    },

    /// The unit exists but declares no such signal.
    #[error("unresolved reference: unit `{unit}` has no signal `{signal}`")]
    UnresolvedSignal {
        /// Unit path.
        unit: HierPath,
        /// Requested local signal name.
        signal: String,
    },

    /// An alias with the generated name is already bound in this scope.
    #[error("probe alias `{alias}` already bound to `{existing}`")]
    NameCollision {
        /// Generated alias name.
        alias: String,
        /// Full path of the source the existing alias mirrors.
        existing: String,
    },

    /// The declared width disagrees with the source signal width.
    #[error("probe alias `{alias}`: declared width {declared}, source width {actual}")]
    WidthMismatch {
        /// Generated alias name.
        alias: String,
        /// Width requested by the caller.
        declared: Width,
        /// Width of the source signal (0 for text signals).
        actual: Width,
    },
}

/// The two classes of binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// Unit or signal could not be found.
    UnresolvedReference,
    /// Name collision or width mismatch.
    Conflict,
}

impl BindError {
    /// Classifies the error.
    pub const fn kind(&self) -> BindErrorKind {
        match self {
            Self::UnresolvedUnit { .. } | Self::UnresolvedSignal { .. } => {
                BindErrorKind::UnresolvedReference
            }
            Self::NameCollision { .. } | Self::WidthMismatch { .. } => BindErrorKind::Conflict,
        }
    }
}

/// Design construction and kernel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A unit with this path already exists.
    #[error("duplicate unit `{0}`")]
    DuplicateUnit(HierPath),

    /// The parent of a new unit has not been added.
    #[error("unit `{0}` has no parent unit in the design")]
    MissingParent(HierPath),

    /// The unit does not exist.
    #[error("unknown unit `{0}`")]
    UnknownUnit(HierPath),

    /// The unit already declares a signal with this name.
    #[error("unit `{unit}` already declares `{name}`")]
    DuplicateSignal {
        /// Owning unit.
        unit: HierPath,
        /// Local name.
        name: String,
    },

    /// Logic widths must be within 1..=64.
    #[error("signal `{signal}` has unsupported width {width}")]
    InvalidWidth {
        /// Full signal path.
        signal: String,
        /// Requested width.
        width: Width,
    },

    /// A full signal path did not resolve.
    #[error("unknown signal `{0}`")]
    UnknownSignal(String),

    /// An event was scheduled before the current time.
    #[error("cannot schedule at {at} ps; current time is {now} ps")]
    ScheduleInPast {
        /// Requested time.
        at: SimTime,
        /// Current time.
        now: SimTime,
    },

    /// The value does not fit the signal.
    #[error("value {value} does not fit signal `{signal}`")]
    ValueMismatch {
        /// Full signal path.
        signal: String,
        /// Offending value, rendered.
        value: String,
    },

    /// Observers may only annotate text signals and signals owned by the testbench probes unit.
    #[error("signal `{0}` is not an annotation probe")]
    NotAnnotation(String),

    /// A timestep failed to settle.
    #[error("no convergence at {time} ps after {limit} delta cycles")]
    DeltaOverflow {
        /// Timestep that failed to settle.
        time: SimTime,
        /// Delta limit that was exceeded.
        limit: usize,
    },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read `{}`: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON could not be parsed into the expected shape.
    #[error("invalid JSON in {origin}: {source}")]
    Json {
        /// File path, or `<inline>` for JSON given as a string.
        origin: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A register definition is inconsistent.
    #[error("register `{reg}`: {reason}")]
    Register {
        /// Register name.
        reg: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Testbench failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TbError {
    /// A transaction failed the driver's consistency check.
    #[error("illegal transaction {trx}: {reason}")]
    IllegalTransaction {
        /// Rendered transaction.
        trx: String,
        /// Failed check.
        reason: String,
    },

    /// The monitor observed bus activity that violates the frame protocol.
    #[error("SPI protocol violation at {time} ps: {detail}")]
    Protocol {
        /// Time of the violation.
        time: SimTime,
        /// Description.
        detail: String,
    },

    /// The scoreboard recorded failures.
    #[error(
        "scoreboard failed: {mismatches} mismatch(es), {unexpected} unexpected, {missing} missing"
    )]
    Scoreboard {
        /// Compared items that differed.
        mismatches: usize,
        /// Items received with no expectation queued.
        unexpected: usize,
        /// Expectations never received.
        missing: usize,
    },

    /// The run exceeded its simulated time budget.
    #[error("simulated time limit of {limit} ps exceeded")]
    Timeout {
        /// Limit in picoseconds.
        limit: SimTime,
    },
}

/// Any harness error.
#[derive(Debug, Error)]
pub enum Error {
    /// Probe binding failed.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// Design or kernel failure.
    #[error(transparent)]
    Sim(#[from] SimError),
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Testbench check failed.
    #[error(transparent)]
    Tb(#[from] TbError),
    /// Waveform or report output failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using the umbrella [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
