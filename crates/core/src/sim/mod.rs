//! Signal simulation kernel.
//!
//! Organizes the design database, the net store, the `Unit` trait for
//! behavioral blocks, and the event-driven `Simulator`.

/// Design hierarchy and local signal tables.
pub mod design;

/// Event queue, delta cycles, clocks, and observers.
pub mod kernel;

/// Flat net storage.
pub mod signals;

/// Behavioral unit trait and its evaluation context.
pub mod unit;

pub use design::{Design, UnitDecl};
pub use kernel::{Observer, Simulator, Step};
pub use signals::{Signal, SignalId, SignalKind, SignalStore};
pub use unit::{EvalCtx, Unit};
