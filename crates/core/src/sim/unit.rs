//! Unit trait for behavioral models.
//!
//! This module defines the `Unit` trait implemented by every modeled block. It provides:
//! 1. **Identification:** `path` of the instance in the design hierarchy.
//! 2. **Evaluation:** `evaluate` is called once per delta cycle with an [`EvalCtx`] that
//!    exposes the values and edges of the previous delta and collects new drives.
//!
//! Units are `Send` so a whole simulator can be moved to a worker thread, and
//! `Any` so tests and tools can get the concrete model back with
//! [`Simulator::unit`](super::Simulator::unit).

use std::any::Any;
use std::collections::BTreeMap;

use crate::common::{HierPath, SimTime, Value};

use super::signals::{SignalId, SignalStore};

/// A behavioral block evaluated by the kernel.
pub trait Unit: Any + Send {
    /// Returns the instance path (e.g., `"top.dut.u_reg_file"`).
    fn path(&self) -> &HierPath;

    /// Reacts to the changes of the previous delta cycle.
    ///
    /// Implementations read through `ctx` and request output changes with
    /// [`EvalCtx::drive`]; drives take effect in the next delta cycle.
    fn evaluate(&mut self, ctx: &mut EvalCtx<'_>);
}

/// View of the design handed to [`Unit::evaluate`].
#[derive(Debug)]
pub struct EvalCtx<'a> {
    now: SimTime,
    store: &'a SignalStore,
    delta: &'a BTreeMap<SignalId, Value>,
    drives: &'a mut Vec<(SignalId, Value)>,
}

impl<'a> EvalCtx<'a> {
    pub(crate) fn new(
        now: SimTime,
        store: &'a SignalStore,
        delta: &'a BTreeMap<SignalId, Value>,
        drives: &'a mut Vec<(SignalId, Value)>,
    ) -> Self {
        Self {
            now,
            store,
            delta,
            drives,
        }
    }

    /// Current simulation time.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Current value of a net.
    pub fn value(&self, id: SignalId) -> &Value {
        self.store.get(id)
    }

    /// Current value as a word, `None` if unknown.
    pub fn word(&self, id: SignalId) -> Option<u64> {
        self.value(id).as_u64()
    }

    /// Current value as a bit, `None` if unknown.
    pub fn bit(&self, id: SignalId) -> Option<bool> {
        self.value(id).as_bit()
    }

    /// Returns `true` if the net changed in the previous delta.
    pub fn changed(&self, id: SignalId) -> bool {
        self.delta.contains_key(&id)
    }

    /// Returns `true` on a transition to 1 (from 0 or X).
    pub fn rose(&self, id: SignalId) -> bool {
        edge(self.delta.get(&id), self.store.get(id), true)
    }

    /// Returns `true` on a transition to 0 (from 1 or X).
    pub fn fell(&self, id: SignalId) -> bool {
        edge(self.delta.get(&id), self.store.get(id), false)
    }

    /// Requests a new value for a net in the next delta.
    pub fn drive(&mut self, id: SignalId, value: impl Into<Value>) {
        self.drives.push((id, value.into()));
    }
}

/// Edge test shared by units and observers.
pub(crate) fn edge(old: Option<&Value>, new: &Value, rising: bool) -> bool {
    let Some(old) = old else {
        return false;
    };
    let target = Value::bit(rising);
    *new == target && *old != target
}
