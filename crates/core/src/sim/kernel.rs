//! Event-driven simulation kernel.
//!
//! The kernel owns the design and the behavioral units and advances time in
//! discrete timesteps:
//! 1. **Apply:** All events queued for the timestep are written to the store.
//! 2. **Settle:** Units are evaluated in delta cycles until no net changes.
//! 3. **Observe:** The settled timestep is handed to an [`Observer`] once, with the
//!    value every changed net had when the timestep began.
//!
//! Clocks are free-running toggles that reschedule themselves.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::common::{SimError, SimTime, Value};

use super::design::Design;
use super::signals::{SignalId, SignalKind, SignalStore};
use super::unit::{EvalCtx, Unit, edge};

/// Default number of delta cycles allowed per timestep.
pub const DEFAULT_DELTA_LIMIT: usize = 64;

/// Receives every settled timestep.
pub trait Observer {
    /// Called once per timestep after all delta cycles have settled.
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError>;
}

impl Observer for () {
    fn on_step(&mut self, _step: &mut Step<'_>) -> Result<(), SimError> {
        Ok(())
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        self.0.on_step(step)?;
        self.1.on_step(step)
    }
}

impl<T: Observer + ?Sized> Observer for &mut T {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        (**self).on_step(step)
    }
}

/// A settled timestep as seen by observers.
#[derive(Debug)]
pub struct Step<'a> {
    time: SimTime,
    design: &'a mut Design,
    changes: &'a mut BTreeMap<SignalId, Value>,
}

impl Step<'_> {
    /// Time of this step.
    pub const fn time(&self) -> SimTime {
        self.time
    }

    /// Design the step belongs to.
    pub fn design(&self) -> &Design {
        self.design
    }

    /// Settled value of a net.
    pub fn value(&self, id: SignalId) -> &Value {
        self.design.store().get(id)
    }

    /// Settled value as a bit.
    pub fn bit(&self, id: SignalId) -> Option<bool> {
        self.value(id).as_bit()
    }

    /// Returns `true` if the net changed during this step.
    pub fn changed(&self, id: SignalId) -> bool {
        self.changes.contains_key(&id)
    }

    /// Returns `true` if the net went to 1 during this step.
    pub fn rose(&self, id: SignalId) -> bool {
        edge(self.changes.get(&id), self.value(id), true)
    }

    /// Returns `true` if the net went to 0 during this step.
    pub fn fell(&self, id: SignalId) -> bool {
        edge(self.changes.get(&id), self.value(id), false)
    }

    /// Iterates over changed nets with the value they had before the step.
    pub fn changes(&self) -> impl Iterator<Item = (SignalId, &Value)> {
        self.changes.iter().map(|(id, old)| (*id, old))
    }

    /// Writes an annotation probe. Only nets declared with
    /// [`Design::declare_annotation`] may be written.
    pub fn annotate(&mut self, id: SignalId, value: impl Into<Value>) -> Result<(), SimError> {
        if !self.design.is_annotation(id) {
            return Err(SimError::NotAnnotation(
                self.design.store().signal(id).path.clone(),
            ));
        }
        let value = value.into();
        let store = self.design.store_mut();
        store.check(id, &value)?;
        if let Some(old) = store.set(id, value) {
            let _ = self.changes.entry(id).or_insert(old);
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Action {
    Drive(SignalId, Value),
    Toggle(usize),
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    signal: SignalId,
    half_period: SimTime,
}

/// Top-level signal simulator: design, units, clocks, and the event queue.
pub struct Simulator {
    design: Design,
    units: Vec<Box<dyn Unit>>,
    clocks: Vec<Clock>,
    queue: BTreeMap<SimTime, Vec<Action>>,
    now: SimTime,
    delta_limit: usize,
    steps: u64,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("now", &self.now)
            .field("units", &self.units.iter().map(|u| u.path().to_string()).collect::<Vec<_>>())
            .field("clocks", &self.clocks.len())
            .field("pending", &self.pending_events())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Creates a simulator at time 0 over an elaborated design.
    pub fn new(design: Design) -> Self {
        Self {
            design,
            units: Vec::new(),
            clocks: Vec::new(),
            queue: BTreeMap::new(),
            now: 0,
            delta_limit: DEFAULT_DELTA_LIMIT,
            steps: 0,
        }
    }

    /// Overrides the per-timestep delta cycle limit.
    #[must_use]
    pub const fn with_delta_limit(mut self, limit: usize) -> Self {
        self.delta_limit = limit;
        self
    }

    /// Registers a behavioral unit.
    pub fn add_unit(&mut self, unit: Box<dyn Unit>) {
        self.units.push(unit);
    }

    /// The registered unit at `path`, if it is a `U`.
    pub fn unit<U: Unit>(&self, path: &str) -> Option<&U> {
        self.units
            .iter()
            .find(|u| u.path().as_str() == path)
            .and_then(|u| (&**u as &dyn Any).downcast_ref::<U>())
    }

    /// The design being simulated.
    pub const fn design(&self) -> &Design {
        &self.design
    }

    /// Net storage.
    pub const fn store(&self) -> &SignalStore {
        self.design.store()
    }

    /// Current simulation time in picoseconds.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Number of timesteps processed so far.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Current value of a net.
    pub fn value(&self, id: SignalId) -> &Value {
        self.design.store().get(id)
    }

    /// Number of queued actions.
    pub fn pending_events(&self) -> usize {
        self.queue.values().map(Vec::len).sum()
    }

    /// Time of the earliest queued action.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.queue.keys().next().copied()
    }

    /// Queues a value change at absolute time `at`.
    pub fn schedule(
        &mut self,
        at: SimTime,
        id: SignalId,
        value: impl Into<Value>,
    ) -> Result<(), SimError> {
        if at < self.now {
            return Err(SimError::ScheduleInPast { at, now: self.now });
        }
        let value = value.into();
        self.design.store().check(id, &value)?;
        self.queue
            .entry(at)
            .or_default()
            .push(Action::Drive(id, value));
        Ok(())
    }

    /// Queues a value change `delay` picoseconds from now.
    pub fn schedule_in(
        &mut self,
        delay: SimTime,
        id: SignalId,
        value: impl Into<Value>,
    ) -> Result<(), SimError> {
        self.schedule(self.now + delay, id, value)
    }

    /// Starts a free-running clock on a 1-bit net: low at `start`, first rising edge half a
    /// period later.
    pub fn add_clock(
        &mut self,
        id: SignalId,
        period: SimTime,
        start: SimTime,
    ) -> Result<(), SimError> {
        let sig = self.design.store().signal(id);
        if sig.kind != SignalKind::WIRE || period < 2 {
            return Err(SimError::ValueMismatch {
                signal: sig.path.clone(),
                value: format!("clock period {period} ps"),
            });
        }
        let half_period = period / 2;
        self.schedule(start, id, false)?;
        self.clocks.push(Clock {
            signal: id,
            half_period,
        });
        let idx = self.clocks.len() - 1;
        self.queue
            .entry(start + half_period)
            .or_default()
            .push(Action::Toggle(idx));
        Ok(())
    }

    /// Advances time to `until`, processing every timestep at or before it.
    pub fn run_until(&mut self, until: SimTime, observer: &mut dyn Observer) -> Result<(), SimError> {
        while let Some(entry) = self.queue.first_entry() {
            if *entry.key() > until {
                break;
            }
            let (time, actions) = entry.remove_entry();
            self.now = time;
            self.process_step(actions, observer)?;
        }
        self.now = self.now.max(until);
        Ok(())
    }

    /// Advances time by `delta` picoseconds.
    pub fn run_for(&mut self, delta: SimTime, observer: &mut dyn Observer) -> Result<(), SimError> {
        self.run_until(self.now + delta, observer)
    }

    fn process_step(
        &mut self,
        actions: Vec<Action>,
        observer: &mut dyn Observer,
    ) -> Result<(), SimError> {
        let now = self.now;
        let mut step_changes = BTreeMap::new();
        let mut delta = BTreeMap::new();

        for action in actions {
            match action {
                Action::Drive(id, value) => {
                    self.apply(id, value, &mut delta, &mut step_changes)?;
                }
                Action::Toggle(idx) => {
                    let clock = self.clocks[idx];
                    let level = self.value(clock.signal).as_bit().unwrap_or(false);
                    self.apply(
                        clock.signal,
                        Value::bit(!level),
                        &mut delta,
                        &mut step_changes,
                    )?;
                    self.queue
                        .entry(now + clock.half_period)
                        .or_default()
                        .push(Action::Toggle(idx));
                }
            }
        }

        let mut cycles = 0;
        while !delta.is_empty() {
            if cycles == self.delta_limit {
                return Err(SimError::DeltaOverflow {
                    time: now,
                    limit: self.delta_limit,
                });
            }
            cycles += 1;

            let mut drives = Vec::new();
            for unit in &mut self.units {
                let mut ctx = EvalCtx::new(now, self.design.store(), &delta, &mut drives);
                unit.evaluate(&mut ctx);
            }
            delta.clear();
            for (id, value) in drives {
                self.apply(id, value, &mut delta, &mut step_changes)?;
            }
        }

        self.steps += 1;
        trace!(time = now, deltas = cycles, changed = step_changes.len(), "timestep settled");

        let mut step = Step {
            time: now,
            design: &mut self.design,
            changes: &mut step_changes,
        };
        observer.on_step(&mut step)
    }

    fn apply(
        &mut self,
        id: SignalId,
        value: Value,
        delta: &mut BTreeMap<SignalId, Value>,
        step_changes: &mut BTreeMap<SignalId, Value>,
    ) -> Result<(), SimError> {
        let store = self.design.store_mut();
        store.check(id, &value)?;
        if let Some(old) = store.set(id, value) {
            let _ = delta.entry(id).or_insert_with(|| old.clone());
            let _ = step_changes.entry(id).or_insert(old);
        }
        Ok(())
    }
}
