//! Signal storage.
//!
//! Every net in the design lives in one flat `SignalStore` and is addressed by
//! a `SignalId`. Ports of different units that are connected share the id.

use crate::common::value::{MAX_WIDTH, mask};
use crate::common::{SimError, Value, Width};

/// Index of a net in the [`SignalStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(usize);

impl SignalId {
    /// Returns the raw index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// What a net can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Logic wire (width 1) or bus.
    Logic(Width),
    /// Annotation text.
    Text,
}

impl SignalKind {
    /// Single-bit logic.
    pub const WIRE: Self = Self::Logic(1);

    /// Returns the logic width, or 0 for text.
    pub const fn width(self) -> Width {
        match self {
            Self::Logic(w) => w,
            Self::Text => 0,
        }
    }
}

/// A net: its declaring path, kind, and current value.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Full path of the declaration (`unit.name`).
    pub path: String,
    /// Logic width or text.
    pub kind: SignalKind,
    /// Current value.
    pub value: Value,
}

/// Flat store of all nets.
#[derive(Debug, Clone, Default)]
pub struct SignalStore {
    signals: Vec<Signal>,
}

impl SignalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a net initialised to `X`.
    pub(crate) fn add(&mut self, path: String, kind: SignalKind) -> Result<SignalId, SimError> {
        if let SignalKind::Logic(width) = kind {
            if width == 0 || width > MAX_WIDTH {
                return Err(SimError::InvalidWidth {
                    signal: path,
                    width,
                });
            }
        }
        self.signals.push(Signal {
            path,
            kind,
            value: Value::X,
        });
        Ok(SignalId(self.signals.len() - 1))
    }

    /// Returns the number of nets.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if no nets have been declared.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Returns the net record.
    ///
    /// # Panics
    ///
    /// Ids are only minted by this store, so an out-of-range id is a bug in the caller
    /// that mixed ids from two designs.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    /// Returns the current value of a net.
    pub fn get(&self, id: SignalId) -> &Value {
        &self.signal(id).value
    }

    /// Returns the kind of a net.
    pub fn kind(&self, id: SignalId) -> SignalKind {
        self.signal(id).kind
    }

    /// Iterates over all nets with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &Signal)> {
        self.signals.iter().enumerate().map(|(i, s)| (SignalId(i), s))
    }

    /// Validates that `value` fits the net.
    pub fn check(&self, id: SignalId, value: &Value) -> Result<(), SimError> {
        let sig = self.signal(id);
        let ok = match (sig.kind, value) {
            (_, Value::X) | (SignalKind::Text, Value::Text(_)) => true,
            (SignalKind::Logic(w), Value::Word(n)) => *n & !mask(w) == 0,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(SimError::ValueMismatch {
                signal: sig.path.clone(),
                value: format!("{value:?}"),
            })
        }
    }

    /// Writes a value; returns the previous value if it changed.
    pub(crate) fn set(&mut self, id: SignalId, value: Value) -> Option<Value> {
        let slot = &mut self.signals[id.0].value;
        if *slot == value {
            None
        } else {
            Some(std::mem::replace(slot, value))
        }
    }
}
