//! Sealed probe namespace.
//!
//! The flat set of aliases produced by a [`ProbeBinder`](super::ProbeBinder).
//! Values are never stored here: every read goes to the source net.

use std::collections::BTreeMap;

use crate::common::{Value, Width};
use crate::sim::{SignalId, SignalStore};

/// A read-only observation point mirroring one source net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAlias {
    name: String,
    width: Width,
    source: SignalId,
    source_path: String,
}

impl ProbeAlias {
    pub(crate) const fn new(name: String, width: Width, source: SignalId, source_path: String) -> Self {
        Self {
            name,
            width,
            source,
            source_path,
        }
    }

    /// Alias name (`prefix + signal`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width, equal to the source width.
    pub const fn width(&self) -> Width {
        self.width
    }

    /// Source net.
    pub const fn source(&self) -> SignalId {
        self.source
    }

    /// `unit.signal` of the source, as it was requested.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Current value, read through to the source.
    pub fn value<'s>(&self, store: &'s SignalStore) -> &'s Value {
        store.get(self.source)
    }
}

/// Immutable alias namespace produced by [`ProbeBinder::finish`](super::ProbeBinder::finish).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeNamespace {
    aliases: BTreeMap<String, ProbeAlias>,
}

impl ProbeNamespace {
    pub(crate) const fn new(aliases: BTreeMap<String, ProbeAlias>) -> Self {
        Self { aliases }
    }

    /// Looks up an alias.
    pub fn get(&self, name: &str) -> Option<&ProbeAlias> {
        self.aliases.get(name)
    }

    /// Current value of an alias.
    pub fn value<'s>(&self, store: &'s SignalStore, name: &str) -> Option<&'s Value> {
        self.get(name).map(|a| a.value(store))
    }

    /// Width of an alias.
    pub fn width(&self, name: &str) -> Option<Width> {
        self.get(name).map(ProbeAlias::width)
    }

    /// Source net of an alias.
    pub fn source(&self, name: &str) -> Option<SignalId> {
        self.get(name).map(ProbeAlias::source)
    }

    /// Iterates over aliases in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ProbeAlias> {
        self.aliases.values()
    }

    /// Alias names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` if no alias was bound.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Snapshot of every alias value, keyed by alias name.
    pub fn sample(&self, store: &SignalStore) -> BTreeMap<String, Value> {
        self.aliases
            .iter()
            .map(|(n, a)| (n.clone(), a.value(store).clone()))
            .collect()
    }
}
