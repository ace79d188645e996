//! Design database.
//!
//! A `Design` is the elaborated hierarchy: unit instances keyed by path, each
//! with a table of local signal names. A local name either declares a new net
//! or connects to a net declared elsewhere (a port binding).

use std::collections::{BTreeMap, BTreeSet};

use crate::common::{HierPath, SimError};

use super::signals::{SignalId, SignalKind, SignalStore};

/// One unit instance and its local signal table.
#[derive(Debug, Clone)]
pub struct UnitDecl {
    path: HierPath,
    signals: BTreeMap<String, SignalId>,
}

impl UnitDecl {
    /// Returns the instance path.
    pub const fn path(&self) -> &HierPath {
        &self.path
    }

    /// Looks up a local signal name.
    pub fn signal(&self, name: &str) -> Option<SignalId> {
        self.signals.get(name).copied()
    }

    /// Iterates over local names in sorted order.
    pub fn signals(&self) -> impl Iterator<Item = (&str, SignalId)> {
        self.signals.iter().map(|(n, id)| (n.as_str(), *id))
    }
}

/// The elaborated design: hierarchy plus net storage.
#[derive(Debug, Clone, Default)]
pub struct Design {
    store: SignalStore,
    units: BTreeMap<HierPath, UnitDecl>,
    annotations: BTreeSet<SignalId>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit instance. Its parent must already exist unless it is a root.
    pub fn add_unit(&mut self, path: impl Into<HierPath>) -> Result<HierPath, SimError> {
        let path = path.into();
        if self.units.contains_key(&path) {
            return Err(SimError::DuplicateUnit(path));
        }
        if let Some(parent) = path.parent() {
            if !self.units.contains_key(&parent) {
                return Err(SimError::MissingParent(path));
            }
        }
        let _ = self.units.insert(
            path.clone(),
            UnitDecl {
                path: path.clone(),
                signals: BTreeMap::new(),
            },
        );
        Ok(path)
    }

    /// Declares a new net owned by `unit`.
    pub fn declare(
        &mut self,
        unit: &HierPath,
        name: &str,
        kind: SignalKind,
    ) -> Result<SignalId, SimError> {
        self.check_free(unit, name)?;
        let id = self.store.add(unit.join(name).to_string(), kind)?;
        self.bind_local(unit, name, id);
        Ok(id)
    }

    /// Declares a net that observers may write through [`Step::annotate`](super::Step::annotate).
    pub fn declare_annotation(
        &mut self,
        unit: &HierPath,
        name: &str,
        kind: SignalKind,
    ) -> Result<SignalId, SimError> {
        let id = self.declare(unit, name, kind)?;
        let _ = self.annotations.insert(id);
        Ok(id)
    }

    /// Binds local name `name` of `unit` to an existing net.
    pub fn connect(&mut self, unit: &HierPath, name: &str, net: SignalId) -> Result<(), SimError> {
        self.check_free(unit, name)?;
        self.bind_local(unit, name, net);
        Ok(())
    }

    /// Returns the unit at `path`.
    pub fn unit(&self, path: &str) -> Option<&UnitDecl> {
        self.units.get(path)
    }

    /// Iterates over all units in path order.
    pub fn units(&self) -> impl Iterator<Item = &UnitDecl> {
        self.units.values()
    }

    /// Looks up `unit.name`.
    pub fn signal(&self, unit: &str, name: &str) -> Option<SignalId> {
        self.unit(unit).and_then(|u| u.signal(name))
    }

    /// Resolves a full dotted signal path.
    pub fn resolve(&self, full: &str) -> Result<SignalId, SimError> {
        full.rsplit_once('.')
            .and_then(|(unit, name)| self.signal(unit, name))
            .ok_or_else(|| SimError::UnknownSignal(full.to_string()))
    }

    /// Returns `true` if observers may annotate the net.
    pub fn is_annotation(&self, id: SignalId) -> bool {
        self.annotations.contains(&id)
    }

    /// Returns the net store.
    pub const fn store(&self) -> &SignalStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut SignalStore {
        &mut self.store
    }

    fn check_free(&self, unit: &HierPath, name: &str) -> Result<(), SimError> {
        let decl = self
            .units
            .get(unit)
            .ok_or_else(|| SimError::UnknownUnit(unit.clone()))?;
        if decl.signals.contains_key(name) {
            return Err(SimError::DuplicateSignal {
                unit: unit.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn bind_local(&mut self, unit: &HierPath, name: &str, id: SignalId) {
        if let Some(decl) = self.units.get_mut(unit) {
            let _ = decl.signals.insert(name.to_string(), id);
        }
    }
}
