//! Probe binder.
//!
//! Creates top-level aliases for internal unit signals during elaboration.
//! Each alias is a structural binding to the source net: reading an alias
//! reads the source, so the two can never disagree. The binder checks, in
//! order, that the unit and signal resolve, that the generated name is free,
//! and that the source is a logic net of the declared width. A failed bind
//! leaves the scope untouched.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::common::{BindError, Width};
use crate::sim::{Design, SignalId, SignalKind};

use super::namespace::{ProbeAlias, ProbeNamespace};

/// One declarative binding: `(unit, prefix, signal, width)`.
///
/// A missing `width` binds a wire; any width binds a bus of that width.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProbeSpec {
    /// Hierarchical path of the unit instance.
    pub unit: String,
    /// Prefix prepended to the signal name.
    pub prefix: String,
    /// Local signal name inside the unit.
    pub signal: String,
    /// Expected bus width.
    #[serde(default)]
    pub width: Option<Width>,
}

impl ProbeSpec {
    /// Wire binding.
    pub fn wire(unit: &str, prefix: &str, signal: &str) -> Self {
        Self {
            unit: unit.to_string(),
            prefix: prefix.to_string(),
            signal: signal.to_string(),
            width: None,
        }
    }

    /// Bus binding.
    pub fn bus(unit: &str, prefix: &str, signal: &str, width: Width) -> Self {
        Self {
            width: Some(width),
            ..Self::wire(unit, prefix, signal)
        }
    }
}

/// Alias builder for one probe scope.
#[derive(Debug)]
pub struct ProbeBinder<'d> {
    design: &'d Design,
    aliases: BTreeMap<String, ProbeAlias>,
}

impl<'d> ProbeBinder<'d> {
    /// Creates an empty scope over `design`.
    pub const fn new(design: &'d Design) -> Self {
        Self {
            design,
            aliases: BTreeMap::new(),
        }
    }

    /// Binds a 1-bit alias `prefix + signal` to `unit.signal`.
    ///
    /// # Errors
    ///
    /// `UnresolvedUnit`/`UnresolvedSignal` if the reference does not exist,
    /// `NameCollision` if the alias is already bound, and `WidthMismatch` if the
    /// source is not a single bit.
    pub fn bind_wire(&mut self, unit: &str, prefix: &str, signal: &str) -> Result<String, BindError> {
        self.bind(unit, prefix, signal, 1)
    }

    /// Binds a `width`-bit alias `prefix + signal` to `unit.signal`.
    ///
    /// # Errors
    ///
    /// As [`bind_wire`](Self::bind_wire), with `WidthMismatch` when the source width differs
    /// from `width`, when `width` is 0, or when the source is a text net.
    pub fn bind_bus(
        &mut self,
        unit: &str,
        prefix: &str,
        signal: &str,
        width: Width,
    ) -> Result<String, BindError> {
        self.bind(unit, prefix, signal, width)
    }

    /// Applies a declarative binding.
    pub fn bind_spec(&mut self, spec: &ProbeSpec) -> Result<String, BindError> {
        match spec.width {
            None => self.bind_wire(&spec.unit, &spec.prefix, &spec.signal),
            Some(w) => self.bind_bus(&spec.unit, &spec.prefix, &spec.signal, w),
        }
    }

    /// Applies a list of bindings, stopping at the first failure.
    pub fn bind_all<'s>(
        &mut self,
        specs: impl IntoIterator<Item = &'s ProbeSpec>,
    ) -> Result<Vec<String>, BindError> {
        specs.into_iter().map(|s| self.bind_spec(s)).collect()
    }

    /// Number of aliases bound so far.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` if nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Returns `true` if `alias` is already bound in this scope.
    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Seals the scope. No alias can be added or rebound afterwards.
    pub fn finish(self) -> ProbeNamespace {
        ProbeNamespace::new(self.aliases)
    }

    fn bind(
        &mut self,
        unit: &str,
        prefix: &str,
        signal: &str,
        declared: Width,
    ) -> Result<String, BindError> {
        let source = self.resolve(unit, signal)?;
        let name = format!("{prefix}{signal}");

        if let Some(existing) = self.aliases.get(&name) {
            return Err(BindError::NameCollision {
                alias: name,
                existing: existing.source_path().to_string(),
            });
        }

        // Aliases are logic vectors; text nets and zero-width buses never bind.
        let kind = self.design.store().kind(source);
        let actual = kind.width();
        if !matches!(kind, SignalKind::Logic(_)) || declared == 0 || actual != declared {
            return Err(BindError::WidthMismatch {
                alias: name,
                declared,
                actual,
            });
        }

        let source_path = format!("{unit}.{signal}");
        debug!(alias = %name, source = %source_path, width = actual, "probe bound");
        let _ = self.aliases.insert(
            name.clone(),
            ProbeAlias::new(name.clone(), actual, source, source_path),
        );
        Ok(name)
    }

    fn resolve(&self, unit: &str, signal: &str) -> Result<SignalId, BindError> {
        let decl = self
            .design
            .unit(unit)
            .ok_or_else(|| BindError::UnresolvedUnit { unit: unit.into() })?;
        decl.signal(signal).ok_or_else(|| BindError::UnresolvedSignal {
            unit: unit.into(),
            signal: signal.to_string(),
        })
    }
}
