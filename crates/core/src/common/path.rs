//! Hierarchical path names.
//!
//! Units are addressed by dot-separated instance paths (`top.dut.u_spi_if`)
//! and signals by appending the local name (`top.dut.u_spi_if.i_cs_n`).

use std::fmt;
use std::sync::Arc;

/// Dot-separated hierarchical instance path.
///
/// Cheap to clone; the string is shared.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Debug, Hash)]
pub struct HierPath(Arc<str>);

impl HierPath {
    /// Returns the path with its last component removed, or `None` for a root path.
    pub fn parent(&self) -> Option<Self> {
        self.0.rsplit_once('.').map(|(parent, _)| parent.into())
    }

    /// Returns the last component of the path.
    pub fn leaf(&self) -> &str {
        self.0.rsplit_once('.').map_or(self.as_str(), |(_, leaf)| leaf)
    }

    /// Appends `child` as a new component.
    pub fn join(&self, child: &str) -> Self {
        format!("{}.{child}", self.0).into()
    }

    /// Returns the number of components.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for HierPath {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for HierPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HierPath {
    fn from(path: String) -> Self {
        Self(path.into())
    }
}

impl From<&str> for HierPath {
    fn from(path: &str) -> Self {
        Self(path.into())
    }
}

impl From<&HierPath> for HierPath {
    fn from(path: &HierPath) -> Self {
        path.clone()
    }
}
