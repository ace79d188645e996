//! Signal values.
//!
//! Logic signals carry either an unknown (`X`) or a word masked to the
//! signal width. Annotation probes written by the testbench carry text.

use std::fmt;
use std::sync::Arc;

/// Width of a logic signal in bits (1..=64).
pub type Width = u32;

/// Largest supported logic width.
pub const MAX_WIDTH: Width = 64;

/// A signal value.
#[derive(Eq, PartialEq, Clone, Default, Hash)]
pub enum Value {
    /// Unknown / undriven.
    #[default]
    X,
    /// Known word value, already masked to the signal width.
    Word(u64),
    /// Free-form annotation text.
    Text(Arc<str>),
}

impl Value {
    /// Builds a single-bit value.
    pub const fn bit(b: bool) -> Self {
        Self::Word(b as u64)
    }

    /// Builds a text value.
    pub fn text(s: impl AsRef<str>) -> Self {
        Self::Text(s.as_ref().into())
    }

    /// Returns `true` for the unknown value.
    pub const fn is_x(&self) -> bool {
        matches!(self, Self::X)
    }

    /// Returns the word if the value is known.
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Word(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the word as a bit: `Some(true)` for 1, `Some(false)` for 0.
    pub const fn as_bit(&self) -> Option<bool> {
        match self {
            Self::Word(n) => Some(*n & 1 == 1),
            _ => None,
        }
    }

    /// Returns the text of an annotation value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a VCD binary vector of `width` bits.
    pub fn to_bin(&self, width: Width) -> String {
        match self {
            Self::Word(n) => (0..width)
                .rev()
                .map(|i| if (n >> i) & 1 == 1 { '1' } else { '0' })
                .collect(),
            _ => "x".repeat(width as usize),
        }
    }
}

/// Returns the all-ones mask for `width` bits.
pub const fn mask(width: Width) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::Word(n) => write!(f, "{n:#x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Word(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::bit(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Word(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Word(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}
