//! Register map.
//!
//! Loaded from a JSON file of the form:
//!
//! ```json
//! { "regs": {
//!     "CHIP_ID_ADDR":   { "addr": 0,  "bit_width": 8,  "r_w": 0 },
//!     "ANODE_BIAS_ADDR": { "addr": 16, "bit_width": 10, "r_w": 1, "n_regs": 4 },
//!     "MBIST_RES_ADDR": { "addr": 32, "bit_width": 12, "r_w": 0, "n_regs": 6,
//!                         "group_widths": [12, 9, 9] }
//! } }
//! ```
//!
//! Entries with `n_regs > 1` are array pseudo-records. A plain array expands
//! into `BASE_<i>_ADDR`; an array with `group_widths` is a sequence of groups
//! and expands into `BASE<i>_<j>_ADDR`, member `j` taking width
//! `group_widths[j]`. `BASE` is the record name without its `_ADDR` suffix.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::common::ConfigError;

/// Largest register width carried by a frame.
pub const MAX_REG_WIDTH: u32 = 16;

/// One record as written in the JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct RegDef {
    /// Address (start address for arrays).
    pub addr: u32,
    /// Data width in bits.
    pub bit_width: u32,
    /// 1 if writable, 0 if read-only.
    #[serde(default)]
    pub r_w: u8,
    /// Reset value.
    #[serde(default)]
    pub reg_value: u32,
    /// Array length.
    #[serde(default = "RegDef::default_n_regs")]
    pub n_regs: u32,
    /// 1 if the address exists but the target rejects it.
    #[serde(default)]
    pub unsupported: u8,
    /// Relative selection weight for random transactions.
    #[serde(default = "RegDef::default_weight")]
    pub weight: u32,
    /// Per-member widths of a grouped array.
    #[serde(default)]
    pub group_widths: Vec<u32>,
}

impl RegDef {
    const fn default_n_regs() -> u32 {
        1
    }

    const fn default_weight() -> u32 {
        1
    }
}

#[derive(Debug, Deserialize)]
struct RegFile {
    regs: BTreeMap<String, RegDef>,
}

/// Access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Writes are ignored.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

/// An expanded register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    /// Unique name.
    pub name: String,
    /// Address.
    pub addr: u8,
    /// Data width in bits.
    pub width: u32,
    /// Access mode.
    pub access: Access,
    /// Reset value.
    pub reset: u16,
    /// The target answers accesses with error status.
    pub unsupported: bool,
    /// Relative selection weight.
    pub weight: u32,
}

impl Register {
    /// Largest value the register holds.
    pub const fn max_value(&self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }

    /// Returns `true` if writes take effect.
    pub const fn writable(&self) -> bool {
        matches!(self.access, Access::ReadWrite)
    }
}

/// Expanded, validated register map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    regs: BTreeMap<String, Register>,
    by_addr: BTreeMap<u8, String>,
}

impl RegisterMap {
    /// Parses, expands, and validates a register map.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::parse(json, "<inline>")
    }

    /// Reads a register map file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(json: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: RegFile = serde_json::from_str(json).map_err(|source| ConfigError::Json {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_defs(file.regs)
    }

    /// Expands and validates raw records.
    pub fn from_defs(defs: BTreeMap<String, RegDef>) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        for (name, def) in defs {
            if def.n_regs == 0 {
                return Err(reg_err(&name, "n_regs must be at least 1"));
            }
            if def.n_regs == 1 {
                map.insert(&name, &def, def.addr, def.bit_width, def.reg_value)?;
                continue;
            }

            let base = name.strip_suffix("_ADDR").unwrap_or(&name);
            if def.group_widths.is_empty() {
                for i in 0..def.n_regs {
                    map.insert(
                        &format!("{base}_{i}_ADDR"),
                        &def,
                        def.addr + i,
                        def.bit_width,
                        def.reg_value,
                    )?;
                }
            } else {
                let group = def.group_widths.len() as u32;
                if def.n_regs % group != 0 {
                    return Err(reg_err(
                        &name,
                        format!("n_regs {} is not a multiple of group size {group}", def.n_regs),
                    ));
                }
                for i in 0..def.n_regs / group {
                    for (j, &width) in def.group_widths.iter().enumerate() {
                        map.insert(
                            &format!("{base}{i}_{j}_ADDR"),
                            &def,
                            def.addr + i * group + j as u32,
                            width,
                            0,
                        )?;
                    }
                }
            }
            debug!(array = %name, n_regs = def.n_regs, "expanded register array");
        }
        Ok(map)
    }

    fn insert(
        &mut self,
        name: &str,
        def: &RegDef,
        addr: u32,
        width: u32,
        reset: u32,
    ) -> Result<(), ConfigError> {
        let addr = u8::try_from(addr)
            .map_err(|_| reg_err(name, format!("address {addr:#x} does not fit 8 bits")))?;
        if width == 0 || width > MAX_REG_WIDTH {
            return Err(reg_err(name, format!("bit_width {width} is outside 1..=16")));
        }
        let access = match def.r_w {
            0 => Access::ReadOnly,
            1 => Access::ReadWrite,
            other => return Err(reg_err(name, format!("r_w must be 0 or 1, got {other}"))),
        };
        if reset >> width != 0 {
            return Err(reg_err(
                name,
                format!("reg_value {reset:#x} does not fit {width} bits"),
            ));
        }
        if let Some(other) = self.by_addr.get(&addr) {
            return Err(reg_err(name, format!("address {addr:#04x} already used by `{other}`")));
        }
        if self.regs.contains_key(name) {
            return Err(reg_err(name, "duplicate register name"));
        }

        let _ = self.by_addr.insert(addr, name.to_string());
        let _ = self.regs.insert(
            name.to_string(),
            Register {
                name: name.to_string(),
                addr,
                width,
                access,
                reset: reset as u16,
                unsupported: def.unsupported != 0,
                weight: def.weight,
            },
        );
        Ok(())
    }

    /// Sets the identification register reset value to `(chip_id << 4) | chip_addr`.
    pub fn set_identification(
        &mut self,
        name: &str,
        chip_id: u16,
        chip_addr: u8,
    ) -> Result<(), ConfigError> {
        let reg = self
            .regs
            .get_mut(name)
            .ok_or_else(|| reg_err(name, "identification register not in map"))?;
        let value = (u32::from(chip_id) << 4) | u32::from(chip_addr);
        if value >> reg.width != 0 {
            return Err(reg_err(
                name,
                format!("identification value {value:#x} does not fit {} bits", reg.width),
            ));
        }
        reg.reset = value as u16;
        Ok(())
    }

    /// Looks up a register by name.
    pub fn get(&self, name: &str) -> Option<&Register> {
        self.regs.get(name)
    }

    /// Looks up a register by address.
    pub fn by_addr(&self, addr: u8) -> Option<&Register> {
        self.by_addr.get(&addr).and_then(|n| self.regs.get(n))
    }

    /// Iterates over registers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.regs.values()
    }

    /// Number of registers after expansion.
    pub fn len(&self) -> usize {
        self.regs.len()
    }

    /// Returns `true` if the map has no registers.
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

fn reg_err(reg: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Register {
        reg: reg.to_string(),
        reason: reason.into(),
    }
}
