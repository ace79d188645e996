//! Register access transactions and their random generator.

use std::fmt;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::common::ConfigError;

use super::frame::Op;
use super::regmap::{Register, RegisterMap};

/// One register access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiTrx {
    /// Register name.
    pub reg_name: String,
    /// Register address; must fit 8 bits to be sent.
    pub addr: u32,
    /// Write data; must fit 16 bits to be sent. 0 for reads.
    pub data: u32,
    /// Direction.
    pub op: Op,
}

impl SpiTrx {
    /// Read of `reg`.
    pub fn read(reg: &Register) -> Self {
        Self {
            reg_name: reg.name.clone(),
            addr: u32::from(reg.addr),
            data: 0,
            op: Op::Read,
        }
    }

    /// Write of `data` to `reg`.
    pub fn write(reg: &Register, data: u16) -> Self {
        Self {
            data: u32::from(data),
            op: Op::Write,
            ..Self::read(reg)
        }
    }
}

impl fmt::Display for SpiTrx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{reg_name: {}, reg_addr: {:#04x}, reg_data: {:#06x}, op: {}}}",
            self.reg_name, self.addr, self.data, self.op
        )
    }
}

/// Kind of value picked for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// All zeros.
    Min,
    /// All ones within the register width.
    Max,
    /// Uniform over the register range.
    Random,
}

const VALUE_KINDS: [ValueKind; 3] = [ValueKind::Min, ValueKind::Max, ValueKind::Random];

/// Relative weights of `VALUE_KINDS`; random values are several times likelier than either bound.
const VALUE_KIND_WEIGHTS: [u32; 3] = [1, 1, 8];

/// Random transaction source over a register map.
///
/// A register is picked by weight, then an operation uniformly among those it
/// allows, then (for writes) a value kind and a value.
#[derive(Debug, Clone)]
pub struct TrxGenerator {
    regs: Vec<Register>,
    reg_dist: WeightedIndex<u32>,
    kind_dist: WeightedIndex<u32>,
}

impl TrxGenerator {
    /// Prepares the weight tables.
    pub fn new(regmap: &RegisterMap) -> Result<Self, ConfigError> {
        let regs: Vec<Register> = regmap.iter().cloned().collect();
        let reg_dist = WeightedIndex::new(regs.iter().map(|r| r.weight)).map_err(|e| {
            ConfigError::Invalid(format!("register weights unusable: {e}"))
        })?;
        let kind_dist = WeightedIndex::new(VALUE_KIND_WEIGHTS)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            regs,
            reg_dist,
            kind_dist,
        })
    }

    /// Draws a transaction.
    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> SpiTrx {
        let reg = &self.regs[self.reg_dist.sample(rng)];
        let op = if reg.writable() && rng.gen_range(0..=1) == 1 {
            Op::Write
        } else {
            Op::Read
        };
        match op {
            Op::Read => SpiTrx::read(reg),
            Op::Write => {
                let value = match VALUE_KINDS[self.kind_dist.sample(rng)] {
                    ValueKind::Min => 0,
                    ValueKind::Max => reg.max_value(),
                    ValueKind::Random => rng.gen_range(0..=reg.max_value()),
                };
                SpiTrx::write(reg, value)
            }
        }
    }
}
