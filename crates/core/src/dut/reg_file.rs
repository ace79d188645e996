//! Register file unit.
//!
//! Serves single accesses from the SPI interface.
//!
//! # Behavior
//!
//! * A rising edge of `i_spi_wr` writes `i_spi_data` (masked to the register
//!   width) to the register at `i_spi_addr`. Read-only registers ignore it.
//! * A rising edge of `i_spi_rd` drives `o_spi_data` with the register value
//!   and clears `o_spi_err`.
//! * Unknown or unsupported addresses answer a read with `o_spi_err` set and
//!   zero data.
//! * While `i_mce` is high, writes are postponed. They are committed on the
//!   falling edge of `i_mce`; a read in between returns the postponed value.
//! * `i_reset_n` low restores every register to its reset value.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::common::{HierPath, SimError, Value};
use crate::sim::{Design, EvalCtx, SignalId, Unit};
use crate::verif::regmap::RegisterMap;

use super::port;

/// Port nets of the register file.
#[derive(Debug, Clone, Copy)]
pub struct RegFilePorts {
    /// `i_spi_addr[7:0]`
    pub addr: SignalId,
    /// `i_spi_data[15:0]`
    pub data: SignalId,
    /// `i_spi_wr`
    pub wr: SignalId,
    /// `i_spi_rd`
    pub rd: SignalId,
    /// `o_spi_data[15:0]`
    pub rdata: SignalId,
    /// `o_spi_err`
    pub err: SignalId,
    /// `i_reset_n`
    pub reset_n: SignalId,
    /// `i_mce`
    pub mce: SignalId,
}

impl RegFilePorts {
    /// Looks up the local port names of `unit`.
    pub fn resolve(design: &Design, unit: &HierPath) -> Result<Self, SimError> {
        Ok(Self {
            addr: port(design, unit, "i_spi_addr")?,
            data: port(design, unit, "i_spi_data")?,
            wr: port(design, unit, "i_spi_wr")?,
            rd: port(design, unit, "i_spi_rd")?,
            rdata: port(design, unit, "o_spi_data")?,
            err: port(design, unit, "o_spi_err")?,
            reset_n: port(design, unit, "i_reset_n")?,
            mce: port(design, unit, "i_mce")?,
        })
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    width: u32,
    writable: bool,
    supported: bool,
    reset: u16,
    value: u16,
}

impl Slot {
    const fn mask(&self) -> u16 {
        ((1u32 << self.width) - 1) as u16
    }
}

/// Behavioral register file.
#[derive(Debug)]
pub struct RegisterFile {
    path: HierPath,
    ports: RegFilePorts,
    slots: BTreeMap<u8, Slot>,
    pending: BTreeMap<u8, u16>,
}

impl RegisterFile {
    /// Creates the unit at `path` holding every register of `regmap`.
    pub fn attach(design: &Design, path: HierPath, regmap: &RegisterMap) -> Result<Self, SimError> {
        let ports = RegFilePorts::resolve(design, &path)?;
        let slots = regmap
            .iter()
            .map(|r| {
                (
                    r.addr,
                    Slot {
                        name: r.name.clone(),
                        width: r.width,
                        writable: r.writable(),
                        supported: !r.unsupported,
                        reset: r.reset,
                        value: r.reset,
                    },
                )
            })
            .collect();
        Ok(Self {
            path,
            ports,
            slots,
            pending: BTreeMap::new(),
        })
    }

    /// Committed value of the register at `addr`.
    pub fn value(&self, addr: u8) -> Option<u16> {
        self.slots.get(&addr).map(|s| s.value)
    }

    /// Number of writes waiting for the end of the MCE frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn reset(&mut self, ctx: &mut EvalCtx<'_>) {
        for slot in self.slots.values_mut() {
            slot.value = slot.reset;
        }
        self.pending.clear();
        ctx.drive(self.ports.rdata, 0u64);
        ctx.drive(self.ports.err, false);
    }

    fn commit(&mut self) {
        for (addr, value) in std::mem::take(&mut self.pending) {
            if let Some(slot) = self.slots.get_mut(&addr) {
                slot.value = value;
            }
        }
    }

    fn write(&mut self, ctx: &EvalCtx<'_>) {
        let p = self.ports;
        let (Some(addr), Some(data)) = (ctx.word(p.addr), ctx.word(p.data)) else {
            warn!(unit = %self.path, "write strobe with unknown address or data");
            return;
        };
        let addr = addr as u8;
        let Some(slot) = self.slots.get_mut(&addr) else {
            warn!(unit = %self.path, addr, "write to unknown address");
            return;
        };
        if !slot.supported || !slot.writable {
            debug!(unit = %self.path, reg = %slot.name, "write ignored");
            return;
        }

        let value = data as u16 & slot.mask();
        if ctx.bit(p.mce) == Some(true) {
            let _ = self.pending.insert(addr, value);
            debug!(unit = %self.path, reg = %slot.name, value, "write postponed");
        } else {
            slot.value = value;
            debug!(unit = %self.path, reg = %slot.name, value, "write");
        }
    }

    fn read(&self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        let slot = ctx
            .word(p.addr)
            .and_then(|a| self.slots.get_key_value(&(a as u8)))
            .filter(|(_, s)| s.supported);

        match slot {
            Some((addr, s)) => {
                let value = self.pending.get(addr).copied().unwrap_or(s.value);
                ctx.drive(p.rdata, u64::from(value));
                ctx.drive(p.err, false);
            }
            None => {
                ctx.drive(p.rdata, Value::Word(0));
                ctx.drive(p.err, true);
            }
        }
    }
}

impl Unit for RegisterFile {
    fn path(&self) -> &HierPath {
        &self.path
    }

    fn evaluate(&mut self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        if ctx.bit(p.reset_n) != Some(true) {
            if ctx.changed(p.reset_n) {
                self.reset(ctx);
            }
            return;
        }

        if ctx.fell(p.mce) {
            self.commit();
        }
        if ctx.rose(p.wr) {
            self.write(ctx);
        }
        if ctx.rose(p.rd) {
            self.read(ctx);
        }
    }
}
