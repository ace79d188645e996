//! SPI interface unit.
//!
//! Deserializes request frames from the host and turns them into single
//! register-side accesses.
//!
//! # Protocol
//!
//! * A frame is the interval between a falling and a rising edge of `i_cs_n`.
//! * `i_mosi` is sampled on every falling edge of `i_sclk`, MSB first.
//! * A frame of exactly 32 bits with a valid stop bit addressed to this chip
//!   (or broadcast) is accepted. Anything else is dropped.
//! * A write raises `o_spi_wr` with `o_spi_addr`/`o_spi_data`; a read raises
//!   `o_spi_rd` with `o_spi_addr`. Strobes stay high until the next frame.
//! * After a read, the next frame is a response frame. At its start the
//!   register-side answer (`i_spi_rdata`, `i_spi_err`) is latched and then
//!   shifted out on `o_miso` on every rising edge of `i_sclk`.

use tracing::{debug, warn};

use crate::common::{HierPath, SimError};
use crate::sim::{Design, EvalCtx, SignalId, Unit};
use crate::verif::frame::{FRAME_BITS, Op, SpiRequest, SpiResponse, Status};

use super::port;

/// Port nets of the interface.
#[derive(Debug, Clone, Copy)]
pub struct SpiIfPorts {
    /// `i_sclk`
    pub sclk: SignalId,
    /// `i_cs_n`
    pub cs_n: SignalId,
    /// `i_mosi`
    pub mosi: SignalId,
    /// `o_miso`
    pub miso: SignalId,
    /// `i_chip_addr[2:0]`
    pub chip_addr: SignalId,
    /// `i_reset_n`
    pub reset_n: SignalId,
    /// `o_spi_addr[7:0]`
    pub addr: SignalId,
    /// `o_spi_data[15:0]`
    pub data: SignalId,
    /// `o_spi_wr`
    pub wr: SignalId,
    /// `o_spi_rd`
    pub rd: SignalId,
    /// `i_spi_rdata[15:0]`
    pub rdata: SignalId,
    /// `i_spi_err`
    pub err: SignalId,
}

impl SpiIfPorts {
    /// Looks up the local port names of `unit`.
    pub fn resolve(design: &Design, unit: &HierPath) -> Result<Self, SimError> {
        Ok(Self {
            sclk: port(design, unit, "i_sclk")?,
            cs_n: port(design, unit, "i_cs_n")?,
            mosi: port(design, unit, "i_mosi")?,
            miso: port(design, unit, "o_miso")?,
            chip_addr: port(design, unit, "i_chip_addr")?,
            reset_n: port(design, unit, "i_reset_n")?,
            addr: port(design, unit, "o_spi_addr")?,
            data: port(design, unit, "o_spi_data")?,
            wr: port(design, unit, "o_spi_wr")?,
            rd: port(design, unit, "o_spi_rd")?,
            rdata: port(design, unit, "i_spi_rdata")?,
            err: port(design, unit, "i_spi_err")?,
        })
    }
}

#[derive(Debug, Default)]
struct Frame {
    shift: u64,
    count: u32,
    valid: bool,
    tx: Option<u32>,
}

/// Frame deserializer and response serializer.
#[derive(Debug)]
pub struct SpiInterface {
    path: HierPath,
    ports: SpiIfPorts,
    frame: Option<Frame>,
    pending_read: Option<bool>,
    accepted: u64,
    dropped: u64,
}

impl SpiInterface {
    /// Creates the unit at `path`, whose ports must already be connected.
    pub fn attach(design: &Design, path: HierPath) -> Result<Self, SimError> {
        let ports = SpiIfPorts::resolve(design, &path)?;
        Ok(Self {
            path,
            ports,
            frame: None,
            pending_read: None,
            accepted: 0,
            dropped: 0,
        })
    }

    /// Frames accepted so far.
    pub const fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Frames dropped so far.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    fn reset(&mut self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        self.frame = None;
        self.pending_read = None;
        ctx.drive(p.miso, false);
        ctx.drive(p.addr, 0u64);
        ctx.drive(p.data, 0u64);
        ctx.drive(p.wr, false);
        ctx.drive(p.rd, false);
    }

    fn begin(&mut self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        ctx.drive(p.wr, false);
        ctx.drive(p.rd, false);

        let tx = self.pending_read.take().map(|broadcast| {
            let chip_addr = ctx.word(p.chip_addr).unwrap_or(0) as u8;
            let (data, status) = match (ctx.word(p.rdata), ctx.bit(p.err)) {
                (Some(data), Some(false)) => (data as u16, Status::Ok),
                _ => (0, Status::Error),
            };
            SpiResponse {
                chip_addr,
                op: Op::Read,
                broadcast,
                data,
                status,
            }
            .encode()
        });

        self.frame = Some(Frame {
            valid: true,
            tx,
            ..Frame::default()
        });
    }

    fn end(&mut self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        let Some(frame) = self.frame.take() else {
            return;
        };

        if frame.tx.is_some() {
            ctx.drive(p.miso, false);
            debug!(unit = %self.path, "response frame sent");
            return;
        }

        match self.accept(ctx, &frame) {
            Ok(req) => {
                self.accepted += 1;
                ctx.drive(p.addr, u64::from(req.reg_addr));
                match req.op {
                    Op::Write => {
                        ctx.drive(p.data, u64::from(req.reg_data));
                        ctx.drive(p.wr, true);
                    }
                    Op::Read => {
                        ctx.drive(p.rd, true);
                        self.pending_read = Some(req.broadcast);
                    }
                }
                debug!(
                    unit = %self.path,
                    op = %req.op,
                    addr = req.reg_addr,
                    data = req.reg_data,
                    "request accepted"
                );
            }
            Err(reason) => {
                self.dropped += 1;
                warn!(unit = %self.path, time = ctx.now(), "frame dropped: {reason}");
            }
        }
    }

    fn accept(&self, ctx: &EvalCtx<'_>, frame: &Frame) -> Result<SpiRequest, String> {
        if frame.count != FRAME_BITS {
            return Err(format!("{} bits, expected {FRAME_BITS}", frame.count));
        }
        if !frame.valid {
            return Err("unknown level on MOSI".to_string());
        }
        let req = SpiRequest::decode(frame.shift as u32).map_err(|e| e.to_string())?;
        let own = ctx
            .word(self.ports.chip_addr)
            .ok_or_else(|| "chip address strap is unknown".to_string())?;
        if u64::from(req.chip_addr) != own && !req.broadcast {
            return Err(format!("addressed to chip {}, this is chip {own}", req.chip_addr));
        }
        Ok(req)
    }
}

impl Unit for SpiInterface {
    fn path(&self) -> &HierPath {
        &self.path
    }

    fn evaluate(&mut self, ctx: &mut EvalCtx<'_>) {
        let p = self.ports;
        let in_reset = ctx.bit(p.reset_n) != Some(true);
        if in_reset {
            if ctx.changed(p.reset_n) {
                self.reset(ctx);
            }
            return;
        }

        if ctx.fell(p.cs_n) {
            self.begin(ctx);
        }

        if let Some(frame) = self.frame.as_mut() {
            if ctx.rose(p.sclk) {
                if let Some(word) = frame.tx {
                    if frame.count < FRAME_BITS {
                        let pos = FRAME_BITS - 1 - frame.count;
                        ctx.drive(p.miso, (word >> pos) & 1 == 1);
                    }
                }
            }
            if ctx.fell(p.sclk) {
                frame.count += 1;
                if frame.tx.is_none() {
                    match ctx.bit(p.mosi) {
                        Some(b) => frame.shift = (frame.shift << 1) | u64::from(b),
                        None => frame.valid = false,
                    }
                }
            }
        }

        if ctx.rose(p.cs_n) {
            self.end(ctx);
        }
    }
}
