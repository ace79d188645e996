//! SPI bus driver.
//!
//! Turns a transaction into scheduled pin activity. With `H` the SCLK half
//! period and `T` the frame start:
//!
//! * `I_CS_N` falls at `T`;
//! * SCLK edge `k` (0-based) rises at `T + (2k+1)H` and falls at `T + (2k+2)H`;
//! * MOSI carries frame bit `n-1-k`, set 1 ns after rising edge `k`;
//! * `I_CS_N` rises 20 ns after the last falling edge, and MOSI returns to X.
//!
//! A frame gap follows every request. A read is followed by a response frame
//! (clocks only) and a random pause of 10 to 200 ns.

use rand::Rng;
use tracing::{debug, info};

use crate::common::time::ns;
use crate::common::{Error, SimError, SimTime, TbError, Value};
use crate::config::Config;
use crate::dut::{TbProbes, TopPins};
use crate::sim::{SignalId, Simulator};

use super::frame::{SpiRequest, bits_msb_first};
use super::transaction::SpiTrx;

/// Delay between an SCLK rising edge and the next MOSI bit.
const MOSI_SETUP: SimTime = 1_000;

/// Delay between the last SCLK edge and CS_n release.
const CS_HOLD: SimTime = 20_000;

/// Annotation text while the response frame is clocked.
const RESPONSE_INFO: &str = "Read response trx";

/// SPI host driver.
#[derive(Debug, Clone)]
pub struct SpiDriver {
    sclk: SignalId,
    cs_n: SignalId,
    mosi: SignalId,
    wr_info: SignalId,
    bit_index: SignalId,
    half_period: SimTime,
    n_sclk: u32,
    chip_addr: u8,
    frame_gap: SimTime,
}

impl SpiDriver {
    /// Creates a driver for the configured port.
    pub fn new(config: &Config, pins: &TopPins, tb: &TbProbes) -> Self {
        Self {
            sclk: pins.sclk,
            cs_n: pins.cs_n,
            mosi: pins.mosi,
            wr_info: tb.wr_info,
            bit_index: tb.i,
            half_period: config.sclk_half_period(),
            n_sclk: config.spi.n_sclk,
            chip_addr: config.spi.chip_addr,
            frame_gap: config.spi.frame_gap(),
        }
    }

    /// Puts the bus in its idle state now: SCLK low, CS_n high, MOSI unknown.
    pub fn idle(&self, sim: &mut Simulator) -> Result<(), SimError> {
        sim.schedule_in(0, self.sclk, false)?;
        sim.schedule_in(0, self.cs_n, true)?;
        sim.schedule_in(0, self.mosi, Value::X)
    }

    /// Checks a transaction and builds its request frame.
    ///
    /// # Errors
    ///
    /// [`TbError::IllegalTransaction`] if the address or data does not fit the frame.
    pub fn check(&self, trx: &SpiTrx) -> Result<SpiRequest, TbError> {
        let illegal = |reason: &str| TbError::IllegalTransaction {
            trx: trx.to_string(),
            reason: reason.to_string(),
        };
        let reg_addr = u8::try_from(trx.addr).map_err(|_| illegal("reg_addr must be < 2^8"))?;
        let reg_data = u16::try_from(trx.data).map_err(|_| illegal("reg_data must be < 2^16"))?;
        Ok(SpiRequest {
            op: trx.op,
            reg_data,
            ..SpiRequest::read(self.chip_addr, reg_addr)
        })
    }

    /// Schedules the frames for `trx` starting now. Returns the time at which
    /// the driver is ready for the next transaction.
    pub fn send<R: Rng + ?Sized>(
        &self,
        sim: &mut Simulator,
        trx: &SpiTrx,
        rng: &mut R,
    ) -> Result<SimTime, Error> {
        let req = self.check(trx)?;
        info!("Sending {trx}");

        let start = sim.now();
        let end = self.frame(sim, start, Some(u64::from(req.encode())))?;
        let mut ready = end + self.frame_gap;

        if !req.op.wrn() {
            sim.schedule(ready, self.wr_info, Value::text(RESPONSE_INFO))?;
            let end = self.frame(sim, ready, None)?;
            sim.schedule(end, self.wr_info, Value::text(""))?;
            ready = end + ns(f64::from(rng.gen_range(10u32..=200)));
        }
        debug!(start, ready, "transaction scheduled");
        Ok(ready)
    }

    /// Schedules one CS_n frame at `start`, shifting `word` out on MOSI when
    /// given. Returns the CS_n release time.
    fn frame(&self, sim: &mut Simulator, start: SimTime, word: Option<u64>) -> Result<SimTime, SimError> {
        let h = self.half_period;
        let n = u64::from(self.n_sclk);
        sim.schedule(start, self.cs_n, false)?;

        for k in 0..n {
            let rise = start + (2 * k + 1) * h;
            sim.schedule(start + 2 * k * h, self.sclk, false)?;
            sim.schedule(rise, self.sclk, true)?;
        }

        if let Some(word) = word {
            for (k, bit) in (0..n).zip(bits_msb_first(word, self.n_sclk)) {
                let at = start + (2 * k + 1) * h + MOSI_SETUP;
                let pos = self.n_sclk - 1 - k as u32;
                sim.schedule(at, self.mosi, bit)?;
                sim.schedule(at, self.wr_info, Value::text(SpiRequest::label(pos)))?;
                sim.schedule(at, self.bit_index, u64::from(pos))?;
            }
        }

        let last = start + 2 * n * h;
        sim.schedule(last, self.sclk, false)?;
        let release = last + CS_HOLD;
        sim.schedule(release, self.cs_n, true)?;
        if word.is_some() {
            sim.schedule(release, self.mosi, Value::X)?;
            sim.schedule(release, self.wr_info, Value::text(""))?;
        }
        Ok(release)
    }
}
