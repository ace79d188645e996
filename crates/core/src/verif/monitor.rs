//! SPI bus monitor.
//!
//! Watches the chip pins at every settled timestep. Request frames are
//! sampled on SCLK falling edges so that MOSI levels can be checked; a
//! request with WRn = 0 arms the monitor, and the next frame is collected
//! from MISO and decoded as a [`SpiResponse`].

use std::collections::VecDeque;

use tracing::{debug, error, info};

use crate::common::{SimError, SimTime, TbError, Value};
use crate::config::Config;
use crate::dut::{TbProbes, TopPins};
use crate::sim::{Observer, SignalId, Step};

use super::frame::{FRAME_BITS, SpiResponse};

/// Bit that carries WRn in a request frame.
const WRN_POS: u32 = 28;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    Request {
        count: u32,
        read: bool,
    },
    AwaitResponse,
    Response {
        count: u32,
        word: u64,
        valid: bool,
    },
}

/// Passive SPI observer.
#[derive(Debug)]
pub struct SpiMonitor {
    sclk: SignalId,
    cs_n: SignalId,
    mosi: SignalId,
    miso: SignalId,
    rd_info: SignalId,
    bit_index: SignalId,
    n_sclk: u32,
    phase: Phase,
    frames: u64,
    responses: VecDeque<SpiResponse>,
    violations: Vec<TbError>,
}

impl SpiMonitor {
    /// Creates a monitor for the configured port.
    pub fn new(config: &Config, pins: &TopPins, tb: &TbProbes) -> Self {
        Self {
            sclk: pins.sclk,
            cs_n: pins.cs_n,
            mosi: pins.mosi,
            miso: pins.miso,
            rd_info: tb.rd_info,
            bit_index: tb.i,
            n_sclk: config.spi.n_sclk,
            phase: Phase::Idle,
            frames: 0,
            responses: VecDeque::new(),
            violations: Vec::new(),
        }
    }

    /// Removes and returns decoded responses in arrival order.
    pub fn take_responses(&mut self) -> Vec<SpiResponse> {
        self.responses.drain(..).collect()
    }

    /// Protocol violations seen so far.
    pub fn violations(&self) -> &[TbError] {
        &self.violations
    }

    /// Frames observed so far (requests and responses).
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns `true` while a read response is outstanding.
    pub const fn awaiting_response(&self) -> bool {
        matches!(self.phase, Phase::AwaitResponse | Phase::Response { .. })
    }

    fn violation(&mut self, time: SimTime, detail: String) {
        error!(time, "{detail}");
        self.violations.push(TbError::Protocol { time, detail });
    }

    fn sample(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let time = step.time();
        match self.phase {
            Phase::Request { count, read } => {
                let pos = self.n_sclk.saturating_sub(count + 1);
                let mut read = read;
                match step.bit(self.mosi) {
                    Some(bit) => {
                        if pos == WRN_POS && !bit {
                            read = true;
                            step.annotate(self.rd_info, Value::text("Read request detected"))?;
                            debug!("Read request detected");
                        }
                    }
                    None => {
                        let level = step.value(self.mosi).to_string();
                        self.violation(time, format!("MOSI is {level} at request bit {pos}"));
                    }
                }
                self.phase = Phase::Request {
                    count: count + 1,
                    read,
                };
            }
            Phase::Response { count, word, valid } => {
                let pos = FRAME_BITS.saturating_sub(count + 1);
                let (word, valid) = match step.bit(self.miso) {
                    Some(bit) => ((word << 1) | u64::from(bit), valid),
                    None => {
                        let level = step.value(self.miso).to_string();
                        self.violation(time, format!("MISO is {level} at response bit {pos}"));
                        (word << 1, false)
                    }
                };
                step.annotate(self.rd_info, Value::text(SpiResponse::label(pos)))?;
                step.annotate(self.bit_index, u64::from(pos))?;
                self.phase = Phase::Response {
                    count: count + 1,
                    word,
                    valid,
                };
            }
            Phase::Idle | Phase::AwaitResponse => {}
        }
        Ok(())
    }

    fn close(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let time = step.time();
        self.phase = match std::mem::take(&mut self.phase) {
            Phase::Request { read: true, .. } => Phase::AwaitResponse,
            Phase::Response { count, word, valid } => {
                step.annotate(self.rd_info, Value::text(""))?;
                if count != FRAME_BITS {
                    self.violation(time, format!("response frame has {count} bits"));
                } else if valid {
                    match SpiResponse::decode(word as u32) {
                        Ok(resp) => {
                            info!("Read trx: {resp}");
                            self.responses.push_back(resp);
                        }
                        Err(e) => self.violation(time, e.to_string()),
                    }
                }
                Phase::Idle
            }
            _ => Phase::Idle,
        };
        Ok(())
    }
}

impl Observer for SpiMonitor {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        if step.fell(self.cs_n) {
            self.frames += 1;
            self.phase = match self.phase {
                Phase::AwaitResponse => {
                    debug!("Starting reading response");
                    Phase::Response {
                        count: 0,
                        word: 0,
                        valid: true,
                    }
                }
                _ => Phase::Request {
                    count: 0,
                    read: false,
                },
            };
        }
        if step.fell(self.sclk) {
            self.sample(step)?;
        }
        if step.rose(self.cs_n) {
            self.close(step)?;
        }
        Ok(())
    }
}
