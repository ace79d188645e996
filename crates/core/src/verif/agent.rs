//! SPI agent: an optional driver and an optional monitor for one port.

use crate::common::SimError;
use crate::config::Config;
use crate::dut::{TbProbes, TopPins};
use crate::sim::{Observer, Step};

use super::driver::SpiDriver;
use super::monitor::SpiMonitor;

/// Driver and monitor bundle.
#[derive(Debug)]
pub struct SpiAgent {
    /// Active side; `None` when disabled in configuration.
    pub driver: Option<SpiDriver>,
    /// Passive side; `None` when disabled in configuration.
    pub monitor: Option<SpiMonitor>,
}

impl SpiAgent {
    /// Builds the components enabled in `config.spi`.
    pub fn new(config: &Config, pins: &TopPins, tb: &TbProbes) -> Self {
        Self {
            driver: config.spi.driver.then(|| SpiDriver::new(config, pins, tb)),
            monitor: config.spi.monitor.then(|| SpiMonitor::new(config, pins, tb)),
        }
    }
}

impl Observer for SpiAgent {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        match self.monitor.as_mut() {
            Some(monitor) => monitor.on_step(step),
            None => Ok(()),
        }
    }
}
