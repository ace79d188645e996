//! Session driver.
//!
//! Ties elaboration, chip initialization, clocks, reset, and the testbench
//! together:
//!
//! 1. Elaborate the design and bind the probes.
//! 2. Tie the static pins low, strap the chip address, idle the SPI bus.
//! 3. Start the configured clocks and hold `I_RESET_N` low for the reset time.
//! 4. After the settle time, hand over to the testbench.
//!
//! Steps 1 to 3 are scheduled by [`Harness::new`]; simulated time only
//! advances in [`Harness::run`], so that a waveform can capture the reset.

use std::io::Write;

use tracing::{info, warn};

use crate::common::time::ns;
use crate::common::{Result, SimError, SimTime};
use crate::config::Config;
use crate::dut::Top;
use crate::dut::top::TOP;
use crate::probe::ProbeNamespace;
use crate::sim::{Observer, Simulator};
use crate::verif::regmap::RegisterMap;
use crate::verif::{SpiDriver, SpiTestBench, TbReport};
use crate::wave::VcdWriter;

/// An elaborated, initialized bench ready to run.
#[derive(Debug)]
pub struct Harness {
    top: Top,
    bench: SpiTestBench,
    reset_done: SimTime,
}

impl Harness {
    /// Loads the register map named by `config.regs_path` and builds the bench.
    pub fn load(config: Config) -> Result<Self> {
        let regmap = RegisterMap::load(&config.regs_path)?;
        Self::new(config, regmap)
    }

    /// Builds the bench over `regmap`.
    ///
    /// # Errors
    ///
    /// Configuration, elaboration, and probe binding errors. Nothing is
    /// simulated yet.
    pub fn new(config: Config, mut regmap: RegisterMap) -> Result<Self> {
        let spi = &config.spi;
        if regmap.get(&spi.id_register).is_some() {
            regmap.set_identification(&spi.id_register, spi.chip_id, spi.chip_addr)?;
        } else {
            warn!(register = %spi.id_register, "identification register not in map");
        }

        let mut top = Top::elaborate(&config, &regmap)?;
        let pins = top.pins;
        let sim = &mut top.sim;

        for pin in [pins.spi_sel, pins.test_en, pins.scan_en, pins.mce] {
            sim.schedule(0, pin, false)?;
        }
        sim.schedule(0, pins.chip_addr, u64::from(spi.chip_addr))?;
        SpiDriver::new(&config, &pins, &top.tb).idle(sim)?;

        for clock in &config.clocks {
            let id = sim
                .design()
                .signal(TOP, &clock.signal)
                .ok_or_else(|| SimError::UnknownSignal(clock.signal.clone()))?;
            sim.add_clock(id, clock.period_ps, 0)?;
        }

        let release = ns(config.reset.duration_ns);
        sim.schedule(0, pins.reset_n, false)?;
        sim.schedule(release, pins.reset_n, true)?;
        let reset_done = release + ns(config.reset.settle_ns);

        let bench = SpiTestBench::new(&config, regmap, &pins, &top.tb)?;
        Ok(Self {
            top,
            bench,
            reset_done,
        })
    }

    /// The sealed probe namespace.
    pub const fn probes(&self) -> &ProbeNamespace {
        &self.top.probes
    }

    /// The elaborated top level.
    pub const fn top(&self) -> &Top {
        &self.top
    }

    /// The simulator.
    pub const fn sim(&self) -> &Simulator {
        &self.top.sim
    }

    /// The testbench.
    pub const fn bench(&self) -> &SpiTestBench {
        &self.bench
    }

    /// Time at which the testbench starts.
    pub const fn reset_done(&self) -> SimTime {
        self.reset_done
    }

    /// Advances through reset and settle time, if not done yet.
    pub fn reset(&mut self, observer: &mut dyn Observer) -> Result<()> {
        if self.top.sim.now() < self.reset_done {
            info!(until = self.reset_done, "applying reset");
            self.top.sim.run_until(self.reset_done, observer)?;
        }
        Ok(())
    }

    /// Runs reset and the testbench.
    pub fn run(self) -> Result<TbReport> {
        self.run_with(&mut ())
    }

    /// Runs reset and the testbench with an extra observer.
    pub fn run_with(mut self, observer: &mut dyn Observer) -> Result<TbReport> {
        self.reset(observer)?;
        self.bench.run_tb(&mut self.top.sim, observer)
    }

    /// Runs with waveform capture into `out` and returns the sink.
    ///
    /// The sink is returned only on success; a failing run reports its error.
    pub fn run_with_wave<W: Write>(self, out: W) -> Result<(TbReport, W)> {
        let tb = self.top.tb;
        let annotations = [
            ("wr_info", tb.wr_info),
            ("rd_info", tb.rd_info),
            ("i", tb.i),
        ];
        let mut wave = VcdWriter::new(
            out,
            self.top.sim.design(),
            &self.top.probes,
            &annotations,
            self.top.sim.now(),
        )?;
        let report = self.run_with(&mut wave)?;
        let out = wave.finish()?;
        Ok((report, out))
    }
}
