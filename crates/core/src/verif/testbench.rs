//! Register read/write testbench.
//!
//! Draws random transactions until `max_runs` is reached. For every
//! transaction the reference model is updated (writes) or consulted to queue
//! an expectation (reads), coverage is sampled, and the driver's frames are
//! simulated while the monitor feeds the scoreboard. An MCE frame toggles
//! `I_MCE` with random timing alongside, so that postponed writes get
//! exercised.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::common::time::ns;
use crate::common::{Error, Result, SimError, SimTime, TbError};
use crate::config::{Config, MceConfig};
use crate::dut::{TbProbes, TopPins};
use crate::sim::{Observer, SignalId, Simulator};
use crate::stats::{RunStats, UnderExercised};

use super::agent::SpiAgent;
use super::coverage::{CoverPoint, CoverageDb, StatusReport};
use super::frame::Op;
use super::regmap::RegisterMap;
use super::scoreboard::{Expected, ScoreSummary, Scoreboard};
use super::transaction::{SpiTrx, TrxGenerator};

/// Register cover point.
pub const COVER_REG: &str = "spi.reg";
/// Operation cover point.
pub const COVER_OP: &str = "spi.op";
/// Register by operation cross.
pub const COVER_REG_OP: &str = "spi.reg_x_op";

/// Outcome of a passing run.
#[derive(Debug, Clone)]
pub struct TbReport {
    /// Transactions run.
    pub runs: usize,
    /// Seed used.
    pub seed: u64,
    /// Scoreboard totals.
    pub score: ScoreSummary,
    /// Weighted functional coverage in percent.
    pub coverage: f64,
    /// Registers below the run threshold.
    pub under_exercised: UnderExercised,
    /// Counters.
    pub stats: RunStats,
}

/// Random `I_MCE` frame generator.
#[derive(Debug)]
struct MceFrame {
    pin: SignalId,
    next: SimTime,
    high: bool,
    high_ns: [u64; 2],
    low_ns: [u64; 2],
}

impl MceFrame {
    fn new(pin: SignalId, cfg: &MceConfig, now: SimTime) -> Self {
        Self {
            pin,
            next: now + ns(cfg.start_ns as f64),
            high: true,
            high_ns: cfg.high_ns,
            low_ns: cfg.low_ns,
        }
    }

    /// Schedules every edge up to and including `horizon`.
    fn extend<R: Rng + ?Sized>(
        &mut self,
        sim: &mut Simulator,
        horizon: SimTime,
        rng: &mut R,
    ) -> std::result::Result<(), SimError> {
        while self.next <= horizon {
            sim.schedule(self.next, self.pin, self.high)?;
            let [lo, hi] = if self.high { self.high_ns } else { self.low_ns };
            self.next += ns(rng.gen_range(lo..=hi) as f64).max(1);
            self.high = !self.high;
        }
        Ok(())
    }
}

/// SPI register testbench.
#[derive(Debug)]
pub struct SpiTestBench {
    config: Config,
    regmap: RegisterMap,
    model: BTreeMap<String, u16>,
    agent: SpiAgent,
    scoreboard: Scoreboard,
    coverage: CoverageDb,
    status: StatusReport,
    stats: RunStats,
    generator: TrxGenerator,
    rng: StdRng,
    mce: Option<MceFrame>,
    mce_pin: SignalId,
    runs: usize,
}

impl SpiTestBench {
    /// Builds the agent, the reference model, and the coverage database.
    pub fn new(config: &Config, regmap: RegisterMap, pins: &TopPins, tb: &TbProbes) -> Result<Self> {
        let generator = TrxGenerator::new(&regmap)?;
        let model = regmap.iter().map(|r| (r.name.clone(), r.reset)).collect();

        let mut coverage = CoverageDb::new();
        coverage.add_point(CoverPoint::new(COVER_REG, regmap.iter().map(|r| r.name.clone())));
        coverage.add_point(CoverPoint::new(COVER_OP, ["Read", "Write"]));
        coverage.add_cross(COVER_REG_OP, &[COVER_REG, COVER_OP])?;
        let status = coverage.setup_report(&config.coverage.status);

        Ok(Self {
            config: config.clone(),
            stats: RunStats::new(&regmap),
            model,
            regmap,
            agent: SpiAgent::new(config, pins, tb),
            scoreboard: Scoreboard::new(),
            coverage,
            status,
            generator,
            rng: StdRng::seed_from_u64(config.general.seed),
            mce: None,
            mce_pin: pins.mce,
            runs: 0,
        })
    }

    /// The agent.
    pub const fn agent(&self) -> &SpiAgent {
        &self.agent
    }

    /// The scoreboard.
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// The coverage database.
    pub const fn coverage(&self) -> &CoverageDb {
        &self.coverage
    }

    /// Counters so far.
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Transactions run so far.
    pub const fn runs(&self) -> usize {
        self.runs
    }

    /// Reference value of a register.
    pub fn model_value(&self, name: &str) -> Option<u16> {
        self.model.get(name).copied()
    }

    /// Returns `true` once `max_runs` transactions have been issued.
    pub const fn test_goal_achieved(&self) -> bool {
        self.runs >= self.config.general.max_runs
    }

    /// Next random transaction, or `None` when the goal is achieved.
    pub fn sequencer(&mut self) -> Option<SpiTrx> {
        if self.test_goal_achieved() {
            return None;
        }
        info!("Test case # {}", self.runs);
        let trx = self.generator.next(&mut self.rng);
        self.runs += 1;
        Some(trx)
    }

    /// Runs transactions until the goal is achieved.
    ///
    /// `observer` sees every timestep after the monitor.
    pub fn run(&mut self, sim: &mut Simulator, observer: &mut dyn Observer) -> Result<()> {
        if self.config.mce.enabled && self.mce.is_none() {
            self.mce = Some(MceFrame::new(self.mce_pin, &self.config.mce, sim.now()));
        }

        while let Some(trx) = self.sequencer() {
            self.stats.record(&trx);
            self.collect_coverage(&trx);
            self.update_model(&trx);

            let ready = match &self.agent.driver {
                Some(driver) => driver.send(sim, &trx, &mut self.rng)?,
                None => sim.now(),
            };
            self.advance(sim, ready, observer)?;
        }
        Ok(())
    }

    fn update_model(&mut self, trx: &SpiTrx) {
        match trx.op {
            Op::Write => {
                let _ = self.model.insert(trx.reg_name.clone(), trx.data as u16);
            }
            Op::Read => {
                if self.agent.driver.is_none() || self.agent.monitor.is_none() {
                    return;
                }
                let unsupported = self.regmap.get(&trx.reg_name).is_some_and(|r| r.unsupported);
                let expected = if unsupported {
                    Expected::Unsupported
                } else {
                    Expected::Data(self.model.get(&trx.reg_name).copied().unwrap_or(0))
                };
                self.scoreboard.add_expected(expected);
            }
        }
    }

    fn collect_coverage(&mut self, trx: &SpiTrx) {
        let op = trx.op.to_string();
        let _ = self.coverage.sample_point(COVER_REG, &trx.reg_name);
        let _ = self.coverage.sample_point(COVER_OP, &op);
        let _ = self.coverage.sample_cross(COVER_REG_OP, &[&trx.reg_name, &op]);
        self.coverage.status_report(&self.status);
    }

    fn advance(
        &mut self,
        sim: &mut Simulator,
        until: SimTime,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        if let Some(limit) = self.config.time_limit() {
            if until > limit {
                return Err(TbError::Timeout { limit }.into());
            }
        }
        if let Some(mce) = self.mce.as_mut() {
            mce.extend(sim, until, &mut self.rng)?;
        }

        let mut both = (&mut self.agent, observer);
        sim.run_until(until, &mut both)?;

        if let Some(monitor) = self.agent.monitor.as_mut() {
            for resp in monitor.take_responses() {
                self.stats.record_response(&resp);
                let _ = self.scoreboard.compare(resp);
            }
        }
        Ok(())
    }

    /// Reports registers exercised fewer than `min_runs` times.
    pub fn check(&self) -> UnderExercised {
        let min_runs = self.config.general.min_runs;
        let under = self.stats.under_exercised(min_runs);
        if !under.writes.is_empty() {
            info!("run_wr_less_min:   {:?}", under.writes);
        }
        if !under.reads.is_empty() {
            info!("run_rd_less_min:   {:?}", under.reads);
        }
        under
    }

    /// Runs the test, reports coverage, and returns the scoreboard verdict.
    ///
    /// # Errors
    ///
    /// Kernel and driver errors, the scoreboard failure, or the first protocol
    /// violation seen by the monitor.
    pub fn run_tb(mut self, sim: &mut Simulator, observer: &mut dyn Observer) -> Result<TbReport> {
        self.run(sim, observer)?;
        info!("Finish tests. {} transactions were run.", self.runs);

        info!("Coverage final results");
        for line in self.coverage.final_report(self.config.coverage.bins).lines() {
            info!("{line}");
        }
        let under_exercised = self.check();

        let violations = self
            .agent
            .monitor
            .as_ref()
            .map(|m| m.violations().to_vec())
            .unwrap_or_default();
        self.stats.violations = violations.len() as u64;
        self.stats.sim_time = sim.now();
        self.stats.steps = sim.steps();

        let score = self.scoreboard.result()?;
        if let Some(first) = violations.into_iter().next() {
            warn!("monitor reported {} protocol violation(s)", self.stats.violations);
            return Err(Error::Tb(first));
        }

        Ok(TbReport {
            runs: self.runs,
            seed: self.config.general.seed,
            score,
            coverage: self.coverage.coverage(),
            under_exercised,
            stats: self.stats,
        })
    }
}
