//! Run statistics collection and reporting.
//!
//! This module tracks what a regression actually exercised. It provides:
//! 1. **Per-register runs:** Read and write counts for every register in the map.
//! 2. **Traffic:** Transactions sent and responses received by status.
//! 3. **Check:** Registers exercised fewer than `min_runs` times per direction.

use std::collections::BTreeMap;

use crate::common::SimTime;
use crate::common::time::fmt_ns;
use crate::verif::frame::{Op, SpiResponse, Status};
use crate::verif::regmap::RegisterMap;
use crate::verif::transaction::SpiTrx;

/// Accesses to one register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegRuns {
    /// Read transactions.
    pub reads: usize,
    /// Write transactions.
    pub writes: usize,
    /// Writes can reach this register.
    pub writable: bool,
}

/// Registers below the run threshold, with their counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnderExercised {
    /// Writable registers written fewer than `min_runs` times.
    pub writes: BTreeMap<String, usize>,
    /// Registers read fewer than `min_runs` times.
    pub reads: BTreeMap<String, usize>,
}

impl UnderExercised {
    /// Returns `true` if every register met the threshold.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.reads.is_empty()
    }
}

/// Statistics of one run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    regs: BTreeMap<String, RegRuns>,
    /// Transactions issued.
    pub transactions: u64,
    /// Responses with `Ok` status.
    pub responses_ok: u64,
    /// Responses with `Error` status.
    pub responses_err: u64,
    /// Protocol violations reported by the monitor.
    pub violations: u64,
    /// Simulated time at the end of the run.
    pub sim_time: SimTime,
    /// Timesteps processed by the kernel.
    pub steps: u64,
}

impl RunStats {
    /// Creates zeroed counters for every register of `regmap`.
    pub fn new(regmap: &RegisterMap) -> Self {
        Self {
            regs: regmap
                .iter()
                .map(|r| {
                    (
                        r.name.clone(),
                        RegRuns {
                            writable: r.writable(),
                            ..RegRuns::default()
                        },
                    )
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Counts a transaction.
    pub fn record(&mut self, trx: &SpiTrx) {
        self.transactions += 1;
        let runs = self.regs.entry(trx.reg_name.clone()).or_default();
        match trx.op {
            Op::Read => runs.reads += 1,
            Op::Write => runs.writes += 1,
        }
    }

    /// Counts a decoded response.
    pub fn record_response(&mut self, resp: &SpiResponse) {
        match resp.status {
            Status::Ok => self.responses_ok += 1,
            Status::Error => self.responses_err += 1,
        }
    }

    /// Counts of one register.
    pub fn runs(&self, name: &str) -> Option<RegRuns> {
        self.regs.get(name).copied()
    }

    /// Iterates over registers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, RegRuns)> {
        self.regs.iter().map(|(n, r)| (n.as_str(), *r))
    }

    /// Registers exercised fewer than `min_runs` times in either direction.
    /// Read-only registers are only checked for reads.
    pub fn under_exercised(&self, min_runs: usize) -> UnderExercised {
        let mut out = UnderExercised::default();
        for (name, runs) in &self.regs {
            if runs.writable && runs.writes < min_runs {
                let _ = out.writes.insert(name.clone(), runs.writes);
            }
            if runs.reads < min_runs {
                let _ = out.reads.insert(name.clone(), runs.reads);
            }
        }
        out
    }

    /// Prints all sections to stdout.
    pub fn print(&self) {
        self.print_sections(&[]);
    }

    /// Prints the requested sections (`"summary"`, `"registers"`); an empty slice prints all.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            println!("\n==========================================================");
            println!("SPI REGISTER REGRESSION STATISTICS");
            println!("==========================================================");
            println!("sim_time                 {}", fmt_ns(self.sim_time));
            println!("sim_steps                {}", self.steps);
            println!("transactions             {}", self.transactions);
            println!("responses.ok             {}", self.responses_ok);
            println!("responses.error          {}", self.responses_err);
            println!("protocol.violations      {}", self.violations);
            println!("----------------------------------------------------------");
        }
        if want("registers") {
            println!("REGISTER ACCESSES");
            for (name, runs) in &self.regs {
                let mode = if runs.writable { "rw" } else { "ro" };
                println!(
                    "  {name:<24} {mode}  rd {:>5}  wr {:>5}",
                    runs.reads, runs.writes
                );
            }
            println!("----------------------------------------------------------");
        }
    }
}
