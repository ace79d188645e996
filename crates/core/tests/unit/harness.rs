//! # Session Tests
//!
//! Complete seeded regressions: reset, random register traffic, monitor and
//! scoreboard checking, probe observation, and waveform capture.

use pretty_assertions::assert_eq;

use probebench_core::common::{BindError, SimError, TbError};
use probebench_core::probe::ProbeSpec;
use probebench_core::sim::{Observer, SignalId, Step};
use probebench_core::{Error, Harness};

use crate::common::{config, init_tracing, regmap};

/// Counts strobe pulses seen through the probe namespace.
struct StrobeCounter {
    wr: SignalId,
    rd: SignalId,
    writes: usize,
    reads: usize,
}

impl Observer for StrobeCounter {
    fn on_step(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        if step.rose(self.wr) {
            self.writes += 1;
        }
        if step.rose(self.rd) {
            self.reads += 1;
        }
        Ok(())
    }
}

#[test]
fn seeded_regression_passes() {
    init_tracing();
    let harness = Harness::new(config(60, 1), regmap()).unwrap();
    let report = harness.run().unwrap();

    let (reads, writes) = report
        .stats
        .iter()
        .fold((0, 0), |(r, w), (_, runs)| (r + runs.reads, w + runs.writes));
    assert_eq!(report.runs, 60);
    assert_eq!(reads + writes, 60);
    assert_eq!(report.stats.transactions, 60);
    assert_eq!(report.score.compared, reads);
    assert_eq!(report.score.matched, reads);
    assert_eq!(
        (report.stats.responses_ok + report.stats.responses_err) as usize,
        reads
    );
    assert_eq!(report.stats.violations, 0);
    assert!(report.coverage > 0.0);
}

#[test]
fn same_seed_same_run() {
    let a = Harness::new(config(20, 9), regmap()).unwrap().run().unwrap();
    let b = Harness::new(config(20, 9), regmap()).unwrap().run().unwrap();
    assert_eq!(a.stats.sim_time, b.stats.sim_time);
    assert_eq!(
        a.stats.iter().collect::<Vec<_>>(),
        b.stats.iter().collect::<Vec<_>>()
    );
}

#[test]
fn default_probe_namespace() {
    let harness = Harness::new(config(1, 1), regmap()).unwrap();
    let probes = harness.probes();
    assert_eq!(probes.len(), 14);
    assert_eq!(probes.width("SPI_IF_i_cs_n"), Some(1));
    assert_eq!(probes.width("REG_i_spi_addr"), Some(8));
    assert_eq!(probes.width("REG_o_spi_data"), Some(16));
    assert_eq!(
        probes.get("SPI_IF_o_spi_addr").unwrap().source(),
        probes.get("REG_i_spi_addr").unwrap().source()
    );
}

#[test]
fn probes_track_sources_through_reset() {
    let mut harness = Harness::new(config(1, 1), regmap()).unwrap();
    harness.reset(&mut ()).unwrap();
    let sim = harness.sim();
    for alias in harness.probes().iter() {
        assert_eq!(alias.value(sim.store()), sim.value(alias.source()), "{}", alias.name());
    }
    assert_eq!(
        harness.probes().value(sim.store(), "SPI_IF_i_cs_n").and_then(|v| v.as_bit()),
        Some(true)
    );
    assert_eq!(
        harness.probes().value(sim.store(), "REG_i_spi_addr").and_then(|v| v.as_u64()),
        Some(0)
    );
}

#[test]
fn internal_strobes_match_transactions() {
    let harness = Harness::new(config(40, 3), regmap()).unwrap();
    let probes = harness.probes();
    let mut counter = StrobeCounter {
        wr: probes.source("REG_i_spi_wr").unwrap(),
        rd: probes.source("REG_i_spi_rd").unwrap(),
        writes: 0,
        reads: 0,
    };
    let report = harness.run_with(&mut counter).unwrap();
    let (reads, writes) = report
        .stats
        .iter()
        .fold((0, 0), |(r, w), (_, runs)| (r + runs.reads, w + runs.writes));
    assert_eq!(counter.reads, reads);
    assert_eq!(counter.writes, writes);
}

#[test]
fn configured_probe_is_bound() {
    let mut cfg = config(1, 1);
    cfg.probes
        .push(ProbeSpec::bus("top.dut.u_reg_file", "REG_", "i_mce", 1));
    let harness = Harness::new(cfg, regmap()).unwrap();
    assert_eq!(harness.probes().len(), 15);
    assert!(harness.probes().get("REG_i_mce").is_some());
}

#[test]
fn unresolved_probe_aborts_construction() {
    let mut cfg = config(1, 1);
    cfg.probes
        .push(ProbeSpec::wire("top.dut.u_reg_file", "REG_", "o_missing"));
    let err = Harness::new(cfg, regmap()).unwrap_err();
    assert!(matches!(
        err,
        Error::Bind(BindError::UnresolvedSignal { ref signal, .. }) if signal == "o_missing"
    ));
}

#[test]
fn colliding_probe_aborts_construction() {
    let mut cfg = config(1, 1);
    cfg.probes
        .push(ProbeSpec::wire("top.dut.u_spi_if", "SPI_IF_", "i_cs_n"));
    let err = Harness::new(cfg, regmap()).unwrap_err();
    assert!(matches!(err, Error::Bind(BindError::NameCollision { .. })));
}

#[test]
fn without_driver_nothing_is_compared() {
    let mut cfg = config(10, 1);
    cfg.spi.driver = false;
    let report = Harness::new(cfg, regmap()).unwrap().run().unwrap();
    assert_eq!(report.runs, 10);
    assert_eq!(report.score.compared, 0);
}

#[test]
fn time_limit_stops_the_run() {
    let mut cfg = config(100, 1);
    cfg.general.time_limit_us = Some(10.0);
    let err = Harness::new(cfg, regmap()).unwrap().run().unwrap_err();
    assert!(matches!(err, Error::Tb(TbError::Timeout { limit: 10_000_000 })));
}

#[test]
fn waveform_declares_probes_and_annotations() {
    let harness = Harness::new(config(4, 2), regmap()).unwrap();
    let (report, out) = harness.run_with_wave(Vec::new()).unwrap();
    assert_eq!(report.runs, 4);

    let vcd = String::from_utf8(out).unwrap();
    assert!(vcd.starts_with("$version probebench"));
    assert!(vcd.contains("$timescale 1ps $end"));
    assert!(vcd.contains(" SPI_IF_i_cs_n $end"));
    assert!(vcd.contains("$var wire 8 "));
    assert!(vcd.contains("$var string 1 "));
    assert!(vcd.contains(" wr_info $end"));
    assert!(vcd.contains("$enddefinitions $end"));
    assert!(vcd.contains("sChip_addr "));
    assert!(vcd.lines().filter(|l| l.starts_with('#')).count() > 10);
}

#[test]
fn shipped_configuration_runs() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../cfg/bench.json");
    let mut cfg = probebench_core::Config::load(path).unwrap();
    cfg.general.max_runs = 30;
    let report = Harness::load(cfg).unwrap().run().unwrap();
    assert_eq!(report.runs, 30);
    assert_eq!(report.stats.violations, 0);
}
