//! Configuration system for the verification harness.
//!
//! This module defines the configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline bench constants (seed, run counts, SPI timing, clocks, MCE frame).
//! 2. **Structures:** Hierarchical config for general, SPI, reset, clocks, MCE, probes, and coverage.
//! 3. **Loading:** JSON parsing from a string or a file, followed by validation.
//!
//! Every field has a default, so `{}` is a complete configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::time::{SimTime, ns, us};
use crate::probe::ProbeSpec;

/// Default configuration constants for the harness.
mod defaults {
    /// Fixed random seed so that runs are reproducible.
    pub const SEED: u64 = 1;

    /// Number of transactions per run.
    pub const MAX_RUNS: usize = 2;

    /// Minimum number of reads and writes per register before it counts as exercised.
    pub const MIN_RUNS: usize = 2;

    /// SPI port index; selects the `_<n>` suffix of the top-level pins.
    pub const SPI_IDX: usize = 0;

    /// SCLK frequency in MHz.
    pub const FREQ_MHZ: f64 = 12.5;

    /// Chip address strapped on `I_CHIP_ADDR`.
    pub const CHIP_ADDR: u8 = 0;

    /// Identification value hardwired in the target.
    pub const CHIP_ID: u16 = 3;

    /// Register that reports `(chip_id << 4) | chip_addr`.
    pub const ID_REGISTER: &str = "CHIP_ID_ADDR";

    /// SCLK cycles per frame.
    pub const N_SCLK: u32 = 32;

    /// Idle time after every request frame, in nanoseconds.
    pub const FRAME_GAP_NS: f64 = 200.0;

    /// Reset assertion time in nanoseconds.
    pub const RESET_NS: f64 = 123.1;

    /// Settle time between reset release and the first frame, in nanoseconds.
    pub const SETTLE_NS: f64 = 20.0;

    /// Interface clock period (1 GHz).
    pub const CLK_I_PERIOD_PS: u64 = 1_000;

    /// Measurement clock period (625 MHz).
    pub const CLK_M_PERIOD_PS: u64 = 1_600;

    /// Delay before the first MCE frame, in nanoseconds.
    pub const MCE_START_NS: u64 = 20;

    /// MCE high phase range in nanoseconds.
    pub const MCE_HIGH_NS: [u64; 2] = [1_900, 2_100];

    /// MCE low phase range in nanoseconds.
    pub const MCE_LOW_NS: [u64; 2] = [50, 250];

    /// Default register map location.
    pub const REGS_PATH: &str = "cfg/regs.json";
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use probebench_core::config::Config;
///
/// let json = r#"{ "general": { "seed": 7, "max_runs": 50 }, "spi": { "chip_addr": 2 } }"#;
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.general.max_runs, 50);
/// assert_eq!(config.spi.chip_addr, 2);
/// assert_eq!(config.clocks.len(), 2);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seed and run-length settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// SPI bus settings.
    #[serde(default)]
    pub spi: SpiConfig,
    /// Reset sequencing.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Free-running clocks on top-level pins.
    #[serde(default = "Config::default_clocks")]
    pub clocks: Vec<ClockConfig>,
    /// Measurement-cycle frame emulation.
    #[serde(default)]
    pub mce: MceConfig,
    /// Extra probe bindings applied after the default probe list.
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
    /// Coverage reporting.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Register map JSON file.
    #[serde(default = "Config::default_regs_path")]
    pub regs_path: PathBuf,
}

impl Config {
    fn default_clocks() -> Vec<ClockConfig> {
        vec![
            ClockConfig {
                signal: "I_CLK_I".to_string(),
                period_ps: defaults::CLK_I_PERIOD_PS,
            },
            ClockConfig {
                signal: "I_CLK_M".to_string(),
                period_ps: defaults::CLK_M_PERIOD_PS,
            },
        ]
    }

    fn default_regs_path() -> PathBuf {
        PathBuf::from(defaults::REGS_PATH)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Json {
            origin: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// A relative `regs_path` is resolved against the directory of the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            origin: path.display().to_string(),
            source,
        })?;
        if config.regs_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.regs_path = dir.join(&config.regs_path);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(self.spi.freq_mhz.is_finite() && self.spi.freq_mhz > 0.0) {
            return invalid(format!("spi.freq_mhz must be positive, got {}", self.spi.freq_mhz));
        }
        if self.spi.chip_addr > 7 {
            return invalid(format!("spi.chip_addr {} does not fit 3 bits", self.spi.chip_addr));
        }
        if self.spi.n_sclk == 0 || self.spi.n_sclk > 64 {
            return invalid(format!("spi.n_sclk must be within 1..=64, got {}", self.spi.n_sclk));
        }
        for clock in &self.clocks {
            if clock.period_ps < 2 {
                return invalid(format!(
                    "clock `{}` period {} ps is too short",
                    clock.signal, clock.period_ps
                ));
            }
        }
        for (name, [lo, hi]) in [("high_ns", self.mce.high_ns), ("low_ns", self.mce.low_ns)] {
            if lo > hi || hi == 0 {
                return invalid(format!("mce.{name} range [{lo}, {hi}] is empty"));
            }
        }
        Ok(())
    }

    /// Half SCLK period in picoseconds.
    pub fn sclk_half_period(&self) -> SimTime {
        us(1.0 / (2.0 * self.spi.freq_mhz))
    }

    /// Simulated time budget, if any.
    pub fn time_limit(&self) -> Option<SimTime> {
        self.general.time_limit_us.map(us)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            spi: SpiConfig::default(),
            reset: ResetConfig::default(),
            clocks: Self::default_clocks(),
            mce: MceConfig::default(),
            probes: Vec::new(),
            coverage: CoverageConfig::default(),
            regs_path: Self::default_regs_path(),
        }
    }
}

/// Seed and run-length settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Random seed for transaction generation and timing jitter.
    #[serde(default = "GeneralConfig::default_seed")]
    pub seed: u64,
    /// Number of transactions the sequencer produces.
    #[serde(default = "GeneralConfig::default_max_runs")]
    pub max_runs: usize,
    /// Reads and writes per register required by the final check.
    #[serde(default = "GeneralConfig::default_min_runs")]
    pub min_runs: usize,
    /// Optional simulated time budget in microseconds.
    #[serde(default)]
    pub time_limit_us: Option<f64>,
}

impl GeneralConfig {
    const fn default_seed() -> u64 {
        defaults::SEED
    }

    const fn default_max_runs() -> usize {
        defaults::MAX_RUNS
    }

    const fn default_min_runs() -> usize {
        defaults::MIN_RUNS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: defaults::SEED,
            max_runs: defaults::MAX_RUNS,
            min_runs: defaults::MIN_RUNS,
            time_limit_us: None,
        }
    }
}

/// SPI bus settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpiConfig {
    /// Port index (`I_SCLK_<spi_idx>` and friends).
    #[serde(default)]
    pub spi_idx: usize,
    /// SCLK frequency in MHz.
    #[serde(default = "SpiConfig::default_freq_mhz")]
    pub freq_mhz: f64,
    /// Chip address driven in request frames and strapped on the target.
    #[serde(default)]
    pub chip_addr: u8,
    /// Identification value of the target.
    #[serde(default = "SpiConfig::default_chip_id")]
    pub chip_id: u16,
    /// Name of the identification register in the register map.
    #[serde(default = "SpiConfig::default_id_register")]
    pub id_register: String,
    /// SCLK cycles per frame.
    #[serde(default = "SpiConfig::default_n_sclk")]
    pub n_sclk: u32,
    /// Idle time after each request frame, in nanoseconds.
    #[serde(default = "SpiConfig::default_frame_gap_ns")]
    pub frame_gap_ns: f64,
    /// Instantiate the driver.
    #[serde(default = "SpiConfig::enabled")]
    pub driver: bool,
    /// Instantiate the monitor.
    #[serde(default = "SpiConfig::enabled")]
    pub monitor: bool,
}

impl SpiConfig {
    const fn default_freq_mhz() -> f64 {
        defaults::FREQ_MHZ
    }

    const fn default_chip_id() -> u16 {
        defaults::CHIP_ID
    }

    fn default_id_register() -> String {
        defaults::ID_REGISTER.to_string()
    }

    const fn default_n_sclk() -> u32 {
        defaults::N_SCLK
    }

    const fn default_frame_gap_ns() -> f64 {
        defaults::FRAME_GAP_NS
    }

    const fn enabled() -> bool {
        true
    }

    /// Frame gap in picoseconds.
    pub fn frame_gap(&self) -> SimTime {
        ns(self.frame_gap_ns)
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            spi_idx: defaults::SPI_IDX,
            freq_mhz: defaults::FREQ_MHZ,
            chip_addr: defaults::CHIP_ADDR,
            chip_id: defaults::CHIP_ID,
            id_register: defaults::ID_REGISTER.to_string(),
            n_sclk: defaults::N_SCLK,
            frame_gap_ns: defaults::FRAME_GAP_NS,
            driver: true,
            monitor: true,
        }
    }
}

/// Reset sequencing.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    /// Time `I_RESET_N` is held low, in nanoseconds.
    #[serde(default = "ResetConfig::default_duration_ns")]
    pub duration_ns: f64,
    /// Wait after reset release before the testbench starts, in nanoseconds.
    #[serde(default = "ResetConfig::default_settle_ns")]
    pub settle_ns: f64,
}

impl ResetConfig {
    const fn default_duration_ns() -> f64 {
        defaults::RESET_NS
    }

    const fn default_settle_ns() -> f64 {
        defaults::SETTLE_NS
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            duration_ns: defaults::RESET_NS,
            settle_ns: defaults::SETTLE_NS,
        }
    }
}

/// A free-running clock on a top-level pin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Top-level pin name.
    pub signal: String,
    /// Period in picoseconds.
    pub period_ps: u64,
}

/// Measurement-cycle (MCE) frame emulation running alongside SPI traffic.
#[derive(Debug, Clone, Deserialize)]
pub struct MceConfig {
    /// Toggle `I_MCE` during the run.
    #[serde(default = "MceConfig::default_enabled")]
    pub enabled: bool,
    /// Delay before the first frame, in nanoseconds.
    #[serde(default = "MceConfig::default_start_ns")]
    pub start_ns: u64,
    /// Inclusive range of the high phase, in nanoseconds.
    #[serde(default = "MceConfig::default_high_ns")]
    pub high_ns: [u64; 2],
    /// Inclusive range of the low phase, in nanoseconds.
    #[serde(default = "MceConfig::default_low_ns")]
    pub low_ns: [u64; 2],
}

impl MceConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_start_ns() -> u64 {
        defaults::MCE_START_NS
    }

    const fn default_high_ns() -> [u64; 2] {
        defaults::MCE_HIGH_NS
    }

    const fn default_low_ns() -> [u64; 2] {
        defaults::MCE_LOW_NS
    }
}

impl Default for MceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_ns: defaults::MCE_START_NS,
            high_ns: defaults::MCE_HIGH_NS,
            low_ns: defaults::MCE_LOW_NS,
        }
    }
}

/// A field list that may be written as a single string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldList {
    /// `"coverage"`
    One(String),
    /// `["coverage", "covered_bins"]`
    Many(Vec<String>),
}

impl FieldList {
    /// Normalizes to a list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// Coverage reporting.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageConfig {
    /// Per-sample status report: cover item name to the fields to print.
    /// A field may select one key of a map field with `field:key`.
    #[serde(default)]
    pub status: BTreeMap<String, FieldList>,
    /// Print per-bin detail in the final report.
    #[serde(default = "CoverageConfig::default_bins")]
    pub bins: bool,
}

impl CoverageConfig {
    const fn default_bins() -> bool {
        true
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            status: BTreeMap::new(),
            bins: true,
        }
    }
}
