//! Test fixtures.

use std::sync::Once;

use probebench_core::common::HierPath;
use probebench_core::config::Config;
use probebench_core::sim::{Design, SignalId, SignalKind};
use probebench_core::verif::RegisterMap;

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness so it is shown only for failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();
    });
}

/// Register map used by the scenario tests.
///
/// Covers a read-only identification register, plain read/write registers of
/// several widths, an expanded array, a grouped array, and an unsupported
/// address.
pub const REGS_JSON: &str = r#"{
  "regs": {
    "CHIP_ID_ADDR":    { "addr": 0,  "bit_width": 16, "r_w": 0 },
    "STATUS_ADDR":     { "addr": 1,  "bit_width": 8,  "r_w": 0, "reg_value": 165 },
    "CTRL_ADDR":       { "addr": 2,  "bit_width": 8,  "r_w": 1 },
    "DAC_TRIM_ADDR":   { "addr": 4,  "bit_width": 12, "r_w": 1, "reg_value": 2048 },
    "ANODE_BIAS_ADDR": { "addr": 16, "bit_width": 10, "r_w": 1, "reg_value": 512, "n_regs": 4 },
    "MBIST_RES_ADDR":  { "addr": 32, "bit_width": 16, "r_w": 0, "n_regs": 4, "group_widths": [8, 3] },
    "DEBUG_ADDR":      { "addr": 63, "bit_width": 16, "r_w": 1, "unsupported": 1 }
  }
}"#;

/// Parsed [`REGS_JSON`].
pub fn regmap() -> RegisterMap {
    RegisterMap::from_json_str(REGS_JSON).unwrap()
}

/// Default configuration with `max_runs` transactions and seed `seed`.
pub fn config(max_runs: usize, seed: u64) -> Config {
    let mut config = Config::default();
    config.general.max_runs = max_runs;
    config.general.seed = seed;
    config.spi.chip_addr = 2;
    config
}

/// A two-unit design: `top.u_spi` with a wire, a byte bus, and a 16-bit bus,
/// and an empty `top.u_empty`.
pub struct SmallDesign {
    /// The design.
    pub design: Design,
    /// `top.u_spi.i_cs_n`
    pub cs_n: SignalId,
    /// `top.u_spi.i_spi_addr`
    pub addr: SignalId,
    /// `top.u_spi.o_spi_data`
    pub data: SignalId,
}

/// Builds [`SmallDesign`].
pub fn small_design() -> SmallDesign {
    let mut design = Design::new();
    let _ = design.add_unit("top").unwrap();
    let spi: HierPath = design.add_unit("top.u_spi").unwrap();
    let _ = design.add_unit("top.u_empty").unwrap();
    let cs_n = design.declare(&spi, "i_cs_n", SignalKind::WIRE).unwrap();
    let addr = design.declare(&spi, "i_spi_addr", SignalKind::Logic(8)).unwrap();
    let data = design.declare(&spi, "o_spi_data", SignalKind::Logic(16)).unwrap();
    SmallDesign {
        design,
        cs_n,
        addr,
        data,
    }
}
