//! Top-level elaboration.
//!
//! Builds the hierarchy
//!
//! ```text
//! top                     chip pins
//! ├── dut                 register-side nets
//! │   ├── u_spi_if        SpiInterface
//! │   └── u_reg_file      RegisterFile
//! └── probes              testbench annotations (wr_info, rd_info, i)
//! ```
//!
//! then binds the probe aliases and hands back a ready [`Simulator`].

use tracing::info;

use crate::common::{HierPath, Result, SimError};
use crate::config::Config;
use crate::probe::{ProbeBinder, ProbeNamespace, ProbeSpec};
use crate::sim::{Design, SignalId, SignalKind, Simulator};
use crate::verif::regmap::RegisterMap;

use super::reg_file::RegisterFile;
use super::spi_if::SpiInterface;

/// Root unit.
pub const TOP: &str = "top";
/// Chip wrapper.
pub const DUT: &str = "top.dut";
/// SPI interface instance.
pub const SPI_IF: &str = "top.dut.u_spi_if";
/// Register file instance.
pub const REG_FILE: &str = "top.dut.u_reg_file";
/// Testbench annotation scope.
pub const PROBES: &str = "top.probes";

/// Alias prefix for SPI interface signals.
pub const SPI_IF_PREFIX: &str = "SPI_IF_";
/// Alias prefix for register file signals.
pub const REG_PREFIX: &str = "REG_";

/// Probe list bound on every elaboration.
pub fn default_probes() -> Vec<ProbeSpec> {
    vec![
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "i_sclk"),
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "i_cs_n"),
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "i_mosi"),
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "o_miso"),
        ProbeSpec::bus(SPI_IF, SPI_IF_PREFIX, "o_spi_addr", 8),
        ProbeSpec::bus(SPI_IF, SPI_IF_PREFIX, "o_spi_data", 16),
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "o_spi_wr"),
        ProbeSpec::wire(SPI_IF, SPI_IF_PREFIX, "o_spi_rd"),
        ProbeSpec::bus(REG_FILE, REG_PREFIX, "i_spi_addr", 8),
        ProbeSpec::bus(REG_FILE, REG_PREFIX, "i_spi_data", 16),
        ProbeSpec::wire(REG_FILE, REG_PREFIX, "i_spi_wr"),
        ProbeSpec::wire(REG_FILE, REG_PREFIX, "i_spi_rd"),
        ProbeSpec::bus(REG_FILE, REG_PREFIX, "o_spi_data", 16),
        ProbeSpec::wire(REG_FILE, REG_PREFIX, "o_spi_err"),
    ]
}

/// Chip pins driven or observed by the testbench.
#[derive(Debug, Clone, Copy)]
pub struct TopPins {
    /// `I_SCLK_<n>`
    pub sclk: SignalId,
    /// `I_CS_N_<n>`
    pub cs_n: SignalId,
    /// `I_MOSI_<n>`
    pub mosi: SignalId,
    /// `O_MISO_<n>`
    pub miso: SignalId,
    /// `I_CLK_I`
    pub clk_i: SignalId,
    /// `I_CLK_M`
    pub clk_m: SignalId,
    /// `I_RESET_N`
    pub reset_n: SignalId,
    /// `I_CHIP_ADDR[2:0]`
    pub chip_addr: SignalId,
    /// `I_MCE`
    pub mce: SignalId,
    /// `I_SPI_SEL`
    pub spi_sel: SignalId,
    /// `I_TEST_EN`
    pub test_en: SignalId,
    /// `I_SCAN_EN`
    pub scan_en: SignalId,
}

/// Annotation nets written by the driver and the monitor.
#[derive(Debug, Clone, Copy)]
pub struct TbProbes {
    /// Field currently sent by the driver.
    pub wr_info: SignalId,
    /// Field currently received by the monitor.
    pub rd_info: SignalId,
    /// Bit index within the current frame.
    pub i: SignalId,
}

/// The elaborated design, ready to run.
#[derive(Debug)]
pub struct Top {
    /// Simulator owning the design and its units.
    pub sim: Simulator,
    /// Chip pins.
    pub pins: TopPins,
    /// Annotation nets.
    pub tb: TbProbes,
    /// Sealed probe namespace.
    pub probes: ProbeNamespace,
}

impl Top {
    /// Elaborates the hierarchy, binds the default and configured probes, and
    /// attaches the behavioral units.
    ///
    /// # Errors
    ///
    /// Any [`SimError`] from design construction, or the first [`BindError`](crate::common::BindError)
    /// from probe binding. Nothing is returned on failure.
    pub fn elaborate(config: &Config, regmap: &RegisterMap) -> Result<Self> {
        let mut design = Design::new();
        let top = design.add_unit(TOP)?;
        let dut = design.add_unit(DUT)?;
        let spi_if = design.add_unit(SPI_IF)?;
        let reg_file = design.add_unit(REG_FILE)?;
        let probes = design.add_unit(PROBES)?;

        let pins = declare_pins(&mut design, &top, &dut, config.spi.spi_idx)?;

        let spi_addr = design.declare(&dut, "spi_addr", SignalKind::Logic(8))?;
        let spi_data = design.declare(&dut, "spi_data", SignalKind::Logic(16))?;
        let spi_wr = design.declare(&dut, "spi_wr", SignalKind::WIRE)?;
        let spi_rd = design.declare(&dut, "spi_rd", SignalKind::WIRE)?;
        let spi_rdata = design.declare(&dut, "spi_rdata", SignalKind::Logic(16))?;
        let spi_err = design.declare(&dut, "spi_err", SignalKind::WIRE)?;

        for (name, net) in [
            ("i_sclk", pins.sclk),
            ("i_cs_n", pins.cs_n),
            ("i_mosi", pins.mosi),
            ("o_miso", pins.miso),
            ("i_chip_addr", pins.chip_addr),
            ("i_reset_n", pins.reset_n),
            ("o_spi_addr", spi_addr),
            ("o_spi_data", spi_data),
            ("o_spi_wr", spi_wr),
            ("o_spi_rd", spi_rd),
            ("i_spi_rdata", spi_rdata),
            ("i_spi_err", spi_err),
        ] {
            design.connect(&spi_if, name, net)?;
        }

        for (name, net) in [
            ("i_spi_addr", spi_addr),
            ("i_spi_data", spi_data),
            ("i_spi_wr", spi_wr),
            ("i_spi_rd", spi_rd),
            ("o_spi_data", spi_rdata),
            ("o_spi_err", spi_err),
            ("i_reset_n", pins.reset_n),
            ("i_mce", pins.mce),
        ] {
            design.connect(&reg_file, name, net)?;
        }

        let tb = TbProbes {
            wr_info: design.declare_annotation(&probes, "wr_info", SignalKind::Text)?,
            rd_info: design.declare_annotation(&probes, "rd_info", SignalKind::Text)?,
            i: design.declare_annotation(&probes, "i", SignalKind::Logic(32))?,
        };

        let mut binder = ProbeBinder::new(&design);
        let _ = binder.bind_all(&default_probes())?;
        let _ = binder.bind_all(&config.probes)?;
        let namespace = binder.finish();

        let spi_unit = SpiInterface::attach(&design, spi_if)?;
        let reg_unit = RegisterFile::attach(&design, reg_file, regmap)?;

        info!(
            nets = design.store().len(),
            units = design.units().count(),
            probes = namespace.len(),
            registers = regmap.len(),
            "design elaborated"
        );

        let mut sim = Simulator::new(design);
        sim.add_unit(Box::new(spi_unit));
        sim.add_unit(Box::new(reg_unit));

        Ok(Self {
            sim,
            pins,
            tb,
            probes: namespace,
        })
    }

    /// Looks up a top-level pin by name.
    pub fn pin(&self, name: &str) -> Option<SignalId> {
        self.sim.design().signal(TOP, name)
    }
}

fn declare_pins(
    design: &mut Design,
    top: &HierPath,
    dut: &HierPath,
    idx: usize,
) -> std::result::Result<TopPins, SimError> {
    let mut pin = |name: String, kind: SignalKind| -> std::result::Result<SignalId, SimError> {
        let id = design.declare(top, &name, kind)?;
        design.connect(dut, &name, id)?;
        Ok(id)
    };

    Ok(TopPins {
        sclk: pin(format!("I_SCLK_{idx}"), SignalKind::WIRE)?,
        cs_n: pin(format!("I_CS_N_{idx}"), SignalKind::WIRE)?,
        mosi: pin(format!("I_MOSI_{idx}"), SignalKind::WIRE)?,
        miso: pin(format!("O_MISO_{idx}"), SignalKind::WIRE)?,
        clk_i: pin("I_CLK_I".to_string(), SignalKind::WIRE)?,
        clk_m: pin("I_CLK_M".to_string(), SignalKind::WIRE)?,
        reset_n: pin("I_RESET_N".to_string(), SignalKind::WIRE)?,
        chip_addr: pin("I_CHIP_ADDR".to_string(), SignalKind::Logic(3))?,
        mce: pin("I_MCE".to_string(), SignalKind::WIRE)?,
        spi_sel: pin("I_SPI_SEL".to_string(), SignalKind::WIRE)?,
        test_en: pin("I_TEST_EN".to_string(), SignalKind::WIRE)?,
        scan_en: pin("I_SCAN_EN".to_string(), SignalKind::WIRE)?,
    })
}
