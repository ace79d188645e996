//! Behavioral design under test.
//!
//! A chip-level wrapper (`top`) around an SPI interface and a register file,
//! plus the testbench annotation probes. The units bind to their ports by
//! local name, so the wiring lives in [`top`] alone.

/// Register file unit.
pub mod reg_file;

/// SPI interface unit.
pub mod spi_if;

/// Top-level elaboration and probe binding.
pub mod top;

pub use reg_file::RegisterFile;
pub use spi_if::SpiInterface;
pub use top::{TbProbes, Top, TopPins};

use crate::common::{HierPath, SimError};
use crate::sim::{Design, SignalId};

fn port(design: &Design, unit: &HierPath, name: &str) -> Result<SignalId, SimError> {
    design
        .signal(unit, name)
        .ok_or_else(|| SimError::UnknownSignal(unit.join(name).to_string()))
}
