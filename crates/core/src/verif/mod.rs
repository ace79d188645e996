//! Verification components.
//!
//! These modules never look inside the design; they work on chip pins and
//! annotation nets only:
//! 1. **Frames:** Bit layout of request and response frames.
//! 2. **Register map:** JSON register description, array expansion, validation.
//! 3. **Stimulus:** Random transactions and the SPI driver.
//! 4. **Checking:** Monitor, scoreboard, and functional coverage.
//! 5. **Testbench:** Sequencing, reference model, and the final verdict.

/// SPI agent bundling driver and monitor.
pub mod agent;

/// Cover points, crosses, and reports.
pub mod coverage;

/// Pin-level stimulus.
pub mod driver;

/// Request/response frame codec.
pub mod frame;

/// Pin-level observation and response decoding.
pub mod monitor;

/// Register map loading and expansion.
pub mod regmap;

/// Expected-versus-observed comparison.
pub mod scoreboard;

/// Register read/write testbench.
pub mod testbench;

/// Transactions and their random generator.
pub mod transaction;

pub use agent::SpiAgent;
pub use coverage::{CoverCross, CoverPoint, CoverageDb};
pub use driver::SpiDriver;
pub use frame::{FrameError, Op, SpiRequest, SpiResponse, Status};
pub use monitor::SpiMonitor;
pub use regmap::{Register, RegisterMap};
pub use scoreboard::{Expected, Scoreboard};
pub use testbench::{SpiTestBench, TbReport};
pub use transaction::{SpiTrx, TrxGenerator};
