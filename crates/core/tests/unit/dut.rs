//! # Target Model Tests
//!
//! Pin-level behavior of the SPI interface and the register file: which
//! frames are accepted, which writes take effect, and when postponed writes
//! become visible.

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;

use probebench_core::common::{SimTime, Value};
use probebench_core::config::Config;
use probebench_core::dut::top::{REG_FILE, SPI_IF};
use probebench_core::dut::{RegisterFile, SpiInterface, Top};
use probebench_core::verif::{RegisterMap, SpiDriver, SpiRequest, SpiTrx};

use crate::common::{config, init_tracing, regmap};

const CTRL: u8 = 2;
const STATUS: u8 = 1;

/// Elaborated target out of reset, with a driver on its SPI port.
struct Bench {
    top: Top,
    regmap: RegisterMap,
    driver: SpiDriver,
    config: Config,
    rng: StdRng,
}

impl Bench {
    fn new() -> Self {
        init_tracing();
        let config = config(0, 5);
        let regmap = regmap();
        let mut top = Top::elaborate(&config, &regmap).unwrap();
        let driver = SpiDriver::new(&config, &top.pins, &top.tb);

        let pins = top.pins;
        let sim = &mut top.sim;
        sim.schedule(0, pins.mce, false).unwrap();
        sim.schedule(0, pins.chip_addr, u64::from(config.spi.chip_addr)).unwrap();
        sim.schedule(0, pins.reset_n, false).unwrap();
        sim.schedule(100_000, pins.reset_n, true).unwrap();
        driver.idle(sim).unwrap();
        sim.run_until(200_000, &mut ()).unwrap();

        Self {
            top,
            regmap,
            driver,
            config,
            rng: StdRng::seed_from_u64(5),
        }
    }

    fn spi_if(&self) -> &SpiInterface {
        self.top.sim.unit::<SpiInterface>(SPI_IF).unwrap()
    }

    fn reg_file(&self) -> &RegisterFile {
        self.top.sim.unit::<RegisterFile>(REG_FILE).unwrap()
    }

    fn probe(&self, alias: &str) -> Value {
        self.top
            .probes
            .value(self.top.sim.store(), alias)
            .unwrap()
            .clone()
    }

    fn write(&mut self, reg: &str, data: u16) {
        let trx = SpiTrx::write(self.regmap.get(reg).unwrap(), data);
        self.send(&trx);
    }

    fn read(&mut self, reg: &str) {
        let trx = SpiTrx::read(self.regmap.get(reg).unwrap());
        self.send(&trx);
    }

    fn send(&mut self, trx: &SpiTrx) {
        let ready = self.driver.send(&mut self.top.sim, trx, &mut self.rng).unwrap();
        self.top.sim.run_until(ready, &mut ()).unwrap();
    }

    /// Clocks `bits` out MSB first with the driver's timing, without any checks.
    fn raw_frame(&mut self, bits: &[Value]) {
        let h = self.config.sclk_half_period();
        let pins = self.top.pins;
        let sim = &mut self.top.sim;
        let start = sim.now();
        sim.schedule(start, pins.cs_n, false).unwrap();
        for (k, bit) in bits.iter().enumerate() {
            let rise = start + (2 * k as SimTime + 1) * h;
            sim.schedule(rise, pins.sclk, true).unwrap();
            sim.schedule(rise + 1_000, pins.mosi, bit.clone()).unwrap();
            sim.schedule(rise + h, pins.sclk, false).unwrap();
        }
        let release = start + 2 * bits.len() as SimTime * h + 20_000;
        sim.schedule(release, pins.cs_n, true).unwrap();
        sim.schedule(release, pins.mosi, Value::X).unwrap();
        sim.run_until(release + 100_000, &mut ()).unwrap();
    }
}

fn frame_bits(word: u32, n: u32) -> Vec<Value> {
    (0..n).rev().map(|pos| Value::from((word >> pos) & 1 == 1)).collect()
}

#[test]
fn accepted_write_updates_the_register() {
    let mut bench = Bench::new();
    bench.write("CTRL_ADDR", 0x5A);

    assert_eq!(bench.spi_if().accepted(), 1);
    assert_eq!(bench.spi_if().dropped(), 0);
    assert_eq!(bench.reg_file().value(CTRL), Some(0x5A));
    assert_eq!(bench.probe("REG_i_spi_data"), Value::Word(0x5A));
    assert_eq!(bench.probe("REG_i_spi_wr"), Value::from(true));
}

#[rstest]
#[case::short_frame(frame_bits(SpiRequest::write(2, CTRL, 0x33).encode() >> 1, 31))]
#[case::long_frame(frame_bits(SpiRequest::write(2, CTRL, 0x33).encode(), 32).into_iter().chain([Value::from(true)]).collect())]
#[case::missing_stop(frame_bits(SpiRequest { stop: false, ..SpiRequest::write(2, CTRL, 0x33) }.encode(), 32))]
#[case::foreign_chip(frame_bits(SpiRequest::write(5, CTRL, 0x33).encode(), 32))]
#[case::unknown_mosi({
    let mut bits = frame_bits(SpiRequest::write(2, CTRL, 0x33).encode(), 32);
    bits[10] = Value::X;
    bits
})]
fn malformed_frame_is_dropped(#[case] bits: Vec<Value>) {
    let mut bench = Bench::new();
    bench.raw_frame(&bits);

    assert_eq!(bench.spi_if().dropped(), 1);
    assert_eq!(bench.spi_if().accepted(), 0);
    assert_eq!(bench.reg_file().value(CTRL), Some(0));
    assert_eq!(bench.probe("SPI_IF_o_spi_wr"), Value::from(false));

    // The interface recovers on the next well-formed frame.
    bench.write("CTRL_ADDR", 0x33);
    assert_eq!(bench.spi_if().accepted(), 1);
    assert_eq!(bench.reg_file().value(CTRL), Some(0x33));
}

#[test]
fn broadcast_reaches_a_foreign_chip_address() {
    let mut bench = Bench::new();
    let req = SpiRequest {
        broadcast: true,
        ..SpiRequest::write(5, CTRL, 0x33)
    };
    bench.raw_frame(&frame_bits(req.encode(), 32));

    assert_eq!(bench.spi_if().accepted(), 1);
    assert_eq!(bench.spi_if().dropped(), 0);
    assert_eq!(bench.reg_file().value(CTRL), Some(0x33));
}

#[test]
fn read_only_register_ignores_writes() {
    let mut bench = Bench::new();
    bench.write("STATUS_ADDR", 0x5A);
    assert_eq!(bench.spi_if().accepted(), 1);
    assert_eq!(bench.reg_file().value(STATUS), Some(0xA5));

    bench.read("STATUS_ADDR");
    assert_eq!(bench.probe("REG_o_spi_data"), Value::Word(0xA5));
    assert_eq!(bench.probe("REG_o_spi_err"), Value::from(false));
}

#[test]
fn unsupported_register_answers_with_error() {
    let mut bench = Bench::new();
    bench.write("DEBUG_ADDR", 0x1234);
    bench.read("DEBUG_ADDR");

    assert_eq!(bench.spi_if().accepted(), 2);
    assert_eq!(bench.probe("REG_o_spi_err"), Value::from(true));
    assert_eq!(bench.probe("REG_o_spi_data"), Value::Word(0));
}

#[test]
fn writes_during_mce_are_postponed_until_its_falling_edge() {
    let mut bench = Bench::new();
    bench.write("CTRL_ADDR", 0x11);

    let mce = bench.top.pins.mce;
    let now = bench.top.sim.now();
    bench.top.sim.schedule(now, mce, true).unwrap();
    bench.write("CTRL_ADDR", 0x5A);

    assert_eq!(bench.reg_file().pending(), 1);
    assert_eq!(bench.reg_file().value(CTRL), Some(0x11));

    bench.read("CTRL_ADDR");
    assert_eq!(bench.probe("REG_o_spi_data"), Value::Word(0x5A));
    assert_eq!(bench.reg_file().value(CTRL), Some(0x11));

    let now = bench.top.sim.now();
    bench.top.sim.schedule(now + 1_000, mce, false).unwrap();
    bench.top.sim.run_until(now + 2_000, &mut ()).unwrap();

    assert_eq!(bench.reg_file().pending(), 0);
    assert_eq!(bench.reg_file().value(CTRL), Some(0x5A));
}

#[test]
fn reset_discards_postponed_writes() {
    let mut bench = Bench::new();
    let pins = bench.top.pins;
    let now = bench.top.sim.now();
    bench.top.sim.schedule(now, pins.mce, true).unwrap();
    bench.write("DAC_TRIM_ADDR", 0x0FF);
    assert_eq!(bench.reg_file().pending(), 1);

    let now = bench.top.sim.now();
    bench.top.sim.schedule(now + 1_000, pins.reset_n, false).unwrap();
    bench.top.sim.run_until(now + 2_000, &mut ()).unwrap();

    assert_eq!(bench.reg_file().pending(), 0);
    assert_eq!(bench.reg_file().value(4), Some(2048));
}
