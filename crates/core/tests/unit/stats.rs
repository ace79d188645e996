//! # Statistics Tests

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use probebench_core::stats::{RegRuns, RunStats};
use probebench_core::verif::{Op, SpiResponse, SpiTrx, Status, TrxGenerator};

use crate::common::regmap;

#[test]
fn transactions_are_counted_per_register() {
    let map = regmap();
    let mut stats = RunStats::new(&map);
    let ctrl = map.get("CTRL_ADDR").unwrap();
    stats.record(&SpiTrx::write(ctrl, 3));
    stats.record(&SpiTrx::read(ctrl));
    stats.record(&SpiTrx::read(ctrl));

    assert_eq!(stats.transactions, 3);
    assert_eq!(
        stats.runs("CTRL_ADDR"),
        Some(RegRuns {
            reads: 2,
            writes: 1,
            writable: true
        })
    );
    assert_eq!(stats.runs("STATUS_ADDR").map(|r| r.writable), Some(false));
}

#[test]
fn under_exercised_skips_writes_of_read_only_registers() {
    let map = regmap();
    let mut stats = RunStats::new(&map);
    let status = map.get("STATUS_ADDR").unwrap();
    stats.record(&SpiTrx::read(status));
    stats.record(&SpiTrx::read(status));

    let under = stats.under_exercised(2);
    assert!(!under.reads.contains_key("STATUS_ADDR"));
    assert!(!under.writes.contains_key("STATUS_ADDR"));
    assert_eq!(under.writes.get("CTRL_ADDR"), Some(&0));
    assert!(stats.under_exercised(0).is_empty());
}

#[test]
fn responses_are_split_by_status() {
    let mut stats = RunStats::default();
    let ok = SpiResponse {
        chip_addr: 0,
        op: Op::Read,
        broadcast: false,
        data: 1,
        status: Status::Ok,
    };
    stats.record_response(&ok);
    stats.record_response(&SpiResponse {
        status: Status::Error,
        ..ok
    });
    assert_eq!((stats.responses_ok, stats.responses_err), (1, 1));
}

#[test]
fn generator_respects_access_and_width() {
    let map = regmap();
    let generator = TrxGenerator::new(&map).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..2000 {
        let trx = generator.next(&mut rng);
        let reg = map.get(&trx.reg_name).unwrap();
        assert_eq!(trx.addr, u32::from(reg.addr));
        if trx.op == Op::Write {
            assert!(reg.writable(), "{trx}");
            assert!(trx.data <= u32::from(reg.max_value()), "{trx}");
        } else {
            assert_eq!(trx.data, 0);
        }
    }
}
