//! # Scoreboard Tests

use pretty_assertions::assert_eq;

use probebench_core::common::TbError;
use probebench_core::verif::scoreboard::ScoreSummary;
use probebench_core::verif::{Expected, Op, Scoreboard, SpiResponse, Status};

fn resp(data: u16, status: Status) -> SpiResponse {
    SpiResponse {
        chip_addr: 2,
        op: Op::Read,
        broadcast: false,
        data,
        status,
    }
}

#[test]
fn in_order_matches_pass() {
    let mut sb = Scoreboard::new();
    sb.add_expected(Expected::Data(0x12));
    sb.add_expected(Expected::Unsupported);
    assert!(sb.compare(resp(0x12, Status::Ok)));
    assert!(sb.compare(resp(0xDEAD, Status::Error)));
    assert_eq!(sb.pending(), 0);
    assert_eq!(
        sb.result(),
        Ok(ScoreSummary {
            compared: 2,
            matched: 2
        })
    );
}

#[test]
fn data_and_status_are_both_checked() {
    let mut sb = Scoreboard::new();
    sb.add_expected(Expected::Data(0x12));
    sb.add_expected(Expected::Data(0x12));
    assert!(!sb.compare(resp(0x13, Status::Ok)));
    assert!(!sb.compare(resp(0x12, Status::Error)));
    assert_eq!(sb.mismatches().len(), 2);
    assert_eq!(sb.mismatches()[1].index, 1);
    assert_eq!(
        sb.result(),
        Err(TbError::Scoreboard {
            mismatches: 2,
            unexpected: 0,
            missing: 0
        })
    );
}

#[test]
fn unexpected_and_missing_fail_the_run() {
    let mut sb = Scoreboard::new();
    assert!(!sb.compare(resp(1, Status::Ok)));
    assert_eq!(sb.unexpected().len(), 1);

    sb.add_expected(Expected::Data(7));
    assert_eq!(
        sb.result(),
        Err(TbError::Scoreboard {
            mismatches: 0,
            unexpected: 1,
            missing: 1
        })
    );
}

#[test]
fn empty_scoreboard_passes() {
    assert_eq!(Scoreboard::new().result(), Ok(ScoreSummary::default()));
}
