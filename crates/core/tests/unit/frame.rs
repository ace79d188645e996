//! # Frame Layout Tests

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use probebench_core::verif::frame::{FRAME_BITS, bits_msb_first};
use probebench_core::verif::{FrameError, Op, SpiRequest, SpiResponse, Status};

#[test]
fn read_request_clears_wrn_and_data() {
    let word = SpiRequest::read(3, 0x10).encode();
    assert_eq!(word, (3 << 29) | (0x10 << 19) | 1);
    let req = SpiRequest::decode(word).unwrap();
    assert_eq!(req.op, Op::Read);
    assert_eq!(req.reg_data, 0);
}

#[test]
fn request_without_stop_bit_is_rejected() {
    let word = SpiRequest::write(1, 2, 3).encode() & !1;
    assert_eq!(SpiRequest::decode(word), Err(FrameError::MissingStop(word)));
}

#[test]
fn response_layout_and_display() {
    let resp = SpiResponse {
        chip_addr: 2,
        op: Op::Read,
        broadcast: false,
        data: 0x0032,
        status: Status::Ok,
    };
    let word = resp.encode();
    assert_eq!(word, (1 << 25) | (2 << 22) | (0x0032 << 4));
    assert_eq!(resp.to_string(), "Chip addr=2 : Data=0x0032 : Status=Ok");

    let err = SpiResponse {
        status: Status::Error,
        ..resp
    };
    assert_eq!(err.encode() & (1 << 3), 1 << 3);
    assert_eq!(SpiResponse::decode(err.encode()), Ok(err));
}

#[test]
fn labels_cover_every_position() {
    for pos in 0..FRAME_BITS {
        assert_ne!(SpiRequest::label(pos), "X", "request bit {pos}");
        assert_ne!(SpiResponse::label(pos), "X", "response bit {pos}");
    }
    assert_eq!(SpiRequest::label(28), "WRn");
    assert_eq!(SpiRequest::label(0), "Stp");
    assert_eq!(SpiResponse::label(25), "One bit");
    assert_eq!(SpiResponse::label(3), "Status");
}

#[test]
fn msb_first_matches_encode() {
    let word = SpiRequest::write(7, 0xFF, 0x8001).encode();
    let bits: Vec<bool> = bits_msb_first(u64::from(word), FRAME_BITS).collect();
    assert_eq!(bits.len(), 32);
    assert_eq!(&bits[..3], &[true, true, true]);
    assert!(bits[3]);
    assert!(bits[31]);
}

proptest! {
    #[test]
    fn any_request_with_stop_bit_reencodes(word in any::<u32>()) {
        let word = word | 1;
        let req = SpiRequest::decode(word).unwrap();
        prop_assert_eq!(req.encode(), word);
    }

    #[test]
    fn padding_bits_are_always_detected(word in any::<u32>(), pad in 0u32..6) {
        let valid = (word & 0x01FF_FFF8) | (1 << 25);
        prop_assert!(SpiResponse::decode(valid).is_ok());
        let dirty = valid | (1 << (26 + pad));
        prop_assert_eq!(SpiResponse::decode(dirty), Err(FrameError::Padding(dirty)));
    }
}
