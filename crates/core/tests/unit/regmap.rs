//! # Register Map Tests

use pretty_assertions::assert_eq;
use rstest::rstest;

use probebench_core::common::ConfigError;
use probebench_core::verif::RegisterMap;
use probebench_core::verif::regmap::Access;

use crate::common::regmap;

#[test]
fn arrays_expand_with_indexed_names() {
    let map = regmap();
    for i in 0..4_u8 {
        let reg = map.get(&format!("ANODE_BIAS_{i}_ADDR")).unwrap();
        assert_eq!(reg.addr, 16 + i);
        assert_eq!(reg.width, 10);
        assert_eq!(reg.reset, 512);
        assert!(reg.writable());
    }
    assert!(map.get("ANODE_BIAS_ADDR").is_none());
}

#[test]
fn grouped_arrays_take_member_widths() {
    let map = regmap();
    let names: Vec<(&str, u8, u32)> = map
        .iter()
        .filter(|r| r.name.starts_with("MBIST_RES"))
        .map(|r| (r.name.as_str(), r.addr, r.width))
        .collect();
    assert_eq!(
        names,
        vec![
            ("MBIST_RES0_0_ADDR", 32, 8),
            ("MBIST_RES0_1_ADDR", 33, 3),
            ("MBIST_RES1_0_ADDR", 34, 8),
            ("MBIST_RES1_1_ADDR", 35, 3),
        ]
    );
    assert!(map.iter().filter(|r| r.name.starts_with("MBIST_RES")).all(|r| r.reset == 0));
}

#[test]
fn lookup_by_address_and_flags() {
    let map = regmap();
    assert_eq!(map.len(), 13);
    assert_eq!(map.by_addr(2).unwrap().name, "CTRL_ADDR");
    assert_eq!(map.by_addr(1).unwrap().access, Access::ReadOnly);
    assert!(map.by_addr(63).unwrap().unsupported);
    assert!(map.by_addr(100).is_none());
    assert_eq!(map.get("DAC_TRIM_ADDR").unwrap().max_value(), 0x0FFF);
}

#[test]
fn identification_packs_chip_id_and_address() {
    let mut map = regmap();
    map.set_identification("CHIP_ID_ADDR", 3, 2).unwrap();
    assert_eq!(map.get("CHIP_ID_ADDR").unwrap().reset, 0x32);
    assert!(map.set_identification("NOPE_ADDR", 3, 2).is_err());
}

#[rstest]
#[case::address_overflow(r#"{"regs":{"A":{"addr":256,"bit_width":8}}}"#, "does not fit 8 bits")]
#[case::zero_width(r#"{"regs":{"A":{"addr":1,"bit_width":0}}}"#, "outside 1..=16")]
#[case::bad_access(r#"{"regs":{"A":{"addr":1,"bit_width":8,"r_w":2}}}"#, "r_w must be 0 or 1")]
#[case::reset_too_wide(r#"{"regs":{"A":{"addr":1,"bit_width":4,"reg_value":16}}}"#, "does not fit 4 bits")]
#[case::shared_address(r#"{"regs":{"A":{"addr":1,"bit_width":8},"B":{"addr":1,"bit_width":8}}}"#, "already used by `A`")]
#[case::bad_group(r#"{"regs":{"A":{"addr":1,"bit_width":8,"n_regs":3,"group_widths":[8,8]}}}"#, "not a multiple")]
fn invalid_maps_are_rejected(#[case] json: &str, #[case] reason: &str) {
    let err = RegisterMap::from_json_str(json).unwrap_err();
    assert!(matches!(err, ConfigError::Register { .. }), "{err}");
    assert!(err.to_string().contains(reason), "{err}");
}

#[test]
fn malformed_json_names_its_origin() {
    let err = RegisterMap::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Json { ref origin, .. } if origin == "<inline>"));
}

#[test]
fn shipped_register_map_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../cfg/regs.json");
    let map = RegisterMap::load(path).unwrap();
    assert!(map.get("CHIP_ID_ADDR").is_some());
    assert!(map.iter().any(|r| r.unsupported));
}
