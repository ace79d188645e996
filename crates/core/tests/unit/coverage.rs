//! # Coverage Tests

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use probebench_core::config::FieldList;
use probebench_core::verif::coverage::CoverItem;
use probebench_core::verif::{CoverCross, CoverPoint, CoverageDb};

fn db() -> CoverageDb {
    let mut db = CoverageDb::new();
    db.add_point(CoverPoint::new("reg", ["A", "B"]));
    db.add_point(CoverPoint::new("op", ["Read", "Write"]));
    db.add_cross("reg_x_op", &["reg", "op"]).unwrap();
    db
}

#[test]
fn point_covers_after_at_least_hits() {
    let mut p = CoverPoint::new("p", ["x", "y"]).with_at_least(2);
    assert!(p.sample("x"));
    assert_eq!(p.coverage(), 0);
    assert!(p.sample("x"));
    assert_eq!(p.coverage(), 1);
    assert_eq!(p.covered_bins(), ["x".to_string()]);
    assert_eq!(p.new_hits(), ["x".to_string()]);
    assert!((p.cover_percentage() - 50.0).abs() < 1e-9);
    assert!(!p.sample("z"));
    assert!(p.new_hits().is_empty());
}

#[test]
fn cross_is_the_cartesian_product() {
    let reg = CoverPoint::new("reg", ["A", "B", "C"]);
    let op = CoverPoint::new("op", ["Read", "Write"]);
    let cross = CoverCross::new("x", &[&reg, &op]);
    assert_eq!(cross.size(), 6);
    assert_eq!(cross.items(), ["reg".to_string(), "op".to_string()]);
    assert_eq!(cross.bin_cnt()["reg"]["A"], 2);
    assert_eq!(cross.bin_cnt()["op"]["Read"], 3);
}

#[test]
fn cross_marks_point_bins_when_all_their_combinations_are_hit() {
    let reg = CoverPoint::new("reg", ["A", "B"]);
    let op = CoverPoint::new("op", ["Read", "Write"]);
    let mut cross = CoverCross::new("x", &[&reg, &op]);

    assert!(cross.sample(&["A", "Read"]));
    assert!(cross.covered_bins()["reg"].is_empty());
    assert!(cross.sample(&["A", "Write"]));
    assert_eq!(cross.covered_bins()["reg"], vec!["A".to_string()]);
    assert!(cross.covered_bins()["op"].is_empty());

    assert!(cross.sample(&["B", "Read"]));
    assert_eq!(cross.covered_bins()["op"], vec!["Read".to_string()]);
    assert_eq!(cross.coverage(), 3);

    // repeated hits do not re-count
    assert!(cross.sample(&["A", "Read"]));
    assert_eq!(cross.coverage(), 3);
    assert!(!cross.sample(&["C", "Read"]));
}

#[test]
fn cross_of_unknown_point_is_rejected() {
    let mut db = CoverageDb::new();
    db.add_point(CoverPoint::new("reg", ["A"]));
    assert!(db.add_cross("bad", &["reg", "op"]).is_err());
    assert!(db.get("bad").is_none());
}

#[test]
fn weighted_total() {
    let mut db = CoverageDb::new();
    db.add_point(CoverPoint::new("a", ["x", "y"]).with_weight(3));
    db.add_point(CoverPoint::new("b", ["x"]));
    assert!(db.sample_point("a", "x"));
    assert!(db.sample_point("b", "x"));
    // (50 * 3 + 100 * 1) / 4
    assert!((db.coverage() - 62.5).abs() < 1e-9);
}

#[test]
fn status_report_drops_unknown_items_and_fields() {
    let mut db = db();
    let status: BTreeMap<String, FieldList> = [
        ("reg".to_string(), FieldList::Many(vec!["coverage".into(), "bogus".into()])),
        ("reg_x_op".to_string(), FieldList::One("bin_cnt:op".into())),
        ("nope".to_string(), FieldList::One("size".into())),
    ]
    .into_iter()
    .collect();
    let report = db.setup_report(&status);
    assert_eq!(report.entries().len(), 2);
    assert_eq!(report.entries()["reg"], vec!["coverage".to_string()]);

    assert!(db.sample_point("reg", "A"));
    assert!(db.sample_cross("reg_x_op", &["A", "Read"]));
    let lines = db.status_lines(&report);
    assert_eq!(
        lines,
        vec![
            "reg.coverage = 1".to_string(),
            r#"reg_x_op.bin_cnt:op = {"Read": 1, "Write": 2}"#.to_string(),
        ]
    );
}

#[test]
fn item_fields_render() {
    let mut db = db();
    assert!(db.sample_cross("reg_x_op", &["B", "Write"]));
    let item = db.get("reg_x_op").unwrap();
    assert!(matches!(item, CoverItem::Cross(_)));
    assert_eq!(item.field("size", None).as_deref(), Some("4"));
    assert_eq!(item.field("cover_percentage", None).as_deref(), Some("25.00"));
    assert_eq!(
        item.field("detailed_coverage", Some("B,Write")).as_deref(),
        Some("1")
    );
    assert_eq!(db.get("reg").unwrap().field("bin_cnt", None).as_deref(), Some("None"));
    assert!(item.field("nonsense", None).is_none());
}

#[test]
fn final_report_lists_every_item() {
    let mut db = db();
    assert!(db.sample_point("op", "Read"));
    let report = db.final_report(true);
    assert!(report.contains("op : 1/2 bins (50.00%), weight 1"));
    assert!(report.contains("    BIN Read : 1 covered"));
    assert!(report.contains("reg_x_op : 0/4 bins (0.00%), weight 1"));
    assert!(report.trim_end().ends_with("%"));
    assert!(!db.final_report(false).contains("BIN"));
}
