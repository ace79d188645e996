//! Functional coverage.
//!
//! A [`CoverPoint`] counts hits per bin; a bin is covered once it has been hit
//! `at_least` times. A [`CoverCross`] is the cartesian product of several
//! points. Besides its own bins, a cross tracks for every dimension how many
//! of its cross bins are still uncovered per point bin (`bin_cnt`); a point bin
//! is listed in the dimension's `covered_bins` once all cross bins containing
//! it are covered.
//!
//! Items live in a [`CoverageDb`] keyed by name. Status reports print selected
//! fields of selected items after every sample; the final report prints every
//! item.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::{info, warn};

use crate::common::ConfigError;
use crate::config::FieldList;

/// Fields a status report may print.
pub const REPORT_FIELDS: [&str; 9] = [
    "at_least",
    "weight",
    "new_hits",
    "size",
    "coverage",
    "cover_percentage",
    "detailed_coverage",
    "covered_bins",
    "bin_cnt",
];

fn percentage(covered: usize, size: usize) -> f64 {
    if size == 0 {
        0.0
    } else {
        covered as f64 * 100.0 / size as f64
    }
}

/// A single coverage dimension.
#[derive(Debug, Clone)]
pub struct CoverPoint {
    name: String,
    at_least: u32,
    weight: u32,
    hits: BTreeMap<String, u32>,
    new_hits: Vec<String>,
    covered_bins: Vec<String>,
}

impl CoverPoint {
    /// Creates a point over `bins` with `at_least = 1` and `weight = 1`.
    pub fn new<S: Into<String>>(name: impl Into<String>, bins: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            at_least: 1,
            weight: 1,
            hits: bins.into_iter().map(|b| (b.into(), 0)).collect(),
            new_hits: Vec::new(),
            covered_bins: Vec::new(),
        }
    }

    /// Sets the hit count at which a bin counts as covered.
    #[must_use]
    pub fn with_at_least(mut self, at_least: u32) -> Self {
        self.at_least = at_least.max(1);
        self
    }

    /// Sets the weight of this point in the overall coverage.
    #[must_use]
    pub const fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Records one sample. Returns `false` if `bin` is not a bin of this point.
    pub fn sample(&mut self, bin: &str) -> bool {
        self.new_hits.clear();
        let Some(count) = self.hits.get_mut(bin) else {
            return false;
        };
        *count += 1;
        self.new_hits.push(bin.to_string());
        if *count == self.at_least {
            self.covered_bins.push(bin.to_string());
            warn!(item = %self.name, "Covered bins: {:?}", self.covered_bins);
        }
        true
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bins.
    pub fn size(&self) -> usize {
        self.hits.len()
    }

    /// Number of covered bins.
    pub fn coverage(&self) -> usize {
        self.covered_bins.len()
    }

    /// Covered share of bins, in percent.
    pub fn cover_percentage(&self) -> f64 {
        percentage(self.coverage(), self.size())
    }

    /// Hit count per bin.
    pub const fn detailed_coverage(&self) -> &BTreeMap<String, u32> {
        &self.hits
    }

    /// Bins hit by the last sample.
    pub fn new_hits(&self) -> &[String] {
        &self.new_hits
    }

    /// Bins in the order they became covered.
    pub fn covered_bins(&self) -> &[String] {
        &self.covered_bins
    }
}

/// Cartesian product of points.
#[derive(Debug, Clone)]
pub struct CoverCross {
    name: String,
    items: Vec<String>,
    at_least: u32,
    weight: u32,
    hits: BTreeMap<Vec<String>, u32>,
    new_hits: Vec<Vec<String>>,
    covered: usize,
    covered_bins: BTreeMap<String, Vec<String>>,
    bin_cnt: BTreeMap<String, BTreeMap<String, u32>>,
}

impl CoverCross {
    /// Crosses `points`, in order.
    pub fn new(name: impl Into<String>, points: &[&CoverPoint]) -> Self {
        let mut combos: Vec<Vec<String>> = vec![Vec::new()];
        for point in points {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    point.hits.keys().map(move |bin| {
                        let mut combo = prefix.clone();
                        combo.push(bin.clone());
                        combo
                    })
                })
                .collect();
        }

        let items: Vec<String> = points.iter().map(|p| p.name.clone()).collect();
        let mut bin_cnt: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
        for combo in &combos {
            for (item, bin) in items.iter().zip(combo) {
                *bin_cnt
                    .entry(item.clone())
                    .or_default()
                    .entry(bin.clone())
                    .or_default() += 1;
            }
        }

        Self {
            name: name.into(),
            covered_bins: items.iter().map(|i| (i.clone(), Vec::new())).collect(),
            items,
            at_least: 1,
            weight: 1,
            hits: combos.into_iter().map(|c| (c, 0)).collect(),
            new_hits: Vec::new(),
            covered: 0,
            bin_cnt,
        }
    }

    /// Sets the hit count at which a cross bin counts as covered.
    #[must_use]
    pub fn with_at_least(mut self, at_least: u32) -> Self {
        self.at_least = at_least.max(1);
        self
    }

    /// Sets the weight of this cross in the overall coverage.
    #[must_use]
    pub const fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Records one sample, one bin per crossed point. Returns `false` if the
    /// combination is not a bin of this cross.
    pub fn sample(&mut self, bins: &[&str]) -> bool {
        self.new_hits.clear();
        let key: Vec<String> = bins.iter().map(|b| (*b).to_string()).collect();
        let Some(count) = self.hits.get_mut(&key) else {
            return false;
        };
        *count += 1;
        let just_covered = *count == self.at_least;
        self.new_hits.push(key.clone());
        if !just_covered {
            return true;
        }

        self.covered += 1;
        for (item, bin) in self.items.iter().zip(&key) {
            let Some(left) = self.bin_cnt.get_mut(item).and_then(|m| m.get_mut(bin)) else {
                continue;
            };
            *left = left.saturating_sub(1);
            if *left == 0 {
                let list = self.covered_bins.entry(item.clone()).or_default();
                list.push(bin.clone());
                warn!(item = %self.name, "Covered bins: {item} - {list:?}");
            }
        }
        true
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the crossed points.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Number of cross bins.
    pub fn size(&self) -> usize {
        self.hits.len()
    }

    /// Number of covered cross bins.
    pub const fn coverage(&self) -> usize {
        self.covered
    }

    /// Covered share of cross bins, in percent.
    pub fn cover_percentage(&self) -> f64 {
        percentage(self.covered, self.size())
    }

    /// Hit count per cross bin.
    pub const fn detailed_coverage(&self) -> &BTreeMap<Vec<String>, u32> {
        &self.hits
    }

    /// Cross bins hit by the last sample.
    pub fn new_hits(&self) -> &[Vec<String>] {
        &self.new_hits
    }

    /// Per dimension, point bins whose cross bins are all covered.
    pub const fn covered_bins(&self) -> &BTreeMap<String, Vec<String>> {
        &self.covered_bins
    }

    /// Per dimension, number of still uncovered cross bins per point bin.
    pub const fn bin_cnt(&self) -> &BTreeMap<String, BTreeMap<String, u32>> {
        &self.bin_cnt
    }
}

/// A coverage database entry.
#[derive(Debug, Clone)]
pub enum CoverItem {
    /// Single dimension.
    Point(CoverPoint),
    /// Cross of points.
    Cross(CoverCross),
}

impl CoverItem {
    /// Bin count.
    pub fn size(&self) -> usize {
        match self {
            Self::Point(p) => p.size(),
            Self::Cross(c) => c.size(),
        }
    }

    /// Covered bin count.
    pub fn coverage(&self) -> usize {
        match self {
            Self::Point(p) => p.coverage(),
            Self::Cross(c) => c.coverage(),
        }
    }

    /// Covered share in percent.
    pub fn cover_percentage(&self) -> f64 {
        match self {
            Self::Point(p) => p.cover_percentage(),
            Self::Cross(c) => c.cover_percentage(),
        }
    }

    /// Weight in the overall coverage.
    pub const fn weight(&self) -> u32 {
        match self {
            Self::Point(p) => p.weight,
            Self::Cross(c) => c.weight,
        }
    }

    /// Renders one report field. `key` selects one entry of a map-valued field;
    /// an unknown key renders the whole map.
    pub fn field(&self, field: &str, key: Option<&str>) -> Option<String> {
        let pick = |map: BTreeMap<String, String>| match key.and_then(|k| map.get(k)) {
            Some(v) => v.clone(),
            None => format!("{map:?}"),
        };
        let rendered = match (self, field) {
            (Self::Point(p), "at_least") => p.at_least.to_string(),
            (Self::Cross(c), "at_least") => c.at_least.to_string(),
            (_, "weight") => self.weight().to_string(),
            (_, "size") => self.size().to_string(),
            (_, "coverage") => self.coverage().to_string(),
            (_, "cover_percentage") => format!("{:2.2}", self.cover_percentage()),
            (Self::Point(p), "new_hits") => format!("{:?}", p.new_hits),
            (Self::Cross(c), "new_hits") => format!("{:?}", c.new_hits),
            (Self::Point(p), "detailed_coverage") => pick(
                p.hits
                    .iter()
                    .map(|(b, n)| (b.clone(), n.to_string()))
                    .collect(),
            ),
            (Self::Cross(c), "detailed_coverage") => pick(
                c.hits
                    .iter()
                    .map(|(b, n)| (b.join(","), n.to_string()))
                    .collect(),
            ),
            (Self::Point(p), "covered_bins") => format!("{:?}", p.covered_bins),
            (Self::Cross(c), "covered_bins") => pick(
                c.covered_bins
                    .iter()
                    .map(|(i, bins)| (i.clone(), format!("{bins:?}")))
                    .collect(),
            ),
            (Self::Point(_), "bin_cnt") => "None".to_string(),
            (Self::Cross(c), "bin_cnt") => pick(
                c.bin_cnt
                    .iter()
                    .map(|(i, m)| (i.clone(), format!("{m:?}")))
                    .collect(),
            ),
            _ => return None,
        };
        Some(rendered)
    }
}

/// Validated status report selection: item name to fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    entries: BTreeMap<String, Vec<String>>,
}

impl StatusReport {
    /// Selected fields per item.
    pub const fn entries(&self) -> &BTreeMap<String, Vec<String>> {
        &self.entries
    }

    /// Returns `true` if nothing is reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named coverage items.
#[derive(Debug, Clone, Default)]
pub struct CoverageDb {
    items: BTreeMap<String, CoverItem>,
}

impl CoverageDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point, replacing any item with the same name.
    pub fn add_point(&mut self, point: CoverPoint) {
        let _ = self.items.insert(point.name.clone(), CoverItem::Point(point));
    }

    /// Adds a cross of already registered points.
    pub fn add_cross(&mut self, name: &str, points: &[&str]) -> Result<(), ConfigError> {
        let mut found = Vec::with_capacity(points.len());
        for p in points {
            match self.items.get(*p) {
                Some(CoverItem::Point(point)) => found.push(point),
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "cover cross `{name}` references unknown point `{p}`"
                    )));
                }
            }
        }
        let cross = CoverCross::new(name, &found);
        let _ = self.items.insert(name.to_string(), CoverItem::Cross(cross));
        Ok(())
    }

    /// Looks up an item.
    pub fn get(&self, name: &str) -> Option<&CoverItem> {
        self.items.get(name)
    }

    /// Samples a point. Returns `false` for an unknown item or bin.
    pub fn sample_point(&mut self, name: &str, bin: &str) -> bool {
        match self.items.get_mut(name) {
            Some(CoverItem::Point(p)) => p.sample(bin),
            _ => false,
        }
    }

    /// Samples a cross. Returns `false` for an unknown item or bin.
    pub fn sample_cross(&mut self, name: &str, bins: &[&str]) -> bool {
        match self.items.get_mut(name) {
            Some(CoverItem::Cross(c)) => c.sample(bins),
            _ => false,
        }
    }

    /// Iterates over items in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CoverItem)> {
        self.items.iter().map(|(n, i)| (n.as_str(), i))
    }

    /// Weighted overall coverage in percent.
    pub fn coverage(&self) -> f64 {
        let (sum, weights) = self.items.values().fold((0.0, 0u64), |(s, w), item| {
            (
                s + item.cover_percentage() * f64::from(item.weight()),
                w + u64::from(item.weight()),
            )
        });
        if weights == 0 { 0.0 } else { sum / weights as f64 }
    }

    /// Validates a status report selection against this database. Unknown
    /// items and unsupported fields are dropped with a warning.
    pub fn setup_report(&self, status: &BTreeMap<String, FieldList>) -> StatusReport {
        if status.is_empty() {
            info!("No coverage status reported.");
        }
        let mut entries = BTreeMap::new();
        for (item, fields) in status {
            if !self.items.contains_key(item) {
                warn!("Wrong coverage_db item: {item}.*");
                continue;
            }
            let kept: Vec<String> = fields
                .clone()
                .into_vec()
                .into_iter()
                .filter(|f| {
                    let base = f.split(':').next().unwrap_or_default();
                    let ok = REPORT_FIELDS.contains(&base);
                    if !ok {
                        warn!("Wrong coverage_db item field: {item}.{base}");
                    }
                    ok
                })
                .collect();
            let _ = entries.insert(item.clone(), kept);
        }
        StatusReport { entries }
    }

    /// Logs the selected fields.
    pub fn status_report(&self, report: &StatusReport) {
        for line in self.status_lines(report) {
            info!("{line}");
        }
    }

    /// Renders the selected fields, one line each.
    pub fn status_lines(&self, report: &StatusReport) -> Vec<String> {
        let mut lines = Vec::new();
        for (name, fields) in &report.entries {
            let Some(item) = self.items.get(name) else {
                continue;
            };
            for field in fields {
                let (base, key) = field
                    .split_once(':')
                    .map_or((field.as_str(), None), |(b, k)| (b, Some(k)));
                if let Some(value) = item.field(base, key) {
                    lines.push(format!("{name}.{field} = {value}"));
                }
            }
        }
        lines
    }

    /// Renders the final report, with per-bin hit counts if `bins` is set.
    pub fn final_report(&self, bins: bool) -> String {
        let mut out = String::new();
        for (name, item) in &self.items {
            let _ = writeln!(
                out,
                "{name} : {}/{} bins ({:.2}%), weight {}",
                item.coverage(),
                item.size(),
                item.cover_percentage(),
                item.weight()
            );
            if !bins {
                continue;
            }
            match item {
                CoverItem::Point(p) => {
                    for (bin, hits) in &p.hits {
                        let mark = if *hits >= p.at_least { "covered" } else { "" };
                        let _ = writeln!(out, "    BIN {bin} : {hits} {mark}");
                    }
                }
                CoverItem::Cross(c) => {
                    for (bin, hits) in &c.hits {
                        let mark = if *hits >= c.at_least { "covered" } else { "" };
                        let _ = writeln!(out, "    BIN ({}) : {hits} {mark}", bin.join(", "));
                    }
                }
            }
        }
        let _ = writeln!(out, "total : {:.2}%", self.coverage());
        out
    }
}
