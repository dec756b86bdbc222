//! Aggregations: pure, deterministic reductions over dataset columns and
//! model probabilities.
//!
//! RULES:
//!   - Every function takes owned-or-borrowed column slices and returns a
//!     new value. Nothing here sees or mutates the dataset itself.
//!   - Bin edges and band thresholds are constants; changing one changes
//!     every dashboard number downstream.

use crate::error::{DashError, DashResult};
use chrono::NaiveDate;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::collections::BTreeMap;

// ── Rates ────────────────────────────────────────────────────────────────────

/// Share of label-0 (not repaid within 5 days) rows, in percent.
pub fn delinquency_rate(labels: &[u8]) -> DashResult<f64> {
    if labels.is_empty() {
        return Err(DashError::computation("Delinquency rate of an empty set"));
    }
    let delinquent = labels.iter().filter(|&&l| l == 0).count();
    Ok(delinquent as f64 / labels.len() as f64 * 100.0)
}

// ── Risk banding ─────────────────────────────────────────────────────────────

pub const LOW_RISK_CEILING: f64 = 0.33;
pub const HIGH_RISK_FLOOR: f64 = 0.67;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lower edges are inclusive: 0.33 is Medium, 0.67 is High.
    pub fn from_probability(p: f64) -> Self {
        if p >= HIGH_RISK_FLOOR {
            Self::High
        } else if p >= LOW_RISK_CEILING {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low    => "Low",
            Self::Medium => "Medium",
            Self::High   => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low:    u64,
    pub medium: u64,
    pub high:   u64,
}

pub fn risk_distribution(probabilities: &[f64]) -> RiskDistribution {
    let mut dist = RiskDistribution::default();
    for &p in probabilities {
        match RiskLevel::from_probability(p) {
            RiskLevel::Low    => dist.low += 1,
            RiskLevel::Medium => dist.medium += 1,
            RiskLevel::High   => dist.high += 1,
        }
    }
    dist
}

/// Portfolio bands, half-open `[lo, hi)`; the top band has no ceiling.
pub const PORTFOLIO_BANDS: [(&str, f64); 6] = [
    ("0-10%",  0.00),
    ("10-20%", 0.10),
    ("20-30%", 0.20),
    ("30-50%", 0.30),
    ("50-70%", 0.50),
    ("70%+",   0.70),
];

/// Index into `PORTFOLIO_BANDS`. Anything below 0.10, negatives included,
/// lands in the first band.
pub fn portfolio_band(p: f64) -> usize {
    PORTFOLIO_BANDS
        .iter()
        .rposition(|(_, floor)| p >= *floor)
        .unwrap_or(0)
}

pub fn portfolio_bands(probabilities: &[f64]) -> LabelledCounts {
    let mut counts = [0u64; 6];
    for &p in probabilities {
        counts[portfolio_band(p)] += 1;
    }
    LabelledCounts(PORTFOLIO_BANDS.iter().map(|(band, _)| *band).zip(counts).collect())
}

/// Counts under fixed labels, serialized as a JSON object in label order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledCounts(Vec<(&'static str, u64)>);

impl LabelledCounts {
    pub fn get(&self, label: &str) -> Option<u64> {
        self.0.iter().find(|(l, _)| *l == label).map(|(_, c)| *c)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, c)| c).sum()
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(l, _)| *l)
    }
}

impl Serialize for LabelledCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

// ── Histogram ────────────────────────────────────────────────────────────────

/// Equal-width histogram over [0, 1]. Bins are `[lo, hi)` except the last,
/// which is closed. Values outside [0, 1] are not counted.
///
/// Edges are `i * (1 / bins)` and boundary values are corrected against
/// those computed edges, not against `p * bins`, so a value sitting on an
/// edge always lands in the bin that edge opens.
pub fn probability_histogram(probabilities: &[f64], bins: usize) -> Vec<u64> {
    let mut counts = vec![0u64; bins];
    if bins == 0 {
        return counts;
    }
    let step = 1.0 / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| i as f64 * step).collect();
    let last_edge = edges[bins];

    for &p in probabilities {
        if !(0.0..=last_edge).contains(&p) {
            continue;
        }
        let mut idx = ((p * bins as f64) as usize).min(bins - 1);
        if p < edges[idx] {
            idx -= 1;
        } else if idx + 1 < bins && p >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }
    counts
}

// ── Summary statistics ───────────────────────────────────────────────────────

// NaN cells are missing values: the summaries below skip them.

fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

pub fn mean(values: &[f64]) -> DashResult<f64> {
    let values = present(values);
    if values.is_empty() {
        return Err(DashError::computation("Mean of an empty set"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> DashResult<f64> {
    let sorted = sorted_copy(&present(values));
    if sorted.is_empty() {
        return Err(DashError::computation("Median of an empty set"));
    }
    let mid = sorted.len() / 2;
    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Standard deviation with `ddof` delta degrees of freedom. `None` when
/// there are not more than `ddof` values.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    let values = present(values);
    if values.len() <= ddof {
        return None;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

pub fn min(values: &[f64]) -> DashResult<f64> {
    present(values)
        .into_iter()
        .reduce(f64::min)
        .ok_or_else(|| DashError::computation("Minimum of an empty set"))
}

pub fn max(values: &[f64]) -> DashResult<f64> {
    present(values)
        .into_iter()
        .reduce(f64::max)
        .ok_or_else(|| DashError::computation("Maximum of an empty set"))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolation quantile of an ascending slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ── Quartile delinquency ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRate {
    pub bucket: String,
    pub rate:   f64,
}

fn quartile_labels(buckets: usize) -> Vec<String> {
    if buckets == 4 {
        return ["Q1 (Low)", "Q2", "Q3", "Q4 (High)"].map(String::from).to_vec();
    }
    (1..=buckets)
        .map(|i| match i {
            1 if buckets > 1 => "Q1 (Low)".to_string(),
            i if i == buckets && buckets > 1 => format!("Q{i} (High)"),
            i => format!("Q{i}"),
        })
        .collect()
}

/// Split `values` at its quartiles (duplicate edges dropped, lowest edge
/// included) and report the delinquency rate of each non-empty bucket.
/// NaN values are ignored.
pub fn quartile_delinquency(values: &[f64], labels: &[u8]) -> DashResult<Vec<BucketRate>> {
    check_lengths(values.len(), labels.len())?;
    let pairs: Vec<(f64, u8)> = values
        .iter()
        .zip(labels)
        .filter(|(v, _)| !v.is_nan())
        .map(|(v, l)| (*v, *l))
        .collect();
    if pairs.is_empty() {
        return Err(DashError::computation("Quartiles of an empty set"));
    }

    let sorted = sorted_copy(&pairs.iter().map(|(v, _)| *v).collect::<Vec<_>>());
    let mut edges: Vec<f64> = [0.0, 0.25, 0.5, 0.75, 1.0]
        .iter()
        .map(|&q| quantile_sorted(&sorted, q))
        .collect();
    edges.dedup();

    let buckets = edges.len().saturating_sub(1).max(1);
    let mut totals = vec![0u64; buckets];
    let mut delinquent = vec![0u64; buckets];
    for (v, l) in pairs {
        let idx = (1..edges.len())
            .find(|&i| v <= edges[i])
            .map(|i| i - 1)
            .unwrap_or(0);
        totals[idx] += 1;
        if l == 0 {
            delinquent[idx] += 1;
        }
    }

    Ok(quartile_labels(buckets)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| totals[*i] > 0)
        .map(|(i, bucket)| BucketRate {
            bucket,
            rate: delinquent[i] as f64 / totals[i] as f64 * 100.0,
        })
        .collect())
}

// ── Grouping ─────────────────────────────────────────────────────────────────

// The grouped means below skip NaN cells like the summaries do. A group
// left with no present value is omitted rather than reported as NaN.

/// Mean of `values` per month, months ascending. Rows with a missing month
/// are dropped; any other non-whole month is an error.
pub fn mean_by_month(months: &[f64], values: &[f64]) -> DashResult<BTreeMap<u32, f64>> {
    check_lengths(months.len(), values.len())?;
    let mut acc: BTreeMap<u32, (f64, u64)> = BTreeMap::new();
    for (&m, &v) in months.iter().zip(values) {
        if m.is_nan() || v.is_nan() {
            continue;
        }
        let month = whole_number(m)
            .ok_or_else(|| DashError::computation(format!("Invalid month value {m}")))?;
        accumulate(&mut acc, month as u32, v);
    }
    Ok(group_means(acc).collect())
}

/// Calendar date for (month, day) under `year`; `None` when the pair is not
/// a real date or either part is not a whole number.
pub fn synthesize_date(year: i32, month: f64, day: f64) -> Option<NaiveDate> {
    let month = u32::try_from(whole_number(month)?).ok()?;
    let day = u32::try_from(whole_number(day)?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Dates for every row; any invalid row is an error naming it.
pub fn synthesize_dates(year: i32, months: &[f64], days: &[f64]) -> DashResult<Vec<NaiveDate>> {
    check_lengths(months.len(), days.len())?;
    months
        .iter()
        .zip(days)
        .enumerate()
        .map(|(i, (&m, &d))| {
            synthesize_date(year, m, d).ok_or_else(|| {
                DashError::computation(format!("Row {i}: {year}-{m}-{d} is not a valid date"))
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateLabelMean {
    pub date:  NaiveDate,
    pub label: u8,
    pub mean:  f64,
}

/// Mean of `values` per (date, label), sorted by date then label.
pub fn mean_by_date_and_label(
    dates: &[NaiveDate],
    labels: &[u8],
    values: &[f64],
) -> DashResult<Vec<DateLabelMean>> {
    check_lengths(dates.len(), labels.len())?;
    check_lengths(dates.len(), values.len())?;
    let mut acc: BTreeMap<(NaiveDate, u8), (f64, u64)> = BTreeMap::new();
    for ((&d, &l), &v) in dates.iter().zip(labels).zip(values) {
        if !v.is_nan() {
            accumulate(&mut acc, (d, l), v);
        }
    }
    Ok(group_means(acc)
        .map(|((date, label), mean)| DateLabelMean { date, label, mean })
        .collect())
}

/// Mean of `values` per date, dates ascending.
pub fn mean_by_date(dates: &[NaiveDate], values: &[f64]) -> DashResult<Vec<(NaiveDate, f64)>> {
    check_lengths(dates.len(), values.len())?;
    let mut acc: BTreeMap<NaiveDate, (f64, u64)> = BTreeMap::new();
    for (&d, &v) in dates.iter().zip(values) {
        if !v.is_nan() {
            accumulate(&mut acc, d, v);
        }
    }
    Ok(group_means(acc).collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date:             NaiveDate,
    /// Percent of the day's loans not repaid.
    pub delinquency_rate: f64,
    pub total_loans:      u64,
    pub repaid_loans:     u64,
}

/// Per-day totals and delinquency rate. Rows whose date is `None` are
/// skipped.
pub fn daily_delinquency(dates: &[Option<NaiveDate>], labels: &[u8]) -> DashResult<Vec<DailyStats>> {
    check_lengths(dates.len(), labels.len())?;
    let mut acc: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    for (d, &l) in dates.iter().zip(labels) {
        if let Some(d) = d {
            let slot = acc.entry(*d).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += u64::from(l);
        }
    }
    Ok(acc
        .into_iter()
        .map(|(date, (total, repaid))| DailyStats {
            date,
            total_loans: total,
            repaid_loans: repaid,
            delinquency_rate: (1.0 - repaid as f64 / total as f64) * 100.0,
        })
        .collect())
}

// ── Payback bucketing ────────────────────────────────────────────────────────

/// Right-closed payback ranges: `(-1,0]`, `(0,5]`, `(5,20]`, `(20,30]`,
/// `(30,90]`, `(90,∞)`.
pub const PAYBACK_BUCKETS: [(&str, i64); 6] = [
    ("0",     0),
    ("1-5",   5),
    ("6-20",  20),
    ("21-30", 30),
    ("31-90", 90),
    ("90+",   i64::MAX),
];

/// Which label segment a payback distribution describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaybackSegment {
    /// Label 1. Rows that round to 0 are kept.
    Repaid,
    /// Label 0. Rows that round to exactly 0 are dropped.
    Delinquent,
}

impl PaybackSegment {
    fn admits(&self, label: u8, rounded: i64) -> bool {
        match self {
            Self::Repaid     => label == 1,
            Self::Delinquent => label == 0 && rounded != 0,
        }
    }
}

/// Round half to even (banker's rounding): 0.5 → 0, 1.5 → 2, 2.5 → 2.
pub fn round_half_even(x: f64) -> DashResult<i64> {
    if !x.is_finite() {
        return Err(DashError::computation(format!("Cannot round non-finite value {x}")));
    }
    Ok(x.round_ties_even() as i64)
}

pub fn payback_bucket(rounded: i64) -> Option<usize> {
    if rounded <= -1 {
        return None;
    }
    PAYBACK_BUCKETS.iter().position(|(_, ceiling)| rounded <= *ceiling)
}

/// Bucket counts for one segment. All six buckets are always present.
pub fn payback_distribution(
    payback: &[f64],
    labels: &[u8],
    segment: PaybackSegment,
) -> DashResult<LabelledCounts> {
    check_lengths(payback.len(), labels.len())?;
    let mut counts = [0u64; 6];
    for (&p, &l) in payback.iter().zip(labels) {
        if !segment_label_matches(segment, l) {
            continue;
        }
        let rounded = round_half_even(p)?;
        if !segment.admits(l, rounded) {
            continue;
        }
        if let Some(idx) = payback_bucket(rounded) {
            counts[idx] += 1;
        }
    }
    Ok(LabelledCounts(
        PAYBACK_BUCKETS.iter().map(|(bucket, _)| *bucket).zip(counts).collect(),
    ))
}

/// Per-integer counts of the rounded payback time for one segment.
pub fn payback_value_counts(
    payback: &[f64],
    labels: &[u8],
    segment: PaybackSegment,
) -> DashResult<BTreeMap<i64, u64>> {
    check_lengths(payback.len(), labels.len())?;
    let mut counts = BTreeMap::new();
    for (&p, &l) in payback.iter().zip(labels) {
        if !segment_label_matches(segment, l) {
            continue;
        }
        let rounded = round_half_even(p)?;
        if segment.admits(l, rounded) {
            *counts.entry(rounded).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

// Rows outside the segment are skipped before rounding, so a NaN in the
// other segment never fails this one.
fn segment_label_matches(segment: PaybackSegment, label: u8) -> bool {
    match segment {
        PaybackSegment::Repaid     => label == 1,
        PaybackSegment::Delinquent => label == 0,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn accumulate<K: Ord>(acc: &mut BTreeMap<K, (f64, u64)>, key: K, value: f64) {
    let slot = acc.entry(key).or_insert((0.0, 0));
    slot.0 += value;
    slot.1 += 1;
}

fn group_means<K>(acc: BTreeMap<K, (f64, u64)>) -> impl Iterator<Item = (K, f64)> {
    acc.into_iter().map(|(k, (sum, n))| (k, sum / n as f64))
}

fn whole_number(x: f64) -> Option<i64> {
    (x.is_finite() && x.fract() == 0.0).then_some(x as i64)
}

fn check_lengths(a: usize, b: usize) -> DashResult<()> {
    if a != b {
        return Err(DashError::computation(format!(
            "Column length mismatch: {a} vs {b}"
        )));
    }
    Ok(())
}
