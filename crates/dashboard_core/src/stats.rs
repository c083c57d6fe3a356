//! Summary statistics behind the dashboard charts.
//!
//! Quartiles are picked by index from the sorted scores (`floor(n * p)`),
//! not interpolated, so the figures match what the charts have always shown.

use std::collections::BTreeMap;

/// Box-plot figures for a set of sentiment scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl BoxSummary {
    /// Strictly outside the 1.5 × IQR fences.
    pub fn is_outlier(&self, score: f64) -> bool {
        score < self.lower_bound || score > self.upper_bound
    }
}

/// Box-plot figures, or `None` when there is no (non-NaN) score.
pub fn box_summary(scores: &[f64]) -> Option<BoxSummary> {
    let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| !s.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[(n * 3) / 4];
    let median = sorted[n / 2];
    let iqr = q3 - q1;
    Some(BoxSummary {
        q1,
        median,
        q3,
        iqr,
        lower_bound: q1 - 1.5 * iqr,
        upper_bound: q3 + 1.5 * iqr,
    })
}

/// Scores outside the fences, in input order.
pub fn outliers(scores: &[f64]) -> Vec<f64> {
    match box_summary(scores) {
        Some(summary) => scores
            .iter()
            .copied()
            .filter(|s| summary.is_outlier(*s))
            .collect(),
        None => Vec::new(),
    }
}

/// One bucket of the absolute-score chart: `lower <= score < upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBin {
    pub label: &'static str,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

const SCORE_BINS: [(&str, f64, f64); 6] = [
    ("very negative (<-2)", f64::NEG_INFINITY, -2.0),
    ("negative (-2~-1)", -2.0, -1.0),
    ("slightly negative (-1~0)", -1.0, 0.0),
    ("slightly positive (0~1)", 0.0, 1.0),
    ("positive (1~2)", 1.0, 2.0),
    ("very positive (>2)", 2.0, f64::INFINITY),
];

/// Fixed six-bin histogram; NaN and `+inf` fall in no bin.
pub fn score_histogram(scores: &[f64]) -> [ScoreBin; 6] {
    SCORE_BINS.map(|(label, lower, upper)| ScoreBin {
        label,
        lower,
        upper,
        count: scores.iter().filter(|s| **s >= lower && **s < upper).count(),
    })
}

/// Satisfaction levels, least satisfied first, as keyed by the backend.
pub const SATISFACTION_LEVELS: [&str; 5] = ["매우 불만족", "불만족", "보통", "만족", "매우 만족"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatisfactionBucket {
    pub level: &'static str,
    pub count: u64,
}

/// All five levels in fixed order; levels missing from `counts` are zero.
pub fn satisfaction_buckets(counts: &BTreeMap<String, u64>) -> [SatisfactionBucket; 5] {
    SATISFACTION_LEVELS.map(|level| SatisfactionBucket {
        level,
        count: counts.get(level).copied().unwrap_or(0),
    })
}
