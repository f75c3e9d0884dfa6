//! Descriptive statistics, IQR outlier detection, and correlation.
//!
//! All functions operate on plain `f64` slices. Non-finite values (the NaN
//! geometric columns) are dropped before computing sample statistics; an
//! input with no finite values is an explicit `NoData` error rather than a
//! silent NaN.

use serde::Serialize;
use std::fmt;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from statistics over a metric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// No finite values to compute over.
    NoData,
    /// The two columns have different lengths.
    LengthMismatch { left: usize, right: usize },
    /// A correlation input has zero variance, making the coefficient
    /// undefined.
    ZeroVariance,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data"),
            Self::LengthMismatch { left, right } => {
                write!(f, "column length mismatch: {} vs {}", left, right)
            }
            Self::ZeroVariance => write!(f, "zero variance makes correlation undefined"),
        }
    }
}

impl std::error::Error for StatsError {}

// ── Descriptive statistics ─────────────────────────────────────────────────

/// Summary statistics of one column (count / mean / std / quartiles /
/// min / max), over finite values only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); NaN when count is 1.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Compute [`Describe`] for a column.
pub fn describe(values: &[f64]) -> Result<Describe, StatsError> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(StatsError::NoData);
    }
    finite.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));

    let n = finite.len();
    let mean = finite.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = finite.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    Ok(Describe {
        count: n,
        mean,
        std,
        min: finite[0],
        q25: percentile_sorted(&finite, 25.0),
        median: percentile_sorted(&finite, 50.0),
        q75: percentile_sorted(&finite, 75.0),
        max: finite[n - 1],
    })
}

/// Percentile of an ascending-sorted non-empty slice, with linear
/// interpolation between adjacent order statistics.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let frac = rank - rank.floor();
    if frac == 0.0 || lo + 1 >= n {
        return sorted[lo.min(n - 1)];
    }
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

// ── Outlier detection ──────────────────────────────────────────────────────

/// IQR rule: a value is an outlier iff it lies below `Q1 − 1.5·IQR` or
/// above `Q3 + 1.5·IQR`. Quartiles are computed over the finite values;
/// non-finite entries are never flagged. The returned mask is aligned with
/// the input. Deterministic for unchanged input.
pub fn iqr_outliers(values: &[f64]) -> Result<Vec<bool>, StatsError> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(StatsError::NoData);
    }
    finite.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));

    let q1 = percentile_sorted(&finite, 25.0);
    let q3 = percentile_sorted(&finite, 75.0);
    let iqr = q3 - q1;
    let lo = q1 - 1.5 * iqr;
    let hi = q3 + 1.5 * iqr;

    Ok(values
        .iter()
        .map(|&v| v.is_finite() && (v < lo || v > hi))
        .collect())
}

// ── Correlation ────────────────────────────────────────────────────────────

/// Pearson product-moment correlation coefficient.
///
/// Pairs with a non-finite member are dropped; fewer than two surviving
/// pairs is `NoData`, and a constant input column is `ZeroVariance`.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return Err(StatsError::NoData);
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Err(StatsError::ZeroVariance);
    }
    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Spearman rank correlation: Pearson over average-tie ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .unzip();
    if xs.len() < 2 {
        return Err(StatsError::NoData);
    }
    pearson(&ranks(&xs), &ranks(&ys))
}

/// 1-based ranks with ties assigned the average of their positions.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).expect("finite values"));

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the value; average their 1-based ranks.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            out[idx] = rank;
        }
        i = j + 1;
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────
