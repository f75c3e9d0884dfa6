//! Corpus-level analysis over the extracted table.
//!
//! Loads the full table into memory (corpus size is bounded by the number of
//! processed images) and derives descriptive statistics, IQR outlier flags,
//! pairwise correlations, and a dominant-color palette. The table is
//! strictly read-only at this stage.

use crate::cluster::{kmeans, ClusterError, KMeansConfig};
use crate::color::{hex_to_rgb, rgb_to_hex, ColorParseError};
use crate::record::{ImageRecord, Metric};
use crate::stats::{self, Describe, StatsError};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Metrics analyzed when no explicit selection is given.
pub const DEFAULT_METRICS: [Metric; 4] = [
    Metric::Brightness,
    Metric::Contrast,
    Metric::Sharpness,
    Metric::TextureContrast,
];

/// Palette size of the corpus-wide dominant color summary.
pub const DEFAULT_PALETTE_SIZE: usize = 5;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors from loading or analyzing the table.
#[derive(Debug)]
pub enum AnalyzeError {
    /// The table could not be read or a row failed to deserialize.
    Csv(csv::Error),
    /// The table holds no data rows.
    NoData,
    /// A dominant-color field failed to parse. Fatal for the color step:
    /// the analyzer never substitutes a default color.
    Color {
        patient_id: String,
        filename: String,
        source: ColorParseError,
    },
    /// A statistic over a selected column failed.
    Stats { metric: Metric, source: StatsError },
    /// Palette clustering failed.
    Cluster(ClusterError),
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(e) => write!(f, "table read failed: {}", e),
            Self::NoData => write!(f, "table holds no data rows"),
            Self::Color {
                patient_id,
                filename,
                source,
            } => write!(
                f,
                "bad dominant color for {}/{}: {}",
                patient_id, filename, source
            ),
            Self::Stats { metric, source } => {
                write!(f, "statistics failed for {}: {}", metric, source)
            }
            Self::Cluster(e) => write!(f, "palette clustering failed: {}", e),
        }
    }
}

impl std::error::Error for AnalyzeError {}

impl From<csv::Error> for AnalyzeError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<ClusterError> for AnalyzeError {
    fn from(e: ClusterError) -> Self {
        Self::Cluster(e)
    }
}

// ── Report types ───────────────────────────────────────────────────────────

/// One metric's summary row.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    pub stats: Describe,
}

/// IQR outlier count for one metric.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierCount {
    pub metric: String,
    pub count: usize,
}

/// Pairwise Pearson correlation matrix over the selected metrics.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<String>,
    /// Row-major coefficients; `[i][i]` is 1.
    pub pearson: Vec<Vec<f64>>,
}

/// Pearson + Spearman coefficients for one metric pair.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationPair {
    pub x: String,
    pub y: String,
    pub pearson: f64,
    pub spearman: f64,
}

/// Everything the analyzer derives from one table, serializable for the
/// CLI's JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub n_records: usize,
    pub summary: Vec<MetricSummary>,
    pub outlier_counts: Vec<OutlierCount>,
    pub correlation: CorrelationMatrix,
    pub pair: CorrelationPair,
    /// Representative dominant colors across the corpus, as `#rrggbb`.
    pub palette: Vec<String>,
}

// ── Corpus ─────────────────────────────────────────────────────────────────

/// A fully loaded table.
#[derive(Debug, Clone)]
pub struct Corpus {
    records: Vec<ImageRecord>,
}

impl Corpus {
    /// Read the whole table. A header-only table is `NoData`.
    pub fn load(path: &Path) -> Result<Self, AnalyzeError> {
        let mut reader = csv::Reader::from_path(path)?;
        let records: Vec<ImageRecord> = reader.deserialize().collect::<Result<_, _>>()?;
        Self::from_records(records)
    }

    /// Wrap pre-loaded records; empty input is `NoData`.
    pub fn from_records(records: Vec<ImageRecord>) -> Result<Self, AnalyzeError> {
        if records.is_empty() {
            return Err(AnalyzeError::NoData);
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One metric's values in record order.
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().map(|r| metric.value(r)).collect()
    }

    /// Per-metric descriptive statistics.
    pub fn summary(&self, metrics: &[Metric]) -> Result<Vec<MetricSummary>, AnalyzeError> {
        metrics
            .iter()
            .map(|&metric| {
                let stats = stats::describe(&self.column(metric))
                    .map_err(|source| AnalyzeError::Stats { metric, source })?;
                Ok(MetricSummary {
                    metric: metric.name().to_string(),
                    stats,
                })
            })
            .collect()
    }

    /// IQR outlier mask for one metric, aligned with [`Self::records`].
    pub fn outlier_flags(&self, metric: Metric) -> Result<Vec<bool>, AnalyzeError> {
        stats::iqr_outliers(&self.column(metric))
            .map_err(|source| AnalyzeError::Stats { metric, source })
    }

    /// Outlier count per selected metric.
    pub fn outlier_counts(&self, metrics: &[Metric]) -> Result<Vec<OutlierCount>, AnalyzeError> {
        metrics
            .iter()
            .map(|&metric| {
                let flags = self.outlier_flags(metric)?;
                Ok(OutlierCount {
                    metric: metric.name().to_string(),
                    count: flags.iter().filter(|&&f| f).count(),
                })
            })
            .collect()
    }

    /// Pairwise Pearson matrix over the selected metrics.
    pub fn correlation_matrix(
        &self,
        metrics: &[Metric],
    ) -> Result<CorrelationMatrix, AnalyzeError> {
        let columns: Vec<Vec<f64>> = metrics.iter().map(|&m| self.column(m)).collect();
        let mut coefficients = vec![vec![0.0; metrics.len()]; metrics.len()];
        for i in 0..metrics.len() {
            coefficients[i][i] = 1.0;
            for j in (i + 1)..metrics.len() {
                let r = stats::pearson(&columns[i], &columns[j]).map_err(|source| {
                    AnalyzeError::Stats {
                        metric: metrics[i],
                        source,
                    }
                })?;
                coefficients[i][j] = r;
                coefficients[j][i] = r;
            }
        }
        Ok(CorrelationMatrix {
            metrics: metrics.iter().map(|m| m.name().to_string()).collect(),
            pearson: coefficients,
        })
    }

    /// Pearson + Spearman for one metric pair.
    pub fn correlation_pair(&self, x: Metric, y: Metric) -> Result<CorrelationPair, AnalyzeError> {
        let xs = self.column(x);
        let ys = self.column(y);
        let pearson = stats::pearson(&xs, &ys)
            .map_err(|source| AnalyzeError::Stats { metric: x, source })?;
        let spearman = stats::spearman(&xs, &ys)
            .map_err(|source| AnalyzeError::Stats { metric: x, source })?;
        Ok(CorrelationPair {
            x: x.name().to_string(),
            y: y.name().to_string(),
            pearson,
            spearman,
        })
    }

    /// Cluster every record's first dominant color into `k` representative
    /// RGB centroids. A malformed hex field aborts the step.
    pub fn color_palette(&self, k: usize, seed: u64) -> Result<Vec<[u8; 3]>, AnalyzeError> {
        let points = self
            .records
            .iter()
            .map(|r| {
                let rgb = hex_to_rgb(&r.dominant_color_1_hex).map_err(|source| {
                    AnalyzeError::Color {
                        patient_id: r.patient_id.clone(),
                        filename: r.filename.clone(),
                        source,
                    }
                })?;
                Ok([rgb[0] as f64, rgb[1] as f64, rgb[2] as f64])
            })
            .collect::<Result<Vec<_>, AnalyzeError>>()?;

        let centroids = kmeans(
            &points,
            &KMeansConfig {
                k,
                seed,
                ..Default::default()
            },
        )?;
        Ok(centroids
            .iter()
            .map(|c| {
                [
                    c[0].clamp(0.0, 255.0) as u8,
                    c[1].clamp(0.0, 255.0) as u8,
                    c[2].clamp(0.0, 255.0) as u8,
                ]
            })
            .collect())
    }

    /// Run every analysis step and aggregate the results.
    pub fn report(
        &self,
        metrics: &[Metric],
        pair: (Metric, Metric),
        palette_size: usize,
        seed: u64,
    ) -> Result<AnalysisReport, AnalyzeError> {
        Ok(AnalysisReport {
            n_records: self.len(),
            summary: self.summary(metrics)?,
            outlier_counts: self.outlier_counts(metrics)?,
            correlation: self.correlation_matrix(metrics)?,
            pair: self.correlation_pair(pair.0, pair.1)?,
            palette: self
                .color_palette(palette_size, seed)?
                .into_iter()
                .map(rgb_to_hex)
                .collect(),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Records with controlled brightness/contrast and a color split.
    fn make_records(n: usize) -> Vec<ImageRecord> {
        (0..n)
            .map(|i| {
                let b = 50.0 + i as f64 * 10.0;
                ImageRecord {
                    patient_id: format!("case_{}", i / 3),
                    filename: format!("img_{}.png", i),
                    width: 64,
                    height: 64,
                    brightness: b,
                    contrast: 2.0 * b + 1.0,
                    sharpness: 100.0,
                    noise_level: 0.0,
                    dynamic_range: 200.0,
                    dominant_color_1_hex: if i % 2 == 0 {
                        "#ff0000".into()
                    } else {
                        "#0000ff".into()
                    },
                    dominant_color_2_hex: "#202020".into(),
                    dominant_color_3_hex: "#404040".into(),
                    texture_contrast: 400.0 - b,
                    texture_dissimilarity: 3.0,
                    texture_homogeneity: 0.8,
                    texture_asm: 0.1,
                    texture_energy: 0.1f64.sqrt(),
                    mean_area: 50.0,
                    mean_eccentricity: 0.5,
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_corpus_is_no_data() {
        assert!(matches!(
            Corpus::from_records(Vec::new()),
            Err(AnalyzeError::NoData)
        ));
    }

    #[test]
    fn test_load_header_only_table_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(&path, format!("{}\n", crate::record::HEADER.join(","))).unwrap();
        assert!(matches!(Corpus::load(&path), Err(AnalyzeError::NoData)));
    }

    #[test]
    fn test_summary_and_correlations() {
        let corpus = Corpus::from_records(make_records(9)).unwrap();
        let summary = corpus.summary(&[Metric::Brightness]).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].stats.count, 9);
        assert_relative_eq!(summary[0].stats.mean, 90.0, epsilon = 1e-12);

        // contrast = 2·brightness + 1 and texture_contrast = 400 − brightness.
        let pair = corpus
            .correlation_pair(Metric::Brightness, Metric::Contrast)
            .unwrap();
        assert_relative_eq!(pair.pearson, 1.0, epsilon = 1e-12);
        assert_relative_eq!(pair.spearman, 1.0, epsilon = 1e-12);

        let matrix = corpus
            .correlation_matrix(&[Metric::Brightness, Metric::Contrast, Metric::TextureContrast])
            .unwrap();
        assert_relative_eq!(matrix.pearson[0][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix.pearson[0][1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix.pearson[0][2], -1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix.pearson[2][0], matrix.pearson[0][2], epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column_correlation_is_an_error() {
        let corpus = Corpus::from_records(make_records(5)).unwrap();
        // sharpness is constant across records.
        let err = corpus.correlation_pair(Metric::Brightness, Metric::Sharpness);
        assert!(matches!(
            err,
            Err(AnalyzeError::Stats {
                source: StatsError::ZeroVariance,
                ..
            })
        ));
    }

    #[test]
    fn test_outlier_counts() {
        let mut records = make_records(20);
        records[0].brightness = 1e6;
        let corpus = Corpus::from_records(records).unwrap();

        let counts = corpus.outlier_counts(&[Metric::Brightness]).unwrap();
        assert_eq!(counts[0].count, 1);

        // Idempotence over the unchanged corpus.
        let again = corpus.outlier_counts(&[Metric::Brightness]).unwrap();
        assert_eq!(again[0].count, counts[0].count);
        let flags_a = corpus.outlier_flags(Metric::Brightness).unwrap();
        let flags_b = corpus.outlier_flags(Metric::Brightness).unwrap();
        assert_eq!(flags_a, flags_b);
    }

    #[test]
    fn test_palette_recovers_color_split() {
        let corpus = Corpus::from_records(make_records(10)).unwrap();
        let palette = corpus.color_palette(2, 0).unwrap();
        assert_eq!(palette.len(), 2);
        let hex: Vec<String> = palette.into_iter().map(rgb_to_hex).collect();
        assert!(hex.contains(&"#ff0000".to_string()), "palette: {:?}", hex);
        assert!(hex.contains(&"#0000ff".to_string()), "palette: {:?}", hex);
    }

    #[test]
    fn test_malformed_hex_aborts_palette() {
        let mut records = make_records(4);
        records[2].dominant_color_1_hex = "#12zz56".into();
        let corpus = Corpus::from_records(records).unwrap();
        let err = corpus.color_palette(DEFAULT_PALETTE_SIZE, 0);
        assert!(matches!(err, Err(AnalyzeError::Color { .. })));
    }

    #[test]
    fn test_full_report() {
        let corpus = Corpus::from_records(make_records(12)).unwrap();
        let report = corpus
            .report(
                &[Metric::Brightness, Metric::Contrast],
                (Metric::Brightness, Metric::TextureContrast),
                DEFAULT_PALETTE_SIZE,
                0,
            )
            .unwrap();
        assert_eq!(report.n_records, 12);
        assert_eq!(report.summary.len(), 2);
        assert_eq!(report.outlier_counts.len(), 2);
        assert_eq!(report.correlation.pearson.len(), 2);
        assert_eq!(report.palette.len(), DEFAULT_PALETTE_SIZE);
        assert_relative_eq!(report.pair.pearson, -1.0, epsilon = 1e-12);
    }
}
