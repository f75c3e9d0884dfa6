//! corpuscan-core — image quality metric extraction and corpus statistics.
//!
//! Operates on a corpus laid out as one folder per patient case, each holding
//! `.jpg` / `.png` images. The pipeline has two independent stages consumed
//! in sequence:
//!
//! 1. **Extract** – walk the corpus, compute a fixed vector of quality /
//!    texture / geometry metrics per image, and append one row per image to
//!    a CSV table with a stable column schema.
//! 2. **Analyze** – load the full table, compute descriptive statistics,
//!    IQR outlier flags, Pearson/Spearman correlations, and a dominant-color
//!    palette over the corpus.
//!
//! Data flows one way: the extractor produces the table, the analyzer reads
//! it. There is no shared state between the stages.

pub mod analyze;
pub mod cluster;
pub mod color;
pub mod extract;
pub mod metrics;
pub mod record;
pub mod regions;
pub mod scan;
pub mod stats;
pub mod texture;

pub use analyze::{AnalysisReport, AnalyzeError, Corpus, DEFAULT_METRICS};
pub use extract::{extract_record, ExtractConfig, ExtractError};
pub use record::{ImageRecord, Metric, UnknownMetric, HEADER};
pub use scan::{scan_corpus, ScanError, ScanSummary};
