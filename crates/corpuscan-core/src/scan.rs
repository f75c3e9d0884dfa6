//! Corpus traversal and the append-only table store.
//!
//! The root directory represents a collection of patient folders, never
//! images itself: files directly inside the root are skipped. Every
//! directory below the root is scanned for `.jpg` / `.png` files (extension
//! match is case-insensitive) and grouped under the name of the file's
//! immediate parent directory.
//!
//! Store discipline: the header is written once up front (every run starts
//! a fresh table — no resumption, no deduplication), then each patient
//! folder's rows are appended as one batch after the folder completes. An
//! interrupted run therefore leaves a structurally valid table ending at
//! the last completed patient.
//!
//! A failure on one image never aborts the run: the image is logged and
//! skipped, and extraction continues with the next file.

use crate::extract::{extract_record, ExtractConfig};
use crate::record::{ImageRecord, HEADER};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ── Error type ─────────────────────────────────────────────────────────────

/// Fatal errors for a corpus scan. Per-image failures are not fatal and do
/// not appear here.
#[derive(Debug)]
pub enum ScanError {
    /// The root directory does not exist.
    RootMissing(PathBuf),
    /// The root path exists but is not a directory.
    NotADirectory(PathBuf),
    /// The output table could not be created or written.
    Io(std::io::Error),
    /// Row serialization failed.
    Csv(csv::Error),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootMissing(p) => write!(f, "root directory {} does not exist", p.display()),
            Self::NotADirectory(p) => write!(f, "{} is not a directory", p.display()),
            Self::Io(e) => write!(f, "table I/O failed: {}", e),
            Self::Csv(e) => write!(f, "row serialization failed: {}", e),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for ScanError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

// ── Summary ────────────────────────────────────────────────────────────────

/// Counters for one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanSummary {
    /// Patient folders visited (including empty ones).
    pub patient_folders: usize,
    /// Records appended to the table.
    pub images_written: usize,
    /// Images skipped because their metric computation failed.
    pub images_skipped: usize,
}

// ── Scan ───────────────────────────────────────────────────────────────────

/// Walk the corpus under `root` and write one record per image to `out`.
///
/// The output table is recreated from scratch (restart policy); the header
/// row is present even when the corpus holds no images.
pub fn scan_corpus(
    root: &Path,
    out: &Path,
    config: &ExtractConfig,
) -> Result<ScanSummary, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let file = File::create(out)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(HEADER)?;
    writer.flush()?;

    let mut summary = ScanSummary::default();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let patient_id = entry.file_name().to_string_lossy().into_owned();
        let records = scan_patient_folder(&patient_id, entry.path(), config, &mut summary);
        tracing::info!(
            "{}: {} images extracted",
            entry.path().display(),
            records.len(),
        );

        // One batch append per completed folder.
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        summary.patient_folders += 1;
        summary.images_written += records.len();
    }

    Ok(summary)
}

/// Extract records for the image files directly inside one folder.
/// Subdirectories are handled as their own batches by the outer walk.
fn scan_patient_folder(
    patient_id: &str,
    dir: &Path,
    config: &ExtractConfig,
    summary: &mut ScanSummary,
) -> Vec<ImageRecord> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || !is_image_file(&path) {
            continue;
        }
        match extract_record(patient_id, &path, config) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                summary.images_skipped += 1;
            }
        }
    }
    records
}

/// Case-insensitive `.jpg` / `.png` extension filter.
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "jpg" || ext == "png"
        })
        .unwrap_or(false)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::collections::BTreeSet;

    fn write_image(path: &Path, seed: u8) {
        let img = RgbImage::from_fn(16, 16, |x, y| {
            Rgb([
                seed.wrapping_add((x * 3) as u8),
                seed.wrapping_mul(2).wrapping_add(y as u8),
                seed,
            ])
        });
        img.save(path).unwrap();
    }

    fn read_table(path: &Path) -> Vec<ImageRecord> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.deserialize().collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_two_folder_scenario() {
        // One folder with 3 images, one with 0: exactly 3 rows, correct ids.
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(root.join("case_a")).unwrap();
        std::fs::create_dir_all(root.join("case_b")).unwrap();
        write_image(&root.join("case_a/one.png"), 10);
        write_image(&root.join("case_a/two.jpg"), 60);
        write_image(&root.join("case_a/three.PNG"), 110);

        let out = dir.path().join("table.csv");
        let summary = scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();

        assert_eq!(summary.patient_folders, 2);
        assert_eq!(summary.images_written, 3);
        assert_eq!(summary.images_skipped, 0);

        let records = read_table(&out);
        assert_eq!(records.len(), 3);
        let ids: BTreeSet<&str> = records.iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, BTreeSet::from(["case_a"]));
        let names: BTreeSet<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, BTreeSet::from(["one.png", "two.jpg", "three.PNG"]));
    }

    #[test]
    fn test_root_level_and_non_image_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(root.join("case_a")).unwrap();
        write_image(&root.join("case_a/keep.png"), 42);
        // Image directly in the root: never a record.
        write_image(&root.join("stray.png"), 42);
        // Non-image files: silently ignored.
        std::fs::write(root.join("case_a/notes.txt"), "n/a").unwrap();
        std::fs::write(root.join("case_a/archive.zip"), [0u8; 4]).unwrap();

        let out = dir.path().join("table.csv");
        let summary = scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();

        assert_eq!(summary.images_written, 1);
        let records = read_table(&out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "keep.png");
        assert_eq!(records[0].patient_id, "case_a");
    }

    #[test]
    fn test_corrupt_image_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(root.join("case_a")).unwrap();
        write_image(&root.join("case_a/good.png"), 7);
        std::fs::write(root.join("case_a/bad.png"), b"not a png at all").unwrap();

        let out = dir.path().join("table.csv");
        let summary = scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();

        assert_eq!(summary.images_written, 1);
        assert_eq!(summary.images_skipped, 1);
        let records = read_table(&out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "good.png");
    }

    #[test]
    fn test_empty_corpus_leaves_header_only_table() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(&root).unwrap();

        let out = dir.path().join("table.csv");
        let summary = scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();
        assert_eq!(summary, ScanSummary::default());

        let data = std::fs::read_to_string(&out).unwrap();
        let mut lines = data.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_rerun_restarts_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(root.join("case_a")).unwrap();
        write_image(&root.join("case_a/img.png"), 3);

        let out = dir.path().join("table.csv");
        scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();
        scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();

        // Restart policy: no duplicated rows, no doubled header.
        let records = read_table(&out);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("table.csv");
        let err = scan_corpus(
            &dir.path().join("no_such_dir"),
            &out,
            &ExtractConfig::default(),
        );
        assert!(matches!(err, Err(ScanError::RootMissing(_))));
        // Fatal before any processing: no table created.
        assert!(!out.exists());
    }

    #[test]
    fn test_nested_folders_group_by_immediate_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("corpus");
        std::fs::create_dir_all(root.join("case_a/followup")).unwrap();
        write_image(&root.join("case_a/base.png"), 1);
        write_image(&root.join("case_a/followup/later.png"), 2);

        let out = dir.path().join("table.csv");
        let summary = scan_corpus(&root, &out, &ExtractConfig::default()).unwrap();
        assert_eq!(summary.images_written, 2);

        let records = read_table(&out);
        let ids: BTreeSet<&str> = records.iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, BTreeSet::from(["case_a", "followup"]));
    }
}
