//! Per-image feature extraction.
//!
//! Decodes one image and computes the full metric vector of the table
//! schema. Extraction of one image is independent of every other image;
//! callers decide whether a failure aborts the run (it should not — see
//! [`crate::scan`]).

use crate::cluster::{kmeans, ClusterError, KMeansConfig};
use crate::color::rgb_to_hex;
use crate::metrics;
use crate::record::ImageRecord;
use crate::regions;
use crate::texture;
use std::fmt;
use std::path::Path;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors that can occur while extracting one image's record.
#[derive(Debug)]
pub enum ExtractError {
    /// Decode failure (unreadable, corrupt, or unsupported file).
    Image(image::ImageError),
    /// The file decodes to zero pixels.
    EmptyImage,
    /// Pixel clustering failed.
    Cluster(ClusterError),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(e) => write!(f, "image decode failed: {}", e),
            Self::EmptyImage => write!(f, "image has zero pixels"),
            Self::Cluster(e) => write!(f, "dominant color clustering failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<image::ImageError> for ExtractError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<ClusterError> for ExtractError {
    fn from(e: ClusterError) -> Self {
        Self::Cluster(e)
    }
}

// ── Configuration ──────────────────────────────────────────────────────────

/// Tunables for per-image extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractConfig {
    /// Seed for the dominant-color k-means, so records are reproducible
    /// run-to-run.
    pub color_seed: u64,
    /// Maximum k-means iterations for the per-image color clustering.
    pub color_max_iters: usize,
    /// Gaussian sigma of the denoised reference used by the noise metric.
    pub denoise_sigma: f32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            color_seed: 0,
            color_max_iters: 50,
            denoise_sigma: 1.5,
        }
    }
}

/// Number of dominant colors per image, fixed by the table schema.
const DOMINANT_COLORS: usize = 3;

// ── Extraction ─────────────────────────────────────────────────────────────

/// Decode the image at `path` and compute its full metric record.
pub fn extract_record(
    patient_id: &str,
    path: &Path,
    config: &ExtractConfig,
) -> Result<ImageRecord, ExtractError> {
    let img = image::open(path)?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(ExtractError::EmptyImage);
    }

    let rgb = img.to_rgb8();
    let gray = img.to_luma8();

    let pixels: Vec<[f64; 3]> = rgb
        .pixels()
        .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
        .collect();
    let centroids = kmeans(
        &pixels,
        &KMeansConfig {
            k: DOMINANT_COLORS,
            max_iters: config.color_max_iters,
            seed: config.color_seed,
        },
    )?;

    let texture = texture::glcm_features(&gray);
    let region_stats = regions::region_stats(&gray);

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ImageRecord {
        patient_id: patient_id.to_string(),
        filename,
        width,
        height,
        brightness: metrics::brightness(&gray),
        contrast: metrics::contrast(&gray),
        sharpness: metrics::sharpness(&gray),
        noise_level: metrics::noise_level(&rgb, config.denoise_sigma),
        dynamic_range: metrics::dynamic_range(&rgb),
        dominant_color_1_hex: rgb_to_hex(quantize(&centroids[0])),
        dominant_color_2_hex: rgb_to_hex(quantize(&centroids[1])),
        dominant_color_3_hex: rgb_to_hex(quantize(&centroids[2])),
        texture_contrast: texture.contrast,
        texture_dissimilarity: texture.dissimilarity,
        texture_homogeneity: texture.homogeneity,
        texture_asm: texture.asm,
        texture_energy: texture.energy,
        mean_area: region_stats.mean_area,
        mean_eccentricity: region_stats.mean_eccentricity,
    })
}

/// Truncate a centroid to byte channels (clamped to [0, 255]).
fn quantize(centroid: &[f64; 3]) -> [u8; 3] {
    [
        centroid[0].clamp(0.0, 255.0) as u8,
        centroid[1].clamp(0.0, 255.0) as u8,
        centroid[2].clamp(0.0, 255.0) as u8,
    ]
}

// ── Tests ──────────────────────────────────────────────────────────────────
