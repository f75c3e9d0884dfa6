//! Gray-level co-occurrence texture statistics.
//!
//! The GLCM is built at 256 gray levels for the fixed offset (+1, 0)
//! (horizontal neighbor, distance 1), accumulated symmetrically and
//! normalized to a probability distribution. Five scalar summaries are
//! reported per image.

use image::GrayImage;

const LEVELS: usize = 256;

/// Scalar GLCM summaries for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureFeatures {
    /// Σ p(i,j)·(i−j)²
    pub contrast: f64,
    /// Σ p(i,j)·|i−j|
    pub dissimilarity: f64,
    /// Σ p(i,j)/(1+(i−j)²)
    pub homogeneity: f64,
    /// Angular second moment: Σ p(i,j)²
    pub asm: f64,
    /// √ASM
    pub energy: f64,
}

impl TextureFeatures {
    fn zero() -> Self {
        Self {
            contrast: 0.0,
            dissimilarity: 0.0,
            homogeneity: 0.0,
            asm: 0.0,
            energy: 0.0,
        }
    }
}

/// Compute the five GLCM summaries for a grayscale image.
///
/// Images narrower than 2 px have no horizontal pixel pairs; all summaries
/// are 0 in that case.
pub fn glcm_features(gray: &GrayImage) -> TextureFeatures {
    let (w, h) = gray.dimensions();
    if w < 2 || h == 0 {
        return TextureFeatures::zero();
    }

    let mut counts = vec![0.0f64; LEVELS * LEVELS];
    let raw = gray.as_raw();
    let w = w as usize;
    for y in 0..h as usize {
        let row = &raw[y * w..(y + 1) * w];
        for pair in row.windows(2) {
            let (i, j) = (pair[0] as usize, pair[1] as usize);
            counts[i * LEVELS + j] += 1.0;
            counts[j * LEVELS + i] += 1.0;
        }
    }

    let total: f64 = 2.0 * (h as f64) * (w as f64 - 1.0);
    let mut features = TextureFeatures::zero();
    for i in 0..LEVELS {
        for j in 0..LEVELS {
            let c = counts[i * LEVELS + j];
            if c == 0.0 {
                continue;
            }
            let p = c / total;
            let d = i as f64 - j as f64;
            features.contrast += p * d * d;
            features.dissimilarity += p * d.abs();
            features.homogeneity += p / (1.0 + d * d);
            features.asm += p * p;
        }
    }
    features.energy = features.asm.sqrt();
    features
}

// ── Tests ──────────────────────────────────────────────────────────────────
