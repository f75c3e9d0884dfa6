//! Foreground region statistics via Otsu thresholding and connected
//! components.
//!
//! The grayscale image is binarized with Otsu's method (foreground strictly
//! above the threshold), foreground pixels are grouped into 8-connected
//! regions, and per-region area and eccentricity are averaged.
//!
//! Threshold policy for degenerate histograms: splits that leave either
//! class empty are skipped, so a constant image thresholds at 0. A uniform
//! nonzero-gray image therefore produces a single region covering the whole
//! image; a uniform black image produces none.

use image::GrayImage;

/// Averaged foreground region properties. Both fields are NaN when the
/// thresholded image has no foreground regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    /// Mean region area in pixels.
    pub mean_area: f64,
    /// Mean region eccentricity in [0, 1].
    pub mean_eccentricity: f64,
}

/// Otsu's threshold: the gray level maximizing between-class variance of
/// the 256-bin histogram. Returns 0 when no split separates two non-empty
/// classes.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for &v in gray.as_raw() {
        hist[v as usize] += 1;
    }
    let total: u64 = gray.as_raw().len() as u64;
    if total == 0 {
        return 0;
    }
    let total_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();

    let mut best_t = 0u8;
    let mut best_var = f64::NEG_INFINITY;
    let mut w0 = 0.0f64;
    let mut sum0 = 0.0f64;
    for t in 0..256usize {
        w0 += hist[t] as f64;
        sum0 += t as f64 * hist[t] as f64;
        if w0 == 0.0 {
            continue;
        }
        let w1 = total as f64 - w0;
        if w1 == 0.0 {
            break;
        }
        let m0 = sum0 / w0;
        let m1 = (total_sum - sum0) / w1;
        let between = w0 * w1 * (m0 - m1) * (m0 - m1);
        if between > best_var {
            best_var = between;
            best_t = t as u8;
        }
    }
    best_t
}

/// Threshold, label, and average region area / eccentricity.
pub fn region_stats(gray: &GrayImage) -> RegionStats {
    let threshold = otsu_threshold(gray);
    let regions = label_regions(gray, threshold);
    if regions.is_empty() {
        return RegionStats {
            mean_area: f64::NAN,
            mean_eccentricity: f64::NAN,
        };
    }
    let n = regions.len() as f64;
    RegionStats {
        mean_area: regions.iter().map(|r| r.area as f64).sum::<f64>() / n,
        mean_eccentricity: regions.iter().map(Region::eccentricity).sum::<f64>() / n,
    }
}

/// Raw moments of one labeled region.
struct Region {
    area: u64,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl Region {
    fn new() -> Self {
        Self {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_xx: 0.0,
            sum_yy: 0.0,
            sum_xy: 0.0,
        }
    }

    fn push(&mut self, x: u32, y: u32) {
        let (x, y) = (x as f64, y as f64);
        self.area += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    /// Eccentricity of the ellipse with the same second central moments:
    /// √(1 − λ₂/λ₁) for eigenvalues λ₁ ≥ λ₂ of the covariance matrix.
    /// 0 for isotropic regions (λ₁ = λ₂) and single pixels (λ₁ = 0).
    fn eccentricity(&self) -> f64 {
        let n = self.area as f64;
        let cx = self.sum_x / n;
        let cy = self.sum_y / n;
        let mxx = self.sum_xx / n - cx * cx;
        let myy = self.sum_yy / n - cy * cy;
        let mxy = self.sum_xy / n - cx * cy;

        let trace = mxx + myy;
        let delta = ((mxx - myy) * (mxx - myy) + 4.0 * mxy * mxy).sqrt();
        let l1 = (trace + delta) / 2.0;
        let l2 = ((trace - delta) / 2.0).max(0.0);
        if l1 <= 0.0 {
            return 0.0;
        }
        (1.0 - l2 / l1).max(0.0).sqrt()
    }
}

/// 8-connected labeling of pixels strictly above `threshold`, via explicit
/// stack flood fill.
fn label_regions(gray: &GrayImage, threshold: u8) -> Vec<Region> {
    let (w, h) = gray.dimensions();
    let raw = gray.as_raw();
    let idx = |x: u32, y: u32| (y * w + x) as usize;
    let foreground = |x: u32, y: u32| raw[idx(x, y)] > threshold;

    let mut visited = vec![false; (w * h) as usize];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if visited[idx(x, y)] || !foreground(x, y) {
                continue;
            }
            let mut region = Region::new();
            visited[idx(x, y)] = true;
            stack.push((x, y));
            while let Some((px, py)) = stack.pop() {
                region.push(px, py);
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = px as i64 + dx;
                        let ny = py as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if !visited[idx(nx, ny)] && foreground(nx, ny) {
                            visited[idx(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            regions.push(region);
        }
    }
    regions
}

// ── Tests ──────────────────────────────────────────────────────────────────
