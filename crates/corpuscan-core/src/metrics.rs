//! Scalar image quality metrics.
//!
//! All metrics operate on 8-bit buffers and return `f64`:
//!
//! - **brightness** – mean luma.
//! - **contrast** – population standard deviation of grayscale intensity.
//! - **sharpness** – variance of the 3×3 Laplacian response (focus proxy).
//! - **noise_level** – signed mean residual against a Gaussian-denoised copy.
//! - **dynamic_range** – 98th − 2nd intensity percentile over all channels.

use image::{imageops, GrayImage, RgbImage};

/// Mean of the luma channel, in [0, 255].
pub fn brightness(gray: &GrayImage) -> f64 {
    let n = gray.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = gray.as_raw().iter().map(|&v| v as u64).sum();
    sum as f64 / n as f64
}

/// Population standard deviation of grayscale intensity. Non-negative.
pub fn contrast(gray: &GrayImage) -> f64 {
    let n = gray.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for &v in gray.as_raw() {
        let v = v as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    var.sqrt()
}

/// Variance of the 3×3 Laplacian of the grayscale image. Non-negative;
/// ~0 for an edge-free (uniform or slowly varying) image.
pub fn sharpness(gray: &GrayImage) -> f64 {
    let response = laplacian(gray);
    let n = response.len();
    if n == 0 {
        return 0.0;
    }
    let mean: f64 = response.iter().sum::<f64>() / n as f64;
    let var: f64 = response.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n as f64;
    var
}

/// 3×3 Laplacian (0,1,0 / 1,−4,1 / 0,1,0) with reflect-101 borders.
fn laplacian(gray: &GrayImage) -> Vec<f64> {
    let (w, h) = gray.dimensions();
    let (w, h) = (w as i64, h as i64);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let px = |x: i64, y: i64| -> f64 {
        let x = reflect_101(x, w);
        let y = reflect_101(y, h);
        gray.get_pixel(x as u32, y as u32)[0] as f64
    };

    let mut out = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let v = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1)
                - 4.0 * px(x, y);
            out.push(v);
        }
    }
    out
}

/// Mirror an index around the edge pixels without repeating them.
fn reflect_101(i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * n - 2 - i;
    }
    i
}

/// Signed mean of the per-pixel residual between the image and a Gaussian
/// blur of it (`sigma`). Near zero for clean images; the sign carries the
/// direction of the residual and is part of the metric's contract.
pub fn noise_level(rgb: &RgbImage, sigma: f32) -> f64 {
    let n = rgb.as_raw().len();
    if n == 0 {
        return 0.0;
    }
    let denoised = imageops::blur(rgb, sigma);
    let sum: f64 = rgb
        .as_raw()
        .iter()
        .zip(denoised.as_raw())
        .map(|(&a, &b)| a as f64 - b as f64)
        .sum();
    sum / n as f64
}

/// Difference between the 98th and 2nd percentile of intensity across all
/// channels. In [0, 255] for 8-bit sources.
pub fn dynamic_range(rgb: &RgbImage) -> f64 {
    let mut hist = [0u64; 256];
    for &v in rgb.as_raw() {
        hist[v as usize] += 1;
    }
    let total: u64 = rgb.as_raw().len() as u64;
    if total == 0 {
        return 0.0;
    }
    percentile_u8(&hist, total, 98.0) - percentile_u8(&hist, total, 2.0)
}

/// Percentile of a histogram of 8-bit values, with linear interpolation
/// between adjacent order statistics.
fn percentile_u8(hist: &[u64; 256], total: u64, q: f64) -> f64 {
    let rank = q / 100.0 * (total - 1) as f64;
    let lo = rank.floor() as u64;
    let frac = rank - rank.floor();
    let v_lo = value_at(hist, lo);
    if frac == 0.0 {
        return v_lo as f64;
    }
    let v_hi = value_at(hist, lo + 1);
    v_lo as f64 + frac * (v_hi as f64 - v_lo as f64)
}

/// Value of the `idx`-th element (0-based) of the sorted sample described
/// by `hist`.
fn value_at(hist: &[u64; 256], idx: u64) -> u8 {
    let mut seen = 0u64;
    for (v, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > idx {
            return v as u8;
        }
    }
    255
}

// ── Tests ──────────────────────────────────────────────────────────────────
