//! The per-image record schema and typed column access.
//!
//! The table schema is fixed: the header is written once per store lifecycle
//! and every row carries exactly these columns in this order. A record is
//! identified by (`patient_id`, `filename`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical column header, in serialization order.
pub const HEADER: [&str; 19] = [
    "PatientID",
    "Filename",
    "Width",
    "Height",
    "Brightness",
    "Contrast",
    "Sharpness",
    "Noise Level",
    "Dynamic Range",
    "Dominant Color 1 Hex",
    "Dominant Color 2 Hex",
    "Dominant Color 3 Hex",
    "Texture Contrast",
    "Texture Dissimilarity",
    "Texture Homogeneity",
    "Texture ASM",
    "Texture Energy",
    "Mean Area",
    "Mean Eccentricity",
];

/// One row of the output table: the full metric vector for one image.
///
/// Undefined geometric properties (no foreground regions) are stored as NaN
/// and round-trip through the csv layer as the literal `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Grouping key: name of the image's immediate parent folder.
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    /// Base name of the source file, unique within a patient folder.
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Width")]
    pub width: u32,
    #[serde(rename = "Height")]
    pub height: u32,
    /// Mean luma in [0, 255].
    #[serde(rename = "Brightness")]
    pub brightness: f64,
    /// Population standard deviation of grayscale intensity.
    #[serde(rename = "Contrast")]
    pub contrast: f64,
    /// Variance of the Laplacian (focus proxy).
    #[serde(rename = "Sharpness")]
    pub sharpness: f64,
    /// Signed mean residual against a denoised copy.
    #[serde(rename = "Noise Level")]
    pub noise_level: f64,
    /// 98th − 2nd intensity percentile across all channels.
    #[serde(rename = "Dynamic Range")]
    pub dynamic_range: f64,
    #[serde(rename = "Dominant Color 1 Hex")]
    pub dominant_color_1_hex: String,
    #[serde(rename = "Dominant Color 2 Hex")]
    pub dominant_color_2_hex: String,
    #[serde(rename = "Dominant Color 3 Hex")]
    pub dominant_color_3_hex: String,
    #[serde(rename = "Texture Contrast")]
    pub texture_contrast: f64,
    #[serde(rename = "Texture Dissimilarity")]
    pub texture_dissimilarity: f64,
    #[serde(rename = "Texture Homogeneity")]
    pub texture_homogeneity: f64,
    #[serde(rename = "Texture ASM")]
    pub texture_asm: f64,
    #[serde(rename = "Texture Energy")]
    pub texture_energy: f64,
    /// Mean foreground region area; NaN when no regions were found.
    #[serde(rename = "Mean Area")]
    pub mean_area: f64,
    /// Mean foreground region eccentricity; NaN when no regions were found.
    #[serde(rename = "Mean Eccentricity")]
    pub mean_eccentricity: f64,
}

// ── Numeric column selection ───────────────────────────────────────────────

/// Numeric columns that statistics can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Width,
    Height,
    Brightness,
    Contrast,
    Sharpness,
    NoiseLevel,
    DynamicRange,
    TextureContrast,
    TextureDissimilarity,
    TextureHomogeneity,
    TextureAsm,
    TextureEnergy,
    MeanArea,
    MeanEccentricity,
}

impl Metric {
    /// Every numeric column, in schema order.
    pub const ALL: [Metric; 14] = [
        Metric::Width,
        Metric::Height,
        Metric::Brightness,
        Metric::Contrast,
        Metric::Sharpness,
        Metric::NoiseLevel,
        Metric::DynamicRange,
        Metric::TextureContrast,
        Metric::TextureDissimilarity,
        Metric::TextureHomogeneity,
        Metric::TextureAsm,
        Metric::TextureEnergy,
        Metric::MeanArea,
        Metric::MeanEccentricity,
    ];

    /// Column header name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Width => "Width",
            Metric::Height => "Height",
            Metric::Brightness => "Brightness",
            Metric::Contrast => "Contrast",
            Metric::Sharpness => "Sharpness",
            Metric::NoiseLevel => "Noise Level",
            Metric::DynamicRange => "Dynamic Range",
            Metric::TextureContrast => "Texture Contrast",
            Metric::TextureDissimilarity => "Texture Dissimilarity",
            Metric::TextureHomogeneity => "Texture Homogeneity",
            Metric::TextureAsm => "Texture ASM",
            Metric::TextureEnergy => "Texture Energy",
            Metric::MeanArea => "Mean Area",
            Metric::MeanEccentricity => "Mean Eccentricity",
        }
    }

    /// Value of this column in a record.
    pub fn value(self, record: &ImageRecord) -> f64 {
        match self {
            Metric::Width => record.width as f64,
            Metric::Height => record.height as f64,
            Metric::Brightness => record.brightness,
            Metric::Contrast => record.contrast,
            Metric::Sharpness => record.sharpness,
            Metric::NoiseLevel => record.noise_level,
            Metric::DynamicRange => record.dynamic_range,
            Metric::TextureContrast => record.texture_contrast,
            Metric::TextureDissimilarity => record.texture_dissimilarity,
            Metric::TextureHomogeneity => record.texture_homogeneity,
            Metric::TextureAsm => record.texture_asm,
            Metric::TextureEnergy => record.texture_energy,
            Metric::MeanArea => record.mean_area,
            Metric::MeanEccentricity => record.mean_eccentricity,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a metric name not present in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl fmt::Display for UnknownMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown metric column: {:?}", self.0)
    }
}

impl std::error::Error for UnknownMetric {}

impl FromStr for Metric {
    type Err = UnknownMetric;

    /// Case-insensitive match against column header names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownMetric(wanted.to_string()))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ImageRecord {
        ImageRecord {
            patient_id: "case_007".into(),
            filename: "img_01.jpg".into(),
            width: 640,
            height: 480,
            brightness: 120.5,
            contrast: 33.25,
            sharpness: 812.0,
            noise_level: -0.125,
            dynamic_range: 212.0,
            dominant_color_1_hex: "#a0522d".into(),
            dominant_color_2_hex: "#101010".into(),
            dominant_color_3_hex: "#f0e0d0".into(),
            texture_contrast: 45.5,
            texture_dissimilarity: 4.75,
            texture_homogeneity: 0.5,
            texture_asm: 0.0625,
            texture_energy: 0.25,
            mean_area: f64::NAN,
            mean_eccentricity: f64::NAN,
        }
    }

    #[test]
    fn test_serde_header_matches_schema() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(sample_record()).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header_line = data.lines().next().unwrap();
        assert_eq!(header_line, HEADER.join(","));
    }

    #[test]
    fn test_csv_roundtrip_with_nan() {
        let record = sample_record();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&record).unwrap();
        let data = writer.into_inner().unwrap();

        let mut reader = csv::Reader::from_reader(data.as_slice());
        let back: ImageRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(back.patient_id, record.patient_id);
        assert_eq!(back.filename, record.filename);
        assert_eq!(back.width, record.width);
        assert_eq!(back.brightness, record.brightness);
        assert_eq!(back.noise_level, record.noise_level);
        assert_eq!(back.dominant_color_3_hex, record.dominant_color_3_hex);
        assert!(back.mean_area.is_nan());
        assert!(back.mean_eccentricity.is_nan());
    }

    #[test]
    fn test_metric_name_roundtrip() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>().unwrap(), metric);
        }
        assert_eq!("noise level".parse::<Metric>().unwrap(), Metric::NoiseLevel);
        assert_eq!(" Brightness ".parse::<Metric>().unwrap(), Metric::Brightness);
        assert!("Bogus".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_value_access() {
        let record = sample_record();
        assert_eq!(Metric::Width.value(&record), 640.0);
        assert_eq!(Metric::NoiseLevel.value(&record), -0.125);
        assert!(Metric::MeanArea.value(&record).is_nan());
    }
}
