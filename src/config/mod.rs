//! Scanner Configuration
//!
//! Tunable pipeline parameters stored in TOML format. Every section falls back
//! to its defaults when omitted from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete pipeline settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Grayscale and blur settings
    pub preprocess: PreprocessConfig,
    /// Edge detector thresholds
    pub edges: EdgeConfig,
    /// Contour retention filters
    pub contours: ContourConfig,
    /// Polygon approximation and corner refinement
    pub detection: DetectionConfig,
    /// Candidate scoring weights and limits
    pub scoring: ScoringConfig,
    /// Rectified output settings
    pub rectify: RectifyConfig,
    /// Title crop and OCR post-processing
    pub title: TitleConfig,
}

/// Grayscale + Gaussian blur settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Gaussian sigma; zero or negative disables the blur
    pub blur_sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { blur_sigma: 1.0 }
    }
}

/// Hysteresis thresholds on the Sobel gradient magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Weak edge threshold
    pub low_threshold: f32,
    /// Strong edge threshold
    pub high_threshold: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: 30.0,
            high_threshold: 80.0,
        }
    }
}

/// Filters applied to flood-filled contours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Absolute minimum number of pixels
    pub min_points: usize,
    /// Minimum pixel count as a fraction of the image area
    pub min_area_fraction: f32,
    /// Minimum bounding-box extent as a fraction of each image dimension
    pub min_extent_fraction: f32,
    /// Minimum bounding-box aspect ratio (width / height)
    pub min_aspect: f32,
    /// Maximum bounding-box aspect ratio (width / height)
    pub max_aspect: f32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_points: 100,
            min_area_fraction: 0.001,
            min_extent_fraction: 0.1,
            min_aspect: 0.5,
            max_aspect: 2.0,
        }
    }
}

/// Polygon approximation sweep and corner refinement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Douglas-Peucker epsilons as fractions of the contour perimeter, tried in order
    pub epsilon_fractions: Vec<f32>,
    /// Smallest vertex count handed to the scorer
    pub min_vertices: usize,
    /// Largest vertex count handed to the scorer
    pub max_vertices: usize,
    /// Re-fit each side to the edge pixels after a candidate is chosen
    pub refine_corners: bool,
    /// Maximum corner displacement during refinement, as a fraction of the diagonal
    pub max_refine_shift: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            epsilon_fractions: vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.06, 0.07, 0.08],
            min_vertices: 4,
            max_vertices: 12,
            refine_corners: true,
            max_refine_shift: 0.05,
        }
    }
}

/// Rectangularity scorer weights and acceptance limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub size_weight: f32,
    pub convexity_weight: f32,
    pub quad_weight: f32,
    pub aspect_weight: f32,
    pub fill_weight: f32,
    /// Bounding-box area fraction below which a polygon scores zero
    pub min_size_fraction: f32,
    /// Polygon area fraction a candidate must exceed to be accepted
    pub min_area_fraction: f32,
    /// Expected card aspect ratio (width / height)
    pub target_aspect: f32,
    /// Accepted bounding-box aspect range
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            size_weight: 0.25,
            convexity_weight: 0.30,
            quad_weight: 0.20,
            aspect_weight: 0.15,
            fill_weight: 0.10,
            min_size_fraction: 0.02,
            min_area_fraction: 0.03,
            target_aspect: 0.716,
            min_aspect: 0.3,
            max_aspect: 3.0,
        }
    }
}

/// Mapping used to rectify the card quadrilateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectifyMode {
    /// Bilinear blend of the four corners
    #[default]
    Bilinear,
    /// Exact projective mapping solved from the four corners
    Homography,
}

/// Rectified output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub mode: RectifyMode,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            mode: RectifyMode::Bilinear,
            width: 800,
            height: 1118,
        }
    }
}

/// Title crop and OCR text acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    /// Fraction of the rectified height kept as the title band
    pub crop_fraction: f32,
    /// OCR confidence (0-100) below which text is discarded
    pub min_confidence: f32,
    /// Number of leading OCR lines searched for the title
    pub max_lines: usize,
    /// Accepted title length in characters
    pub min_length: usize,
    pub max_length: usize,
    /// Read the centred guide box when no card is detected
    pub guide_box_fallback: bool,
    /// Guide box width as a fraction of the frame width
    pub guide_box_width: f32,
    /// Guide box height as a fraction of the frame height
    pub guide_box_height: f32,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            crop_fraction: 0.12,
            min_confidence: 30.0,
            max_lines: 5,
            min_length: 3,
            max_length: 50,
            guide_box_fallback: false,
            guide_box_width: 0.6,
            guide_box_height: 0.3,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<ScannerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: ScannerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &ScannerConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cardscanner", "CardScanner")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of the configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
