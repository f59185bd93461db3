//! Application Configuration
//!
//! Scanner settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::{ConverterKind, NormalizedRegion};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Scanner settings
    pub scanner: ScannerConfig,
    /// Color conversion settings
    pub converter: ConverterConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// How the region of interest is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Crop the frame to the ROI before OCR
    #[default]
    Crop,
    /// Run OCR on the whole frame, then drop lines outside the ROI
    FilterFullFrame,
}

/// Scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// How the ROI is applied
    pub mode: ScanMode,
    /// Minimum OCR confidence for a line to be classified (0.0 - 1.0)
    pub min_confidence: f32,
    /// Region of interest in fractional coordinates of the upright frame
    pub roi: NormalizedRegion,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Crop,
            min_confidence: 0.0,
            roi: NormalizedRegion::default(),
        }
    }
}

/// Color conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Conversion strategy
    pub kind: ConverterKind,
    /// JPEG quality for the round-trip converter (1 - 100)
    pub jpeg_quality: u8,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            kind: ConverterKind::Direct,
            jpeg_quality: 100,
        }
    }
}

impl AppConfig {
    /// Reject settings the scanner cannot run with
    pub fn validate(&self) -> Result<()> {
        self.scanner
            .roi
            .validate()
            .context("Invalid scanner.roi")?;
        if !(0.0..=1.0).contains(&self.scanner.min_confidence) {
            anyhow::bail!(
                "scanner.min_confidence must be within [0, 1], got {}",
                self.scanner.min_confidence
            );
        }
        if !(1..=100).contains(&self.converter.jpeg_quality) {
            anyhow::bail!(
                "converter.jpeg_quality must be within [1, 100], got {}",
                self.converter.jpeg_quality
            );
        }
        Ok(())
    }
}

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "platescan", "PlateScan")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file, creating parent directories
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
