//! Frame Capture Layer
//!
//! Planar 4:2:0 frames as delivered by a camera pipeline, plus loading of
//! raw frame dumps from disk for offline scanning.

pub mod frame;

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use frame::{Nv21Frame, PlanarFrame, Plane};

/// Byte layout of a raw frame dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// Y plane, then U plane, then V plane
    #[default]
    I420,
    /// Y plane, then interleaved V/U pairs
    Nv21,
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I420 => f.write_str("i420"),
            Self::Nv21 => f.write_str("nv21"),
        }
    }
}

impl FromStr for RawFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i420" | "yuv420p" => Ok(Self::I420),
            "nv21" => Ok(Self::Nv21),
            other => Err(format!("unknown raw format '{other}' (expected i420 or nv21)")),
        }
    }
}

/// Load a raw frame dump of known dimensions
pub fn load_raw_frame(path: &Path, width: u32, height: u32, format: RawFormat) -> Result<PlanarFrame> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let frame = match format {
        RawFormat::I420 => PlanarFrame::from_i420(&data, width, height),
        RawFormat::Nv21 => PlanarFrame::from_nv21(&data, width, height),
    }
    .with_context(|| format!("{} is not a {width}x{height} {format} frame", path.display()))?;

    tracing::debug!(
        "Loaded {}x{} {} frame from {} ({} bytes)",
        width,
        height,
        format,
        path.display(),
        data.len()
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_raw_format_parsing() {
        assert_eq!("i420".parse::<RawFormat>().unwrap(), RawFormat::I420);
        assert_eq!("NV21".parse::<RawFormat>().unwrap(), RawFormat::Nv21);
        assert!("rgb".parse::<RawFormat>().is_err());
        assert_eq!(RawFormat::Nv21.to_string(), "nv21");
    }

    #[test]
    fn test_load_i420_frame() {
        // 4x2 frame: 8 luma bytes, 2 U bytes, 2 V bytes
        let mut bytes = vec![10u8; 8];
        bytes.extend([20, 21, 30, 31]);
        let file = write_temp(&bytes);

        let frame = load_raw_frame(file.path(), 4, 2, RawFormat::I420).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));

        let nv21 = frame.to_nv21().unwrap();
        assert_eq!(nv21.luma(3, 1), Some(10));
        assert_eq!(nv21.chroma(2, 0), Some((21, 31)));
    }

    #[test]
    fn test_load_nv21_frame() {
        let mut bytes = vec![50u8; 8];
        bytes.extend([30, 20, 31, 21]);
        let file = write_temp(&bytes);

        let frame = load_raw_frame(file.path(), 4, 2, RawFormat::Nv21).unwrap();
        let nv21 = frame.to_nv21().unwrap();
        assert_eq!(nv21.data(), &bytes[..]);
        assert_eq!(nv21.chroma(0, 0), Some((20, 30)));
    }

    #[test]
    fn test_load_short_file_fails() {
        let file = write_temp(&[0u8; 5]);
        let err = load_raw_frame(file.path(), 4, 2, RawFormat::I420).unwrap_err();
        assert!(format!("{err:#}").contains("4x2 i420"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_raw_frame(Path::new("/nonexistent/frame.yuv"), 4, 2, RawFormat::I420).is_err());
    }
}
