//! Planar-to-raster color conversion
//!
//! Converters turn a reassembled NV21 frame into an interleaved RGB8 raster.
//! [`DirectConverter`] converts with the `yuv` crate; [`JpegRoundTripConverter`]
//! additionally passes the result through a JPEG encode/decode, matching
//! pipelines that can only reach RGB via a compressed image.

use std::fmt;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;
use yuv::{
    yuv_nv21_to_rgb, YuvBiPlanarImage, YuvConversionMode, YuvError, YuvRange, YuvStandardMatrix,
};

use super::CropError;
use crate::capture::frame::{chroma_dimensions, Nv21Frame};

/// Turns a 4:2:0 frame into an RGB raster
pub trait PlanarToRasterConverter: Send + Sync {
    /// Short identifier used in logs and configuration
    fn name(&self) -> &'static str;

    /// Convert a full frame to an RGB8 raster of the same dimensions
    fn convert(&self, frame: &Nv21Frame) -> Result<RgbImage, CropError>;
}

/// Converter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterKind {
    /// Direct fixed-point YCbCr to RGB
    #[default]
    Direct,
    /// Direct conversion followed by a JPEG encode/decode pass
    JpegRoundTrip,
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::JpegRoundTrip => f.write_str("jpeg_round_trip"),
        }
    }
}

impl FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "jpeg" | "jpeg_round_trip" | "jpeg-round-trip" => Ok(Self::JpegRoundTrip),
            other => Err(format!("unknown converter '{other}' (expected direct or jpeg)")),
        }
    }
}

/// Direct BT.601 full-range YCbCr to RGB conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectConverter;

impl PlanarToRasterConverter for DirectConverter {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn convert(&self, frame: &Nv21Frame) -> Result<RgbImage, CropError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(CropError::MalformedFrame(format!(
                "NV21 frame has empty dimensions {width}x{height}"
            )));
        }

        let (cw, _) = chroma_dimensions(width, height);
        let vu_stride = u32::try_from(cw * 2)
            .map_err(|_| CropError::MalformedFrame("NV21 VU stride overflows u32".to_string()))?;
        let rgb_stride = width
            .checked_mul(3)
            .ok_or_else(|| CropError::MalformedFrame("RGB stride overflows u32".to_string()))?;
        let mut rgb = vec![0u8; rgb_stride as usize * height as usize];

        let bi_planar = YuvBiPlanarImage {
            y_plane: frame.y_plane(),
            y_stride: width,
            uv_plane: frame.vu_plane(),
            uv_stride: vu_stride,
            width,
            height,
        };
        yuv_nv21_to_rgb(
            &bi_planar,
            &mut rgb,
            rgb_stride,
            YuvRange::Full,
            YuvStandardMatrix::Bt601,
            YuvConversionMode::Balanced,
        )
        .map_err(map_yuv_error)?;

        RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            CropError::MalformedFrame(format!("raster buffer does not fit {width}x{height}"))
        })
    }
}

fn map_yuv_error(err: YuvError) -> CropError {
    CropError::MalformedFrame(format!("yuv conversion error: {err}"))
}

/// Direct conversion followed by a lossy JPEG encode/decode
#[derive(Debug, Clone, Copy)]
pub struct JpegRoundTripConverter {
    quality: u8,
}

impl Default for JpegRoundTripConverter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JpegRoundTripConverter {
    /// Create a converter encoding at `quality` (clamped to 1..=100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl PlanarToRasterConverter for JpegRoundTripConverter {
    fn name(&self) -> &'static str {
        "jpeg_round_trip"
    }

    fn convert(&self, frame: &Nv21Frame) -> Result<RgbImage, CropError> {
        let rgb = DirectConverter.convert(frame)?;

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality).write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;
        debug!(
            "JPEG round trip: {}x{} at quality {} -> {} bytes",
            rgb.width(),
            rgb.height(),
            self.quality,
            encoded.len()
        );

        Ok(image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)?.to_rgb8())
    }
}
