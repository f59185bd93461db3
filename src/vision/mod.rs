//! Vision Layer
//!
//! Turns planar camera frames into upright, cropped RGB rasters for OCR:
//! plane reassembly, color conversion, rotation and region-of-interest crop.
//! The OCR engine itself is an external collaborator behind [`OcrEngine`].

pub mod convert;
pub mod ocr;

use std::fmt;
use std::str::FromStr;

use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capture::frame::PlanarFrame;
use crate::config::ConverterConfig;

pub use convert::{ConverterKind, DirectConverter, JpegRoundTripConverter, PlanarToRasterConverter};
pub use ocr::{filter_lines_in_region, NullOcr, OcrEngine, RecognizedLine, ScriptedOcr};

/// Errors produced while turning a frame into a cropped raster
#[derive(Debug, Error)]
pub enum CropError {
    /// The region is degenerate, out of range, or maps outside the raster
    #[error("invalid region: {0}")]
    InvalidRegion(String),
    /// Plane sizes or strides do not match the declared frame dimensions
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// Rotation is not a multiple of 90 degrees
    #[error("unsupported rotation: {0} degrees")]
    UnsupportedRotation(i32),
    /// The raster codec failed during conversion
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Rectangle in fractional coordinates of the rotated image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for NormalizedRegion {
    /// Horizontal scanning band across the lower middle of the preview
    fn default() -> Self {
        Self {
            left: 0.05,
            top: 0.5,
            right: 0.95,
            bottom: 0.6,
        }
    }
}

impl NormalizedRegion {
    /// The whole image
    pub const FULL: Self = Self {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Create a validated region
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self, CropError> {
        let region = Self {
            left,
            top,
            right,
            bottom,
        };
        region.validate()?;
        Ok(region)
    }

    /// Fractional width
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Fractional height
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Reject non-finite, out-of-range and degenerate regions
    pub fn validate(&self) -> Result<(), CropError> {
        let edges = [self.left, self.top, self.right, self.bottom];
        if edges.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)) {
            return Err(CropError::InvalidRegion(format!(
                "{self} has edges outside [0, 1]"
            )));
        }
        if self.left >= self.right || self.top >= self.bottom {
            return Err(CropError::InvalidRegion(format!("{self} is degenerate")));
        }
        Ok(())
    }

    /// Map to integer pixel bounds of a `width` x `height` raster.
    ///
    /// Origin and extent are each truncated toward zero.
    pub fn to_pixels(&self, width: u32, height: u32) -> Result<PixelRect, CropError> {
        self.validate()?;

        let rect = PixelRect {
            x: (self.left * width as f32) as u32,
            y: (self.top * height as f32) as u32,
            width: (self.width() * width as f32) as u32,
            height: (self.height() * height as f32) as u32,
        };

        if rect.width == 0 || rect.height == 0 {
            return Err(CropError::InvalidRegion(format!(
                "{self} maps to an empty {}x{} crop of a {width}x{height} raster",
                rect.width, rect.height
            )));
        }
        if rect.right() > width as u64 || rect.bottom() > height as u64 {
            return Err(CropError::InvalidRegion(format!(
                "{self} maps to {rect:?}, outside a {width}x{height} raster"
            )));
        }
        Ok(rect)
    }
}

impl fmt::Display for NormalizedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

impl FromStr for NormalizedRegion {
    type Err = CropError;

    /// Parse `left,top,right,bottom`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CropError::InvalidRegion(format!("'{s}': {e}")))?;
        match values[..] {
            [left, top, right, bottom] => Self::new(left, top, right, bottom),
            _ => Err(CropError::InvalidRegion(format!(
                "'{s}': expected four comma-separated values"
            ))),
        }
    }
}

/// Integer pixel rectangle (x, y, width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Clockwise quarter-turn rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize an angle modulo 360; only quarter turns are accepted
    pub fn from_degrees(degrees: i32) -> Result<Self, CropError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(CropError::UnsupportedRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether width and height trade places
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Rotate a raster about its own frame
    pub fn apply(self, raster: RgbImage) -> RgbImage {
        match self {
            Self::Deg0 => raster,
            Self::Deg90 => imageops::rotate90(&raster),
            Self::Deg180 => imageops::rotate180(&raster),
            Self::Deg270 => imageops::rotate270(&raster),
        }
    }
}

/// Upright, cropped RGB8 raster handed to the OCR engine
#[derive(Debug, Clone)]
pub struct CroppedImage {
    image: RgbImage,
}

impl CroppedImage {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Interleaved RGB8 pixel buffer
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Orientation hint for the OCR engine; the raster is already upright
    pub fn orientation_hint(&self) -> i32 {
        0
    }
}

/// Converts planar camera frames into cropped RGB rasters
pub struct FrameCropper {
    converter: Box<dyn PlanarToRasterConverter>,
}

impl Default for FrameCropper {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCropper {
    /// Create a cropper using direct YUV to RGB conversion
    pub fn new() -> Self {
        Self::with_converter(DirectConverter)
    }

    /// Create a cropper with a specific color converter
    pub fn with_converter(converter: impl PlanarToRasterConverter + 'static) -> Self {
        Self {
            converter: Box::new(converter),
        }
    }

    /// Create a cropper from configuration
    pub fn from_config(config: &ConverterConfig) -> Self {
        match config.kind {
            ConverterKind::Direct => Self::with_converter(DirectConverter),
            ConverterKind::JpegRoundTrip => {
                Self::with_converter(JpegRoundTripConverter::new(config.jpeg_quality))
            }
        }
    }

    /// Name of the active converter
    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    /// Crop a frame using its own reported rotation
    pub fn crop_frame(
        &self,
        frame: &PlanarFrame,
        roi: &NormalizedRegion,
    ) -> Result<CroppedImage, CropError> {
        self.crop(frame, frame.rotation_degrees, roi)
    }

    /// Convert, rotate and crop a frame to the region of interest
    pub fn crop(
        &self,
        frame: &PlanarFrame,
        rotation_degrees: i32,
        roi: &NormalizedRegion,
    ) -> Result<CroppedImage, CropError> {
        roi.validate()?;

        let rotated = self.rotated_raster(frame, rotation_degrees)?;
        let rect = roi.to_pixels(rotated.width(), rotated.height())?;
        let cropped =
            imageops::crop_imm(&rotated, rect.x, rect.y, rect.width, rect.height).to_image();

        debug!(
            "Cropped {}x{} frame (rotation {}) to {}x{} at ({}, {})",
            frame.width,
            frame.height,
            rotation_degrees,
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );

        Ok(CroppedImage::new(cropped))
    }

    /// Reassemble, color-convert and rotate a frame without cropping
    pub fn rotated_raster(
        &self,
        frame: &PlanarFrame,
        rotation_degrees: i32,
    ) -> Result<RgbImage, CropError> {
        let rotation = Rotation::from_degrees(rotation_degrees)?;
        let nv21 = frame.to_nv21()?;
        let raster = self.converter.convert(&nv21)?;
        Ok(rotation.apply(raster))
    }
}

/// Outline the region of interest on a rotated raster
pub fn annotate_region(raster: &mut RgbImage, roi: &NormalizedRegion) -> Result<(), CropError> {
    let rect = roi.to_pixels(raster.width(), raster.height())?;
    let color = Rgb([255, 0, 0]);

    // Two-pixel outline, shrinking inward so it stays inside the crop
    for inset in 0..2u32 {
        if rect.width <= inset * 2 || rect.height <= inset * 2 {
            break;
        }
        let outline = Rect::at((rect.x + inset) as i32, (rect.y + inset) as i32)
            .of_size(rect.width - inset * 2, rect.height - inset * 2);
        draw_hollow_rect_mut(raster, outline, color);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::test_frames::{gradient, solid};

    const ROTATIONS: [i32; 4] = [0, 90, 180, 270];

    #[test]
    fn test_full_roi_keeps_rotated_dimensions() {
        let cropper = FrameCropper::new();
        let frame = solid(12, 8, 100, 128, 128);

        for rotation in ROTATIONS {
            let image = cropper.crop(&frame, rotation, &NormalizedRegion::FULL).unwrap();
            let expected = if rotation % 180 == 0 { (12, 8) } else { (8, 12) };
            assert_eq!((image.width(), image.height()), expected, "rotation {rotation}");
        }
    }

    #[test]
    fn test_full_roi_equals_rotated_raster() {
        let cropper = FrameCropper::new();
        let frame = gradient(6, 4);

        for rotation in ROTATIONS {
            let raster = cropper.rotated_raster(&frame, rotation).unwrap();
            let image = cropper.crop(&frame, rotation, &NormalizedRegion::FULL).unwrap();
            assert_eq!(image.image(), &raster);
        }
    }

    #[test]
    fn test_quarter_turns_swap_dimensions() {
        let cropper = FrameCropper::new();
        let frame = solid(10, 4, 50, 128, 128);

        assert_eq!(cropper.rotated_raster(&frame, 90).unwrap().dimensions(), (4, 10));
        assert_eq!(cropper.rotated_raster(&frame, 270).unwrap().dimensions(), (4, 10));
        assert_eq!(cropper.rotated_raster(&frame, 180).unwrap().dimensions(), (10, 4));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        let cropper = FrameCropper::new();
        let frame = gradient(4, 2);
        let top_left = cropper.rotated_raster(&frame, 0).unwrap().get_pixel(0, 0).0;

        let rotated = cropper.rotated_raster(&frame, 90).unwrap();
        // 4x2 becomes 2x4; the old top-left lands on the top-right
        assert_eq!(rotated.get_pixel(1, 0).0, top_left);

        let flipped = cropper.rotated_raster(&frame, 180).unwrap();
        assert_eq!(flipped.get_pixel(3, 1).0, top_left);
    }

    #[test]
    fn test_negative_and_wrapped_rotation() {
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
        assert!(matches!(
            Rotation::from_degrees(45),
            Err(CropError::UnsupportedRotation(45))
        ));
    }

    #[test]
    fn test_crop_uses_rotated_dimensions() {
        let cropper = FrameCropper::new();
        let frame = solid(20, 10, 80, 128, 128);
        let roi = NormalizedRegion::new(0.0, 0.5, 0.5, 1.0).unwrap();

        // After 90 degrees the raster is 10x20
        let image = cropper.crop(&frame, 90, &roi).unwrap();
        assert_eq!((image.width(), image.height()), (5, 10));
    }

    #[test]
    fn test_crop_extracts_expected_pixels() {
        let cropper = FrameCropper::new();
        let frame = gradient(8, 4);
        let raster = cropper.rotated_raster(&frame, 0).unwrap();
        let roi = NormalizedRegion::new(0.25, 0.5, 0.75, 1.0).unwrap();

        let image = cropper.crop(&frame, 0, &roi).unwrap();
        assert_eq!((image.width(), image.height()), (4, 2));
        assert_eq!(image.image().get_pixel(0, 0), raster.get_pixel(2, 2));
        assert_eq!(image.image().get_pixel(3, 1), raster.get_pixel(5, 3));
    }

    #[test]
    fn test_pixel_mapping_truncates() {
        let roi = NormalizedRegion::new(0.3, 0.1, 0.95, 0.6).unwrap();
        let rect = roi.to_pixels(10, 10).unwrap();
        assert_eq!(rect.x, 3);
        assert_eq!(rect.y, 1);
        assert_eq!(rect.width, 6);
        assert_eq!(rect.height, 5);
    }

    #[test]
    fn test_degenerate_region_is_rejected() {
        let cropper = FrameCropper::new();
        let frame = solid(8, 8, 0, 128, 128);

        let inverted_x = NormalizedRegion {
            left: 0.6,
            top: 0.0,
            right: 0.4,
            bottom: 1.0,
        };
        let flat_y = NormalizedRegion {
            left: 0.0,
            top: 0.5,
            right: 1.0,
            bottom: 0.5,
        };
        for roi in [inverted_x, flat_y] {
            assert!(matches!(
                cropper.crop(&frame, 0, &roi),
                Err(CropError::InvalidRegion(_))
            ));
        }
    }

    #[test]
    fn test_out_of_range_region_is_rejected() {
        assert!(NormalizedRegion::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(NormalizedRegion::new(0.0, 0.0, 1.2, 0.5).is_err());
        assert!(NormalizedRegion::new(0.0, f32::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_region_too_small_for_raster() {
        let roi = NormalizedRegion::new(0.0, 0.0, 0.1, 0.1).unwrap();
        assert!(matches!(roi.to_pixels(4, 4), Err(CropError::InvalidRegion(_))));
    }

    #[test]
    fn test_malformed_frame_is_reported() {
        let cropper = FrameCropper::new();
        let mut frame = solid(8, 8, 0, 128, 128);
        frame.u.data.truncate(3);

        assert!(matches!(
            cropper.crop(&frame, 0, &NormalizedRegion::FULL),
            Err(CropError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_crop_frame_uses_frame_rotation() {
        let cropper = FrameCropper::new();
        let frame = solid(6, 2, 0, 128, 128).with_rotation(90);
        let image = cropper.crop_frame(&frame, &NormalizedRegion::FULL).unwrap();
        assert_eq!((image.width(), image.height()), (2, 6));
        assert_eq!(image.orientation_hint(), 0);
    }

    #[test]
    fn test_region_from_str() {
        let roi: NormalizedRegion = "0.05, 0.5, 0.95, 0.6".parse().unwrap();
        assert_eq!(roi, NormalizedRegion::default());
        assert!("0.1,0.2,0.3".parse::<NormalizedRegion>().is_err());
        assert!("a,b,c,d".parse::<NormalizedRegion>().is_err());
    }

    #[test]
    fn test_pixel_rect_contains() {
        let outer = PixelRect::new(10, 10, 20, 20);
        assert!(outer.contains(&PixelRect::new(10, 10, 20, 20)));
        assert!(outer.contains(&PixelRect::new(15, 12, 5, 5)));
        assert!(!outer.contains(&PixelRect::new(5, 12, 10, 5)));
        assert!(!outer.contains(&PixelRect::new(25, 25, 10, 10)));
    }

    #[test]
    fn test_annotate_region_draws_outline() {
        let mut raster = RgbImage::new(20, 10);
        let roi = NormalizedRegion::new(0.25, 0.2, 0.75, 0.8).unwrap();
        annotate_region(&mut raster, &roi).unwrap();

        assert_eq!(raster.get_pixel(5, 2).0, [255, 0, 0]);
        assert_eq!(raster.get_pixel(10, 5).0, [0, 0, 0]);
        assert_eq!(raster.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_from_config_selects_converter() {
        let mut config = ConverterConfig::default();
        assert_eq!(FrameCropper::from_config(&config).converter_name(), "direct");

        config.kind = ConverterKind::JpegRoundTrip;
        assert_eq!(FrameCropper::from_config(&config).converter_name(), "jpeg_round_trip");
    }
}
