//! Per-frame plate scanning
//!
//! Crops each frame to the region of interest, runs OCR on the result and
//! classifies every recognized line. Only positive matches leave the scanner.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use super::plate::{PlateCategory, PlateClassifier};
use crate::capture::frame::PlanarFrame;
use crate::config::{ScanMode, ScannerConfig};
use crate::vision::{filter_lines_in_region, CropError, FrameCropper, NormalizedRegion, OcrEngine};

/// Errors that abort scanning of a single frame
#[derive(Debug, Error)]
pub enum ScanError {
    /// The frame could not be turned into an OCR raster
    #[error(transparent)]
    Crop(#[from] CropError),
    /// The OCR engine failed
    #[error(transparent)]
    Ocr(#[from] anyhow::Error),
}

/// A plate found in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct PlateDetection {
    /// Sequence number of the frame within this scanner (1-based)
    pub frame_index: u64,
    /// Matched plate format
    pub category: PlateCategory,
    /// Normalized plate text
    pub text: String,
    /// OCR confidence of the line
    pub confidence: f32,
    /// Time spent on the frame
    pub elapsed: Duration,
}

/// Frame to plate pipeline
pub struct PlateScanner {
    cropper: FrameCropper,
    ocr: Box<dyn OcrEngine>,
    classifier: PlateClassifier,
    config: ScannerConfig,
    frames_scanned: u64,
}

impl PlateScanner {
    /// Create a scanner with a direct-conversion cropper
    pub fn new(ocr: impl OcrEngine + 'static, config: ScannerConfig) -> Self {
        Self::with_cropper(FrameCropper::new(), ocr, config)
    }

    /// Create a scanner with a specific cropper
    pub fn with_cropper(
        cropper: FrameCropper,
        ocr: impl OcrEngine + 'static,
        config: ScannerConfig,
    ) -> Self {
        info!(
            "Plate scanner using {} conversion and '{}' OCR, ROI {}",
            cropper.converter_name(),
            ocr.name(),
            config.roi
        );
        Self {
            cropper,
            ocr: Box::new(ocr),
            classifier: PlateClassifier::new(),
            config,
            frames_scanned: 0,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Number of frames handed to [`scan`](Self::scan) so far
    pub fn frames_scanned(&self) -> u64 {
        self.frames_scanned
    }

    /// Scan one frame and return every positive plate match
    pub fn scan(&mut self, frame: &PlanarFrame) -> Result<Vec<PlateDetection>, ScanError> {
        let start = Instant::now();
        self.frames_scanned += 1;
        let frame_index = self.frames_scanned;

        let (image, text_region) = match self.config.mode {
            ScanMode::Crop => (self.cropper.crop_frame(frame, &self.config.roi)?, None),
            ScanMode::FilterFullFrame => {
                let image = self.cropper.crop_frame(frame, &NormalizedRegion::FULL)?;
                let region = self.config.roi.to_pixels(image.width(), image.height())?;
                (image, Some(region))
            }
        };

        let mut lines = self.ocr.recognize(&image)?;
        let recognized = lines.len();
        if let Some(region) = text_region {
            lines = filter_lines_in_region(lines, &region);
        }

        let detections: Vec<PlateDetection> = lines
            .into_iter()
            .filter(|line| line.confidence >= self.config.min_confidence)
            .filter_map(|line| {
                let result = self.classifier.detect(&line.text)?;
                let (category, text) = result.into_parts();
                Some(PlateDetection {
                    frame_index,
                    category,
                    text,
                    confidence: line.confidence,
                    elapsed: start.elapsed(),
                })
            })
            .collect();

        for detection in &detections {
            debug!(
                "Frame {}: {} plate {}",
                frame_index, detection.category, detection.text
            );
        }
        debug!(
            "Frame {} scanned in {:?}: {} lines, {} plates",
            frame_index,
            start.elapsed(),
            recognized,
            detections.len()
        );

        Ok(detections)
    }

    /// Scan one frame and hand each detection to `on_detection`.
    ///
    /// Returns the number of detections.
    pub fn scan_with<F>(&mut self, frame: &PlanarFrame, mut on_detection: F) -> Result<usize, ScanError>
    where
        F: FnMut(&PlateDetection),
    {
        let detections = self.scan(frame)?;
        detections.iter().for_each(&mut on_detection);
        Ok(detections.len())
    }
}
