//! PlateScan - License-plate text scanning for camera frames
//!
//! Turns planar YUV 4:2:0 camera frames into upright RGB crops of a
//! region of interest, hands them to an OCR engine and classifies the
//! recognized lines against known plate formats.

pub mod analysis;
pub mod analyzer;
pub mod capture;
pub mod config;
pub mod vision;

pub use analysis::{ClassificationResult, PlateCategory, PlateClassifier, PlateDetection, PlateScanner, ScanError};
pub use analyzer::{AnalyzerStats, FrameAnalyzer};
pub use capture::{PlanarFrame, Plane};
pub use config::AppConfig;
pub use vision::{CropError, CroppedImage, FrameCropper, NormalizedRegion, OcrEngine, RecognizedLine};
