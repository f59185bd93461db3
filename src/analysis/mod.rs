//! Analysis Layer
//!
//! Classifies OCR output into plate formats and drives the per-frame
//! crop → recognize → classify pipeline.

pub mod plate;
pub mod scanner;

pub use plate::{ClassificationResult, PlateCategory, PlateClassifier};
pub use scanner::{PlateDetection, PlateScanner, ScanError};
