//! OCR (Optical Character Recognition) boundary
//!
//! The recognition engine is external; this module defines the contract the
//! scanner consumes plus two in-process engines for dry runs and tests.

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{CroppedImage, PixelRect};

/// Text recognizer consuming upright RGB rasters (orientation hint 0)
pub trait OcrEngine: Send {
    /// Engine identifier for logs
    fn name(&self) -> &str;

    /// Recognize text lines in an image
    fn recognize(&self, image: &CroppedImage) -> Result<Vec<RecognizedLine>>;
}

/// Single line of OCR output
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    /// Recognized text
    pub text: String,
    /// Bounding box in image pixels, when the engine reports layout
    pub bounds: Option<PixelRect>,
    /// Recognition confidence (0.0 - 1.0); engines without scores report 1.0
    pub confidence: f32,
}

impl RecognizedLine {
    /// Line without layout information
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounds: None,
            confidence: 1.0,
        }
    }

    /// Attach a bounding box
    pub fn with_bounds(mut self, bounds: PixelRect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Attach a confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Line from an engine reporting polygon outlines
    pub fn from_polygon(text: impl Into<String>, polygon: &[(f32, f32)], confidence: f32) -> Self {
        Self {
            text: text.into(),
            bounds: polygon_to_bounds(polygon),
            confidence,
        }
    }
}

/// Convert polygon points to a bounding box
fn polygon_to_bounds(polygon: &[(f32, f32)]) -> Option<PixelRect> {
    if polygon.is_empty() {
        return None;
    }

    let min_x = polygon.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let min_y = polygon.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_x = polygon.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let max_y = polygon.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

    // Clip to the image before measuring so the far edge stays put
    let x0 = min_x.max(0.0);
    let y0 = min_y.max(0.0);

    Some(PixelRect::new(
        x0 as u32,
        y0 as u32,
        (max_x - x0).max(0.0) as u32,
        (max_y - y0).max(0.0) as u32,
    ))
}

/// Keep only lines lying entirely inside `region`.
///
/// Lines without a bounding box cannot be placed and are kept.
pub fn filter_lines_in_region(lines: Vec<RecognizedLine>, region: &PixelRect) -> Vec<RecognizedLine> {
    lines
        .into_iter()
        .filter(|line| line.bounds.map_or(true, |bounds| region.contains(&bounds)))
        .collect()
}

/// Engine that never recognizes anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOcr;

impl OcrEngine for NullOcr {
    fn name(&self) -> &str {
        "null"
    }

    fn recognize(&self, _image: &CroppedImage) -> Result<Vec<RecognizedLine>> {
        Ok(vec![])
    }
}

/// Engine replaying canned results, one batch per call.
///
/// Once the queued batches run out, the fallback batch is returned for every
/// further image.
#[derive(Debug, Default)]
pub struct ScriptedOcr {
    queued: Mutex<VecDeque<Vec<RecognizedLine>>>,
    fallback: Vec<RecognizedLine>,
}

impl ScriptedOcr {
    /// Engine returning the same lines for every image
    pub fn repeating(lines: Vec<RecognizedLine>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: lines,
        }
    }

    /// Engine returning each batch once, then nothing
    pub fn sequence(batches: Vec<Vec<RecognizedLine>>) -> Self {
        Self {
            queued: Mutex::new(batches.into()),
            fallback: vec![],
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&self, _image: &CroppedImage) -> Result<Vec<RecognizedLine>> {
        Ok(self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank() -> CroppedImage {
        CroppedImage::new(RgbImage::new(4, 4))
    }

    #[test]
    fn test_polygon_to_bounds() {
        let polygon = [(10.0, 5.0), (40.0, 6.0), (41.0, 20.0), (9.5, 19.0)];
        let line = RecognizedLine::from_polygon("12A345BC", &polygon, 0.9);
        assert_eq!(line.bounds, Some(PixelRect::new(9, 5, 31, 15)));
        assert!((line.confidence - 0.9).abs() < f32::EPSILON);

        assert_eq!(RecognizedLine::from_polygon("x", &[], 1.0).bounds, None);
    }

    #[test]
    fn test_polygon_past_image_edge_keeps_far_edge() {
        let polygon = [(-10.0, -3.0), (5.0, -3.0), (5.0, 4.0), (-10.0, 4.0)];
        let line = RecognizedLine::from_polygon("12345ABC", &polygon, 1.0);
        let bounds = line.bounds.unwrap();
        assert_eq!(bounds, PixelRect::new(0, 0, 5, 4));
        assert_eq!(bounds.right(), 5);
        assert_eq!(bounds.bottom(), 4);

        let kept = filter_lines_in_region(vec![line], &PixelRect::new(0, 0, 10, 10));
        assert_eq!(kept.len(), 1);

        // Entirely outside the image collapses to an empty box at the edge
        let outside = RecognizedLine::from_polygon("x", &[(-8.0, 1.0), (-2.0, 3.0)], 1.0);
        assert_eq!(outside.bounds, Some(PixelRect::new(0, 1, 0, 2)));
    }

    #[test]
    fn test_filter_lines_in_region() {
        let region = PixelRect::new(10, 10, 100, 20);
        let lines = vec![
            RecognizedLine::new("inside").with_bounds(PixelRect::new(12, 12, 50, 10)),
            RecognizedLine::new("outside").with_bounds(PixelRect::new(0, 40, 50, 10)),
            RecognizedLine::new("straddling").with_bounds(PixelRect::new(90, 12, 40, 10)),
            RecognizedLine::new("unplaced"),
        ];

        let kept: Vec<_> = filter_lines_in_region(lines, &region)
            .into_iter()
            .map(|l| l.text)
            .collect();
        assert_eq!(kept, vec!["inside", "unplaced"]);
    }

    #[test]
    fn test_null_ocr_is_empty() {
        assert!(NullOcr.recognize(&blank()).unwrap().is_empty());
    }

    #[test]
    fn test_scripted_sequence_then_empty() {
        let ocr = ScriptedOcr::sequence(vec![
            vec![RecognizedLine::new("first")],
            vec![RecognizedLine::new("second")],
        ]);
        assert_eq!(ocr.recognize(&blank()).unwrap()[0].text, "first");
        assert_eq!(ocr.recognize(&blank()).unwrap()[0].text, "second");
        assert!(ocr.recognize(&blank()).unwrap().is_empty());
    }

    #[test]
    fn test_scripted_repeating() {
        let ocr = ScriptedOcr::repeating(vec![RecognizedLine::new("12345ABC")]);
        for _ in 0..3 {
            assert_eq!(ocr.recognize(&blank()).unwrap().len(), 1);
        }
    }
}
