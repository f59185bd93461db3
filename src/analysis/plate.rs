//! License-plate text classification
//!
//! Matches a recognized text line against fixed positional plate grammars.
//! OCR often reads plate frame dividers as `|`, so those are stripped along
//! with spaces before matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Plate length shared by every known format
const PLATE_LEN: usize = 8;

/// Plate format taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateCategory {
    /// `DD L DDD LL`
    Physical,
    /// `DD DDD LLL`
    Legal,
    /// Foreign-registered plates; no format rule yet
    Foreigner,
    /// Rejection state, never reported as a match
    Unknown,
}

impl PlateCategory {
    /// Whether this category is a positive match
    pub fn is_match(self) -> bool {
        self != Self::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Legal => "legal",
            Self::Foreigner => "foreigner",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PlateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category and normalized text of one classified line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassificationResult {
    category: PlateCategory,
    text: String,
}

impl ClassificationResult {
    pub fn category(&self) -> PlateCategory {
        self.category
    }

    /// Text after stripping spaces and vertical bars
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_match(&self) -> bool {
        self.category.is_match()
    }

    pub fn into_parts(self) -> (PlateCategory, String) {
        (self.category, self.text)
    }
}

type Rule = fn(&[char]) -> bool;

/// Format rules in priority order; first match wins
const RULES: [(PlateCategory, Rule); 3] = [
    (PlateCategory::Physical, is_physical),
    (PlateCategory::Legal, is_legal),
    (PlateCategory::Foreigner, is_foreigner),
];

/// Rule-based plate classifier
#[derive(Debug, Default, Clone, Copy)]
pub struct PlateClassifier;

impl PlateClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Remove spaces and vertical bars
    pub fn normalize(text: &str) -> String {
        text.chars().filter(|c| !matches!(c, ' ' | '|')).collect()
    }

    /// Classify a line; unmatched text yields [`PlateCategory::Unknown`]
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text = Self::normalize(text);
        let chars: Vec<char> = text.chars().collect();

        let category = RULES
            .iter()
            .find(|(_, rule)| rule(&chars))
            .map_or(PlateCategory::Unknown, |(category, _)| *category);

        ClassificationResult { category, text }
    }

    /// Classify a line, keeping only positive matches
    pub fn detect(&self, text: &str) -> Option<ClassificationResult> {
        Some(self.classify(text)).filter(ClassificationResult::is_match)
    }

    /// Classify a line and invoke `on_match` only for a positive match.
    ///
    /// Returns whether the callback fired.
    pub fn detect_with<F>(&self, text: &str, on_match: F) -> bool
    where
        F: FnOnce(PlateCategory, &str),
    {
        match self.detect(text) {
            Some(result) => {
                on_match(result.category, &result.text);
                true
            }
            None => false,
        }
    }
}

fn is_physical(text: &[char]) -> bool {
    text.len() == PLATE_LEN
        && all_digits(text, 0..2)
        && all_uppercase(text, 2..3)
        && all_digits(text, 3..6)
        && all_uppercase(text, 6..8)
}

fn is_legal(text: &[char]) -> bool {
    text.len() == PLATE_LEN
        && all_digits(text, 0..2)
        && all_digits(text, 2..5)
        && all_uppercase(text, 5..8)
}

// Extension point: no foreign plate format is recognized yet.
fn is_foreigner(_text: &[char]) -> bool {
    false
}

fn all_digits(text: &[char], range: Range<usize>) -> bool {
    segment_all(text, range, |c| c.is_ascii_digit())
}

fn all_uppercase(text: &[char], range: Range<usize>) -> bool {
    segment_all(text, range, |c| c.is_uppercase())
}

fn segment_all(text: &[char], range: Range<usize>, predicate: impl Fn(&char) -> bool) -> bool {
    text.get(range)
        .is_some_and(|segment| !segment.is_empty() && segment.iter().all(predicate))
}
