//! Last-resort metadata guessed from the first-page text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Candidate, CandidateBuilder, ExtractionSource, FALLBACK_YEAR, UNKNOWN_AUTHOR};
use crate::sources::Document;
use crate::utils::collapse_whitespace;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Title used when neither the text nor the file name offer one
const UNTITLED: &str = "Untitled";

/// The terminal step of every cascade; it cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextHeuristic;

impl TextHeuristic {
    /// Guess a title, year and author from whatever the document offers.
    ///
    /// Title is the first non-empty line of the text, else the file stem,
    /// else `"Untitled"`. Year is the first 19xx/20xx number in the text,
    /// else [`FALLBACK_YEAR`]. The author is always the sentinel.
    pub fn parse(document: &Document) -> Candidate {
        let text = document.text().unwrap_or("");

        let title = text
            .lines()
            .map(collapse_whitespace)
            .find(|line| !line.is_empty())
            .or_else(|| document.file_stem().map(str::to_string))
            .unwrap_or_else(|| UNTITLED.to_string());

        let year = YEAR_RE
            .find(text)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(FALLBACK_YEAR);

        CandidateBuilder::new(title, ExtractionSource::TextHeuristic)
            .authors(vec![UNKNOWN_AUTHOR.to_string()])
            .year(year)
            .build()
    }
}
