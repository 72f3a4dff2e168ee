//! Core data models for resolved citations.

mod citation;

pub use citation::{
    normalize_year, Candidate, CandidateBuilder, CitationRecord, ExtractionSource, FALLBACK_YEAR,
    UNKNOWN_AUTHOR,
};
