//! Identifier extraction from free text.
//!
//! These scans work on rendered page text and are a fallback: identifiers read
//! straight from the PDF binary (see [`crate::sources::EmbeddedIdentifierResolver`])
//! take precedence when they are available.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:doi:\s*)?(10\.\d{4,}/\S+)").unwrap());

static ARXIV_RES: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)arXiv:\s*(\d{4}\.\d{4,5})").unwrap(),
        Regex::new(r"(?i)arxiv\.org/abs/(\d{4}\.\d{4,5})").unwrap(),
    ]
});

static PUBMED_RES: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)PMID:\s*(\d{7,8})").unwrap(),
        Regex::new(r"(?i)pubmed\.ncbi\.nlm\.nih\.gov/(\d{7,8})").unwrap(),
    ]
});

/// Characters trimmed from the end of a DOI match.
const DOI_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':'];

/// Identifiers found in a block of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedIdentifiers {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pubmed_id: Option<String>,
}

impl ExtractedIdentifiers {
    pub fn is_empty(&self) -> bool {
        self.doi.is_none() && self.arxiv_id.is_none() && self.pubmed_id.is_none()
    }
}

/// Extract the first DOI from text.
///
/// An optional `doi:` prefix is dropped along with trailing sentence punctuation.
///
/// ```
/// use bibresolve::utils::extract_doi;
///
/// assert_eq!(
///     extract_doi("See doi: 10.1234/abcd.5678.").as_deref(),
///     Some("10.1234/abcd.5678")
/// );
/// ```
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(DOI_TRAILING_PUNCTUATION))
        .filter(|doi| doi.contains('/') && !doi.ends_with('/'))
        .map(str::to_string)
}

/// Extract the first new-style arXiv identifier (`YYMM.NNNNN`) from text.
///
/// Accepts both `arXiv:2301.12345` and `arxiv.org/abs/2301.12345`.
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    first_capture(&*ARXIV_RES, text)
}

/// Extract the first PubMed identifier from text.
pub fn extract_pubmed_id(text: &str) -> Option<String> {
    first_capture(&*PUBMED_RES, text)
}

/// Run every extractor over the text.
pub fn extract_identifiers(text: &str) -> ExtractedIdentifiers {
    ExtractedIdentifiers {
        doi: extract_doi(text),
        arxiv_id: extract_arxiv_id(text),
        pubmed_id: extract_pubmed_id(text),
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
