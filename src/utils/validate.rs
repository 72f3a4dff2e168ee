//! Validation and normalization of identifiers and output file names.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static ARXIV_NEW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\.\d{4,5}$").unwrap());
static ARXIV_OLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z\-]+(\.[a-z]{2})?/\d{7}$").unwrap());
static ARXIV_VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"v\d+$").unwrap());

/// Validation error types
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid DOI format: {0}")]
    InvalidDoi(String),

    #[error("Invalid arXiv identifier: {0}")]
    InvalidArxivId(String),

    #[error("Invalid filename: contains disallowed characters")]
    InvalidFilename,

    #[error("Path traversal detected: {0}")]
    PathTraversal(String),
}

/// Normalize and validate a DOI.
///
/// Strips `doi:` and resolver URL prefixes and lowercases the result.
pub fn validate_doi(doi: &str) -> Result<String, ValidationError> {
    let doi = doi.trim().to_lowercase();

    if doi.is_empty() {
        return Err(ValidationError::InvalidDoi("empty DOI".to_string()));
    }

    let doi = doi.strip_prefix("doi:").unwrap_or(&doi).trim_start();
    let doi = doi.strip_prefix("https://doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("http://doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("https://dx.doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("http://dx.doi.org/").unwrap_or(doi);

    if !doi.starts_with("10.") {
        return Err(ValidationError::InvalidDoi(
            "DOI must start with '10.'".to_string(),
        ));
    }

    if !doi.contains('/') {
        return Err(ValidationError::InvalidDoi(
            "DOI must contain a slash".to_string(),
        ));
    }

    if doi.contains("..") || doi.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidDoi(doi.to_string()));
    }

    Ok(doi.to_string())
}

/// Normalize and validate an arXiv identifier, dropping any version suffix.
///
/// Handles formats like:
/// - "2301.12345"
/// - "2301.12345v1"
/// - "arXiv:2301.12345"
/// - "https://arxiv.org/abs/2301.12345v1"
/// - "hep-th/9901001"
pub fn validate_arxiv_id(id: &str) -> Result<String, ValidationError> {
    let id = id.trim().to_lowercase();

    let id = match id.find("/abs/") {
        Some(pos) => &id[pos + 5..],
        None => id.strip_prefix("arxiv:").unwrap_or(&id).trim_start(),
    };
    let id = ARXIV_VERSION_RE.replace(id, "");

    if ARXIV_NEW_RE.is_match(&id) || ARXIV_OLD_RE.is_match(&id) {
        Ok(id.into_owned())
    } else {
        Err(ValidationError::InvalidArxivId(id.into_owned()))
    }
}

/// Sanitize a filename for safe filesystem operations
///
/// Removes path separators and dangerous characters, limits length,
/// and ensures the filename is safe to use.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let filename = filename.trim();

    if filename.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    if filename.contains("..")
        || filename.starts_with('/')
        || filename.starts_with('\\')
        || filename.contains(":/")
        || filename.contains(":\\")
    {
        return Err(ValidationError::PathTraversal(filename.to_string()));
    }

    // Keep only safe characters: alphanumeric, dash, underscore, dot, space
    let mut sanitized: String = filename
        .chars()
        .filter(|&ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | ' '))
        .collect();

    const MAX_FILENAME_LENGTH: usize = 255;
    if sanitized.len() > MAX_FILENAME_LENGTH {
        let mut cut = MAX_FILENAME_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
    }

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == ' ').to_string();
    if sanitized.is_empty() {
        return Err(ValidationError::InvalidFilename);
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_doi_valid() {
        assert!(validate_doi("10.1234/abc123").is_ok());
        assert_eq!(
            validate_doi("doi: 10.1234/ABC123").unwrap(),
            "10.1234/abc123"
        );
        assert_eq!(
            validate_doi("https://doi.org/10.1234/abc123").unwrap(),
            "10.1234/abc123"
        );
    }

    #[test]
    fn test_validate_doi_invalid() {
        assert!(validate_doi("").is_err());
        assert!(validate_doi("10.1234").is_err());
        assert!(validate_doi("9.1234/abc").is_err());
        assert!(validate_doi("10.1234/../abc").is_err());
    }

    #[test]
    fn test_validate_arxiv_id() {
        assert_eq!(validate_arxiv_id("2301.12345").unwrap(), "2301.12345");
        assert_eq!(validate_arxiv_id("arXiv:2301.12345v3").unwrap(), "2301.12345");
        assert_eq!(
            validate_arxiv_id("https://arxiv.org/abs/1706.03762v5").unwrap(),
            "1706.03762"
        );
        assert_eq!(validate_arxiv_id("hep-th/9901001").unwrap(), "hep-th/9901001");
        assert_eq!(validate_arxiv_id("math.GT/0104020").unwrap(), "math.gt/0104020");
        assert!(validate_arxiv_id("").is_err());
        assert!(validate_arxiv_id("not-an-id").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Smith2020a").unwrap(), "Smith2020a");
        assert_eq!(sanitize_filename("Smith2020_27").unwrap(), "Smith2020_27");
        assert_eq!(sanitize_filename("bad<name>?").unwrap(), "badname");
        assert!(sanitize_filename("../etc/passwd").is_err());
        assert!(sanitize_filename("/etc/passwd").is_err());
        assert!(sanitize_filename("???").is_err());
    }
}
