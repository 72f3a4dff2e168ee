//! Utility modules supporting metadata resolution.
//!
//! - [`extract_identifiers`]: DOI, arXiv and PubMed identifiers found in free text
//! - [`parse_entry`] / [`build_entry`]: BibTeX normalization and entry building
//! - [`generate_key`] / [`KeyRegistry`]: citation keys with collision resolution
//! - [`HttpClient`]: HTTP client configured with timeouts and a polite user agent
//! - [`with_retry`]: execute an operation with retry on transient errors
//! - [`extract_first_pages_text`]: rendered text of a PDF's first pages
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use bibresolve::sources::SourceError;
//! use bibresolve::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let result = with_retry(config, || async { fetch_data().await }).await?;
//! # Ok(())
//! # }
//! ```

mod bibtex;
mod cite_key;
mod http;
mod identifiers;
mod pdf;
mod retry;
mod validate;

pub use bibtex::{
    build_entry, entry_key, format_authors, parse_entry, replace_entry_key, save_entry_file,
    validate_entry, NormalizeError, NormalizedEntry,
};
pub(crate) use bibtex::collapse_whitespace;
pub use cite_key::{base_key, generate_key, surname, KeyRegistry};
pub use http::{user_agent, HttpClient};
pub use identifiers::{
    extract_arxiv_id, extract_doi, extract_identifiers, extract_pubmed_id, ExtractedIdentifiers,
};
pub use pdf::{
    decode_text_string, extract_first_pages_text, extract_text, first_pages, read_info, read_xmp,
    PdfExtractError, PdfInfo,
};
pub use retry::{with_retry, RetryConfig};
pub use validate::{sanitize_filename, validate_arxiv_id, validate_doi, ValidationError};
