//! Metadata resolution strategies with an extensible trait-based architecture.
//!
//! This module defines the [`Strategy`] trait that every resolution technique
//! implements. A [`MetadataResolver`] runs its strategies in
//! [`ExtractionSource::priority`] order and stops at the first one that
//! resolves; a free-text heuristic always closes the cascade, so every
//! readable document yields a record.
//!
//! # Built-in Strategies
//!
//! | id               | technique                                             |
//! |------------------|-------------------------------------------------------|
//! | `direct_pdf`     | DOI / arXiv ID embedded in the PDF, entry fetched     |
//! | `doi`            | DOI found in the text, BibTeX fetched from CrossRef   |
//! | `arxiv`          | arXiv ID found in the text, arXiv Atom API            |
//! | `pubmed`         | PubMed ID found in the text (not implemented yet)     |
//! | `pdf_properties` | title, author and creation date of the info dictionary|
//!
//! # Runtime Strategy Configuration
//!
//! Strategies can be switched off in the configuration file:
//!
//! ```toml
//! [strategies]
//! disabled = ["direct_pdf", "pubmed"]
//! ```
//!
//! The text heuristic cannot be disabled.

mod arxiv;
mod cascade;
mod direct_pdf;
mod doi;
pub mod mock;
mod pdf_properties;
mod pubmed;
mod text_heuristic;

pub use arxiv::{ArxivClient, ArxivStrategy};
pub use cascade::MetadataResolver;
pub use direct_pdf::{
    DirectPdfStrategy, EmbeddedIdentifierResolver, IdentifierKind, IdentifierPayload,
    IdentifierResolver,
};
pub use doi::DoiStrategy;
pub use mock::MockStrategy;
pub use pdf_properties::PdfPropertiesStrategy;
pub use pubmed::PubmedStrategy;
pub use text_heuristic::TextHeuristic;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::models::{Candidate, ExtractionSource};
use crate::utils::{extract_identifiers, ExtractedIdentifiers, NormalizeError};

bitflags::bitflags! {
    /// Set of strategies enabled for a cascade
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StrategySet: u32 {
        const DIRECT_PDF = 1 << 0;
        const DOI = 1 << 1;
        const ARXIV = 1 << 2;
        const PUBMED = 1 << 3;
        const PDF_PROPERTIES = 1 << 4;
    }
}

impl StrategySet {
    /// The flag for a source; the text heuristic has none since it always runs
    pub fn from_source(source: ExtractionSource) -> Self {
        match source {
            ExtractionSource::DirectPdf => StrategySet::DIRECT_PDF,
            ExtractionSource::Doi => StrategySet::DOI,
            ExtractionSource::Arxiv => StrategySet::ARXIV,
            ExtractionSource::Pubmed => StrategySet::PUBMED,
            ExtractionSource::PdfProperties => StrategySet::PDF_PROPERTIES,
            ExtractionSource::TextHeuristic => StrategySet::empty(),
        }
    }

    /// Whether strategies producing `source` should run
    pub fn allows(&self, source: ExtractionSource) -> bool {
        source == ExtractionSource::TextHeuristic || self.contains(Self::from_source(source))
    }
}

/// A document handed to the cascade: the parsed PDF plus optional rendered text.
///
/// The PDF structure is parsed once when the document is built and shared by
/// every strategy that reads it.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    pdf: Result<lopdf::Document, String>,
    first_pages_text: Option<String>,
    identifiers: ExtractedIdentifiers,
}

impl Document {
    /// Read the file at `path`. This is the only fallible step of a resolution.
    pub async fn load(
        path: impl AsRef<Path>,
        first_pages_text: Option<String>,
    ) -> Result<Self, ResolveError> {
        let path = path.as_ref().to_path_buf();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ResolveError::Unreadable {
                path: path.clone(),
                source,
            })?;

        let parse_path = path.clone();
        tokio::task::spawn_blocking(move || Self::from_bytes(parse_path, bytes, first_pages_text))
            .await
            .map_err(|e| ResolveError::Unreadable {
                path,
                source: std::io::Error::other(e),
            })
    }

    /// Build a document from bytes already in memory, parsing the PDF structure
    pub fn from_bytes(
        path: impl Into<PathBuf>,
        bytes: Vec<u8>,
        first_pages_text: Option<String>,
    ) -> Self {
        let first_pages_text = first_pages_text.filter(|text| !text.trim().is_empty());
        let identifiers = first_pages_text
            .as_deref()
            .map(extract_identifiers)
            .unwrap_or_default();
        let pdf = lopdf::Document::load_mem(&bytes).map_err(|e| e.to_string());

        Self {
            path: path.into(),
            pdf,
            first_pages_text,
            identifiers,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed PDF, or the parse error as [`SourceError::Pdf`]
    pub fn pdf(&self) -> Result<&lopdf::Document, SourceError> {
        self.pdf
            .as_ref()
            .map_err(|reason| SourceError::Pdf(reason.clone()))
    }

    /// First-page text, if the caller supplied any
    pub fn text(&self) -> Option<&str> {
        self.first_pages_text.as_deref()
    }

    /// Identifiers found in the first-page text
    pub fn identifiers(&self) -> &ExtractedIdentifiers {
        &self.identifiers
    }

    /// File name without its extension
    pub fn file_stem(&self) -> Option<&str> {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::trim)
            .filter(|stem| !stem.is_empty())
    }
}

/// What one strategy made of a document
#[derive(Debug)]
pub enum StrategyOutcome {
    /// Metadata was found
    Resolved(Candidate),
    /// The strategy does not apply or found nothing
    NoMatch(String),
    /// The strategy applied but errored
    Failed(SourceError),
}

impl StrategyOutcome {
    /// Map a strategy result; "nothing to do" errors become [`StrategyOutcome::NoMatch`]
    pub fn from_result(result: Result<Candidate, SourceError>) -> Self {
        match result {
            Ok(candidate) => StrategyOutcome::Resolved(candidate),
            Err(
                err @ (SourceError::NotImplemented(_)
                | SourceError::NotApplicable(_)
                | SourceError::NotFound(_)),
            ) => StrategyOutcome::NoMatch(err.to_string()),
            Err(err) => StrategyOutcome::Failed(err),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, StrategyOutcome::Resolved(_))
    }
}

impl From<Result<Candidate, SourceError>> for StrategyOutcome {
    fn from(result: Result<Candidate, SourceError>) -> Self {
        Self::from_result(result)
    }
}

/// The Strategy trait defines the interface for every resolution technique.
///
/// # Implementing a New Strategy
///
/// 1. Create a struct that implements `Strategy`
/// 2. Return the provenance tag from `source`; it fixes the cascade position
/// 3. Implement `lookup`, returning [`SourceError::NotApplicable`] when the
///    document offers nothing to work with
/// 4. Pass it to [`MetadataResolver::with_strategies`]
#[async_trait]
pub trait Strategy: Send + Sync + std::fmt::Debug {
    /// Provenance tag of the records this strategy produces
    fn source(&self) -> ExtractionSource;

    /// Identifier used in configuration and logs
    fn id(&self) -> &str {
        self.source().id()
    }

    /// Human-readable name of this strategy
    fn name(&self) -> &str {
        self.source().name()
    }

    /// Try to resolve metadata for a document
    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError>;

    /// Run [`lookup`](Strategy::lookup) and classify the result
    async fn attempt(&self, document: &Document) -> StrategyOutcome {
        StrategyOutcome::from_result(self.lookup(document).await)
    }
}

/// Errors that can occur inside a strategy
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The strategy exists but is not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The document offers nothing this strategy can use
    #[error("Not applicable: {0}")]
    NotApplicable(String),

    /// The remote service has no record for the identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected HTTP status from a remote service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parsing error (BibTeX, XML, Atom)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The PDF structure could not be read
    #[error("PDF error: {0}")]
    Pdf(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_) => true,
            SourceError::Api { status, .. } => *status != 404,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<NormalizeError> for SourceError {
    fn from(err: NormalizeError) -> Self {
        SourceError::Parse(format!("BibTeX: {}", err))
    }
}

impl From<lopdf::Error> for SourceError {
    fn from(err: lopdf::Error) -> Self {
        SourceError::Pdf(err.to_string())
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

impl From<feed_rs::parser::ParseFeedError> for SourceError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        SourceError::Parse(format!("Atom feed: {}", err))
    }
}

/// Errors that abort a resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
