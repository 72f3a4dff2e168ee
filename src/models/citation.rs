//! Citation models: provenance tags, strategy candidates and resolved records.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::{build_entry, save_entry_file, NormalizedEntry};

/// Year used when no publication year can be discovered.
pub const FALLBACK_YEAR: i32 = 2024;

/// Author name used when a record has no known authors.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Clamp a year to the four-digit range, substituting [`FALLBACK_YEAR`] otherwise.
pub fn normalize_year(year: i32) -> i32 {
    if (1000..=9999).contains(&year) {
        year
    } else {
        FALLBACK_YEAR
    }
}

/// The strategy that produced a citation record.
///
/// Serialized names match the method names stored by earlier indexing runs,
/// so persisted records round-trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionSource {
    /// Identifier read from the PDF binary, citation fetched by the resolver
    #[serde(rename = "pdf2bib")]
    DirectPdf,
    /// DOI found in text, BibTeX fetched from CrossRef
    #[serde(rename = "crossref")]
    Doi,
    /// arXiv ID found in text, metadata fetched from the arXiv API
    #[serde(rename = "arxiv")]
    Arxiv,
    /// Reserved for PubMed lookups (currently never produced)
    #[serde(rename = "pubmed")]
    Pubmed,
    /// Embedded document-information dictionary
    #[serde(rename = "pdf_metadata")]
    PdfProperties,
    /// Free-text heuristics over the first page
    #[serde(rename = "parsed")]
    TextHeuristic,
}

impl ExtractionSource {
    /// Every source in cascade order.
    pub const ALL: [ExtractionSource; 6] = [
        ExtractionSource::DirectPdf,
        ExtractionSource::Doi,
        ExtractionSource::Arxiv,
        ExtractionSource::Pubmed,
        ExtractionSource::PdfProperties,
        ExtractionSource::TextHeuristic,
    ];

    /// Position in the resolution cascade (lower runs first).
    pub fn priority(&self) -> u8 {
        match self {
            ExtractionSource::DirectPdf => 0,
            ExtractionSource::Doi => 1,
            ExtractionSource::Arxiv => 2,
            ExtractionSource::Pubmed => 3,
            ExtractionSource::PdfProperties => 4,
            ExtractionSource::TextHeuristic => 5,
        }
    }

    /// Identifier used in configuration files (e.g. `strategies.disabled`).
    pub fn id(&self) -> &'static str {
        match self {
            ExtractionSource::DirectPdf => "direct_pdf",
            ExtractionSource::Doi => "doi",
            ExtractionSource::Arxiv => "arxiv",
            ExtractionSource::Pubmed => "pubmed",
            ExtractionSource::PdfProperties => "pdf_properties",
            ExtractionSource::TextHeuristic => "text_heuristic",
        }
    }

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionSource::DirectPdf => "PDF identifier",
            ExtractionSource::Doi => "CrossRef",
            ExtractionSource::Arxiv => "arXiv",
            ExtractionSource::Pubmed => "PubMed",
            ExtractionSource::PdfProperties => "PDF properties",
            ExtractionSource::TextHeuristic => "Text heuristic",
        }
    }

    /// Look up a source by its configuration identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim().to_lowercase();
        Self::ALL.into_iter().find(|source| source.id() == id)
    }
}

impl std::fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Normalized metadata produced by a strategy, before a citation key is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: ExtractionSource,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub abstract_text: Option<String>,
    /// BibTeX type used when an entry has to be built locally
    pub entry_type: String,
    /// Entry text fetched from a remote service; its key is rewritten on finalization
    pub entry: Option<String>,
}

impl Candidate {
    /// Build a candidate from a parsed BibTeX entry, keeping the raw text.
    pub fn from_entry(
        parsed: NormalizedEntry,
        raw_entry: impl Into<String>,
        source: ExtractionSource,
    ) -> Self {
        CandidateBuilder::new(parsed.title, source)
            .authors(parsed.authors)
            .year(parsed.year)
            .entry_type(parsed.entry_type)
            .journal_opt(parsed.journal)
            .volume_opt(parsed.volume)
            .pages_opt(parsed.pages)
            .publisher_opt(parsed.publisher)
            .doi_opt(parsed.doi)
            .url_opt(parsed.url)
            .entry(raw_entry)
            .build()
    }

    /// Render the candidate's fields as a BibTeX entry under `key`.
    pub fn render_entry(&self, key: &str) -> String {
        build_entry(
            &self.entry_type,
            key,
            &self.title,
            &self.authors,
            self.year,
            &[
                ("journal", self.journal.as_deref()),
                ("volume", self.volume.as_deref()),
                ("pages", self.pages.as_deref()),
                ("publisher", self.publisher.as_deref()),
                ("doi", self.doi.as_deref()),
                ("url", self.url.as_deref()),
            ],
        )
    }
}

/// Builder for constructing [`Candidate`] values
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    candidate: Candidate,
}

impl CandidateBuilder {
    /// Create a new builder with the required fields
    pub fn new(title: impl Into<String>, source: ExtractionSource) -> Self {
        Self {
            candidate: Candidate {
                source,
                title: title.into(),
                authors: Vec::new(),
                year: FALLBACK_YEAR,
                journal: None,
                volume: None,
                pages: None,
                publisher: None,
                doi: None,
                url: None,
                abstract_text: None,
                entry_type: "article".to_string(),
                entry: None,
            },
        }
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.candidate.authors = authors;
        self
    }

    /// Set the year; values outside the four-digit range fall back to [`FALLBACK_YEAR`]
    pub fn year(mut self, year: i32) -> Self {
        self.candidate.year = normalize_year(year);
        self
    }

    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.candidate.entry_type = entry_type.into();
        self
    }

    pub fn journal(self, journal: impl Into<String>) -> Self {
        self.journal_opt(Some(journal.into()))
    }

    pub fn journal_opt(mut self, journal: Option<String>) -> Self {
        self.candidate.journal = journal;
        self
    }

    pub fn volume_opt(mut self, volume: Option<String>) -> Self {
        self.candidate.volume = volume;
        self
    }

    pub fn pages_opt(mut self, pages: Option<String>) -> Self {
        self.candidate.pages = pages;
        self
    }

    pub fn publisher_opt(mut self, publisher: Option<String>) -> Self {
        self.candidate.publisher = publisher;
        self
    }

    pub fn doi(self, doi: impl Into<String>) -> Self {
        self.doi_opt(Some(doi.into()))
    }

    pub fn doi_opt(mut self, doi: Option<String>) -> Self {
        self.candidate.doi = doi;
        self
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.url_opt(Some(url.into()))
    }

    pub fn url_opt(mut self, url: Option<String>) -> Self {
        self.candidate.url = url;
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.candidate.abstract_text = Some(abstract_text.into());
        self
    }

    /// Attach BibTeX text fetched from a remote service
    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.candidate.entry = Some(entry.into());
        self
    }

    pub fn build(self) -> Candidate {
        self.candidate
    }
}

/// A fully resolved citation record.
///
/// Records are immutable once built: the key is unique against the key set
/// it was generated for and is always the key embedded in
/// [`structured_entry`](CitationRecord::structured_entry).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationRecord {
    title: String,
    authors: Vec<String>,
    year: i32,
    key: String,
    structured_entry: String,
    journal: Option<String>,
    volume: Option<String>,
    pages: Option<String>,
    doi: Option<String>,
    url: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    source: ExtractionSource,
}

impl CitationRecord {
    /// Combine a candidate with its assigned key and the matching entry text.
    pub(crate) fn from_candidate(candidate: Candidate, key: String, structured_entry: String) -> Self {
        Self {
            title: candidate.title,
            authors: candidate.authors,
            year: normalize_year(candidate.year),
            key,
            structured_entry,
            journal: candidate.journal,
            volume: candidate.volume,
            pages: candidate.pages,
            doi: candidate.doi,
            url: candidate.url,
            publisher: candidate.publisher,
            abstract_text: candidate.abstract_text,
            source: candidate.source,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn structured_entry(&self) -> &str {
        &self.structured_entry
    }

    pub fn journal(&self) -> Option<&str> {
        self.journal.as_deref()
    }

    pub fn volume(&self) -> Option<&str> {
        self.volume.as_deref()
    }

    pub fn pages(&self) -> Option<&str> {
        self.pages.as_deref()
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn abstract_text(&self) -> Option<&str> {
        self.abstract_text.as_deref()
    }

    pub fn source(&self) -> ExtractionSource {
        self.source
    }

    /// Authors for display, with the sentinel author when none are known
    pub fn display_authors(&self) -> String {
        if self.authors.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            self.authors.join(", ")
        }
    }

    /// Write the entry to `<dir>/<key>.bib`, returning the written path.
    pub fn write_entry_file(&self, dir: &Path) -> std::io::Result<PathBuf> {
        save_entry_file(&self.structured_entry, &self.key, dir)
    }
}
