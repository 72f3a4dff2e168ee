//! Identifiers embedded in the PDF itself.
//!
//! Publishers usually stamp the DOI into the document-information dictionary
//! or the XMP packet, and arXiv downloads keep the identifier in the file
//! name. Reading those is more reliable than scanning rendered text, so this
//! strategy runs first.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::models::{Candidate, ExtractionSource};
use crate::sources::{ArxivClient, Document, SourceError, Strategy};
use crate::utils::{
    extract_arxiv_id, extract_doi, parse_entry, read_info, read_xmp, validate_arxiv_id,
    validate_doi, HttpClient,
};

/// Info-dictionary keys searched for identifiers, in order
const INFO_KEYS: [&str; 4] = ["doi", "Subject", "Keywords", "Title"];

/// XMP elements (or attributes) that carry identifiers
const XMP_TAGS: [&[u8]; 4] = [b"prism:doi", b"pdfx:doi", b"crossmark:DOI", b"dc:identifier"];

/// Kind of identifier found in a PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Doi,
    Arxiv,
}

/// What an [`IdentifierResolver`] found for a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierPayload {
    pub identifier: Option<String>,
    pub kind: Option<IdentifierKind>,
    /// BibTeX entry fetched for the identifier
    pub entry: Option<String>,
    /// Landing page reported by the resolver, used when no DOI is known
    pub url: Option<String>,
}

/// Finds an identifier in a PDF and fetches its citation entry.
#[async_trait]
pub trait IdentifierResolver: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, document: &Document) -> Result<IdentifierPayload, SourceError>;
}

/// Default resolver: scans the info dictionary, the XMP packet and the file
/// name, then fetches the entry from the DOI resolver or the arXiv API.
#[derive(Debug, Clone)]
pub struct EmbeddedIdentifierResolver {
    client: HttpClient,
    doi_resolver_url: String,
    arxiv: ArxivClient,
}

impl EmbeddedIdentifierResolver {
    pub fn new(client: HttpClient, config: &LookupConfig) -> Self {
        Self {
            arxiv: ArxivClient::from_config(client.clone(), config),
            doi_resolver_url: config.doi_resolver_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fetch a BibTeX entry through DOI content negotiation.
    async fn fetch_doi_entry(&self, doi: &str) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.doi_resolver_url, doi);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/x-bibtex")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("DOI resolver request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!("DOI {} is not registered", doi)));
        }
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: format!("DOI resolver returned status: {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }

    /// Fetch arXiv metadata and render it as an entry.
    async fn fetch_arxiv_entry(&self, arxiv_id: &str) -> Result<String, SourceError> {
        let candidate = self.arxiv.fetch(arxiv_id).await?;
        let key = format!("arXiv_{}", arxiv_id.replace(['.', '/'], "_"));
        Ok(candidate.render_entry(&key))
    }
}

#[async_trait]
impl IdentifierResolver for EmbeddedIdentifierResolver {
    async fn resolve(&self, document: &Document) -> Result<IdentifierPayload, SourceError> {
        let Some((kind, identifier)) = embedded_identifier(document) else {
            return Ok(IdentifierPayload::default());
        };

        tracing::info!("Found {:?} identifier in PDF: {}", kind, identifier);

        let fetched = match kind {
            IdentifierKind::Doi => self.fetch_doi_entry(&identifier).await,
            IdentifierKind::Arxiv => self.fetch_arxiv_entry(&identifier).await,
        };
        let entry = match fetched {
            Ok(entry) => Some(entry),
            Err(SourceError::NotFound(reason)) => {
                tracing::debug!("No entry for {}: {}", identifier, reason);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(IdentifierPayload {
            identifier: Some(identifier),
            kind: Some(kind),
            entry,
            url: None,
        })
    }
}

/// First identifier embedded in the document; DOIs win over arXiv IDs.
pub fn embedded_identifier(document: &Document) -> Option<(IdentifierKind, String)> {
    let values = embedded_values(document);

    values
        .iter()
        .find_map(|value| doi_in(value))
        .map(|doi| (IdentifierKind::Doi, doi))
        .or_else(|| {
            values
                .iter()
                .find_map(|value| arxiv_id_in(value))
                .map(|id| (IdentifierKind::Arxiv, id))
        })
}

/// Candidate strings in search order: info dictionary, XMP, file stem
fn embedded_values(document: &Document) -> Vec<String> {
    let mut values = Vec::new();

    match document.pdf() {
        Ok(pdf) => {
            if let Some(info) = read_info(pdf) {
                values.extend(INFO_KEYS.iter().filter_map(|key| info.get(key)).map(String::from));
            }
            if let Some(xmp) = read_xmp(pdf) {
                match xmp_identifiers(&xmp) {
                    Ok(found) => values.extend(found),
                    Err(e) => tracing::debug!("Skipping unreadable XMP packet: {}", e),
                }
            }
        }
        Err(e) => tracing::debug!("Cannot parse {} as PDF: {}", document.path().display(), e),
    }

    if let Some(stem) = document.file_stem() {
        values.push(stem.to_string());
    }
    values
}

/// Text and attribute values of the identifier elements in an XMP packet
fn xmp_identifiers(xmp: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = Reader::from_str(xmp);
    let mut buf = Vec::new();
    let mut found = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                found.extend(identifier_attributes(e));
                if is_identifier_tag(e.name().as_ref()) {
                    depth += 1;
                }
            }
            Ok(Event::Empty(ref e)) => found.extend(identifier_attributes(e)),
            Ok(Event::Text(e)) if depth > 0 => {
                let text = e.unescape()?;
                let text = text.trim();
                if !text.is_empty() {
                    found.push(text.to_string());
                }
            }
            Ok(Event::End(ref e)) => {
                if depth > 0 && is_identifier_tag(e.name().as_ref()) {
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }

    Ok(found)
}

fn is_identifier_tag(name: &[u8]) -> bool {
    XMP_TAGS.iter().any(|tag| *tag == name)
}

fn identifier_attributes(e: &BytesStart<'_>) -> Vec<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .filter(|a| is_identifier_tag(a.key.as_ref()))
        .filter_map(|a| {
            std::str::from_utf8(a.value.as_ref())
                .ok()
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn doi_in(value: &str) -> Option<String> {
    extract_doi(value).filter(|doi| validate_doi(doi).is_ok())
}

fn arxiv_id_in(value: &str) -> Option<String> {
    extract_arxiv_id(value).or_else(|| validate_arxiv_id(value).ok())
}

/// Resolves the identifier embedded in the PDF binary.
#[derive(Debug, Clone)]
pub struct DirectPdfStrategy {
    resolver: Arc<dyn IdentifierResolver>,
}

impl DirectPdfStrategy {
    pub fn new(resolver: Arc<dyn IdentifierResolver>) -> Self {
        Self { resolver }
    }

    /// Strategy backed by [`EmbeddedIdentifierResolver`]
    pub fn embedded(client: HttpClient, config: &LookupConfig) -> Self {
        Self::new(Arc::new(EmbeddedIdentifierResolver::new(client, config)))
    }
}

#[async_trait]
impl Strategy for DirectPdfStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::DirectPdf
    }

    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError> {
        let payload = self.resolver.resolve(document).await?;

        let identifier = payload
            .identifier
            .ok_or_else(|| SourceError::NotFound("no identifier embedded in PDF".to_string()))?;
        let entry = payload.entry.ok_or_else(|| {
            SourceError::NotFound(format!("identifier {} found but no BibTeX entry", identifier))
        })?;

        let parsed = parse_entry(&entry)?;
        let doi = parsed
            .doi
            .clone()
            .or_else(|| (payload.kind == Some(IdentifierKind::Doi)).then(|| identifier.clone()));

        let url = match (&doi, payload.kind) {
            (Some(doi), _) => Some(format!("https://doi.org/{}", doi)),
            (None, Some(IdentifierKind::Arxiv)) => Some(format!("https://arxiv.org/abs/{}", identifier)),
            (None, _) => payload.url,
        };

        let mut candidate = Candidate::from_entry(parsed, entry, ExtractionSource::DirectPdf);
        candidate.doi = doi;
        candidate.url = url;
        Ok(candidate)
    }
}
