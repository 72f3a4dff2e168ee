//! The resolution cascade.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{normalize_year, Candidate, CitationRecord};
use crate::sources::{
    ArxivClient, ArxivStrategy, DirectPdfStrategy, Document, DoiStrategy, PdfPropertiesStrategy,
    PubmedStrategy, ResolveError, SourceError, Strategy, StrategyOutcome, TextHeuristic,
};
use crate::utils::{generate_key, parse_entry, replace_entry_key, HttpClient, KeyRegistry};

/// Runs strategies in priority order and turns the first result into a
/// [`CitationRecord`].
///
/// Strategies run one at a time and the first resolved candidate wins. When
/// every strategy declines or fails, [`TextHeuristic`] produces the record,
/// so resolution only fails when the file itself cannot be read.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl MetadataResolver {
    /// Build the default cascade from configuration, skipping disabled strategies
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::new(&config.lookup)?;
        let enabled = config.strategies.enabled();

        let strategies: Vec<Arc<dyn Strategy>> = vec![
            Arc::new(DirectPdfStrategy::embedded(client.clone(), &config.lookup)),
            Arc::new(DoiStrategy::new(
                client.clone(),
                &config.lookup,
                config.retry.to_retry_config(),
            )),
            Arc::new(ArxivStrategy::new(ArxivClient::from_config(
                client,
                &config.lookup,
            ))),
            Arc::new(PubmedStrategy::new()),
            Arc::new(PdfPropertiesStrategy::new()),
        ];

        Ok(Self::with_strategies(
            strategies
                .into_iter()
                .filter(|strategy| enabled.allows(strategy.source()))
                .collect(),
        ))
    }

    /// Build a cascade from explicit strategies; they are ordered by priority
    pub fn with_strategies(mut strategies: Vec<Arc<dyn Strategy>>) -> Self {
        strategies.sort_by_key(|strategy| strategy.source().priority());
        Self { strategies }
    }

    /// Strategy identifiers in the order they run
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Resolve the PDF at `path` against a set of keys already in use.
    ///
    /// The returned key is not inserted into `existing_keys`; callers doing
    /// several resolutions should add it themselves or use
    /// [`resolve_with_registry`](Self::resolve_with_registry).
    pub async fn resolve(
        &self,
        path: impl AsRef<Path>,
        first_pages_text: Option<String>,
        existing_keys: &HashSet<String>,
    ) -> Result<CitationRecord, ResolveError> {
        let document = Document::load(path, first_pages_text).await?;
        Ok(self.resolve_document(&document, existing_keys).await)
    }

    /// Resolve an already loaded document. Never fails.
    pub async fn resolve_document(
        &self,
        document: &Document,
        existing_keys: &HashSet<String>,
    ) -> CitationRecord {
        let candidate = self.resolve_candidate(document).await;
        Self::finalize(candidate, existing_keys)
    }

    /// Resolve using a shared registry; the key is reserved before returning.
    ///
    /// Strategies run without the registry lock, which is taken only to
    /// generate and insert the key.
    pub async fn resolve_with_registry(
        &self,
        path: impl AsRef<Path>,
        first_pages_text: Option<String>,
        registry: &KeyRegistry,
    ) -> Result<CitationRecord, ResolveError> {
        let document = Document::load(path, first_pages_text).await?;
        let candidate = self.resolve_candidate(&document).await;

        Ok(registry.with_keys(|keys| {
            let record = Self::finalize(candidate, keys);
            keys.insert(record.key().to_string());
            record
        }))
    }

    /// Run the cascade and return the winning candidate, without a key.
    pub async fn resolve_candidate(&self, document: &Document) -> Candidate {
        let name = document.path().display();

        for strategy in &self.strategies {
            match strategy.attempt(document).await {
                StrategyOutcome::Resolved(candidate) => {
                    tracing::info!("Resolved {} with {}", name, strategy.name());
                    return candidate;
                }
                StrategyOutcome::NoMatch(reason) => {
                    tracing::debug!("{} found nothing for {}: {}", strategy.name(), name, reason);
                }
                StrategyOutcome::Failed(err) => {
                    tracing::warn!("{} failed for {}: {}", strategy.name(), name, err);
                }
            }
        }

        tracing::warn!("Using document parsing for {} (may be incomplete)", name);
        TextHeuristic::parse(document)
    }

    /// Assign a key unique against `existing_keys` and embed it in the entry.
    ///
    /// A fetched entry keeps its text with only the key rewritten. The result
    /// is parsed again and must carry the new key; otherwise the entry is
    /// rebuilt from the candidate's fields.
    pub fn finalize(mut candidate: Candidate, existing_keys: &HashSet<String>) -> CitationRecord {
        candidate.year = normalize_year(candidate.year);
        let key = generate_key(&candidate.authors, candidate.year, existing_keys);

        let entry = candidate
            .entry
            .as_deref()
            .and_then(|raw| replace_entry_key(raw, &key))
            .filter(|rewritten| {
                parse_entry(rewritten)
                    .map(|parsed| parsed.key == key)
                    .unwrap_or(false)
            })
            .unwrap_or_else(|| candidate.render_entry(&key));

        CitationRecord::from_candidate(candidate, key, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateBuilder, ExtractionSource, FALLBACK_YEAR};
    use crate::sources::mock::{make_candidate, MockResponse, MockStrategy};
    use crate::utils::entry_key;

    fn doc(text: Option<&str>) -> Document {
        Document::from_bytes("/papers/sample.pdf", Vec::new(), text.map(String::from))
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let direct = Arc::new(MockStrategy::no_match(ExtractionSource::DirectPdf));
        let doi = Arc::new(MockStrategy::resolving(make_candidate(
            "Paper",
            "Smith, John",
            2020,
            ExtractionSource::Doi,
        )));
        let arxiv = Arc::new(MockStrategy::failing(ExtractionSource::Arxiv));

        let strategies: Vec<Arc<dyn Strategy>> = vec![arxiv.clone(), doi.clone(), direct.clone()];
        let resolver = MetadataResolver::with_strategies(strategies);
        let record = resolver.resolve_document(&doc(None), &HashSet::new()).await;

        assert_eq!(record.source(), ExtractionSource::Doi);
        assert_eq!(record.key(), "Smith2020");
        assert_eq!(direct.calls(), 1);
        assert_eq!(doi.calls(), 1);
        assert_eq!(arxiv.calls(), 0);
    }

    #[tokio::test]
    async fn test_strategy_response_can_change_between_runs() {
        let arxiv = Arc::new(MockStrategy::no_match(ExtractionSource::Arxiv));
        let strategies: Vec<Arc<dyn Strategy>> = vec![arxiv.clone()];
        let resolver = MetadataResolver::with_strategies(strategies);

        let first = resolver.resolve_document(&doc(None), &HashSet::new()).await;
        assert_eq!(first.source(), ExtractionSource::TextHeuristic);

        arxiv.set_response(MockResponse::Resolve(make_candidate(
            "Preprint",
            "Noether, Emmy",
            2019,
            ExtractionSource::Arxiv,
        )));
        let second = resolver.resolve_document(&doc(None), &HashSet::new()).await;
        assert_eq!(second.source(), ExtractionSource::Arxiv);
        assert_eq!(second.key(), "Noether2019");
        assert_eq!(arxiv.calls(), 2);
    }

    #[test]
    fn test_strategies_sorted_by_priority() {
        let strategies: Vec<Arc<dyn Strategy>> = vec![
            Arc::new(MockStrategy::no_match(ExtractionSource::PdfProperties)),
            Arc::new(MockStrategy::no_match(ExtractionSource::DirectPdf)),
            Arc::new(MockStrategy::no_match(ExtractionSource::Arxiv)),
        ];
        let resolver = MetadataResolver::with_strategies(strategies);
        assert_eq!(resolver.strategy_ids(), vec!["direct_pdf", "arxiv", "pdf_properties"]);
    }

    #[tokio::test]
    async fn test_fallback_when_everything_fails() {
        let failing = Arc::new(MockStrategy::failing(ExtractionSource::Doi));
        let strategies: Vec<Arc<dyn Strategy>> = vec![failing.clone()];
        let resolver = MetadataResolver::with_strategies(strategies);

        let record = resolver.resolve_document(&doc(None), &HashSet::new()).await;
        assert_eq!(record.source(), ExtractionSource::TextHeuristic);
        assert_eq!(record.year(), FALLBACK_YEAR);
        assert_eq!(record.title(), "sample");
        assert_eq!(record.key(), "Unknown2024");
        assert_eq!(failing.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_cascade_still_resolves() {
        let resolver = MetadataResolver::with_strategies(Vec::new());
        let record = resolver
            .resolve_document(&doc(Some("Some Title\n2011")), &HashSet::new())
            .await;
        assert_eq!(record.title(), "Some Title");
        assert_eq!(record.year(), 2011);
    }

    #[test]
    fn test_finalize_rewrites_fetched_key() {
        let candidate = CandidateBuilder::new("Deep Learning", ExtractionSource::Doi)
            .authors(vec!["LeCun, Yann".to_string()])
            .year(2015)
            .entry("@article{LeCun_2015, title={Deep Learning}, year={2015}}")
            .build();
        let existing: HashSet<String> = ["LeCun2015".to_string()].into();

        let record = MetadataResolver::finalize(candidate, &existing);
        assert_eq!(record.key(), "LeCun2015a");
        assert!(record.structured_entry().starts_with("@article{LeCun2015a,"));
        assert!(record.structured_entry().contains("title={Deep Learning}"));
    }

    #[test]
    fn test_finalize_key_lands_in_the_real_entry() {
        for raw in [
            "@comment{generated, by tool}\n@article{real, title={T}, year={2001}}",
            "@preamble{\"a,b\"}\n@article{real, title={T}, year={2001}}",
        ] {
            let candidate = CandidateBuilder::new("T", ExtractionSource::Doi)
                .year(2001)
                .entry(raw)
                .build();

            let record = MetadataResolver::finalize(candidate, &HashSet::new());
            assert_eq!(record.key(), "Unknown2001");
            assert_eq!(
                parse_entry(record.structured_entry()).unwrap().key,
                "Unknown2001"
            );
        }
    }

    #[test]
    fn test_finalize_rebuilds_headerless_entry() {
        let candidate = CandidateBuilder::new("Odd", ExtractionSource::DirectPdf)
            .year(2001)
            .entry("not an entry")
            .build();

        let record = MetadataResolver::finalize(candidate, &HashSet::new());
        assert_eq!(record.key(), "Unknown2001");
        assert_eq!(entry_key(record.structured_entry()), Some("Unknown2001"));
        assert!(record.structured_entry().contains("author = {Unknown}"));
    }

    #[tokio::test]
    async fn test_registry_assigns_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();

        let registry = KeyRegistry::new();
        let resolver = MetadataResolver::with_strategies(Vec::new());

        let mut keys = Vec::new();
        for _ in 0..3 {
            let record = resolver
                .resolve_with_registry(&path, Some("Title 1999".to_string()), &registry)
                .await
                .unwrap();
            keys.push(record.key().to_string());
        }

        assert_eq!(keys, vec!["Unknown1999", "Unknown1999a", "Unknown1999b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_new_respects_disabled_strategies() {
        let mut config = Config::default();
        config.strategies.disabled = vec!["direct_pdf".to_string(), "pubmed".to_string()];

        let resolver = MetadataResolver::new(&config).unwrap();
        assert_eq!(resolver.strategy_ids(), vec!["doi", "arxiv", "pdf_properties"]);
    }
}
