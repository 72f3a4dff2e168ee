//! PubMed lookup by PMID.

use async_trait::async_trait;

use crate::models::{Candidate, ExtractionSource};
use crate::sources::{Document, SourceError, Strategy};

/// Recognizes PubMed IDs in the first-page text.
///
/// No E-utilities client exists yet, so every lookup ends as "not
/// implemented" and the cascade moves on. A record is never made up from the
/// bare PMID.
#[derive(Debug, Clone, Default)]
pub struct PubmedStrategy;

impl PubmedStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Strategy for PubmedStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Pubmed
    }

    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError> {
        let pmid = document
            .identifiers()
            .pubmed_id
            .as_deref()
            .ok_or_else(|| SourceError::NotApplicable("no PMID in text".to_string()))?;

        tracing::info!("PubMed lookup not implemented yet for PMID: {}", pmid);
        Err(SourceError::NotImplemented(format!("PubMed lookup for PMID {}", pmid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StrategyOutcome;

    #[tokio::test]
    async fn test_pmid_never_resolves() {
        let doc = Document::from_bytes("p.pdf", Vec::new(), Some("PMID: 12345678".to_string()));
        let outcome = PubmedStrategy::new().attempt(&doc).await;
        assert!(matches!(outcome, StrategyOutcome::NoMatch(reason) if reason.contains("12345678")));
    }
}
