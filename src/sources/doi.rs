//! DOI lookup through CrossRef's BibTeX transform.

use async_trait::async_trait;

use crate::config::LookupConfig;
use crate::models::{Candidate, ExtractionSource};
use crate::sources::{Document, SourceError, Strategy};
use crate::utils::{parse_entry, with_retry, HttpClient, RetryConfig};

/// Resolves DOIs found in the first-page text against CrossRef.
///
/// Transport errors and unexpected statuses are retried with exponential
/// backoff; a 404 ends the lookup immediately.
#[derive(Debug, Clone)]
pub struct DoiStrategy {
    client: HttpClient,
    api_url: String,
    retry: RetryConfig,
}

impl DoiStrategy {
    pub fn new(client: HttpClient, config: &LookupConfig, retry: RetryConfig) -> Self {
        Self {
            client,
            api_url: config.crossref_api_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Fetch the BibTeX entry for a DOI.
    pub async fn fetch_entry(&self, doi: &str) -> Result<String, SourceError> {
        let url = format!("{}/works/{}/transform/application/x-bibtex", self.api_url, doi);

        with_retry(self.retry, || {
            let client = self.client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    SourceError::Network(format!("CrossRef request failed: {}", e))
                })?;

                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(SourceError::NotFound("DOI not found in CrossRef".to_string()));
                }
                if !status.is_success() {
                    return Err(SourceError::Api {
                        status: status.as_u16(),
                        message: format!("CrossRef API returned status: {}", status),
                    });
                }

                response
                    .text()
                    .await
                    .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
            }
        })
        .await
    }

    /// Fetch and normalize the record for a DOI.
    pub async fn resolve_doi(&self, doi: &str) -> Result<Candidate, SourceError> {
        let entry = self.fetch_entry(doi).await?;
        let parsed = parse_entry(&entry)?;

        let mut candidate = Candidate::from_entry(parsed, entry, ExtractionSource::Doi);
        candidate.doi = Some(doi.to_string());
        candidate.url = Some(format!("https://doi.org/{}", doi));
        Ok(candidate)
    }
}

#[async_trait]
impl Strategy for DoiStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Doi
    }

    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError> {
        let doi = document
            .identifiers()
            .doi
            .as_deref()
            .ok_or_else(|| SourceError::NotApplicable("no DOI in text".to_string()))?;

        tracing::info!("Found DOI: {}", doi);
        self.resolve_doi(doi).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const ENTRY: &str = "@article{Smith_2020, title={Deep Learning for Cats}, \
        author={Smith, John and Doe, Jane}, journal={Journal of Feline Studies}, \
        volume={12}, pages={1--10}, year={2020}, publisher={Cat Press}}";

    fn strategy_for(server: &mockito::Server) -> DoiStrategy {
        let config = LookupConfig::with_base_url(&server.url());
        let retry = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        };
        DoiStrategy::new(HttpClient::new(&config).unwrap(), &config, retry)
    }

    #[tokio::test]
    async fn test_resolve_doi() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1234/cats.2020/transform/application/x-bibtex")
            .with_status(200)
            .with_body(ENTRY)
            .expect(1)
            .create_async()
            .await;

        let candidate = strategy_for(&server)
            .resolve_doi("10.1234/cats.2020")
            .await
            .unwrap();

        assert_eq!(candidate.title, "Deep Learning for Cats");
        assert_eq!(candidate.authors, vec!["Smith, John", "Doe, Jane"]);
        assert_eq!(candidate.year, 2020);
        assert_eq!(candidate.doi.as_deref(), Some("10.1234/cats.2020"));
        assert_eq!(candidate.url.as_deref(), Some("https://doi.org/10.1234/cats.2020"));
        assert_eq!(candidate.entry.as_deref(), Some(ENTRY));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.9999/missing/transform/application/x-bibtex")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let err = strategy_for(&server)
            .resolve_doi("10.9999/missing")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retried_to_bound() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1234/flaky/transform/application/x-bibtex")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let err = strategy_for(&server)
            .resolve_doi("10.1234/flaky")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Api { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unparseable_body_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1234/garbled/transform/application/x-bibtex")
            .with_status(200)
            .with_body("<html>not bibtex</html>")
            .expect(1)
            .create_async()
            .await;

        let err = strategy_for(&server)
            .resolve_doi("10.1234/garbled")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Parse(_)));
        mock.assert_async().await;
    }
}
