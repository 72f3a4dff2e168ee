//! arXiv lookup by identifier.

use async_trait::async_trait;
use chrono::Datelike;
use feed_rs::parser;

use crate::config::LookupConfig;
use crate::models::{Candidate, CandidateBuilder, ExtractionSource, FALLBACK_YEAR};
use crate::sources::{Document, SourceError, Strategy};
use crate::utils::{collapse_whitespace, HttpClient};

/// Journal recorded for arXiv preprints
const ARXIV_JOURNAL: &str = "arXiv preprint";
/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";

/// Client for the arXiv Atom API
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: HttpClient,
    api_url: String,
}

impl ArxivClient {
    pub fn new(client: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    pub fn from_config(client: HttpClient, config: &LookupConfig) -> Self {
        Self::new(client, config.arxiv_api_url.clone())
    }

    /// Fetch the metadata of one arXiv paper.
    ///
    /// An empty feed, or arXiv's error entry, is [`SourceError::NotFound`].
    pub async fn fetch(&self, arxiv_id: &str) -> Result<Candidate, SourceError> {
        let url = format!("{}?id_list={}", self.api_url, arxiv_id);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv entry: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: format!("arXiv API returned status: {}", status),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        let feed = parser::parse(bytes.as_ref())?;
        let entry = feed
            .entries
            .first()
            .filter(|entry| !entry.id.contains("/api/errors"))
            .ok_or_else(|| SourceError::NotFound(format!("arXiv has no entry for {}", arxiv_id)))?;

        Self::parse_entry(entry, arxiv_id)
    }

    /// Convert an Atom feed entry into a candidate
    fn parse_entry(entry: &feed_rs::model::Entry, arxiv_id: &str) -> Result<Candidate, SourceError> {
        let title = entry
            .title
            .as_ref()
            .map(|t| collapse_whitespace(&t.content))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::Parse(format!("arXiv entry {} has no title", arxiv_id)))?;

        let authors = entry
            .authors
            .iter()
            .map(|a| collapse_whitespace(&a.name))
            .filter(|name| !name.is_empty())
            .collect();

        let year = entry
            .published
            .or(entry.updated)
            .map(|date| date.year())
            .unwrap_or(FALLBACK_YEAR);

        let mut builder = CandidateBuilder::new(title, ExtractionSource::Arxiv)
            .authors(authors)
            .year(year)
            .journal(ARXIV_JOURNAL)
            .url(format!("{}/{}", ARXIV_ABS_URL, arxiv_id));

        if let Some(summary) = entry.summary.as_ref() {
            let summary = collapse_whitespace(&summary.content);
            if !summary.is_empty() {
                builder = builder.abstract_text(summary);
            }
        }

        Ok(builder.build())
    }
}

/// Resolves arXiv identifiers found in the first-page text. Single attempt.
#[derive(Debug, Clone)]
pub struct ArxivStrategy {
    client: ArxivClient,
}

impl ArxivStrategy {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for ArxivStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Arxiv
    }

    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError> {
        let arxiv_id = document
            .identifiers()
            .arxiv_id
            .as_deref()
            .ok_or_else(|| SourceError::NotApplicable("no arXiv ID in text".to_string()))?;

        tracing::info!("Found arXiv ID: {}", arxiv_id);
        self.client.fetch(arxiv_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>arXiv Query Results</title>
            <id>http://arxiv.org/api/query</id>
            <updated>2023-01-16T00:00:00Z</updated>
            <entry>
                <id>http://arxiv.org/abs/2301.12345v1</id>
                <title>Test   Paper
                    Title</title>
                <summary>  Test abstract  </summary>
                <published>2023-01-15T10:00:00Z</published>
                <updated>2023-02-01T10:00:00Z</updated>
                <author><name>Test Author</name></author>
                <author><name>Second Author</name></author>
            </entry>
        </feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>arXiv Query Results</title>
            <id>http://arxiv.org/api/query</id>
            <updated>2023-01-16T00:00:00Z</updated>
            <entry>
                <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999.1</id>
                <title>Error</title>
                <summary>incorrect id format for 9999.1</summary>
                <updated>2023-01-16T00:00:00Z</updated>
                <author><name>arXiv api core</name></author>
            </entry>
        </feed>"#;

    fn client_for(server: &mockito::Server) -> ArxivClient {
        let config = LookupConfig::with_base_url(&server.url());
        ArxivClient::from_config(HttpClient::new(&config).unwrap(), &config)
    }

    #[test]
    fn test_parse_entry() {
        let feed = parser::parse(FEED.as_bytes()).unwrap();
        let candidate = ArxivClient::parse_entry(&feed.entries[0], "2301.12345").unwrap();

        assert_eq!(candidate.title, "Test Paper Title");
        assert_eq!(candidate.authors, vec!["Test Author", "Second Author"]);
        assert_eq!(candidate.year, 2023);
        assert_eq!(candidate.journal.as_deref(), Some("arXiv preprint"));
        assert_eq!(candidate.url.as_deref(), Some("https://arxiv.org/abs/2301.12345"));
        assert_eq!(candidate.abstract_text.as_deref(), Some("Test abstract"));
        assert_eq!(candidate.source, ExtractionSource::Arxiv);
    }

    #[tokio::test]
    async fn test_fetch_with_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::UrlEncoded(
                "id_list".into(),
                "2301.12345".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let candidate = client_for(&server).fetch("2301.12345").await.unwrap();
        assert_eq!(candidate.title, "Test Paper Title");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_entry_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(ERROR_FEED)
            .create_async()
            .await;

        let err = client_for(&server).fetch("9999.1").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_strategy_without_id_is_not_applicable() {
        let server = mockito::Server::new_async().await;
        let strategy = ArxivStrategy::new(client_for(&server));
        let doc = Document::from_bytes("paper.pdf", Vec::new(), Some("no ids".to_string()));

        let err = strategy.lookup(&doc).await.unwrap_err();
        assert!(matches!(err, SourceError::NotApplicable(_)));
    }
}
