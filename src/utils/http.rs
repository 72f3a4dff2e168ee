//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;

use crate::config::LookupConfig;
use crate::sources::SourceError;

/// Shared HTTP client configured from [`LookupConfig`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client with the configured timeouts and a polite user agent
    pub fn new(config: &LookupConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent(config.crossref_email.as_deref()))
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }
}

/// `bibresolve/<version>`, with a CrossRef contact address when one is configured
pub fn user_agent(email: Option<&str>) -> String {
    let base = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
    match email {
        Some(email) => format!("{} (mailto:{})", base, email),
        None => base.to_string(),
    }
}
