//! Mock strategy for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{Candidate, CandidateBuilder, ExtractionSource};
use crate::sources::{Document, SourceError, Strategy};

/// What a [`MockStrategy`] answers
#[derive(Debug, Clone)]
pub enum MockResponse {
    Resolve(Candidate),
    NoMatch(String),
    Fail(String),
}

/// A strategy returning a predefined response and counting its calls.
#[derive(Debug)]
pub struct MockStrategy {
    source: ExtractionSource,
    response: Mutex<MockResponse>,
    calls: AtomicUsize,
}

impl MockStrategy {
    pub fn new(source: ExtractionSource, response: MockResponse) -> Self {
        Self {
            source,
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
        }
    }

    /// A strategy that resolves to `candidate`, tagged with the candidate's source
    pub fn resolving(candidate: Candidate) -> Self {
        Self::new(candidate.source, MockResponse::Resolve(candidate))
    }

    pub fn no_match(source: ExtractionSource) -> Self {
        Self::new(source, MockResponse::NoMatch("mock has nothing".to_string()))
    }

    pub fn failing(source: ExtractionSource) -> Self {
        Self::new(source, MockResponse::Fail("mock failure".to_string()))
    }

    /// Replace the configured response.
    pub fn set_response(&self, response: MockResponse) {
        let mut guard = self.response.lock().unwrap_or_else(|e| e.into_inner());
        *guard = response;
    }

    /// Number of times the strategy was attempted
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Strategy for MockStrategy {
    fn source(&self) -> ExtractionSource {
        self.source
    }

    fn name(&self) -> &str {
        "Mock Strategy"
    }

    async fn lookup(&self, _document: &Document) -> Result<Candidate, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match response {
            MockResponse::Resolve(candidate) => Ok(candidate),
            MockResponse::NoMatch(reason) => Err(SourceError::NotApplicable(reason)),
            MockResponse::Fail(reason) => Err(SourceError::Network(reason)),
        }
    }
}

/// Helper function to create a candidate for testing.
pub fn make_candidate(title: &str, author: &str, year: i32, source: ExtractionSource) -> Candidate {
    CandidateBuilder::new(title, source)
        .authors(vec![author.to_string()])
        .year(year)
        .build()
}
