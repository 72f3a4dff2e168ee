//! Configuration management.
//!
//! # Configuration File Format
//!
//! ```toml
//! [lookup]
//! crossref_email = "you@example.org"
//! crossref_api_url = "https://api.crossref.org"
//! doi_resolver_url = "https://doi.org"
//! arxiv_api_url = "http://export.arxiv.org/api/query"
//! request_timeout_secs = 10
//! connect_timeout_secs = 10
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//! max_delay_ms = 30000
//!
//! [strategies]
//! disabled = ["direct_pdf"]
//!
//! [output]
//! bib_dir = "./bibs"
//! first_pages = 2
//! ```
//!
//! Every value can be overridden with a `BIBRESOLVE_`-prefixed environment
//! variable using `__` between sections, e.g. `BIBRESOLVE_RETRY__MAX_ATTEMPTS=5`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ExtractionSource;
use crate::sources::StrategySet;
use crate::utils::RetryConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote lookup endpoints and HTTP settings
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Retry policy for DOI lookups
    #[serde(default)]
    pub retry: RetrySettings,

    /// Strategy selection
    #[serde(default)]
    pub strategies: StrategyConfig,

    /// Output settings used by the command-line front end
    #[serde(default)]
    pub output: OutputConfig,
}

/// Endpoints and HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Contact address sent to CrossRef for polite API usage
    #[serde(default = "default_crossref_email")]
    pub crossref_email: Option<String>,

    #[serde(default = "default_crossref_api_url")]
    pub crossref_api_url: String,

    /// DOI resolver queried with `Accept: application/x-bibtex`
    #[serde(default = "default_doi_resolver_url")]
    pub doi_resolver_url: String,

    #[serde(default = "default_arxiv_api_url")]
    pub arxiv_api_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            crossref_email: default_crossref_email(),
            crossref_api_url: default_crossref_api_url(),
            doi_resolver_url: default_doi_resolver_url(),
            arxiv_api_url: default_arxiv_api_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl LookupConfig {
    /// Point every endpoint at one base URL (used against mock servers)
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            crossref_email: None,
            crossref_api_url: base.to_string(),
            doi_resolver_url: format!("{}/doi", base),
            arxiv_api_url: format!("{}/api/query", base),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_crossref_email() -> Option<String> {
    std::env::var("CROSSREF_EMAIL").ok().filter(|e| !e.is_empty())
}

fn default_crossref_api_url() -> String {
    "https://api.crossref.org".to_string()
}

fn default_doi_resolver_url() -> String {
    "https://doi.org".to_string()
}

fn default_arxiv_api_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

/// Retry settings, converted to a [`RetryConfig`] at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on every further attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: 2.0,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Which strategies run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Strategy identifiers to skip (`direct_pdf`, `doi`, `arxiv`, `pubmed`, `pdf_properties`)
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl StrategyConfig {
    /// The enabled strategy set; unknown names are logged and ignored
    pub fn enabled(&self) -> StrategySet {
        let mut set = StrategySet::all();
        for name in &self.disabled {
            match ExtractionSource::from_id(name) {
                Some(ExtractionSource::TextHeuristic) => {
                    tracing::warn!("The text heuristic fallback cannot be disabled");
                }
                Some(source) => set.remove(StrategySet::from_source(source)),
                None => tracing::warn!("Ignoring unknown strategy in config: {}", name),
            }
        }
        set
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for standalone `.bib` files
    #[serde(default)]
    pub bib_dir: Option<PathBuf>,

    /// Pages of text extracted for identifier scanning
    #[serde(default = "default_first_pages")]
    pub first_pages: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bib_dir: None,
            first_pages: default_first_pages(),
        }
    }
}

fn default_first_pages() -> usize {
    2
}

/// Load configuration from a file, layered with `BIBRESOLVE_*` environment variables
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("BIBRESOLVE")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for `./bibresolve.toml`, then `<config dir>/bibresolve/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bibresolve.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bibresolve").join("config.toml"))
        .filter(|path| path.is_file())
}
