//! # bibresolve
//!
//! Resolve bibliographic metadata for PDF documents and assign each one a
//! collision-free BibTeX citation key.
//!
//! ## Architecture
//!
//! - [`models`]: [`CitationRecord`], candidates and the [`ExtractionSource`] tag
//! - [`sources`]: lookup strategies and the [`MetadataResolver`] cascade
//! - [`utils`]: identifier extraction, BibTeX handling, key generation, HTTP, PDF access
//! - [`config`]: configuration loading
//! - [`ui`]: terminal output for the command-line front end
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use bibresolve::{Config, MetadataResolver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = MetadataResolver::new(&Config::default())?;
//! let record = resolver.resolve("paper.pdf", None, &HashSet::new()).await?;
//! println!("{} -> {}", record.key(), record.title());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use models::{CitationRecord, ExtractionSource};
pub use sources::{MetadataResolver, ResolveError, SourceError, Strategy, StrategyOutcome};
pub use utils::{generate_key, KeyRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
