use anyhow::{bail, Context, Result};
use bibresolve::config::{find_config_file, load_config, Config};
use bibresolve::ui;
use bibresolve::utils::{extract_first_pages_text, extract_identifiers};
use bibresolve::{generate_key, CitationRecord, KeyRegistry, MetadataResolver};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bibresolve - Resolve citation metadata and BibTeX keys for PDF documents
#[derive(Parser, Debug)]
#[command(name = "bibresolve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve citation metadata and BibTeX keys for PDF documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Text on a terminal, JSON otherwise
    Auto,
    /// Colored human-readable text
    Text,
    /// JSON
    Json,
}

impl OutputFormat {
    fn is_json(self) -> bool {
        match self {
            OutputFormat::Auto => !ui::is_terminal(),
            OutputFormat::Text => false,
            OutputFormat::Json => true,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve metadata and citation keys for one or more PDFs
    Resolve {
        /// PDF files, resolved in order
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,

        /// Use this file as the first-page text instead of extracting it (single PDF only)
        #[arg(long)]
        text: Option<PathBuf>,

        /// File of keys already in use, one per line
        #[arg(long)]
        keys: Option<PathBuf>,

        /// Write each entry to <DIR>/<key>.bib
        #[arg(long)]
        bib_dir: Option<PathBuf>,
    },

    /// Print the DOI, arXiv ID and PubMed ID found in a text file
    Ids {
        /// Text file to scan
        file: PathBuf,
    },

    /// Generate a citation key
    Key {
        /// Author name, repeat for several authors
        #[arg(long = "author")]
        authors: Vec<String>,

        /// Publication year
        #[arg(long)]
        year: i32,

        /// Key already in use, repeat for several
        #[arg(long = "existing")]
        existing: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bibresolve={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        Config::default()
    };

    let json = cli.output.is_json();

    match cli.command {
        Commands::Resolve {
            pdfs,
            text,
            keys,
            bib_dir,
        } => {
            if text.is_some() && pdfs.len() > 1 {
                bail!("--text can only be used with a single PDF");
            }

            let registry = match &keys {
                Some(path) => KeyRegistry::from_keys(read_keys(path)?),
                None => KeyRegistry::new(),
            };
            let bib_dir = bib_dir.or_else(|| config.output.bib_dir.clone());
            let resolver =
                MetadataResolver::new(&config).context("Failed to build the resolver")?;

            let mut records = Vec::with_capacity(pdfs.len());
            for pdf in &pdfs {
                let first_pages_text = match &text {
                    Some(path) => Some(
                        std::fs::read_to_string(path)
                            .with_context(|| format!("Failed to read {}", path.display()))?,
                    ),
                    None => first_pages_text(pdf, config.output.first_pages).await,
                };

                let record = resolver
                    .resolve_with_registry(pdf, first_pages_text, &registry)
                    .await
                    .with_context(|| format!("Failed to resolve {}", pdf.display()))?;

                if let Some(dir) = &bib_dir {
                    let written = record
                        .write_entry_file(dir)
                        .with_context(|| format!("Failed to write entry to {}", dir.display()))?;
                    tracing::info!("Wrote {}", written.display());
                }

                if !json {
                    print_resolved(pdf, &record);
                }
                records.push(record);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }

        Commands::Ids { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let ids = extract_identifiers(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                ui::print_section(&file.display().to_string());
                ui::print_identifiers(&ids);
            }
        }

        Commands::Key {
            authors,
            year,
            existing,
        } => {
            let existing: HashSet<String> = existing.into_iter().collect();
            println!("{}", generate_key(&authors, year, &existing));
        }

        Commands::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render config")?
            );
        }
    }

    Ok(())
}

/// Read one key per line, skipping blanks and `#` comments
fn read_keys(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read keys file {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Extract leading page text off the async runtime; failures only cost the identifiers
async fn first_pages_text(pdf: &Path, pages: usize) -> Option<String> {
    let path = pdf.to_path_buf();
    match tokio::task::spawn_blocking(move || extract_first_pages_text(&path, pages)).await {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            tracing::warn!("No text extracted from {}: {}", pdf.display(), e);
            None
        }
        Err(e) => {
            tracing::warn!("Text extraction task for {} failed: {}", pdf.display(), e);
            None
        }
    }
}

fn print_resolved(pdf: &Path, record: &CitationRecord) {
    ui::print_section(&pdf.display().to_string());
    ui::print_record(record);
    ui::print_divider();
}
