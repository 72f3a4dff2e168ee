//! BibTeX normalization, entry building and key rewriting.
//!
//! Parsing goes through the `biblatex` crate, so both `Last, First` and
//! `First Last` person formats, braces and LaTeX accents are handled by a
//! real BibTeX grammar rather than by regexes.

use std::path::{Path, PathBuf};

use biblatex::{Bibliography, Chunk, Entry, Person, Spanned};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::{normalize_year, FALLBACK_YEAR, UNKNOWN_AUTHOR};
use crate::utils::sanitize_filename;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(\w+)\s*\{\s*([^,\s]*)\s*,").unwrap());

/// Block types that hold no entry and never carry a citation key
const NON_ENTRY_TYPES: [&str; 3] = ["comment", "preamble", "string"];

static VALID_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@\w+\{[\w:-]+,").unwrap());
static VALID_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)title\s*=\s*\{[^}]+\}").unwrap());
static VALID_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)year\s*=\s*\{?\d{4}\}?").unwrap());

/// Errors raised when an entry cannot be normalized
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("BibTeX syntax error: {0}")]
    Syntax(String),

    #[error("no BibTeX entry found")]
    Empty,

    #[error("BibTeX entry '{0}' has no title")]
    MissingTitle(String),
}

/// The canonical field set extracted from one BibTeX entry
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub entry_type: String,
    pub key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub pages: Option<String>,
    pub publisher: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// Parse a BibTeX string and normalize its first entry.
pub fn parse_entry(text: &str) -> Result<NormalizedEntry, NormalizeError> {
    let bibliography =
        Bibliography::parse(text).map_err(|e| NormalizeError::Syntax(e.to_string()))?;
    let entry = bibliography.iter().next().ok_or(NormalizeError::Empty)?;

    let title = field(entry, "title").ok_or_else(|| NormalizeError::MissingTitle(entry.key.clone()))?;

    let authors = entry
        .author()
        .unwrap_or_default()
        .iter()
        .filter(|p| p.name != "others")
        .filter(|p| !p.name.is_empty() || !p.given_name.is_empty())
        .map(format_person)
        .collect();

    let entry_type = entry_headers(text)
        .find(|caps| caps[2] == *entry.key)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_else(|| "article".to_string());

    Ok(NormalizedEntry {
        entry_type,
        key: entry.key.clone(),
        title,
        authors,
        year: entry_year(entry),
        journal: field(entry, "journal").or_else(|| field(entry, "journaltitle")),
        volume: field(entry, "volume"),
        pages: field(entry, "pages").map(|pages| restore_dashes(&pages)),
        publisher: field(entry, "publisher"),
        doi: field(entry, "doi").or_else(|| field(entry, "DOI")),
        url: field(entry, "url").or_else(|| field(entry, "URL")),
    })
}

/// Build a BibTeX entry from individual fields.
///
/// `extra` fields are written in order and skipped when `None` or blank.
pub fn build_entry(
    entry_type: &str,
    key: &str,
    title: &str,
    authors: &[String],
    year: i32,
    extra: &[(&str, Option<&str>)],
) -> String {
    let title = if title.trim().is_empty() { "Untitled" } else { title.trim() };

    let mut lines = vec![
        format!("@{}{{{},", entry_type, key),
        format!("  title = {{{}}},", title),
        format!("  author = {{{}}},", format_authors(authors)),
        format!("  year = {{{}}},", normalize_year(year)),
    ];

    for (name, value) in extra {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            lines.push(format!("  {} = {{{}}},", name, value));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Join authors with ` and `, using the sentinel author when the list is empty
pub fn format_authors(authors: &[String]) -> String {
    if authors.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        authors.join(" and ")
    }
}

/// Replace the citation key in the first `@type{key,` entry header.
///
/// `@comment`, `@preamble` and `@string` blocks are skipped. Returns `None`
/// when the text has no entry header.
pub fn replace_entry_key(entry: &str, new_key: &str) -> Option<String> {
    let header = entry_headers(entry).next()?;
    let range = header.get(0)?.range();

    Some(format!(
        "{}@{}{{{},{}",
        &entry[..range.start],
        &header[1],
        new_key,
        &entry[range.end..]
    ))
}

/// Read the citation key from the first entry header
pub fn entry_key(entry: &str) -> Option<&str> {
    entry_headers(entry)
        .next()
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// `@type{key,` headers of real entries, in order
fn entry_headers(text: &str) -> impl Iterator<Item = Captures<'_>> {
    HEADER_RE.captures_iter(text).filter(|caps| {
        !NON_ENTRY_TYPES
            .iter()
            .any(|block| caps[1].eq_ignore_ascii_case(block))
    })
}

/// Check that an entry has a header, a braced title and a four-digit year
pub fn validate_entry(entry: &str) -> bool {
    VALID_HEADER_RE.is_match(entry)
        && VALID_TITLE_RE.is_match(entry)
        && VALID_YEAR_RE.is_match(entry)
}

/// Save an entry to `<dir>/<key>.bib` with a trailing newline.
pub fn save_entry_file(entry: &str, key: &str, dir: &Path) -> std::io::Result<PathBuf> {
    let base_name = sanitize_filename(key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.bib", base_name));
    std::fs::write(&path, format!("{}\n", entry.trim_end()))?;

    tracing::debug!("Saved BibTeX entry to {}", path.display());
    Ok(path)
}

fn entry_year(entry: &Entry) -> i32 {
    let raw = field(entry, "year").or_else(|| field(entry, "date"));
    raw.and_then(|year| {
        let digits: String = year.trim().chars().take(4).collect();
        if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
            digits.parse::<i32>().ok()
        } else {
            None
        }
    })
    .map(normalize_year)
    .unwrap_or(FALLBACK_YEAR)
}

fn field(entry: &Entry, name: &str) -> Option<String> {
    entry
        .get(name)
        .map(chunks_to_string)
        .map(|value| collapse_whitespace(&value.replace(['{', '}'], "")))
        .filter(|value| !value.is_empty())
}

/// Undo the dash ligatures biblatex applies to normal text (`--`, `---`)
fn restore_dashes(text: &str) -> String {
    text.replace('\u{2014}', "---").replace('\u{2013}', "--")
}

fn chunks_to_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|c| match &c.v {
            Chunk::Normal(s) => s.as_str(),
            Chunk::Verbatim(s) => s.as_str(),
            Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Render a person as `prefix Last, suffix, Given`.
fn format_person(person: &Person) -> String {
    let mut family = String::new();
    if !person.prefix.is_empty() {
        family.push_str(&person.prefix);
        family.push(' ');
    }
    family.push_str(&person.name);

    let mut parts = vec![family];
    if !person.suffix.is_empty() {
        parts.push(person.suffix.clone());
    }
    if !person.given_name.is_empty() {
        parts.push(person.given_name.clone());
    }
    collapse_whitespace(&parts.join(", "))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
