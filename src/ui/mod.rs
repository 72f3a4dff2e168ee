//! Terminal output for the command-line front end.

use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::models::{CitationRecord, ExtractionSource};
use crate::utils::ExtractedIdentifiers;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Short marker for where a record's metadata came from.
pub fn source_icon(source: ExtractionSource) -> &'static str {
    match source {
        ExtractionSource::DirectPdf => "📄",
        ExtractionSource::Doi => "🔗",
        ExtractionSource::Arxiv => "📝",
        ExtractionSource::Pubmed => "🏥",
        ExtractionSource::PdfProperties => "🗂",
        ExtractionSource::TextHeuristic => "✎",
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(80).dimmed());
}

/// Truncate text to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", truncated)
}

/// Print one resolved record.
pub fn print_record(record: &CitationRecord) {
    let source = record.source();
    let fallback = source == ExtractionSource::TextHeuristic;

    println!(
        "{} {} {}",
        source_icon(source),
        record.key().green().bold(),
        truncate_with_ellipsis(record.title(), 70).blue().bold()
    );
    println!(
        "   Authors: {}",
        truncate_with_ellipsis(&record.display_authors(), 68)
    );
    println!("   Year:    {}", record.year().yellow());
    if let Some(journal) = record.journal() {
        println!("   Journal: {}", truncate_with_ellipsis(journal, 68));
    }
    if let Some(doi) = record.doi() {
        println!("   DOI:     {}", doi.cyan());
    }
    if fallback {
        println!("   Source:  {} {}", source.name().red(), "(may be incomplete)".dimmed());
    } else {
        println!("   Source:  {}", source.name().green());
    }
}

/// Print the identifiers found in a piece of text.
pub fn print_identifiers(ids: &ExtractedIdentifiers) {
    let show = |label: &str, value: &Option<String>| match value {
        Some(v) => println!("  {:<8} {}", label.bold(), v.cyan()),
        None => println!("  {:<8} {}", label.bold(), "-".dimmed()),
    };

    show("DOI", &ids.doi);
    show("arXiv", &ids.arxiv_id);
    show("PubMed", &ids.pubmed_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_with_ellipsis("Attention", 20), "Attention");
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate_with_ellipsis("Attention Is All You Need", 12), "Attention...");
        assert_eq!(truncate_with_ellipsis("anything", 2), "...");
    }

    #[test]
    fn test_every_source_has_icon() {
        for source in ExtractionSource::ALL {
            assert!(!source_icon(source).is_empty());
        }
    }
}
