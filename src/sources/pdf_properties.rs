//! Metadata from the PDF document-information dictionary.

use async_trait::async_trait;

use crate::models::{Candidate, CandidateBuilder, ExtractionSource};
use crate::sources::{Document, SourceError, Strategy};
use crate::utils::{collapse_whitespace, read_info, PdfInfo};

/// Uses the `Title`, `Author` and `CreationDate` properties.
///
/// All three are required. The year is read from the four characters after
/// the `D:` prefix of the creation date; the author string is kept as a
/// single author.
#[derive(Debug, Clone, Default)]
pub struct PdfPropertiesStrategy;

impl PdfPropertiesStrategy {
    pub fn new() -> Self {
        Self
    }

    fn candidate_from_info(info: &PdfInfo) -> Result<Candidate, SourceError> {
        let title = info
            .get("Title")
            .map(collapse_whitespace)
            .ok_or_else(|| SourceError::NotFound("no Title property".to_string()))?;
        let author = info
            .get("Author")
            .map(collapse_whitespace)
            .ok_or_else(|| SourceError::NotFound("no Author property".to_string()))?;
        let year = info
            .get("CreationDate")
            .and_then(creation_year)
            .ok_or_else(|| SourceError::NotFound("no usable CreationDate property".to_string()))?;

        Ok(CandidateBuilder::new(title, ExtractionSource::PdfProperties)
            .authors(vec![author])
            .year(year)
            .build())
    }
}

/// Year of a PDF date string such as `D:20190304120000Z`
fn creation_year(date: &str) -> Option<i32> {
    let year = date.get(2..6)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok().filter(|y| (1000..=9999).contains(y))
    } else {
        None
    }
}

#[async_trait]
impl Strategy for PdfPropertiesStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::PdfProperties
    }

    async fn lookup(&self, document: &Document) -> Result<Candidate, SourceError> {
        let info = read_info(document.pdf()?)
            .ok_or_else(|| SourceError::NotFound("no document-information dictionary".to_string()))?;

        Self::candidate_from_info(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StrategyOutcome;
    use lopdf::{dictionary, Object};

    fn pdf_with_info(info: lopdf::Dictionary) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(info);
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_creation_year() {
        assert_eq!(creation_year("D:20190304120000Z"), Some(2019));
        assert_eq!(creation_year("D:19"), None);
        assert_eq!(creation_year("D:abcd0101"), None);
    }

    #[tokio::test]
    async fn test_properties_resolve() {
        let bytes = pdf_with_info(dictionary! {
            "Title" => Object::string_literal("Graph  Kernels"),
            "Author" => Object::string_literal("Ada Lovelace"),
            "CreationDate" => Object::string_literal("D:20190304120000Z"),
        });
        let doc = Document::from_bytes("graph.pdf", bytes, None);

        let candidate = PdfPropertiesStrategy::new().lookup(&doc).await.unwrap();
        assert_eq!(candidate.title, "Graph Kernels");
        assert_eq!(candidate.authors, vec!["Ada Lovelace"]);
        assert_eq!(candidate.year, 2019);
        assert_eq!(candidate.source, ExtractionSource::PdfProperties);
    }

    #[tokio::test]
    async fn test_missing_author_is_no_match() {
        let bytes = pdf_with_info(dictionary! {
            "Title" => Object::string_literal("Graph Kernels"),
            "CreationDate" => Object::string_literal("D:20190304120000Z"),
        });
        let doc = Document::from_bytes("graph.pdf", bytes, None);

        let outcome = PdfPropertiesStrategy::new().attempt(&doc).await;
        assert!(matches!(outcome, StrategyOutcome::NoMatch(_)));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail() {
        let doc = Document::from_bytes("junk.pdf", b"not a pdf".to_vec(), None);
        let outcome = PdfPropertiesStrategy::new().attempt(&doc).await;
        assert!(matches!(outcome, StrategyOutcome::Failed(SourceError::Pdf(_))));
    }
}
