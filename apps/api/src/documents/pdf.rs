use std::fmt::Display;

use lopdf::Document;
use tracing::{debug, warn};

use crate::documents::ExtractError;

/// Extracts text page by page, in page order, each page followed by a newline.
///
/// `lopdf` provides the page boundaries. If a page's content cannot be decoded
/// (unsupported font encodings, broken streams) the whole document is handed to
/// `pdf-extract` instead and treated as a single page.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    pages_or_whole_document(page_texts(&doc), || {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    })
}

fn pages_or_whole_document<E, F>(
    pages: Result<Vec<String>, E>,
    whole: F,
) -> Result<String, ExtractError>
where
    E: Display,
    F: FnOnce() -> Result<String, ExtractError>,
{
    match pages {
        Ok(pages) => {
            debug!("Extracted {} PDF page(s)", pages.len());
            Ok(join_pages(&pages))
        }
        Err(e) => {
            warn!("Per-page PDF extraction failed ({e}), falling back to pdf-extract");
            let text = whole()?;
            Ok(join_pages(&[text.trim_end_matches('\n')]))
        }
    }
}

fn page_texts(doc: &Document) -> lopdf::Result<Vec<String>> {
    // get_pages() is keyed by 1-based page number, so iteration is in page order.
    // lopdf ends each page with its own line break; join_pages adds the separator.
    doc.get_pages()
        .keys()
        .map(|&page_number| {
            doc.extract_text(&[page_number])
                .map(|text| text.trim_end_matches('\n').to_string())
        })
        .collect()
}

pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push('\n');
    }
    text
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_appends_newline_per_page() {
        assert_eq!(join_pages(&["first", "second", "third"]), "first\nsecond\nthird\n");
    }

    #[test]
    fn test_join_pages_keeps_empty_pages() {
        assert_eq!(join_pages(&["", "body"]), "\nbody\n");
        assert_eq!(join_pages::<&str>(&[]), "");
    }

    #[test]
    fn test_extract_pages_in_order() {
        let bytes = fixtures::pdf_with_pages(&["Registered Nurse", "Ontario Licensure"]);
        let text = extract_pdf_text(&bytes).unwrap();

        assert_eq!(text, "Registered Nurse\nOntario Licensure\n");
    }

    #[test]
    fn test_single_page_has_one_trailing_newline() {
        let text = extract_pdf_text(&fixtures::pdf_with_pages(&["Alpha"])).unwrap();
        assert_eq!(text, "Alpha\n");
    }

    #[test]
    fn test_page_failure_falls_back_to_whole_document() {
        let text = pages_or_whole_document(Err::<Vec<String>, _>("bad font encoding"), || {
            Ok("Registered Nurse\n\nOntario Licensure\n".to_string())
        })
        .unwrap();
        assert_eq!(text, "Registered Nurse\n\nOntario Licensure\n");
    }

    #[test]
    fn test_fallback_failure_is_a_pdf_error() {
        let result = pages_or_whole_document(Err::<Vec<String>, _>("bad font encoding"), || {
            Err(ExtractError::Pdf("no text layer".to_string()))
        });
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn test_fallback_not_taken_when_pages_decode() {
        let pages: Result<_, String> = Ok(vec!["one".to_string(), "two".to_string()]);
        let text = pages_or_whole_document(pages, || panic!("fallback must not run")).unwrap();
        assert_eq!(text, "one\ntwo\n");
    }

    #[test]
    fn test_undecodable_page_yields_one_page_or_pdf_error() {
        let bytes = fixtures::pdf_with_undecodable_page();
        match std::panic::catch_unwind(|| extract_pdf_text(&bytes)) {
            Ok(Ok(text)) => {
                assert!(text.ends_with('\n'));
                assert!(!text.ends_with("\n\n"), "doubled page separator: {text:?}");
            }
            Ok(Err(e)) => assert!(matches!(e, ExtractError::Pdf(_))),
            // pdf-extract panics on some broken streams; the upload handler maps that to 422.
            Err(_) => {}
        }
    }

    #[test]
    fn test_garbage_is_a_pdf_error() {
        let result = extract_pdf_text(b"this is not a pdf at all");
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }
}
