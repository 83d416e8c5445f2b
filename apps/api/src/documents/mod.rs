//! Document extraction: uploaded bytes plus a declared MIME type in, one text string out.
//!
//! Extraction is stateless and CPU-bound; callers run it via `spawn_blocking`.

pub mod docx;
pub mod pdf;

use serde::Serialize;
use thiserror::Error;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// File extensions the upload form accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF could not be parsed: {0}")]
    Pdf(String),

    #[error("DOCX could not be parsed: {0}")]
    Docx(String),

    #[error("text is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// How an upload is decoded. Decided by the declared MIME type only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    pub fn from_mime(mime: Option<&str>) -> Self {
        // Parameters such as "; charset=..." are not part of the type.
        let essence = mime
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase());
        match essence.as_deref() {
            Some(PDF_MIME) => DocumentKind::Pdf,
            Some(DOCX_MIME) => DocumentKind::Docx,
            _ => DocumentKind::Text,
        }
    }
}

pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => pdf::extract_pdf_text(bytes),
        DocumentKind::Docx => docx::extract_docx_text(bytes),
        DocumentKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
    }
}

/// True when the file name carries one of the accepted extensions (case-insensitive).
pub fn has_accepted_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}
