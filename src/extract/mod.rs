//! Plain-text extraction for uploaded documents.
//!
//! PDF and Word files go through their parsers; everything recognised as text is
//! decoded as UTF-8 and returned byte-for-byte.

use tracing::debug;

use crate::data::{self, DocumentKind, TypeHint};
use crate::error::ExtractError;

mod office;
mod pdf;

pub use office::extract_docx_text;
pub use pdf::extract_pdf_text;

#[derive(Debug, Clone)]
pub struct Extracted {
    pub kind: DocumentKind,
    pub text: String,
}

pub fn extract_text(bytes: &[u8], hint: &TypeHint) -> Result<Extracted, ExtractError> {
    let kind = data::resolve_kind(hint, bytes)
        .ok_or_else(|| ExtractError::UnsupportedFileType(hint.describe()))?;
    debug!(
        "extracting {} bytes as {} ({})",
        bytes.len(),
        kind.as_str(),
        hint.describe()
    );
    let text = match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes)?,
        DocumentKind::Word => extract_docx_text(bytes)?,
        DocumentKind::Text => decode_text(bytes)?,
    };
    Ok(Extracted { kind, text })
}

pub(crate) fn decode_text(bytes: &[u8]) -> Result<String, ExtractError> {
    std::str::from_utf8(bytes)
        .map(|value| value.to_string())
        .map_err(|err| ExtractError::Extraction(format!("file is not valid UTF-8 text: {}", err)))
}
