use std::panic;

use crate::error::ExtractError;

/// Concatenated page text of a PDF, normalised to plain lines.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs
    let result = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Extraction("pdf parser aborted on malformed input".to_string()))?;
    let raw = result.map_err(|err| ExtractError::Extraction(format!("failed to parse pdf: {}", err)))?;
    Ok(normalize_pdf_text(&raw))
}

pub(crate) fn normalize_pdf_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    let mut blank_run = false;
    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .filter(|ch| *ch == '\t' || !ch.is_control())
            .collect();
        let cleaned = cleaned.trim_end().to_string();
        if cleaned.trim().is_empty() {
            if !blank_run && !lines.is_empty() {
                lines.push(String::new());
            }
            blank_run = true;
            continue;
        }
        blank_run = false;
        lines.push(cleaned);
    }
    while lines.last().map(|line| line.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}
