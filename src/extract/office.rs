use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::error::ExtractError;

const DOCUMENT_ENTRY: &str = "word/document.xml";

/// Raw text of a WordprocessingML package, one line per paragraph.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ExtractError::Extraction(format!("failed to read docx archive: {}", err)))?;
    let mut entry = archive.by_name(DOCUMENT_ENTRY).map_err(|err| {
        ExtractError::Extraction(format!("docx has no {}: {}", DOCUMENT_ENTRY, err))
    })?;
    let mut xml = Vec::new();
    entry
        .read_to_end(&mut xml)
        .map_err(|err| ExtractError::Extraction(format!("failed to read {}: {}", DOCUMENT_ENTRY, err)))?;
    document_xml_text(&xml)
}

/// Paragraphs keep the order their `w:p` opens in, so a text box paragraph nested
/// inside another lands after the enclosing paragraph's line.
fn document_xml_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(Cursor::new(xml));
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    // (slot in `paragraphs`, text collected so far) for every open w:p
    let mut open: Vec<(usize, String)> = Vec::new();
    let mut run_depth = 0usize;
    let mut props_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    paragraphs.push(String::new());
                    open.push((paragraphs.len() - 1, String::new()));
                }
                b"w:r" => run_depth += 1,
                b"w:pPr" | b"w:rPr" => props_depth += 1,
                b"w:t" => in_text = run_depth > 0 && props_depth == 0,
                name => push_run_break(name, run_depth, props_depth, &mut open),
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                name => push_run_break(name, run_depth, props_depth, &mut open),
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:pPr" | b"w:rPr" => props_depth = props_depth.saturating_sub(1),
                b"w:p" => {
                    if let Some((slot, text)) = open.pop() {
                        paragraphs[slot] = text;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    let text = e
                        .unescape()
                        .map_err(|err| ExtractError::Extraction(format!("bad docx text: {}", err)))?;
                    if let Some((_, current)) = open.last_mut() {
                        current.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_text {
                    if let Some((_, current)) = open.last_mut() {
                        current.push_str(&String::from_utf8_lossy(e.into_inner().as_ref()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ExtractError::Extraction(format!(
                    "failed to parse docx xml: {}",
                    err
                )));
            }
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

/// `w:tab`, `w:br` and `w:cr` only count as text inside a run, never in property blocks
/// where `w:tab` declares tab stops.
fn push_run_break(
    name: &[u8],
    run_depth: usize,
    props_depth: usize,
    open: &mut [(usize, String)],
) {
    if run_depth == 0 || props_depth > 0 {
        return;
    }
    let Some((_, current)) = open.last_mut() else {
        return;
    };
    match name {
        b"w:tab" => current.push('\t'),
        b"w:br" | b"w:cr" => current.push('\n'),
        _ => {}
    }
}
