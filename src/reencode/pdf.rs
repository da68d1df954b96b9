use anyhow::{Result, anyhow};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use std::io::{BufWriter, Cursor};
use tracing::{debug, warn};

use super::font::{FontMetrics, measure_text_width};

const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy)]
pub struct PdfLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub font_size: f32,
    pub line_height_factor: f32,
}

impl Default for PdfLayout {
    /// A4 portrait with 20mm margins.
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 20.0,
            font_size: 11.0,
            line_height_factor: 1.4,
        }
    }
}

impl PdfLayout {
    fn usable_width_pt(&self) -> f32 {
        (self.page_width_mm - self.margin_mm * 2.0).max(1.0) * PT_PER_MM
    }

    fn line_height_mm(&self) -> f32 {
        self.font_size * self.line_height_factor / PT_PER_MM
    }
}

pub fn encode_pdf(text: &str, layout: &PdfLayout, font: Option<&FontMetrics>) -> Result<Vec<u8>> {
    let measure = |line: &str| measure_text_width(line, layout.font_size, font);
    let pages = layout_pages(text, layout, &measure);
    debug!("pdf layout: {} page(s)", pages.len());

    let (doc, first_page, first_layer) = PdfDocument::new(
        "translation",
        Mm(layout.page_width_mm),
        Mm(layout.page_height_mm),
        "Layer 1",
    );
    let pdf_font: IndirectFontRef = match font {
        Some(metrics) => {
            debug!("pdf font: {}", metrics.family().unwrap_or("(unnamed)"));
            doc.add_external_font(Cursor::new(metrics.data().to_vec()))
                .map_err(|err| anyhow!("failed to embed pdf font: {}", err))?
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| anyhow!("failed to load builtin pdf font: {}", err))?,
    };

    let mut replaced = false;
    let line_height = layout.line_height_mm();
    for (idx, lines) in pages.iter().enumerate() {
        let (page, layer) = if idx == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(
                Mm(layout.page_width_mm),
                Mm(layout.page_height_mm),
                format!("Layer {}", idx + 1),
            )
        };
        let current_layer = doc.get_page(page).get_layer(layer);
        let mut cursor = layout.margin_mm;
        for line in lines {
            cursor += line_height;
            if line.trim().is_empty() {
                continue;
            }
            let rendered = if font.is_some() {
                line.clone()
            } else {
                let (latin, lossy) = latin1_fallback(line);
                replaced |= lossy;
                latin
            };
            current_layer.use_text(
                rendered,
                layout.font_size,
                Mm(layout.margin_mm),
                Mm(layout.page_height_mm - cursor),
                &pdf_font,
            );
        }
    }
    if replaced {
        warn!("pdf export: no system font covers the text, characters outside Latin-1 were replaced; set export.font_path to a TTF font for the target script");
    }

    let mut buffer = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buffer);
        doc.save(&mut writer)
            .map_err(|err| anyhow!("failed to write pdf: {}", err))?;
    }
    Ok(buffer)
}

/// Wraps `text` to the usable width and splits it into pages.
///
/// A new page starts when the next line would cross the bottom margin. Empty
/// source lines are kept as blank lines; words longer than a full line are
/// broken between characters.
pub fn layout_pages(text: &str, layout: &PdfLayout, measure: &dyn Fn(&str) -> f32) -> Vec<Vec<String>> {
    let max_width = layout.usable_width_pt();
    let line_height = layout.line_height_mm();
    let bottom = layout.page_height_mm - layout.margin_mm;

    let mut pages = vec![Vec::new()];
    let mut cursor = layout.margin_mm;
    for source_line in text.split('\n') {
        let source_line = source_line.strip_suffix('\r').unwrap_or(source_line);
        for line in wrap_line(source_line, max_width, measure) {
            if cursor + line_height > bottom && pages.last().is_some_and(|page| !page.is_empty()) {
                pages.push(Vec::new());
                cursor = layout.margin_mm;
            }
            cursor += line_height;
            if let Some(page) = pages.last_mut() {
                page.push(line);
            }
        }
    }
    pages
}

fn wrap_line(line: &str, max_width: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut first = true;
    for word in line.split(' ') {
        let candidate = if first {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            first = false;
            continue;
        }
        if !first {
            out.push(std::mem::take(&mut current));
        }
        first = false;
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                out.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    out.push(current);
    out
}

fn latin1_fallback(line: &str) -> (String, bool) {
    let mut lossy = false;
    let converted = line
        .chars()
        .map(|ch| {
            if (ch as u32) <= 0xFF {
                ch
            } else {
                lossy = true;
                '?'
            }
        })
        .collect();
    (converted, lossy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_measure(line: &str) -> f32 {
        line.chars().count() as f32 * 10.0
    }

    #[test]
    fn short_lines_stay_on_one_page() {
        let pages = layout_pages("one\n\nthree", &PdfLayout::default(), &char_measure);
        assert_eq!(pages, vec![vec!["one".to_string(), String::new(), "three".to_string()]]);
    }

    #[test]
    fn long_lines_wrap_at_word_boundaries() {
        // usable width is 170mm, about 481pt, so 48 characters per line
        let word = "abcdefghi";
        let line = vec![word; 10].join(" ");
        let pages = layout_pages(&line, &PdfLayout::default(), &char_measure);
        let lines = &pages[0];
        assert!(lines.len() >= 2);
        for wrapped in lines {
            assert!(char_measure(wrapped) <= PdfLayout::default().usable_width_pt());
            assert!(!wrapped.starts_with(' '));
        }
        assert_eq!(lines.join(" "), line);
    }

    #[test]
    fn unbroken_text_is_split_between_characters() {
        let line = "字".repeat(120);
        let pages = layout_pages(&line, &PdfLayout::default(), &char_measure);
        assert!(pages[0].len() >= 3);
        assert_eq!(pages[0].concat(), line);
    }

    #[test]
    fn overflow_starts_new_pages() {
        let layout = PdfLayout::default();
        let per_page = ((layout.page_height_mm - layout.margin_mm * 2.0) / layout.line_height_mm()) as usize;
        let text = vec!["line"; per_page * 2 + 1].join("\n");
        let pages = layout_pages(&text, &layout, &char_measure);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), per_page);
        assert_eq!(pages[2].len(), 1);
    }

    #[test]
    fn rendered_pdf_is_readable() {
        let bytes = encode_pdf("Hello world\nSecond line", &PdfLayout::default(), None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("Hello"));
    }

    #[test]
    fn builtin_font_replaces_unsupported_characters() {
        assert_eq!(latin1_fallback("café 你好"), ("café ??".to_string(), true));
        assert_eq!(latin1_fallback("plain"), ("plain".to_string(), false));
    }
}
