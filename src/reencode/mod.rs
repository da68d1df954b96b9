//! Re-encoding of translated text into downloadable files.

use anyhow::{Result, anyhow};
use std::path::Path;

use crate::data;
use crate::settings::ExportSettings;

mod docx;
mod font;
mod pdf;

pub use docx::encode_docx;
pub use font::{FontMetrics, load_font_metrics, resolve_export_font};
pub use pdf::{PdfLayout, encode_pdf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Txt,
    Md,
    Docx,
    Pdf,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Txt,
        OutputFormat::Md,
        OutputFormat::Docx,
        OutputFormat::Pdf,
    ];

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "md" | "markdown" => Ok(OutputFormat::Md),
            "docx" | "word" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(anyhow!(
                "unsupported output format '{}' (expected txt, md, docx or pdf)",
                other
            )),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Md => "md",
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "text/plain; charset=utf-8",
            OutputFormat::Md => "text/markdown; charset=utf-8",
            OutputFormat::Docx => data::DOCX_MIME,
            OutputFormat::Pdf => data::PDF_MIME,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
}

/// `translated_<stem>.<ext>`, or `translation.<ext>` when the source name is unknown.
pub fn download_file_name(source_name: Option<&str>, format: OutputFormat) -> String {
    let stem = source_name
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name))
        .and_then(|name| Path::new(name).file_stem().and_then(|stem| stem.to_str()))
        .map(|stem| stem.trim())
        .filter(|stem| !stem.is_empty());
    match stem {
        Some(stem) => format!("translated_{}.{}", stem, format.extension()),
        None => format!("translation.{}", format.extension()),
    }
}

pub fn reencode(
    text: &str,
    format: OutputFormat,
    source_name: Option<&str>,
    settings: &ExportSettings,
) -> Result<Encoded> {
    let bytes = match format {
        OutputFormat::Txt | OutputFormat::Md => text.as_bytes().to_vec(),
        OutputFormat::Docx => encode_docx(text)?,
        OutputFormat::Pdf => {
            let font = resolve_export_font(text, settings.font_path.as_deref().map(Path::new))?;
            let layout = PdfLayout {
                font_size: settings.font_size,
                ..PdfLayout::default()
            };
            encode_pdf(text, &layout, font.as_ref())?
        }
    };
    Ok(Encoded {
        bytes,
        file_name: download_file_name(source_name, format),
        mime: format.mime(),
    })
}
