use std::path::Path;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOC_MIME: &str = "application/msword";
pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";
pub const MARKDOWN_MIME: &str = "text/markdown";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Extensions that are decoded as UTF-8 without any parser.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "csv", "tsv", "log", "json", "yaml", "yml", "xml", "html",
    "htm", "po", "srt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    Text,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Word => "word",
            DocumentKind::Text => "text",
        }
    }
}

/// Declared metadata of an upload: what the browser claimed, before looking at the bytes.
#[derive(Debug, Clone, Default)]
pub struct TypeHint {
    pub name: Option<String>,
    pub mime: Option<String>,
}

impl TypeHint {
    pub fn new(name: Option<&str>, mime: Option<&str>) -> Self {
        Self {
            name: name.map(|value| value.to_string()),
            mime: mime.map(|value| value.to_string()),
        }
    }

    pub fn extension(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Declared MIME without parameters; `application/octet-stream` carries no information.
    pub fn declared_mime(&self) -> Option<String> {
        let raw = self.mime.as_deref()?;
        let mime = raw.split(';').next().unwrap_or(raw).trim().to_lowercase();
        if mime.is_empty() || mime == OCTET_STREAM_MIME {
            return None;
        }
        Some(mime)
    }

    /// Human-readable label for error messages and logs.
    pub fn describe(&self) -> String {
        match (self.extension(), self.declared_mime()) {
            (Some(ext), Some(mime)) => format!(".{} ({})", ext, mime),
            (Some(ext), None) => format!(".{}", ext),
            (None, Some(mime)) => mime,
            (None, None) => "unknown".to_string(),
        }
    }
}

/// Resolves the document kind: extension first, then declared MIME, then the bytes.
pub fn resolve_kind(hint: &TypeHint, bytes: &[u8]) -> Option<DocumentKind> {
    if let Some(ext) = hint.extension() {
        if let Some(kind) = kind_from_extension(&ext) {
            return Some(kind);
        }
    }
    if let Some(mime) = hint.declared_mime() {
        if let Some(kind) = kind_from_mime(&mime) {
            return Some(kind);
        }
    }
    if hint.extension().is_some() || hint.declared_mime().is_some() {
        // something was declared and it is not one of ours
        return None;
    }
    sniff_kind(bytes)
}

pub fn kind_from_extension(ext: &str) -> Option<DocumentKind> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "docx" | "doc" => Some(DocumentKind::Word),
        other if TEXT_EXTENSIONS.contains(&other) => Some(DocumentKind::Text),
        _ => None,
    }
}

pub fn kind_from_mime(mime: &str) -> Option<DocumentKind> {
    let mime = mime.trim().to_lowercase();
    match mime.as_str() {
        PDF_MIME => Some(DocumentKind::Pdf),
        DOCX_MIME | DOC_MIME => Some(DocumentKind::Word),
        "application/json" | "application/xml" | "application/x-yaml" | "application/yaml" => {
            Some(DocumentKind::Text)
        }
        other if other.starts_with("text/") => Some(DocumentKind::Text),
        _ => None,
    }
}

/// Magic-byte detection for uploads that arrive without a name or type.
pub fn sniff_kind(bytes: &[u8]) -> Option<DocumentKind> {
    if let Some(kind) = infer::get(bytes) {
        return kind_from_mime(kind.mime_type());
    }
    if !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
        return Some(DocumentKind::Text);
    }
    None
}
