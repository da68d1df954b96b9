//! Finite-state model of the upload screen.
//!
//! One [`UploadState`] value is authoritative; transitions consume the old state
//! and return the next one, so a translating state without a file cannot exist.
//! A rejected transition hands the unchanged state back inside [`Rejected`].

use std::path::Path;

use crate::data;

pub const SUPPORTED_MIME_TYPES: [&str; 4] = [
    data::TEXT_MIME,
    data::PDF_MIME,
    data::DOC_MIME,
    data::DOCX_MIME,
];

pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".txt", ".pdf", ".doc", ".docx"];

pub const UNSUPPORTED_SELECTION_MESSAGE: &str =
    "Please upload a supported file type (.txt, .pdf, .doc, .docx)";

pub const GENERIC_FAILURE_MESSAGE: &str = "Translation failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = guess_mime(&name).map(|mime| mime.to_string());
        Ok(Self { name, mime, bytes })
    }
}

fn guess_mime(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    if lower.ends_with(".txt") {
        Some(data::TEXT_MIME)
    } else if lower.ends_with(".pdf") {
        Some(data::PDF_MIME)
    } else if lower.ends_with(".docx") {
        Some(data::DOCX_MIME)
    } else if lower.ends_with(".doc") {
        Some(data::DOC_MIME)
    } else {
        None
    }
}

/// A pick is accepted when either its MIME type or its extension is on the allow-list.
pub fn validate_selection(name: &str, mime: Option<&str>) -> Result<(), &'static str> {
    let mime_ok = mime
        .map(|mime| mime.split(';').next().unwrap_or(mime).trim().to_lowercase())
        .is_some_and(|mime| SUPPORTED_MIME_TYPES.contains(&mime.as_str()));
    let lower = name.to_lowercase();
    let ext_ok = SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext));
    if mime_ok || ext_ok {
        Ok(())
    } else {
        Err(UNSUPPORTED_SELECTION_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle { error: Option<String> },
    FileSelected { file: SelectedFile },
    Translating { file: SelectedFile },
    ResultShown { file: SelectedFile, translation: String },
    ErrorShown { file: SelectedFile, message: String },
}

impl Default for UploadState {
    fn default() -> Self {
        UploadState::Idle { error: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Selection is locked while a request is in flight.
    Busy,
    /// Submit was requested with no file selected.
    NoFile,
    /// A result arrived while nothing was being translated.
    NotTranslating,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::Busy => write!(f, "a translation is already in progress"),
            TransitionError::NoFile => write!(f, "no file selected"),
            TransitionError::NotTranslating => write!(f, "no translation in progress"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// A refused transition together with the state it was refused in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub state: UploadState,
    pub error: TransitionError,
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (state: {})", self.error, self.state.name())
    }
}

impl std::error::Error for Rejected {}

pub type Transition = Result<UploadState, Rejected>;

impl UploadState {
    fn reject(self, error: TransitionError) -> Transition {
        Err(Rejected { state: self, error })
    }
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle { .. } => "idle",
            UploadState::FileSelected { .. } => "file-selected",
            UploadState::Translating { .. } => "translating",
            UploadState::ResultShown { .. } => "result-shown",
            UploadState::ErrorShown { .. } => "error-shown",
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            UploadState::Idle { .. } => None,
            UploadState::FileSelected { file }
            | UploadState::Translating { file }
            | UploadState::ResultShown { file, .. }
            | UploadState::ErrorShown { file, .. } => Some(file),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadState::Idle { error } => error.as_deref(),
            UploadState::ErrorShown { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn translation(&self) -> Option<&str> {
        match self {
            UploadState::ResultShown { translation, .. } => Some(translation),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, UploadState::Translating { .. })
    }

    /// Replaces any previous file, result or error. An invalid pick returns to idle
    /// with the validation message and keeps no file.
    pub fn select_file(self, file: SelectedFile) -> Transition {
        if self.is_busy() {
            return self.reject(TransitionError::Busy);
        }
        match validate_selection(&file.name, file.mime.as_deref()) {
            Ok(()) => Ok(UploadState::FileSelected { file }),
            Err(message) => Ok(UploadState::Idle {
                error: Some(message.to_string()),
            }),
        }
    }

    /// Starts a translation of the selected file, or resubmits it after a failure.
    pub fn submit(self) -> Transition {
        match self {
            UploadState::FileSelected { file } | UploadState::ErrorShown { file, .. } => {
                Ok(UploadState::Translating { file })
            }
            UploadState::Translating { .. } => self.reject(TransitionError::Busy),
            _ => self.reject(TransitionError::NoFile),
        }
    }

    pub fn succeed(self, translation: String) -> Transition {
        match self {
            UploadState::Translating { file } => Ok(UploadState::ResultShown { file, translation }),
            _ => self.reject(TransitionError::NotTranslating),
        }
    }

    pub fn fail(self, message: Option<String>) -> Transition {
        match self {
            UploadState::Translating { file } => {
                let message = message
                    .map(|message| message.trim().to_string())
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                Ok(UploadState::ErrorShown { file, message })
            }
            _ => self.reject(TransitionError::NotTranslating),
        }
    }
}
