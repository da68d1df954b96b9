use thiserror::Error;

/// Failures while turning an uploaded file into plain text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("failed to extract text: {0}")]
    Extraction(String),
}

/// Failures of the outbound chat-completion call. None of these are retried.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation service is not configured: {0}")]
    NotConfigured(String),

    #[error("translation service error: {0}")]
    Service(String),

    #[error("invalid response from translation service: {0}")]
    InvalidResponseFormat(String),
}

/// Everything that can abort a single upload request.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file uploaded")]
    MissingFile,

    #[error("only one file can be uploaded at a time")]
    MultipleFiles,

    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    #[error("upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    #[error("no text content found in file")]
    EmptyContent,

    #[error("failed to spool upload: {0}")]
    Spool(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// Audit-log write failure. Logged by the caller and never surfaced to the client.
#[derive(Debug, Error)]
#[error("failed to persist translation record: {0}")]
pub struct PersistenceError(pub String);
