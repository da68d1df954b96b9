use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};

use crate::error::{ExtractError, TranslationError, UploadError};
use crate::extract::{Extracted, extract_text};
use crate::providers::Provider;
use crate::store::TranslationRecord;
use crate::translations::TranslateOptions;

use super::models::{ErrorResponse, TranslateResponse};
use super::state::ServerState;
use super::upload::{UploadRequest, UploadedFile};

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) details: Option<String>,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub(crate) fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.trim().is_empty() {
            self.details = Some(details);
        }
        self
    }
}

impl From<UploadError> for ServerError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => ServerError::bad_request("No file uploaded"),
            UploadError::MultipleFiles => {
                ServerError::bad_request("Only one file can be uploaded at a time")
            }
            UploadError::InvalidRequest(details) => {
                ServerError::bad_request("Invalid upload request").with_details(details)
            }
            UploadError::PayloadTooLarge(details) => ServerError {
                status: StatusCode::PAYLOAD_TOO_LARGE,
                message: "Uploaded file is too large".to_string(),
                details: None,
            }
            .with_details(details),
            UploadError::UnsupportedLanguage(code) => {
                ServerError::bad_request(format!("Unsupported target language: {}", code))
            }
            UploadError::EmptyContent => ServerError::bad_request("No text content found in file"),
            UploadError::Spool(details) => {
                ServerError::internal("Failed to store upload").with_details(details)
            }
            UploadError::Extract(ExtractError::UnsupportedFileType(details)) => {
                ServerError::bad_request("Unsupported file type").with_details(details)
            }
            UploadError::Extract(ExtractError::Extraction(details)) => {
                ServerError::bad_request("Failed to extract text from file").with_details(details)
            }
            UploadError::Translation(TranslationError::NotConfigured(details)) => {
                ServerError::internal("Translation service not configured").with_details(details)
            }
            UploadError::Translation(TranslationError::Service(details)) => {
                ServerError::internal("Translation service error").with_details(details)
            }
            UploadError::Translation(TranslationError::InvalidResponseFormat(details)) => {
                ServerError::internal("Invalid response from translation service")
                    .with_details(details)
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                details: self.details,
            }),
        )
            .into_response()
    }
}

/// Extract, check, translate, then record. The spooled file lives until this returns.
pub(crate) async fn translate_upload<P: Provider>(
    state: &ServerState<P>,
    request: UploadRequest,
) -> Result<TranslateResponse, UploadError> {
    let UploadRequest { file, target } = request;
    info!(
        "received {} ({} bytes), target {}",
        file.display_name(),
        file.size(),
        target
    );

    let extracted = match extract_upload(&file).await {
        Ok(extracted) => extracted,
        Err(err) => {
            error!("extraction failed for {}: {}", file.display_name(), err);
            return Err(err.into());
        }
    };
    if extracted.text.trim().is_empty() {
        warn!("{} has no text content", file.display_name());
        return Err(UploadError::EmptyContent);
    }

    let mut options = TranslateOptions::new(target);
    if let Some(name) = file.name() {
        options = options.with_file_name(name);
    }
    let output = match state.translator.exec(&extracted.text, &options).await {
        Ok(output) => output,
        Err(err) => {
            error!("translation failed for {}: {}", file.display_name(), err);
            return Err(err.into());
        }
    };

    let record = TranslationRecord::new(
        extracted.text,
        output.text.clone(),
        target,
        file.display_name(),
    );
    if let Err(err) = state.store.append(record).await {
        warn!("{} ({} store)", err, state.store.name());
    }

    Ok(TranslateResponse {
        translation: output.text,
    })
}

async fn extract_upload(file: &UploadedFile) -> Result<Extracted, ExtractError> {
    let path = file.path().to_path_buf();
    let hint = file.hint();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path)
            .map_err(|err| ExtractError::Extraction(format!("failed to read upload: {}", err)))?;
        extract_text(&bytes, &hint)
    })
    .await
    .map_err(|err| ExtractError::Extraction(format!("extraction task failed: {}", err)))?
}
