//! Client side of the upload screen: posts the selected file to `/api/translate`
//! and drives [`UploadState`] with the outcome.

use anyhow::{Context, Result, anyhow};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::languages::TargetLanguage;
use crate::reencode::{self, OutputFormat};
use crate::settings::ExportSettings;
use crate::ui::{GENERIC_FAILURE_MESSAGE, SelectedFile, UploadState};

/// Human-readable failure shown in the error state.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ClientError(pub String);

#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/translate", self.base_url)
    }

    pub async fn translate(
        &self,
        file: &SelectedFile,
        lang: TargetLanguage,
    ) -> Result<String, ClientError> {
        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(mime) = file.mime.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|err| ClientError(err.to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("targetLang", lang.code().to_string());

        debug!("uploading {} to {}", file.name, self.endpoint());
        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|err| ClientError(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError(err.to_string()))?;
        if !status.is_success() {
            return Err(ClientError(error_message_from_body(&body)));
        }
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|_| ClientError(GENERIC_FAILURE_MESSAGE.to_string()))?;
        value
            .get("translation")
            .and_then(|value| value.as_str())
            .map(|value| value.to_string())
            .ok_or_else(|| ClientError(GENERIC_FAILURE_MESSAGE.to_string()))
    }
}

/// Picks `error`, then `details`, from an error payload; falls back to a generic message.
pub fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return GENERIC_FAILURE_MESSAGE.to_string();
    };
    ["error", "details"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|value| value.as_str()))
        .map(|message| message.trim())
        .find(|message| !message.is_empty())
        .map(|message| message.to_string())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

#[derive(Debug, Clone)]
pub struct TranslateJob {
    pub path: PathBuf,
    pub lang: TargetLanguage,
    pub server: String,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct JobOutcome {
    pub translation: String,
    pub written: Option<PathBuf>,
}

/// Runs one pass of the upload screen from the command line. An unsupported file
/// never reaches the network.
pub async fn run_translate_job(job: &TranslateJob, export: &ExportSettings) -> Result<JobOutcome> {
    let file = SelectedFile::from_path(&job.path)?;
    let state = UploadState::default().select_file(file)?;
    if let UploadState::Idle { error } = &state {
        return Err(anyhow!(
            "{}",
            error.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE)
        ));
    }

    let state = state.submit()?;
    let client = UploadClient::new(job.server.clone());
    let result = match state.file() {
        Some(file) => client.translate(file, job.lang).await,
        None => Err(ClientError(GENERIC_FAILURE_MESSAGE.to_string())),
    };
    let state = match result {
        Ok(translation) => state.succeed(translation)?,
        Err(err) => state.fail(Some(err.0))?,
    };

    let (file, translation) = match state {
        UploadState::ResultShown { file, translation } => (file, translation),
        other => {
            return Err(anyhow!(
                "{}",
                other.error().unwrap_or(GENERIC_FAILURE_MESSAGE)
            ));
        }
    };

    let written = match job.format {
        Some(format) => Some(write_download(&translation, format, &file.name, job.output.as_deref(), export)?),
        None => None,
    };
    Ok(JobOutcome {
        translation,
        written,
    })
}

fn write_download(
    translation: &str,
    format: OutputFormat,
    source_name: &str,
    output: Option<&Path>,
    export: &ExportSettings,
) -> Result<PathBuf> {
    let encoded = reencode::reencode(translation, format, Some(source_name), export)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&encoded.file_name));
    std::fs::write(&path, &encoded.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("saved {} ({})", path.display(), encoded.mime);
    Ok(path)
}
