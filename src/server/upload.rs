//! Normalises a multipart upload into one typed [`UploadRequest`].

use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::data::TypeHint;
use crate::error::UploadError;
use crate::languages::TargetLanguage;

const FILE_FIELD: &str = "file";
const LANG_FIELDS: [&str; 3] = ["targetLang", "target_lang", "lang"];

/// Upload spooled to disk. The temp file is removed when this value is dropped.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    name: Option<String>,
    mime: Option<String>,
    size: u64,
    spool: NamedTempFile,
}

impl UploadedFile {
    pub(crate) fn path(&self) -> &Path {
        self.spool.path()
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("upload")
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn hint(&self) -> TypeHint {
        TypeHint::new(self.name.as_deref(), self.mime.as_deref())
    }
}

#[derive(Debug)]
pub(crate) struct UploadRequest {
    pub(crate) file: UploadedFile,
    pub(crate) target: TargetLanguage,
}

pub(crate) async fn normalize_upload(
    multipart: Result<Multipart, MultipartRejection>,
    spool_dir: &Path,
) -> Result<UploadRequest, UploadError> {
    let mut multipart = multipart.map_err(|err| UploadError::InvalidRequest(err.body_text()))?;
    let mut file: Option<UploadedFile> = None;
    let mut target: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field
                .file_name()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            let mime = field.content_type().map(|value| value.to_string());
            let spool = NamedTempFile::new_in(spool_dir)
                .map_err(|err| UploadError::Spool(format!("{}: {}", spool_dir.display(), err)))?;
            let handle = spool
                .reopen()
                .map_err(|err| UploadError::Spool(err.to_string()))?;
            let mut writer = tokio::fs::File::from_std(handle);
            let mut size = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                size += chunk.len() as u64;
                writer
                    .write_all(&chunk)
                    .await
                    .map_err(|err| UploadError::Spool(err.to_string()))?;
            }
            writer
                .flush()
                .await
                .map_err(|err| UploadError::Spool(err.to_string()))?;

            if file_name.is_none() && size == 0 {
                // browsers send an empty unnamed part when nothing was picked
                debug!("ignoring empty file part");
                continue;
            }
            if file.is_some() {
                return Err(UploadError::MultipleFiles);
            }
            file = Some(UploadedFile {
                name: file_name,
                mime,
                size,
                spool,
            });
        } else if LANG_FIELDS.contains(&name.as_str()) {
            target = Some(field.text().await.map_err(multipart_error)?);
        } else {
            debug!("ignoring multipart field {:?}", name);
            while field.chunk().await.map_err(multipart_error)?.is_some() {}
        }
    }

    let file = file.ok_or(UploadError::MissingFile)?;
    let target = TargetLanguage::parse_field(target.as_deref())?;
    Ok(UploadRequest { file, target })
}

fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge(err.body_text())
    } else {
        UploadError::InvalidRequest(err.body_text())
    }
}
