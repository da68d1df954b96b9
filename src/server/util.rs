use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::settings::ServerSettings;

/// Directory where uploads are spooled while a request is processed.
pub(crate) fn resolve_tmp_dir(settings: &ServerSettings) -> PathBuf {
    match settings.tmp_dir.as_deref() {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("llm-doc-translator"),
    }
}

pub(crate) fn ensure_tmp_dir(settings: &ServerSettings) -> Result<PathBuf> {
    let dir = resolve_tmp_dir(settings);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create tmp dir: {}", dir.display()))?;
    Ok(dir)
}
