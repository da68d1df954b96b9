use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{RecordStore, StoreFuture, TranslationRecord};
use crate::error::PersistenceError;

/// One JSON object per line, opened in append mode for every write.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonlStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn append(&self, record: TranslationRecord) -> StoreFuture {
        let path = self.path.clone();
        let lock = self.lock.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || append_line(&path, &lock, &record))
                .await
                .map_err(|err| PersistenceError(format!("store task failed: {}", err)))?
        })
    }
}

fn append_line(
    path: &Path,
    lock: &Mutex<()>,
    record: &TranslationRecord,
) -> Result<(), PersistenceError> {
    let mut line = serde_json::to_string(record)
        .map_err(|err| PersistenceError(format!("failed to serialize record: {}", err)))?;
    line.push('\n');

    let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                PersistenceError(format!("failed to create {}: {}", parent.display(), err))
            })?;
        }
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| PersistenceError(format!("failed to open {}: {}", path.display(), err)))?;
    file.write_all(line.as_bytes())
        .map_err(|err| PersistenceError(format!("failed to write {}: {}", path.display(), err)))
}
