//! Optional audit log of completed translations.
//!
//! Records are append-only: a store can add a record, never change or delete one.

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::languages::TargetLanguage;
use crate::settings::{self, StoreKind, StoreSettings};

mod jsonl;
mod supabase;

pub use jsonl::JsonlStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Clone, Serialize)]
pub struct TranslationRecord {
    original_text: String,
    translated_text: String,
    target_language: TargetLanguage,
    file_name: String,
    created_at: String,
}

impl TranslationRecord {
    pub fn new(
        original_text: impl Into<String>,
        translated_text: impl Into<String>,
        target_language: TargetLanguage,
        file_name: impl Into<String>,
    ) -> Self {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string());
        Self {
            original_text: original_text.into(),
            translated_text: translated_text.into(),
            target_language,
            file_name: file_name.into(),
            created_at,
        }
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn translated_text(&self) -> &str {
        &self.translated_text
    }

    pub fn target_language(&self) -> TargetLanguage {
        self.target_language
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }
}

pub type StoreFuture = Pin<Box<dyn Future<Output = Result<(), PersistenceError>> + Send>>;

pub trait RecordStore: Send + Sync {
    fn name(&self) -> &'static str;
    fn append(&self, record: TranslationRecord) -> StoreFuture;
}

/// Store used when persistence is switched off.
#[derive(Debug, Clone, Default)]
pub struct NoopStore;

impl RecordStore for NoopStore {
    fn name(&self) -> &'static str {
        "none"
    }

    fn append(&self, _record: TranslationRecord) -> StoreFuture {
        Box::pin(async { Ok(()) })
    }
}

pub fn build_store(config: &StoreSettings) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.kind {
        StoreKind::None => Arc::new(NoopStore),
        StoreKind::Jsonl => {
            let path = match config.path.as_deref() {
                Some(path) => PathBuf::from(path),
                None => settings::home_dir()
                    .map(|dir| dir.join("translations.jsonl"))
                    .ok_or_else(|| anyhow!("store.path is not set and HOME is unavailable"))?,
            };
            Arc::new(JsonlStore::new(path))
        }
        StoreKind::Supabase => match SupabaseStore::from_env(&config.table) {
            Some(store) => Arc::new(store),
            None => {
                warn!("store kind is supabase but SUPABASE_URL/SUPABASE_ANON_KEY are not set; records will not be persisted");
                Arc::new(NoopStore)
            }
        },
    };
    info!("translation records store: {}", store.name());
    Ok(store)
}
