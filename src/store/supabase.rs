use super::{RecordStore, StoreFuture, TranslationRecord};
use crate::error::PersistenceError;

/// Inserts records through the PostgREST interface of a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    table: String,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            table: table.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env(table: &str) -> Option<Self> {
        let url = env_value("SUPABASE_URL")?;
        let key = env_value("SUPABASE_ANON_KEY")?;
        Some(Self::new(url, key, table))
    }

    fn insert_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

impl RecordStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    fn append(&self, record: TranslationRecord) -> StoreFuture {
        let store = self.clone();
        Box::pin(async move {
            let response = store
                .client
                .post(store.insert_url())
                .header("apikey", &store.anon_key)
                .bearer_auth(&store.anon_key)
                .header("Prefer", "return=minimal")
                .json(&[record])
                .send()
                .await
                .map_err(|err| PersistenceError(format!("supabase request failed: {}", err)))?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(PersistenceError(format!(
                "supabase insert failed ({}): {}",
                status,
                body.trim()
            )))
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
