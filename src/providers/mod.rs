use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::error::TranslationError;
use crate::settings::TranslationSettings;

mod openai;

pub use openai::OpenAICompatible;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

pub type ProviderFuture =
    Pin<Box<dyn Future<Output = Result<ProviderResponse, TranslationError>> + Send>>;

/// A chat-completion backend. Builders consume `self` so a configured provider can be
/// cloned per request and extended without shared mutable state.
pub trait Provider: Clone + Send + Sync + 'static {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn complete(self) -> ProviderFuture;
}

/// Builds the configured chat-completion provider. A missing key is allowed here and
/// reported on the first call instead.
pub fn build_provider(settings: &TranslationSettings) -> OpenAICompatible {
    let key = resolve_key(&settings.api_key_env);
    let base_url = get_env("TRANSLATION_API_BASE_URL").unwrap_or_else(|| settings.base_url.clone());
    let mut provider = OpenAICompatible::new(key)
        .with_base_url(base_url)
        .with_model(settings.model.clone())
        .with_temperature(settings.temperature);
    if let Some(max_tokens) = settings.max_tokens {
        provider = provider.with_max_tokens(max_tokens);
    }
    provider
}

pub fn resolve_key(env_name: &str) -> Option<String> {
    get_env(env_name).or_else(|| get_env("TRANSLATION_API_KEY"))
}

fn get_env(key: &str) -> Option<String> {
    if key.trim().is_empty() {
        return None;
    }
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
