use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Message, Provider, ProviderFuture, ProviderResponse, ProviderUsage};
use crate::error::TranslationError;

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TEMPERATURE: f64 = 0.3;

/// Client for any endpoint speaking the OpenAI `chat/completions` dialect.
#[derive(Debug, Clone)]
pub struct OpenAICompatible {
    key: Option<String>,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
    messages: Vec<Message>,
    client: reqwest::Client,
}

impl OpenAICompatible {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|value| !value.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            messages: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    fn request_body(&self) -> Value {
        let messages = self
            .messages
            .iter()
            .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
            .collect::<Vec<_>>();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

impl Provider for OpenAICompatible {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn complete(self) -> ProviderFuture {
        Box::pin(async move { call_chat_completions(self).await })
    }
}

async fn call_chat_completions(provider: OpenAICompatible) -> Result<ProviderResponse, TranslationError> {
    let Some(key) = provider.key.clone() else {
        return Err(TranslationError::NotConfigured(
            "no API key found for the translation service".to_string(),
        ));
    };
    let url = format!("{}/chat/completions", provider.base_url);
    let body = provider.request_body();
    debug!("POST {} (model {})", url, provider.model);

    let response = provider
        .client
        .post(&url)
        .bearer_auth(key)
        .json(&body)
        .send()
        .await
        .map_err(|err| TranslationError::Service(format!("request failed: {}", err)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| TranslationError::Service(format!("failed to read response: {}", err)))?;
    if !status.is_success() {
        return Err(TranslationError::Service(format!(
            "API error ({}): {}",
            status,
            extract_api_error(&text).unwrap_or(text)
        )));
    }
    extract_completion(&text, &provider.model)
}

pub(crate) fn extract_completion(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, TranslationError> {
    let payload: ChatResponse = serde_json::from_str(text).map_err(|err| {
        TranslationError::InvalidResponseFormat(format!("response is not valid JSON: {}", err))
    })?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            TranslationError::InvalidResponseFormat(
                "choices[0].message.content is missing".to_string(),
            )
        })?;
    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse {
        content,
        model,
        usage,
    })
}

fn extract_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ApiError>,
    }

    #[derive(Deserialize)]
    struct ApiError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<Value>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let code = error.code.map(|code| match code {
        Value::String(value) => value,
        other => other.to_string(),
    });
    Some(format_error_parts(error.message, error.kind, code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message {
        if !message.trim().is_empty() {
            parts.push(message);
        }
    }
    if let Some(kind) = kind {
        if !kind.trim().is_empty() {
            parts.push(format!("type: {}", kind));
        }
    }
    if let Some(code) = code {
        if !code.trim().is_empty() {
            parts.push(format!("code: {}", code));
        }
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}
