use tracing::{debug, info};

use crate::error::TranslationError;
use crate::providers::{Provider, ProviderUsage};
use crate::translations::{self, TranslateOptions};

#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// One chat-completion call for the whole text; no chunking and no retry.
    pub async fn exec(
        &self,
        input: &str,
        options: &TranslateOptions,
    ) -> Result<ExecutionOutput, TranslationError> {
        let system_prompt = translations::render_system_prompt(options)
            .map_err(|err| TranslationError::NotConfigured(format!("{:#}", err)))?;
        debug!(
            "translating {} chars into {}",
            input.chars().count(),
            options.lang.code()
        );
        let response = self
            .provider
            .clone()
            .append_system_input(system_prompt)
            .append_user_input(input.to_string())
            .complete()
            .await?;
        info!(
            "translation finished (model: {}, tokens: {})",
            response.model.as_deref().unwrap_or("unavailable"),
            format_usage(response.usage.as_ref())
        );
        Ok(ExecutionOutput {
            text: response.content,
            model: response.model,
            usage: response.usage,
        })
    }
}

fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "unavailable".to_string()
    } else {
        parts.join(", ")
    }
}
