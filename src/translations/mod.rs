use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::languages::TargetLanguage;

const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system_prompt.tera");

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub lang: TargetLanguage,
    pub file_name: Option<String>,
}

impl TranslateOptions {
    pub fn new(lang: TargetLanguage) -> Self {
        Self {
            lang,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.file_name = Some(name);
        }
        self
    }
}

pub fn render_system_prompt(options: &TranslateOptions) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("target_name", options.lang.name());
    context.insert("target_code", options.lang.code());
    context.insert("file_name", &options.file_name);
    let rendered = Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render system prompt")?;
    Ok(rendered.trim_end().to_string())
}
