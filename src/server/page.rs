use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::languages::TargetLanguage;
use crate::reencode::OutputFormat;
use crate::settings::Settings;
use crate::ui;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");

#[derive(Serialize)]
struct LanguageOption {
    code: &'static str,
    name: &'static str,
    selected: bool,
}

/// Renders the upload page once at startup; the allow-lists come from [`ui`].
pub(crate) fn render_index(settings: &Settings) -> Result<String> {
    let languages: Vec<LanguageOption> = TargetLanguage::ALL
        .iter()
        .map(|lang| LanguageOption {
            code: lang.code(),
            name: lang.name(),
            selected: *lang == TargetLanguage::default(),
        })
        .collect();
    let formats: Vec<&str> = OutputFormat::ALL.iter().map(|format| format.extension()).collect();

    let mut context = TeraContext::new();
    context.insert("languages", &languages);
    context.insert("formats", &formats);
    context.insert("accept", &ui::SUPPORTED_EXTENSIONS.join(","));
    context.insert("max_upload_mb", &settings.server.max_upload_mb);
    context.insert("extensions_json", &serde_json::to_string(&ui::SUPPORTED_EXTENSIONS)?);
    context.insert("mime_types_json", &serde_json::to_string(&ui::SUPPORTED_MIME_TYPES)?);
    context.insert(
        "unsupported_message_json",
        &serde_json::to_string(ui::UNSUPPORTED_SELECTION_MESSAGE)?,
    );
    context.insert(
        "generic_failure_json",
        &serde_json::to_string(ui::GENERIC_FAILURE_MESSAGE)?,
    );
    Tera::one_off(INDEX_TEMPLATE, &context, false).with_context(|| "failed to render index page")
}
