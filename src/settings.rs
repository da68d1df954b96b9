use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub translation: TranslationSettings,
    pub store: StoreSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: String,
    pub tmp_dir: Option<String>,
    pub max_upload_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            tmp_dir: None,
            max_upload_mb: 20,
        }
    }
}

impl ServerSettings {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub api_key_env: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.3,
            max_tokens: None,
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    None,
    Jsonl,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub path: Option<String>,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::None,
            path: None,
            table: "translations".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub font_path: Option<String>,
    pub font_size: f32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 11.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    server: Option<ServerSection>,
    translation: Option<TranslationSection>,
    store: Option<StoreSection>,
    export: Option<ExportSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    tmp_dir: Option<String>,
    max_upload_mb: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSection {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    api_key_env: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSection {
    kind: Option<String>,
    path: Option<String>,
    table: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportSection {
    font_path: Option<String>,
    font_size: Option<f32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))?)?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed = parse_settings(&content, &path)?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", path.display()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server.addr = addr;
                }
            }
            if let Some(dir) = server.tmp_dir {
                if !dir.trim().is_empty() {
                    self.server.tmp_dir = Some(dir);
                }
            }
            if let Some(limit) = server.max_upload_mb {
                if limit > 0 {
                    self.server.max_upload_mb = limit;
                }
            }
        }
        if let Some(translation) = incoming.translation {
            if let Some(url) = translation.base_url {
                if !url.trim().is_empty() {
                    self.translation.base_url = url;
                }
            }
            if let Some(model) = translation.model {
                if !model.trim().is_empty() {
                    self.translation.model = model;
                }
            }
            if let Some(temperature) = translation.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(anyhow!(
                        "translation.temperature must be between 0 and 2 (got {})",
                        temperature
                    ));
                }
                self.translation.temperature = temperature;
            }
            if let Some(max_tokens) = translation.max_tokens {
                self.translation.max_tokens = (max_tokens > 0).then_some(max_tokens);
            }
            if let Some(env) = translation.api_key_env {
                if !env.trim().is_empty() {
                    self.translation.api_key_env = env;
                }
            }
        }
        if let Some(store) = incoming.store {
            if let Some(kind) = store.kind {
                self.store.kind = parse_store_kind(&kind)?;
            }
            if let Some(path) = store.path {
                if !path.trim().is_empty() {
                    self.store.path = Some(path);
                }
            }
            if let Some(table) = store.table {
                if !table.trim().is_empty() {
                    self.store.table = table;
                }
            }
        }
        if let Some(export) = incoming.export {
            if let Some(path) = export.font_path {
                if !path.trim().is_empty() {
                    self.export.font_path = Some(path);
                }
            }
            if let Some(size) = export.font_size {
                if size > 0.0 {
                    self.export.font_size = size;
                }
            }
        }
        Ok(())
    }
}

fn parse_store_kind(raw: &str) -> Result<StoreKind> {
    match raw.trim().to_lowercase().as_str() {
        "" | "none" | "off" => Ok(StoreKind::None),
        "jsonl" | "file" => Ok(StoreKind::Jsonl),
        "supabase" => Ok(StoreKind::Supabase),
        other => Err(anyhow!(
            "unknown store kind '{}' (expected none, jsonl or supabase)",
            other
        )),
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".llm-doc-translator"))
        }
    })
}
