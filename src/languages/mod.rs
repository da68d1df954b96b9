use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::UploadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetLanguage {
    #[default]
    English,
    Chinese,
    Spanish,
    French,
    German,
    Japanese,
    Korean,
    Russian,
    Arabic,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 9] = [
        TargetLanguage::English,
        TargetLanguage::Chinese,
        TargetLanguage::Spanish,
        TargetLanguage::French,
        TargetLanguage::German,
        TargetLanguage::Japanese,
        TargetLanguage::Korean,
        TargetLanguage::Russian,
        TargetLanguage::Arabic,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::English => "en",
            TargetLanguage::Chinese => "zh",
            TargetLanguage::Spanish => "es",
            TargetLanguage::French => "fr",
            TargetLanguage::German => "de",
            TargetLanguage::Japanese => "ja",
            TargetLanguage::Korean => "ko",
            TargetLanguage::Russian => "ru",
            TargetLanguage::Arabic => "ar",
        }
    }

    /// English name, used both in the prompt and in the language selector.
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Chinese => "Chinese",
            TargetLanguage::Spanish => "Spanish",
            TargetLanguage::French => "French",
            TargetLanguage::German => "German",
            TargetLanguage::Japanese => "Japanese",
            TargetLanguage::Korean => "Korean",
            TargetLanguage::Russian => "Russian",
            TargetLanguage::Arabic => "Arabic",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = normalize_code(code);
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// Form-field semantics: blank means the default language, anything else must be known.
    pub fn parse_field(raw: Option<&str>) -> Result<Self, UploadError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::from_code(raw).ok_or_else(|| UploadError::UnsupportedLanguage(raw.trim().to_string()))
    }
}

impl Serialize for TargetLanguage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_field_defaults_to_english() {
        assert_eq!(
            TargetLanguage::parse_field(None).unwrap(),
            TargetLanguage::English
        );
        assert_eq!(
            TargetLanguage::parse_field(Some("  ")).unwrap(),
            TargetLanguage::English
        );
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(
            TargetLanguage::parse_field(Some(" ZH ")).unwrap(),
            TargetLanguage::Chinese
        );
        assert_eq!(TargetLanguage::from_code("ar"), Some(TargetLanguage::Arabic));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = TargetLanguage::parse_field(Some("xx")).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedLanguage(code) if code == "xx"));
    }

    #[test]
    fn serializes_as_code() {
        let value = serde_json::to_value(TargetLanguage::Japanese).unwrap();
        assert_eq!(value, serde_json::json!("ja"));
    }
}
