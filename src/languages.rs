//! Languages offered in the form and their mapping onto the model's
//! language tokens.

use qwen3_tts::Language;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    /// Label shown in the language picker
    pub name: &'static str,
    /// Form value; regional codes resolve to the base language
    pub code: &'static str,
    #[serde(skip)]
    language: Language,
}

impl LanguageEntry {
    const fn new(name: &'static str, code: &'static str, language: Language) -> Self {
        Self {
            name,
            code,
            language,
        }
    }

    pub fn model_language(&self) -> Language {
        self.language
    }

    /// `fr-fr` -> `fr`
    pub fn base_code(&self) -> &'static str {
        self.code.split('-').next().unwrap_or(self.code)
    }
}

/// Picker order: the three original form languages first.
pub const SUPPORTED_LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry::new("English", "en", Language::English),
    LanguageEntry::new("French", "fr-fr", Language::French),
    LanguageEntry::new("Portuguese", "pt-br", Language::Portuguese),
    LanguageEntry::new("Spanish", "es", Language::Spanish),
    LanguageEntry::new("German", "de", Language::German),
    LanguageEntry::new("Italian", "it", Language::Italian),
    LanguageEntry::new("Russian", "ru", Language::Russian),
    LanguageEntry::new("Chinese", "zh", Language::Chinese),
    LanguageEntry::new("Japanese", "ja", Language::Japanese),
    LanguageEntry::new("Korean", "ko", Language::Korean),
];

pub const DEFAULT_LANGUAGE: &LanguageEntry = &SUPPORTED_LANGUAGES[0];

/// Find a language by code, display name or base code, ignoring case.
pub fn lookup(query: &str) -> Option<&'static LanguageEntry> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let base = query.split(['-', '_']).next().unwrap_or(query);

    SUPPORTED_LANGUAGES
        .iter()
        .find(|e| e.code.eq_ignore_ascii_case(query) || e.name.eq_ignore_ascii_case(query))
        .or_else(|| {
            SUPPORTED_LANGUAGES
                .iter()
                .find(|e| e.base_code().eq_ignore_ascii_case(base))
        })
}
