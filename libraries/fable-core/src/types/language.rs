/// Narration language and per-language values
use serde::{Deserialize, Serialize};

/// Narration and subtitle language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl Language {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ko" => Some(Self::Ko),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// The other language
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Ko => Self::En,
            Self::En => Self::Ko,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value that may exist separately for each language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Localized<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ko: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<T>,
}

// Manual impl so `T` does not need `Default`.
impl<T> Default for Localized<T> {
    fn default() -> Self {
        Self { ko: None, en: None }
    }
}

impl<T> Localized<T> {
    /// Value for both languages
    pub fn new(ko: Option<T>, en: Option<T>) -> Self {
        Self { ko, en }
    }

    /// Value for the given language, if any
    pub fn get(&self, language: Language) -> Option<&T> {
        match language {
            Language::Ko => self.ko.as_ref(),
            Language::En => self.en.as_ref(),
        }
    }

    /// Replace the value for one language
    pub fn set(&mut self, language: Language, value: T) {
        match language {
            Language::Ko => self.ko = Some(value),
            Language::En => self.en = Some(value),
        }
    }

    /// Whether a value exists for the given language
    pub fn has(&self, language: Language) -> bool {
        self.get(language).is_some()
    }
}

/// Text in both languages
pub type LocalizedText = Localized<String>;
