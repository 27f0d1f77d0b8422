/// Story page and sentence types
use super::{Language, Localized, LocalizedText};
use serde::{Deserialize, Serialize};

/// Reference to a remote media asset (audio, image or video)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    /// Create a media reference from a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Get the URL
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visual media kind shown on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Visual media of a page
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMedia {
    /// Whether the page shows a still image or a video
    #[serde(default)]
    pub media_type: MediaType,

    /// Still image (also the poster frame for video pages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaRef>,

    /// Video clip, only meaningful when `media_type` is `Video`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaRef>,
}

/// One narrated sentence of a page
///
/// A sentence without audio for the active language is skipped during
/// playback but keeps its slot in the ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    /// Position within the page (0-based)
    pub index: usize,

    /// Subtitle text
    #[serde(default)]
    pub text: LocalizedText,

    /// Narration clip per language
    #[serde(default)]
    pub audio: Localized<MediaRef>,
}

impl Sentence {
    /// Create a sentence with text in both languages and no audio
    pub fn new(index: usize, ko: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            index,
            text: LocalizedText::new(Some(ko.into()), Some(en.into())),
            audio: Localized::default(),
        }
    }

    /// Attach a narration clip for one language
    #[must_use]
    pub fn with_audio(mut self, language: Language, audio: MediaRef) -> Self {
        self.audio.set(language, audio);
        self
    }

    /// Narration clip for the given language
    pub fn audio_for(&self, language: Language) -> Option<&MediaRef> {
        self.audio.get(language)
    }
}

/// A story page
///
/// Pages are fetched once per story and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Position within the story (0-based)
    pub index: usize,

    /// Legacy whole-page narration, used when no sentence has audio
    #[serde(default)]
    pub narration: Localized<MediaRef>,

    /// Image or video shown on the page
    #[serde(default)]
    pub media: PageMedia,

    /// Sentences in reading order
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

impl Page {
    /// Create an empty image page
    pub fn new(index: usize) -> Self {
        Self {
            index,
            narration: Localized::default(),
            media: PageMedia::default(),
            sentences: Vec::new(),
        }
    }

    /// Append a sentence
    #[must_use]
    pub fn with_sentence(mut self, sentence: Sentence) -> Self {
        self.sentences.push(sentence);
        self
    }

    /// Set the legacy page narration for one language
    #[must_use]
    pub fn with_narration(mut self, language: Language, audio: MediaRef) -> Self {
        self.narration.set(language, audio);
        self
    }

    /// Turn this page into a video page
    #[must_use]
    pub fn with_video(mut self, video: MediaRef) -> Self {
        self.media.media_type = MediaType::Video;
        self.media.video = Some(video);
        self
    }

    /// Video clip to play, if this is a video page with a video asset
    pub fn video(&self) -> Option<&MediaRef> {
        match self.media.media_type {
            MediaType::Video => self.media.video.as_ref(),
            MediaType::Image => None,
        }
    }

    /// Whether any sentence has audio for the language
    pub fn has_sentence_audio(&self, language: Language) -> bool {
        self.sentences.iter().any(|s| s.audio.has(language))
    }

    /// Legacy whole-page narration for the language
    pub fn legacy_audio(&self, language: Language) -> Option<&MediaRef> {
        self.narration.get(language)
    }
}
