/// Story bundles loaded from disk
use crate::error::{Result, ViewerError};
use fable_core::{FableError, Page, PageProvider, Story, StoryId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A story with all of its pages, as stored in a bundle file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryBundle {
    pub story: Story,
    pub pages: Vec<Page>,
}

impl StoryBundle {
    /// Read and check a bundle from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let bundle = Self::from_json(&contents)?;
        tracing::info!(
            story = %bundle.story.id,
            pages = bundle.pages.len(),
            path = %path.display(),
            "Story bundle loaded"
        );
        Ok(bundle)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut bundle: Self = serde_json::from_str(json)?;
        bundle.normalize()?;
        Ok(bundle)
    }

    /// Check the bundle and fix page indices to match file order
    fn normalize(&mut self) -> Result<()> {
        if self.pages.is_empty() {
            return Err(ViewerError::Story(format!(
                "story {} has no pages",
                self.story.id
            )));
        }

        if self.story.page_count != self.pages.len() {
            tracing::warn!(
                story = %self.story.id,
                declared = self.story.page_count,
                actual = self.pages.len(),
                "Page count mismatch, using bundled pages"
            );
            self.story.page_count = self.pages.len();
        }

        for (index, page) in self.pages.iter_mut().enumerate() {
            page.index = index;
            for (position, sentence) in page.sentences.iter_mut().enumerate() {
                sentence.index = position;
            }
        }

        Ok(())
    }

    /// Number of sentences with narration across the story
    pub fn narrated_sentences(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| &page.sentences)
            .filter(|sentence| sentence.audio.ko.is_some() || sentence.audio.en.is_some())
            .count()
    }
}

impl PageProvider for StoryBundle {
    fn get_page(&self, story_id: &StoryId, page_index: usize) -> fable_core::Result<Page> {
        if story_id != &self.story.id {
            return Err(FableError::not_found("Story", story_id.as_str()));
        }
        self.pages
            .get(page_index)
            .cloned()
            .ok_or_else(|| FableError::not_found("Page", format!("{story_id}/{page_index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fable_core::{Language, MediaType};

    const BUNDLE: &str = r#"{
        "story": {
            "id": "moon-rabbit",
            "title": { "ko": "달토끼", "en": "The Moon Rabbit" },
            "pageCount": 3,
            "bgm": "bgm/moon.mp3"
        },
        "pages": [
            {
                "index": 7,
                "sentences": [
                    {
                        "index": 0,
                        "text": { "ko": "옛날 옛적에", "en": "Once upon a time" },
                        "audio": { "ko": "p0s0.ko.mp3", "en": "p0s0.en.mp3" }
                    }
                ]
            },
            {
                "index": 1,
                "media": { "mediaType": "video", "video": "p1.mp4" }
            }
        ]
    }"#;

    #[test]
    fn test_bundle_parses_and_normalizes() {
        let bundle = StoryBundle::from_json(BUNDLE).unwrap();

        assert_eq!(bundle.story.page_count, 2);
        assert_eq!(bundle.pages[0].index, 0);
        assert!(bundle.pages[0].has_sentence_audio(Language::En));
        assert_eq!(bundle.pages[1].media.media_type, MediaType::Video);
        assert_eq!(bundle.narrated_sentences(), 1);
    }

    #[test]
    fn test_empty_bundle_rejected() {
        let json = r#"{ "story": { "id": "empty", "pageCount": 0 }, "pages": [] }"#;
        assert!(matches!(
            StoryBundle::from_json(json),
            Err(ViewerError::Story(_))
        ));
    }

    #[test]
    fn test_provider_serves_pages() {
        let bundle = StoryBundle::from_json(BUNDLE).unwrap();
        let id = StoryId::new("moon-rabbit");

        assert_eq!(bundle.get_page(&id, 1).unwrap().index, 1);
        assert!(bundle.get_page(&id, 2).is_err());
        assert!(bundle.get_page(&StoryId::new("other"), 0).is_err());
    }
}
