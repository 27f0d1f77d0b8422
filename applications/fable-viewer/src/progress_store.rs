/// JSON file progress store
///
/// All stories share one file holding a map of story id to saved record.
/// Each write rewrites the whole file through a temporary sibling so a crash
/// never leaves a truncated file behind.
use chrono::Utc;
use fable_core::{FableError, ProgressRecord, ProgressStore, ProgressUpdate, StoryId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

type ProgressFile = BTreeMap<StoryId, ProgressRecord>;

#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> fable_core::Result<ProgressFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(ProgressFile::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgressFile::new()),
            Err(e) => Err(FableError::storage(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, records: &ProgressFile) -> fable_core::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn read_progress(&self, story_id: &StoryId) -> fable_core::Result<Option<ProgressRecord>> {
        Ok(self.read_all()?.remove(story_id))
    }

    fn write_progress(
        &mut self,
        story_id: &StoryId,
        update: ProgressUpdate,
    ) -> fable_core::Result<()> {
        let mut records = self.read_all()?;
        let now = Utc::now();
        records
            .entry(story_id.clone())
            .and_modify(|record| record.apply(&update, now))
            .or_insert_with(|| ProgressRecord {
                story_id: story_id.clone(),
                current_page: update.current_page,
                is_completed: update.is_completed,
                last_read_at: now,
            });
        self.write_all(&records)?;

        tracing::debug!(
            story = %story_id,
            page = update.current_page,
            completed = update.is_completed,
            path = %self.path.display(),
            "Progress file updated"
        );
        Ok(())
    }
}
