use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One cleaned transcript, persisted as a text file and ordered by
/// creation time.
#[derive(Debug, Clone)]
pub struct TranscriptArtifact {
    /// Timestamp key shared with the source recording (YYYYMMDDHHMMSS).
    pub key: String,
    /// Creation time; the ordering key for gap decisions.
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
    pub text: String,
}

/// In-memory, creation-ordered record of persisted transcripts.
///
/// The registry, not directory-listing order, is the source of truth
/// for ordering, so reordered persistence completions across tasks
/// cannot produce spurious gaps.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    artifacts: Vec<TranscriptArtifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist transcript text and record the artifact.
    ///
    /// The file is written under a temporary name and renamed into
    /// place, so a concurrent reader never observes a partial write.
    pub fn persist(
        &mut self,
        dir: &Path,
        key: &str,
        created_at: DateTime<Utc>,
        text: &str,
    ) -> Result<TranscriptArtifact> {
        let path = dir.join(format!("{}.txt", key));
        let tmp = dir.join(format!(".{}.txt.tmp", key));

        fs::write(&tmp, text)
            .with_context(|| format!("Failed to write transcript {:?}", tmp))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move transcript into place at {:?}", path))?;

        let artifact = TranscriptArtifact {
            key: key.to_string(),
            created_at,
            path,
            text: text.to_string(),
        };

        // Insert in creation order; completions may arrive reordered.
        let pos = self
            .artifacts
            .iter()
            .rposition(|a| a.created_at <= artifact.created_at)
            .map(|p| p + 1)
            .unwrap_or(0);
        self.artifacts.insert(pos, artifact.clone());

        Ok(artifact)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// The most recently created artifact.
    pub fn newest(&self) -> Option<&TranscriptArtifact> {
        self.artifacts.last()
    }

    /// The artifact created immediately before the newest one.
    pub fn previous(&self) -> Option<&TranscriptArtifact> {
        self.artifacts.len().checked_sub(2).map(|i| &self.artifacts[i])
    }

    /// Text of every artifact older than the newest, in creation order.
    pub fn combined_older_text(&self) -> String {
        let older = self.artifacts.len().saturating_sub(1);
        self.artifacts[..older]
            .iter()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every artifact older than the newest and delete its file.
    ///
    /// A file that fails to delete is logged and skipped: its registry
    /// entry is gone either way, since keeping it would re-upsert the
    /// same content on the next flush.
    pub fn consume_older(&mut self) -> usize {
        let older = self.artifacts.len().saturating_sub(1);
        for artifact in self.artifacts.drain(..older) {
            if let Err(e) = fs::remove_file(&artifact.path) {
                warn!("Failed to remove transcript {:?}: {}", artifact.path, e);
            }
        }
        older
    }
}
