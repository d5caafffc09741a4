// Tests for the time-gap batching decision.
//
// The gate compares creation times of the two most recent transcripts;
// a flush only clears artifacts after the indexer reports success.

use ambient_scribe::{ArtifactRegistry, BatchDecision, BatchGate, DocumentIndexer, PipelineError};
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Indexer double: records the documents it was asked to upsert and
/// optionally fails every call.
struct RecordingIndexer {
    fail: bool,
    calls: std::sync::Mutex<Vec<String>>,
}

impl RecordingIndexer {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            calls: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DocumentIndexer for RecordingIndexer {
    async fn upsert(&self, document: &str) -> Result<usize, PipelineError> {
        if self.fail {
            return Err(PipelineError::Indexing("mock failure".into()));
        }
        self.calls.lock().unwrap().push(document.to_string());
        if document.trim().is_empty() {
            Ok(0)
        } else {
            Ok(1)
        }
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

async fn persist(
    registry: &Arc<Mutex<ArtifactRegistry>>,
    dir: &TempDir,
    key: &str,
    offset_secs: i64,
    text: &str,
) -> Result<()> {
    let created_at = base_time() + chrono::Duration::seconds(offset_secs);
    registry
        .lock()
        .await
        .persist(dir.path(), key, created_at, text)?;
    Ok(())
}

#[tokio::test]
async fn no_decision_without_two_artifacts() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let indexer = RecordingIndexer::new(false);
    let gate = BatchGate::new(Arc::clone(&registry), indexer.clone(), 10);

    assert_eq!(gate.on_artifact().await, BatchDecision::Insufficient);

    persist(&registry, &dir, "20260101120000", 0, "first note").await?;
    assert_eq!(gate.on_artifact().await, BatchDecision::Insufficient);
    assert!(indexer.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn gap_below_delay_holds_the_batch() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let indexer = RecordingIndexer::new(false);
    let gate = BatchGate::new(Arc::clone(&registry), indexer.clone(), 10);

    persist(&registry, &dir, "20260101120000", 0, "first note").await?;
    persist(&registry, &dir, "20260101120005", 5, "second note").await?;

    assert_eq!(gate.on_artifact().await, BatchDecision::Hold { gap_secs: 5 });
    assert!(indexer.calls().is_empty());
    assert_eq!(registry.lock().await.len(), 2);
    assert!(dir.path().join("20260101120000.txt").exists());
    assert!(dir.path().join("20260101120005.txt").exists());

    Ok(())
}

#[tokio::test]
async fn gap_above_delay_flushes_and_clears_older_artifacts() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let indexer = RecordingIndexer::new(false);
    let gate = BatchGate::new(Arc::clone(&registry), indexer.clone(), 10);

    persist(&registry, &dir, "20260101120000", 0, "first note").await?;
    persist(&registry, &dir, "20260101120015", 15, "second note").await?;

    assert_eq!(gate.on_artifact().await, BatchDecision::Flushed { chunks: 1 });

    // Only the older artifact was combined and consumed.
    assert_eq!(indexer.calls(), vec!["first note".to_string()]);
    assert!(!dir.path().join("20260101120000.txt").exists());
    assert!(dir.path().join("20260101120015.txt").exists());
    assert_eq!(registry.lock().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn indexing_failure_retains_artifacts_for_retry() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let failing = RecordingIndexer::new(true);
    let gate = BatchGate::new(Arc::clone(&registry), failing, 10);

    persist(&registry, &dir, "20260101120000", 0, "first note").await?;
    persist(&registry, &dir, "20260101120015", 15, "second note").await?;

    assert_eq!(gate.on_artifact().await, BatchDecision::Retained);
    assert!(dir.path().join("20260101120000.txt").exists());
    assert_eq!(registry.lock().await.len(), 2);

    // The next evaluation retries the same content once indexing recovers.
    let working = RecordingIndexer::new(false);
    let retry_gate = BatchGate::new(Arc::clone(&registry), working.clone(), 10);
    assert_eq!(retry_gate.on_artifact().await, BatchDecision::Flushed { chunks: 1 });
    assert_eq!(working.calls(), vec!["first note".to_string()]);
    assert!(!dir.path().join("20260101120000.txt").exists());

    Ok(())
}

#[tokio::test]
async fn combined_document_preserves_creation_order() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let indexer = RecordingIndexer::new(false);
    let gate = BatchGate::new(Arc::clone(&registry), indexer.clone(), 10);

    persist(&registry, &dir, "20260101120000", 0, "alpha").await?;
    persist(&registry, &dir, "20260101120002", 2, "bravo").await?;
    persist(&registry, &dir, "20260101120020", 20, "charlie").await?;

    assert_eq!(gate.on_artifact().await, BatchDecision::Flushed { chunks: 1 });
    assert_eq!(indexer.calls(), vec!["alpha\nbravo".to_string()]);
    assert_eq!(registry.lock().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn empty_batch_content_flushes_with_zero_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
    let indexer = RecordingIndexer::new(false);
    let gate = BatchGate::new(Arc::clone(&registry), indexer.clone(), 10);

    persist(&registry, &dir, "20260101120000", 0, "").await?;
    persist(&registry, &dir, "20260101120015", 15, "second note").await?;

    // Zero chunks still counts as a handled flush; artifacts are
    // consumed so the gate does not retry forever.
    assert_eq!(gate.on_artifact().await, BatchDecision::Flushed { chunks: 0 });
    assert_eq!(registry.lock().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn registry_orders_by_creation_time_not_insertion_time() -> Result<()> {
    let dir = TempDir::new()?;
    let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));

    // Persistence completions arrive out of creation order.
    persist(&registry, &dir, "20260101120010", 10, "later").await?;
    persist(&registry, &dir, "20260101120000", 0, "earlier").await?;

    let registry = registry.lock().await;
    assert_eq!(registry.newest().unwrap().key, "20260101120010");
    assert_eq!(registry.previous().unwrap().key, "20260101120000");

    Ok(())
}
