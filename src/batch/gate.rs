use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::registry::ArtifactRegistry;
use crate::index::DocumentIndexer;

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    /// Fewer than two artifacts exist; nothing to compare yet.
    Insufficient,
    /// Gap at or below the configured delay; keep accumulating.
    Hold { gap_secs: i64 },
    /// Batch combined and indexed; consumed artifacts removed. A zero
    /// chunk count means there was nothing to upsert but the flush
    /// still completed.
    Flushed { chunks: usize },
    /// Indexing failed; every artifact retained for the next attempt.
    Retained,
}

/// Decides, per newly arrived transcript, whether the accumulated batch
/// should flush to the index, and performs the flush.
///
/// Evaluation runs under the registry lock, so concurrent evaluations
/// serialize and a flush can never race another flush over the same
/// artifact set.
pub struct BatchGate {
    registry: Arc<Mutex<ArtifactRegistry>>,
    indexer: Arc<dyn DocumentIndexer>,
    gap_delay_secs: i64,
}

impl BatchGate {
    pub fn new(
        registry: Arc<Mutex<ArtifactRegistry>>,
        indexer: Arc<dyn DocumentIndexer>,
        gap_delay_secs: i64,
    ) -> Self {
        Self {
            registry,
            indexer,
            gap_delay_secs,
        }
    }

    /// Evaluate after a new artifact lands in the registry.
    pub async fn on_artifact(&self) -> BatchDecision {
        let mut registry = self.registry.lock().await;

        let gap_secs = {
            let (Some(newest), Some(previous)) = (registry.newest(), registry.previous()) else {
                debug!("Not enough transcript history for a gap decision");
                return BatchDecision::Insufficient;
            };
            let gap = newest
                .created_at
                .signed_duration_since(previous.created_at)
                .num_seconds();
            debug!(
                "Time gap from '{}' to '{}': {}s",
                previous.key, newest.key, gap
            );
            gap
        };

        if gap_secs <= self.gap_delay_secs {
            return BatchDecision::Hold { gap_secs };
        }

        let combined = registry.combined_older_text();
        match self.indexer.upsert(&combined).await {
            Ok(chunks) => {
                let consumed = registry.consume_older();
                info!(
                    "Flushed batch: {} chunks indexed, {} transcripts cleared",
                    chunks, consumed
                );
                BatchDecision::Flushed { chunks }
            }
            Err(e) => {
                warn!(
                    "Indexing failed, retaining {} transcripts for retry: {}",
                    registry.len(),
                    e
                );
                BatchDecision::Retained
            }
        }
    }
}
