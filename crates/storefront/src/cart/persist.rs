//! Background writer that mirrors cart snapshots into storage.
//!
//! Mutations enqueue full-state snapshots on an unbounded channel. A single
//! task drains the channel in order, keeps only the newest pending snapshot,
//! performs one storage attempt, and publishes the result on a watch channel.

use std::sync::Arc;

use gtm_shop_core::CartLine;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::snapshot;
use crate::storage::KeyValueStorage;

/// A full copy of the cart taken right after a mutation.
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) generation: u64,
    pub(crate) lines: Vec<CartLine>,
}

/// What happened to the storage slot during a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing has been flushed yet.
    Idle,
    /// The slot was overwritten with the serialized cart.
    Written,
    /// The cart was empty and the slot was deleted.
    Deleted,
    /// The storage attempt failed; in-memory state is unaffected.
    Failed(String),
}

/// Result of the most recent flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Generation of the snapshot that was flushed.
    pub generation: u64,
    /// Outcome of the storage attempt.
    pub outcome: FlushOutcome,
}

impl FlushReport {
    pub(crate) const fn initial() -> Self {
        Self {
            generation: 0,
            outcome: FlushOutcome::Idle,
        }
    }

    /// Whether the flush reached storage.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(
            self.outcome,
            FlushOutcome::Written | FlushOutcome::Deleted | FlushOutcome::Idle
        )
    }
}

/// Spawn the writer task.
///
/// The task exits once every sender is dropped and the queue is drained.
pub(crate) fn spawn_writer(
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<Snapshot>,
    reports: watch::Sender<FlushReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mut latest) = rx.recv().await {
            // Every snapshot is a full overwrite, so older queued ones can be skipped.
            while let Ok(newer) = rx.try_recv() {
                latest = newer;
            }

            let outcome = flush(storage.as_ref(), &key, &latest.lines).await;
            match &outcome {
                FlushOutcome::Failed(error) => {
                    warn!(generation = latest.generation, %error, "Cart flush failed");
                }
                other => {
                    debug!(generation = latest.generation, outcome = ?other, "Cart flushed");
                }
            }

            reports.send_replace(FlushReport {
                generation: latest.generation,
                outcome,
            });
        }
        debug!("Cart writer stopped");
    })
}

async fn flush(storage: &dyn KeyValueStorage, key: &str, lines: &[CartLine]) -> FlushOutcome {
    let encoded = match snapshot::encode(lines) {
        Ok(encoded) => encoded,
        Err(e) => return FlushOutcome::Failed(format!("serialize: {e}")),
    };

    let result = match encoded {
        Some(raw) => storage.set(key, &raw).await.map(|()| FlushOutcome::Written),
        None => storage.remove(key).await.map(|()| FlushOutcome::Deleted),
    };

    result.unwrap_or_else(|e| FlushOutcome::Failed(e.to_string()))
}
