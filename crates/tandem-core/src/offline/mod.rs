//! Offline reconciliation queue
//!
//! A client-resident durable queue of vibes captured while the device had no
//! connectivity, stored as a JSON list in a single file owned by the device.
//! Entries have exactly two states: captured (present in the file) and
//! submitted (removed after a successful replay). There is no failed
//! terminal state; a failed replay leaves the entry captured for the next
//! reconciliation pass.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{RelationshipId, UserId};
use crate::services::SubmitVibes;
use crate::util::timestamp_ms;

/// A vibe captured offline, waiting to be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineVibe {
    /// Locally generated id, never seen by the store
    pub id: String,
    /// Target relationship
    pub relationship_id: RelationshipId,
    /// Submitting user
    pub user_id: UserId,
    /// Mood score as captured (validated at replay, not capture)
    pub mood: i64,
    /// Optional note as captured
    pub note: Option<String>,
    /// Capture timestamp (Unix ms)
    pub captured_at: i64,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries successfully submitted and removed
    pub submitted: usize,
    /// Entries still queued after the pass
    pub remaining: usize,
    /// True when another pass was already in flight and this one did nothing
    pub already_running: bool,
}

/// Durable FIFO queue of offline vibes backed by one JSON file
pub struct OfflineQueue {
    path: PathBuf,
    reconciling: AtomicBool,
}

impl OfflineQueue {
    /// Create a queue over the given file path
    ///
    /// The file is created lazily on the first enqueue.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reconciling: AtomicBool::new(false),
        }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture a vibe locally, appending it to the durable list
    pub fn enqueue(
        &self,
        relationship_id: RelationshipId,
        user_id: UserId,
        mood: i64,
        note: Option<String>,
    ) -> Result<OfflineVibe> {
        let entry = OfflineVibe {
            id: Uuid::now_v7().to_string(),
            relationship_id,
            user_id,
            mood,
            note,
            captured_at: timestamp_ms(),
        };

        let mut entries = self.load()?;
        entries.push(entry.clone());
        self.save(&entries)?;

        tracing::debug!(entry = %entry.id, "Captured offline vibe");
        Ok(entry)
    }

    /// All currently queued entries, in capture order
    pub fn list_pending(&self) -> Result<Vec<OfflineVibe>> {
        self.load()
    }

    /// Remove one entry by id
    ///
    /// Idempotent: removing an absent id is a no-op, not an error.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);

        if entries.len() != before {
            self.save(&entries)?;
        }
        Ok(())
    }

    /// Drop every queued entry and the backing file
    pub fn clear_all(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Replay pending entries against the submission service
    ///
    /// Entries are processed sequentially in capture order to preserve
    /// ordering and keep failure isolation simple. A successful submission
    /// removes the entry; any failure (including `DuplicateSubmission`,
    /// which legitimately occurs when the user also submitted directly while
    /// the offline state was stale) leaves it queued and moves on to the
    /// next entry. Concurrent triggers are serialized through a
    /// single-flight flag: a second call while a pass runs reports
    /// `already_running` and touches nothing.
    pub async fn reconcile<S: SubmitVibes>(&self, submitter: &S) -> Result<ReconcileReport> {
        if self
            .reconciling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Reconciliation already in flight, skipping");
            return Ok(ReconcileReport {
                already_running: true,
                ..ReconcileReport::default()
            });
        }
        let _guard = InFlightGuard(&self.reconciling);

        let mut submitted = 0;
        for entry in self.list_pending()? {
            match submitter
                .submit(
                    &entry.relationship_id,
                    &entry.user_id,
                    entry.mood,
                    entry.note.clone(),
                )
                .await
            {
                Ok(vibe_id) => {
                    tracing::info!(entry = %entry.id, vibe = %vibe_id, "Replayed offline vibe");
                    self.remove(&entry.id)?;
                    submitted += 1;
                }
                Err(error) => {
                    // Leave it captured for the next pass.
                    tracing::warn!(entry = %entry.id, %error, "Offline vibe replay failed");
                }
            }
        }

        Ok(ReconcileReport {
            submitted,
            remaining: self.list_pending()?.len(),
            already_running: false,
        })
    }

    fn load(&self) -> Result<Vec<OfflineVibe>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                // An unreadable queue file is treated as empty rather than
                // wedging every capture.
                tracing::warn!(%error, path = %self.path.display(), "Discarding unreadable offline queue");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &[OfflineVibe]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

/// Clears the single-flight flag when a reconciliation pass ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
