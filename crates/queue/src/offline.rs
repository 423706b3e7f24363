//! Offline write-intent journal.
//!
//! When the durable store is unreachable, writes are captured as intents
//! in a JSON-lines file owned by a single device. On reconnect the
//! journal is drained in order: transient failures are retried with
//! backoff, while rejections that depend on state that changed since the
//! intent was queued (`Conflict`, `InvalidState`) are dropped. The
//! current server state wins over a stale offline write.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nagare_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::retry::RetryConfig;

/// The entity a queued write targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentTarget {
    /// A post, by ID.
    Post {
        /// Post ID.
        id: String,
    },
    /// A comment, by ID.
    Comment {
        /// Comment ID.
        id: String,
    },
}

/// A write captured while the store was unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteIntent {
    /// Submit a new post for moderation.
    SubmitPost {
        /// Post body.
        content: String,
        /// Category slug.
        category: String,
        /// Optional attached image URL.
        image_url: Option<String>,
        /// Optional attached link URL.
        link_url: Option<String>,
    },
    /// Create a comment on a post.
    CreateComment {
        /// Post being commented on.
        post_id: String,
        /// Parent comment for a one-level reply.
        parent_id: Option<String>,
        /// Comment body.
        content: String,
    },
    /// Toggle a reaction on a post or comment.
    ToggleReaction {
        /// What the reaction targets.
        target: IntentTarget,
        /// Reaction kind slug ("like" or "dislike").
        kind: String,
    },
    /// File a report against a post or comment.
    FileReport {
        /// What the report targets.
        target: IntentTarget,
        /// Report reason.
        reason: String,
    },
}

/// One journal entry: an intent plus who queued it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedWrite {
    /// Entry ID.
    pub id: String,
    /// User who queued the write.
    pub user_id: String,
    /// When the write was queued.
    pub queued_at: DateTime<Utc>,
    /// The captured write.
    pub intent: WriteIntent,
}

impl QueuedWrite {
    /// Capture an intent for the given user, stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, intent: WriteIntent) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            queued_at: Utc::now(),
            intent,
        }
    }
}

/// Outcome of a drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries successfully resubmitted.
    pub resubmitted: usize,
    /// Entries rejected and dropped.
    pub dropped: usize,
    /// Entries kept for the next drain after retries ran out.
    pub kept: usize,
}

/// JSON-lines journal of queued writes.
#[derive(Debug, Clone)]
pub struct OfflineJournal {
    path: PathBuf,
}

impl OfflineJournal {
    /// Create a journal backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry to the journal.
    pub async fn enqueue(&self, entry: &QueuedWrite) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create journal dir: {e}")))?;
        }

        let mut line = serde_json::to_string(entry)
            .map_err(|e| AppError::Internal(format!("Failed to serialize intent: {e}")))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to open journal: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write journal: {e}")))?;
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to flush journal: {e}")))?;

        Ok(())
    }

    /// Load all entries, in queue order. Lines that fail to parse are
    /// skipped with a warning so one corrupt entry cannot wedge the queue.
    pub async fn load(&self) -> AppResult<Vec<QueuedWrite>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Internal(format!("Failed to read journal: {e}"))),
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<QueuedWrite>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable journal line: {}", e),
            }
        }
        Ok(entries)
    }

    /// Drain the journal: resubmit every entry in order through `apply`.
    ///
    /// Transient failures are retried with backoff from `retry`; when
    /// retries run out the entry stays in the journal for the next drain.
    /// Any other rejection drops the entry, since the store has moved past
    /// the state the intent was written against.
    pub async fn drain<F, Fut>(&self, retry: &RetryConfig, mut apply: F) -> AppResult<DrainReport>
    where
        F: FnMut(QueuedWrite) -> Fut,
        Fut: Future<Output = AppResult<()>>,
    {
        let entries = self.load().await?;
        if entries.is_empty() {
            return Ok(DrainReport::default());
        }

        info!(count = entries.len(), "Draining offline journal");

        let mut report = DrainReport::default();
        let mut survivors = Vec::new();

        for entry in entries {
            let mut attempt = 0;
            loop {
                match apply(entry.clone()).await {
                    Ok(()) => {
                        report.resubmitted += 1;
                        break;
                    }
                    Err(e) if is_transient(&e) => {
                        if retry.should_retry(attempt) {
                            let delay = retry.delay_for_attempt(attempt);
                            warn!(
                                entry_id = %entry.id,
                                attempt,
                                "Transient failure resubmitting, retrying in {:?}: {}",
                                delay,
                                e
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        } else {
                            warn!(entry_id = %entry.id, "Retries exhausted, keeping entry: {}", e);
                            survivors.push(entry);
                            report.kept += 1;
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(entry_id = %entry.id, "Dropping rejected offline write: {}", e);
                        report.dropped += 1;
                        break;
                    }
                }
            }
        }

        self.rewrite(&survivors).await?;

        info!(
            resubmitted = report.resubmitted,
            dropped = report.dropped,
            kept = report.kept,
            "Offline journal drained"
        );

        Ok(report)
    }

    /// Replace the journal's contents with the given entries.
    async fn rewrite(&self, entries: &[QueuedWrite]) -> AppResult<()> {
        if entries.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(AppError::Internal(format!("Failed to clear journal: {e}")));
                }
            }
        }

        let mut content = String::new();
        for entry in entries {
            content.push_str(
                &serde_json::to_string(entry)
                    .map_err(|e| AppError::Internal(format!("Failed to serialize intent: {e}")))?,
            );
            content.push('\n');
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to rewrite journal: {e}")))
    }
}

/// Whether a store failure is worth queuing or retrying.
///
/// `Conflict` is deliberately not here: for an offline write it means the
/// store state moved on, and the server's version wins.
#[must_use]
pub fn is_transient(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) | AppError::Timeout
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_journal() -> OfflineJournal {
        let path = std::env::temp_dir().join(format!("nagare-journal-{}.jsonl", uuid::Uuid::new_v4()));
        OfflineJournal::new(path)
    }

    fn queued_like(id: &str, post_id: &str) -> QueuedWrite {
        QueuedWrite {
            id: id.to_string(),
            user_id: "user_a".to_string(),
            queued_at: Utc::now(),
            intent: WriteIntent::ToggleReaction {
                target: IntentTarget::Post {
                    id: post_id.to_string(),
                },
                kind: "like".to_string(),
            },
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_enqueue_then_load_round_trip() {
        let journal = temp_journal();

        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();
        journal.enqueue(&queued_like("q2", "p2")).await.unwrap();

        let entries = journal.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "q1");
        assert_eq!(entries[1].id, "q2");

        tokio::fs::remove_file(journal.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let journal = temp_journal();
        assert!(journal.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_skips_corrupt_lines() {
        let journal = temp_journal();
        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();

        let mut content = tokio::fs::read_to_string(journal.path()).await.unwrap();
        content.push_str("{not json\n");
        tokio::fs::write(journal.path(), content).await.unwrap();
        journal.enqueue(&queued_like("q2", "p2")).await.unwrap();

        let entries = journal.load().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "q2");

        tokio::fs::remove_file(journal.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_resubmits_in_order_and_clears() {
        let journal = temp_journal();
        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();
        journal.enqueue(&queued_like("q2", "p2")).await.unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        let report = journal
            .drain(&fast_retry(), move |entry| {
                let seen = seen_in.clone();
                async move {
                    seen.lock().unwrap().push(entry.id);
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(report.resubmitted, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["q1", "q2"]);
        assert!(journal.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drain_drops_conflicted_entry() {
        let journal = temp_journal();
        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();
        journal.enqueue(&queued_like("q2", "p2")).await.unwrap();

        let report = journal
            .drain(&fast_retry(), |entry| async move {
                if entry.id == "q1" {
                    Err(AppError::Conflict("state moved on".to_string()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(report.resubmitted, 1);
        assert_eq!(report.dropped, 1);
        assert!(journal.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drain_keeps_entry_after_transient_retries_exhausted() {
        let journal = temp_journal();
        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in = attempts.clone();
        let report = journal
            .drain(&fast_retry(), move |_| {
                let attempts = attempts_in.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::Database("connection refused".to_string()))
                }
            })
            .await
            .unwrap();

        // Initial attempt plus max_retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(report.kept, 1);

        let entries = journal.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "q1");

        tokio::fs::remove_file(journal.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_retries_then_succeeds() {
        let journal = temp_journal();
        journal.enqueue(&queued_like("q1", "p1")).await.unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_in = attempts.clone();
        let report = journal
            .drain(&fast_retry(), move |_| {
                let attempts = attempts_in.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AppError::Timeout)
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(report.resubmitted, 1);
        assert!(journal.load().await.unwrap().is_empty());
    }
}
