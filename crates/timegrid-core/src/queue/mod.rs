//! Offline operation queue.
//!
//! Mutating intents against the sync server are appended here first and
//! replayed in FIFO order once connectivity allows. Each operation gets a
//! bounded retry budget; an operation that keeps failing is dropped rather
//! than parked in a dead-letter store, and its optimistic local placeholder
//! is cleaned up either way. Replay failures never escape a drain pass:
//! they become retry-state changes and an aggregate notification.

mod store;

pub use store::QueueStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::events::{AppEvent, EventSink};
use crate::model::{new_id, Client, Project, Tag, TimeEntry};
use crate::remote::RemoteStore;

/// Retry budget applied when the configuration does not say otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A mutating intent awaiting replay, one variant per entity and kind.
///
/// The tagged layout keeps replay dispatch exhaustive: a new variant does
/// not compile until `replay` handles it. Tags have no update variant; a
/// rename is a delete plus a create, matching the remote surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Operation {
    CreateEntry { entry: TimeEntry },
    UpdateEntry { id: String, patch: Value },
    DeleteEntry { id: String },
    CreateProject { project: Project },
    UpdateProject { id: String, patch: Value },
    DeleteProject { id: String },
    CreateTag { tag: Tag },
    DeleteTag { name: String },
    CreateClient { client: Client },
    UpdateClient { id: String, patch: Value },
    DeleteClient { id: String },
}

impl Operation {
    /// Entity kind this operation targets.
    pub fn entity(&self) -> &'static str {
        match self {
            Operation::CreateEntry { .. }
            | Operation::UpdateEntry { .. }
            | Operation::DeleteEntry { .. } => "entry",
            Operation::CreateProject { .. }
            | Operation::UpdateProject { .. }
            | Operation::DeleteProject { .. } => "project",
            Operation::CreateTag { .. } | Operation::DeleteTag { .. } => "tag",
            Operation::CreateClient { .. }
            | Operation::UpdateClient { .. }
            | Operation::DeleteClient { .. } => "client",
        }
    }

    /// Mutation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateEntry { .. }
            | Operation::CreateProject { .. }
            | Operation::CreateTag { .. }
            | Operation::CreateClient { .. } => "create",
            Operation::UpdateEntry { .. }
            | Operation::UpdateProject { .. }
            | Operation::UpdateClient { .. } => "update",
            Operation::DeleteEntry { .. }
            | Operation::DeleteProject { .. }
            | Operation::DeleteTag { .. }
            | Operation::DeleteClient { .. } => "delete",
        }
    }

    /// Id of the targeted record (the local id for creates).
    pub fn target_id(&self) -> &str {
        match self {
            Operation::CreateEntry { entry } => &entry.id,
            Operation::UpdateEntry { id, .. } | Operation::DeleteEntry { id } => id,
            Operation::CreateProject { project } => &project.id,
            Operation::UpdateProject { id, .. } | Operation::DeleteProject { id } => id,
            Operation::CreateTag { tag } => &tag.name,
            Operation::DeleteTag { name } => name,
            Operation::CreateClient { client } => &client.id,
            Operation::UpdateClient { id, .. } | Operation::DeleteClient { id } => id,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {} {}", self.kind(), self.entity(), self.target_id())
    }
}

/// One queued operation with its retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedOperation {
    pub id: String,
    pub op: Operation,
    pub queued_at: DateTime<Utc>,
    pub retries: u32,
}

impl QueuedOperation {
    pub fn new(op: Operation) -> Self {
        QueuedOperation {
            id: new_id("op"),
            op,
            queued_at: Utc::now(),
            retries: 0,
        }
    }
}

/// Cleanup hook for optimistic local copies tied to queued operations.
///
/// Invoked with the operation already removed from the queue, both when it
/// was confirmed by the server and when it was abandoned at the retry limit.
pub trait PlaceholderStore {
    fn remove_placeholder(&mut self, operation_id: &str) -> Result<()>;
}

/// Snapshot of the queue's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub online: bool,
    pub in_flight: bool,
}

/// Why a drain pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    InProgress,
}

/// Outcome of one drain call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Operations confirmed and removed in this pass
    pub succeeded: usize,
    /// Operations that failed but stay queued for the next pass
    pub failed: usize,
    /// Operations dropped at the retry limit
    pub discarded: usize,
    /// Set when the pass did not run at all
    pub skipped: Option<SkipReason>,
}

impl DrainReport {
    fn skipped(reason: SkipReason) -> Self {
        DrainReport {
            succeeded: 0,
            failed: 0,
            discarded: 0,
            skipped: Some(reason),
        }
    }

    pub fn ran(&self) -> bool {
        self.skipped.is_none()
    }
}

/// Durable FIFO queue of pending mutations.
///
/// Constructed once at the composition root and passed by reference to
/// every caller that enqueues. Not internally synchronized: all mutators
/// take `&mut self` and rely on the host driving one operation at a time.
/// A multi-threaded host must add its own exclusion (a mutex around the
/// queue or an owning actor task).
pub struct OperationQueue {
    ops: Vec<QueuedOperation>,
    store: QueueStore,
    sink: Box<dyn EventSink>,
    max_retries: u32,
    online: bool,
    in_flight: bool,
}

impl OperationQueue {
    /// Queue backed by the default store location.
    pub fn open(max_retries: u32, sink: Box<dyn EventSink>) -> Self {
        Self::with_store(QueueStore::new(), max_retries, sink)
    }

    /// Queue backed by an explicit store. Loads persisted operations; a
    /// missing or unreadable file starts the queue empty.
    pub fn with_store(store: QueueStore, max_retries: u32, sink: Box<dyn EventSink>) -> Self {
        let ops = store.load().unwrap_or_else(|err| {
            tracing::warn!("Could not load queue file, starting empty: {}", err);
            Vec::new()
        });
        OperationQueue {
            ops,
            store,
            sink,
            max_retries,
            online: false,
            in_flight: false,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            pending: self.ops.len(),
            online: self.online,
            in_flight: self.in_flight,
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Pending operations in replay order.
    pub fn operations(&self) -> &[QueuedOperation] {
        &self.ops
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Record the host connectivity signal. Returns true when the value
    /// changed; an offline-to-online transition is the host's cue to drain.
    pub fn set_online(&mut self, online: bool) -> bool {
        let changed = self.online != online;
        self.online = online;
        changed
    }

    /// Append an operation, persist the queue, and return the new id.
    ///
    /// Never touches the network and never fails: a persist error is logged
    /// and the operation stays queued in memory.
    pub fn enqueue(&mut self, op: Operation) -> String {
        tracing::debug!("Enqueueing {}", op.describe());
        let queued = QueuedOperation::new(op);
        let id = queued.id.clone();
        self.ops.push(queued);
        self.persist_quietly();
        self.publish_queue_changed();
        id
    }

    /// Enqueue and, when online, immediately attempt a drain.
    pub async fn submit(
        &mut self,
        op: Operation,
        remote: &dyn RemoteStore,
        placeholders: &mut dyn PlaceholderStore,
    ) -> (String, DrainReport) {
        let id = self.enqueue(op);
        let report = self.drain(remote, placeholders).await;
        (id, report)
    }

    /// Replay the queued operations in FIFO order.
    ///
    /// Runs at most once at a time and only while online; otherwise returns
    /// a skipped report. The pass works on a snapshot of the queue, so an
    /// operation enqueued mid-pass waits for the next one. Remote errors of
    /// any kind count against the operation's retry budget; they are never
    /// propagated out of the pass.
    pub async fn drain(
        &mut self,
        remote: &dyn RemoteStore,
        placeholders: &mut dyn PlaceholderStore,
    ) -> DrainReport {
        if !self.online {
            tracing::debug!("Drain skipped: offline with {} pending", self.ops.len());
            return DrainReport::skipped(SkipReason::Offline);
        }
        if self.in_flight {
            return DrainReport::skipped(SkipReason::InProgress);
        }

        self.in_flight = true;
        self.sink.publish(AppEvent::DrainStarted {
            pending: self.ops.len(),
            at: Utc::now(),
        });

        let snapshot: Vec<String> = self.ops.iter().map(|q| q.id.clone()).collect();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut discarded = 0;

        for op_id in snapshot {
            let pos = match self.ops.iter().position(|q| q.id == op_id) {
                Some(pos) => pos,
                None => continue,
            };

            match replay(remote, &self.ops[pos].op).await {
                Ok(()) => {
                    let done = self.ops.remove(pos);
                    self.drop_placeholder(placeholders, &done.id);
                    succeeded += 1;
                    tracing::debug!("Synced {}", done.op.describe());
                }
                Err(err) => {
                    let queued = &mut self.ops[pos];
                    queued.retries += 1;
                    tracing::warn!(
                        "Sync of {} failed (attempt {}/{}): {}",
                        queued.op.describe(),
                        queued.retries,
                        self.max_retries,
                        err
                    );
                    if queued.retries >= self.max_retries {
                        let dropped = self.ops.remove(pos);
                        self.drop_placeholder(placeholders, &dropped.id);
                        discarded += 1;
                        tracing::warn!(
                            "Dropping {} after {} failed attempts",
                            dropped.op.describe(),
                            self.max_retries
                        );
                    } else {
                        failed += 1;
                    }
                }
            }
            self.persist_quietly();
        }

        self.in_flight = false;
        self.sink.publish(AppEvent::DrainCompleted {
            succeeded,
            failed,
            discarded,
            at: Utc::now(),
        });
        if succeeded > 0 {
            self.sink.publish(AppEvent::DataChanged { at: Utc::now() });
        }

        DrainReport {
            succeeded,
            failed,
            discarded,
            skipped: None,
        }
    }

    fn drop_placeholder(&self, placeholders: &mut dyn PlaceholderStore, operation_id: &str) {
        if let Err(err) = placeholders.remove_placeholder(operation_id) {
            tracing::warn!("Could not clean up placeholder for {}: {}", operation_id, err);
        }
    }

    fn persist_quietly(&self) {
        if let Err(err) = self.store.persist(&self.ops) {
            tracing::warn!("Could not persist queue: {}", err);
        }
    }

    fn publish_queue_changed(&self) {
        self.sink.publish(AppEvent::QueueChanged {
            pending: self.ops.len(),
            online: self.online,
            at: Utc::now(),
        });
    }
}

/// Replay one operation against the remote store.
///
/// Creates carry no idempotency key: a create retried after an ambiguous
/// failure (a timeout the server actually committed) can duplicate the
/// server record.
async fn replay(remote: &dyn RemoteStore, op: &Operation) -> Result<(), ApiError> {
    match op {
        Operation::CreateEntry { entry } => remote.add_entry(entry).await.map(|_| ()),
        Operation::UpdateEntry { id, patch } => remote.update_entry(id, patch).await,
        Operation::DeleteEntry { id } => remote.delete_entry(id).await,
        Operation::CreateProject { project } => remote.add_project(project).await.map(|_| ()),
        Operation::UpdateProject { id, patch } => remote.update_project(id, patch).await,
        Operation::DeleteProject { id } => remote.delete_project(id).await,
        Operation::CreateTag { tag } => remote.add_tag(tag).await.map(|_| ()),
        Operation::DeleteTag { name } => remote.delete_tag(name).await,
        Operation::CreateClient { client } => remote.add_client(client).await.map(|_| ()),
        Operation::UpdateClient { id, patch } => remote.update_client(id, patch).await,
        Operation::DeleteClient { id } => remote.delete_client(id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Scripted remote: records calls, fails for configured target ids.
    #[derive(Default)]
    struct FakeRemote {
        calls: Mutex<Vec<String>>,
        fail_ids: HashSet<String>,
        fail_all: bool,
    }

    impl FakeRemote {
        fn ok() -> Self {
            FakeRemote::default()
        }

        fn failing() -> Self {
            FakeRemote {
                fail_all: true,
                ..FakeRemote::default()
            }
        }

        fn failing_for(id: &str) -> Self {
            FakeRemote {
                fail_ids: HashSet::from([id.to_string()]),
                ..FakeRemote::default()
            }
        }

        fn touch(&self, target: &str, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            if self.fail_all || self.fail_ids.contains(target) {
                Err(ApiError::Http {
                    status: 500,
                    message: "scripted failure".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn add_entry(&self, entry: &TimeEntry) -> Result<String, ApiError> {
            self.touch(&entry.id, format!("add_entry {}", entry.id))?;
            Ok("srv-entry-1".to_string())
        }
        async fn update_entry(&self, id: &str, _patch: &Value) -> Result<(), ApiError> {
            self.touch(id, format!("update_entry {id}"))
        }
        async fn delete_entry(&self, id: &str) -> Result<(), ApiError> {
            self.touch(id, format!("delete_entry {id}"))
        }
        async fn add_project(&self, project: &Project) -> Result<String, ApiError> {
            self.touch(&project.id, format!("add_project {}", project.id))?;
            Ok("srv-project-1".to_string())
        }
        async fn update_project(&self, id: &str, _patch: &Value) -> Result<(), ApiError> {
            self.touch(id, format!("update_project {id}"))
        }
        async fn delete_project(&self, id: &str) -> Result<(), ApiError> {
            self.touch(id, format!("delete_project {id}"))
        }
        async fn add_tag(&self, tag: &Tag) -> Result<String, ApiError> {
            self.touch(&tag.name, format!("add_tag {}", tag.name))?;
            Ok(tag.name.clone())
        }
        async fn delete_tag(&self, name: &str) -> Result<(), ApiError> {
            self.touch(name, format!("delete_tag {name}"))
        }
        async fn add_client(&self, client: &Client) -> Result<String, ApiError> {
            self.touch(&client.id, format!("add_client {}", client.id))?;
            Ok("srv-client-1".to_string())
        }
        async fn update_client(&self, id: &str, _patch: &Value) -> Result<(), ApiError> {
            self.touch(id, format!("update_client {id}"))
        }
        async fn delete_client(&self, id: &str) -> Result<(), ApiError> {
            self.touch(id, format!("delete_client {id}"))
        }
    }

    #[derive(Default)]
    struct FakePlaceholders {
        removed: Vec<String>,
    }

    impl PlaceholderStore for FakePlaceholders {
        fn remove_placeholder(&mut self, operation_id: &str) -> Result<()> {
            self.removed.push(operation_id.to_string());
            Ok(())
        }
    }

    fn test_queue(dir: &TempDir, max_retries: u32) -> (OperationQueue, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let store = QueueStore::at_path(dir.path().join("queue.json"));
        let queue = OperationQueue::with_store(store, max_retries, Box::new(sink.clone()));
        (queue, sink)
    }

    #[tokio::test]
    async fn enqueue_then_drain_clears_queue() {
        let dir = TempDir::new().unwrap();
        let (mut queue, sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);
        queue.set_online(true);

        let remote = FakeRemote::ok();
        let mut placeholders = FakePlaceholders::default();

        let op_id = queue.enqueue(Operation::CreateEntry {
            entry: TimeEntry::new("offline work"),
        });
        assert_eq!(queue.len(), 1);

        let report = queue.drain(&remote, &mut placeholders).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.discarded, 0);
        assert!(queue.is_empty());
        assert_eq!(remote.calls().len(), 1);
        assert_eq!(placeholders.removed, vec![op_id]);

        let events = sink.drain();
        assert!(matches!(events[0], AppEvent::QueueChanged { pending: 1, .. }));
        assert!(matches!(events[1], AppEvent::DrainStarted { pending: 1, .. }));
        assert!(matches!(
            events[2],
            AppEvent::DrainCompleted { succeeded: 1, failed: 0, discarded: 0, .. }
        ));
        assert!(matches!(events[3], AppEvent::DataChanged { .. }));
    }

    #[tokio::test]
    async fn drain_replays_in_fifo_order() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);
        queue.set_online(true);

        queue.enqueue(Operation::DeleteEntry {
            id: "entry-a".to_string(),
        });
        queue.enqueue(Operation::DeleteEntry {
            id: "entry-b".to_string(),
        });

        let remote = FakeRemote::ok();
        let mut placeholders = FakePlaceholders::default();
        queue.drain(&remote, &mut placeholders).await;

        assert_eq!(
            remote.calls(),
            vec!["delete_entry entry-a".to_string(), "delete_entry entry-b".to_string()]
        );
    }

    #[tokio::test]
    async fn always_failing_operation_is_dropped_after_max_retries() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, 3);
        queue.set_online(true);

        let op_id = queue.enqueue(Operation::DeleteProject {
            id: "project-x".to_string(),
        });

        let remote = FakeRemote::failing();
        let mut placeholders = FakePlaceholders::default();

        let first = queue.drain(&remote, &mut placeholders).await;
        assert_eq!((first.failed, first.discarded), (1, 0));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.operations()[0].retries, 1);

        let second = queue.drain(&remote, &mut placeholders).await;
        assert_eq!((second.failed, second.discarded), (1, 0));
        assert_eq!(queue.len(), 1);

        let third = queue.drain(&remote, &mut placeholders).await;
        assert_eq!((third.failed, third.discarded), (0, 1));
        assert!(queue.is_empty());
        assert_eq!(placeholders.removed, vec![op_id]);
    }

    #[tokio::test]
    async fn failed_operations_keep_their_relative_order() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);
        queue.set_online(true);

        queue.enqueue(Operation::DeleteEntry {
            id: "entry-stuck".to_string(),
        });
        queue.enqueue(Operation::DeleteEntry {
            id: "entry-fine".to_string(),
        });
        queue.enqueue(Operation::DeleteEntry {
            id: "entry-stuck-2".to_string(),
        });

        let mut remote = FakeRemote::failing_for("entry-stuck");
        remote.fail_ids.insert("entry-stuck-2".to_string());
        let mut placeholders = FakePlaceholders::default();

        let report = queue.drain(&remote, &mut placeholders).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);

        let remaining: Vec<&str> = queue
            .operations()
            .iter()
            .map(|q| q.op.target_id())
            .collect();
        assert_eq!(remaining, vec!["entry-stuck", "entry-stuck-2"]);
    }

    #[tokio::test]
    async fn offline_drain_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);

        queue.enqueue(Operation::DeleteEntry {
            id: "entry-1".to_string(),
        });

        let remote = FakeRemote::ok();
        let mut placeholders = FakePlaceholders::default();
        let report = queue.drain(&remote, &mut placeholders).await;

        assert_eq!(report.skipped, Some(SkipReason::Offline));
        assert!(!report.ran());
        assert_eq!(queue.len(), 1);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_drains_immediately_when_online() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);
        queue.set_online(true);

        let remote = FakeRemote::ok();
        let mut placeholders = FakePlaceholders::default();
        let (_id, report) = queue
            .submit(
                Operation::CreateProject {
                    project: Project::new("website"),
                },
                &remote,
                &mut placeholders,
            )
            .await;

        assert!(report.ran());
        assert_eq!(report.succeeded, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn submit_only_enqueues_when_offline() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);

        let remote = FakeRemote::ok();
        let mut placeholders = FakePlaceholders::default();
        let (_id, report) = queue
            .submit(
                Operation::DeleteTag {
                    name: "stale".to_string(),
                },
                &remote,
                &mut placeholders,
            )
            .await;

        assert_eq!(report.skipped, Some(SkipReason::Offline));
        assert_eq!(queue.len(), 1);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn queue_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.json");

        {
            let store = QueueStore::at_path(path.clone());
            let mut queue =
                OperationQueue::with_store(store, DEFAULT_MAX_RETRIES, Box::new(crate::events::NullSink));
            queue.enqueue(Operation::DeleteClient {
                id: "client-9".to_string(),
            });
        }

        let store = QueueStore::at_path(path);
        let queue =
            OperationQueue::with_store(store, DEFAULT_MAX_RETRIES, Box::new(crate::events::NullSink));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.operations()[0].op.target_id(), "client-9");
    }

    #[test]
    fn status_reflects_flags_and_counts() {
        let dir = TempDir::new().unwrap();
        let (mut queue, _sink) = test_queue(&dir, DEFAULT_MAX_RETRIES);

        assert_eq!(
            queue.status(),
            QueueStatus {
                pending: 0,
                online: false,
                in_flight: false
            }
        );

        queue.enqueue(Operation::DeleteEntry {
            id: "entry-1".to_string(),
        });
        assert!(queue.set_online(true));
        assert!(!queue.set_online(true));

        assert_eq!(
            queue.status(),
            QueueStatus {
                pending: 1,
                online: true,
                in_flight: false
            }
        );
    }

    #[test]
    fn operation_serialization_is_tagged() {
        let op = Operation::UpdateEntry {
            id: "entry-1".to_string(),
            patch: serde_json::json!({"billable": true}),
        };

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"UpdateEntry\""));
        let decoded: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn operation_describe_names_kind_entity_and_target() {
        let op = Operation::CreateTag {
            tag: Tag::new("deep-work"),
        };
        assert_eq!(op.entity(), "tag");
        assert_eq!(op.kind(), "create");
        assert_eq!(op.describe(), "create tag deep-work");
    }
}
