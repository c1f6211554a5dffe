//! Application events and the notification sink boundary.
//!
//! Every observable state change produces an `AppEvent`. Hosts subscribe by
//! installing an `EventSink` (toasts, badges, log lines); nothing in here
//! applies back-pressure or mutates data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum AppEvent {
    TimerStarted {
        description: String,
        project_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerStopped {
        entry_id: String,
        duration_secs: i64,
        at: DateTime<Utc>,
    },
    TimerCancelled {
        at: DateTime<Utc>,
    },
    /// Queue membership changed (emitted after every enqueue).
    QueueChanged {
        pending: usize,
        online: bool,
        at: DateTime<Utc>,
    },
    DrainStarted {
        pending: usize,
        at: DateTime<Utc>,
    },
    /// One full drain pass finished. `failed` counts operations still queued
    /// for the next pass; `discarded` counts operations dropped at the retry
    /// limit.
    DrainCompleted {
        succeeded: usize,
        failed: usize,
        discarded: usize,
        at: DateTime<Utc>,
    },
    /// Server state moved under us; caches and views should refetch.
    DataChanged {
        at: DateTime<Utc>,
    },
}

/// Receives events as they happen. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AppEvent);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn publish(&self, event: AppEvent) {
        (**self).publish(event);
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: AppEvent) {}
}

/// Forwards events to the tracing subscriber at INFO.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: AppEvent) {
        tracing::info!("event: {:?}", event);
    }
}

/// Buffers events in order. Used by polling hosts and by tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<AppEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far, oldest first.
    pub fn drain(&self) -> Vec<AppEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: AppEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_is_tagged() {
        let event = AppEvent::DrainCompleted {
            succeeded: 2,
            failed: 1,
            discarded: 0,
            at: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"DrainCompleted\""));
        let decoded: AppEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.publish(AppEvent::DataChanged { at: Utc::now() });
        sink.publish(AppEvent::TimerCancelled { at: Utc::now() });

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AppEvent::DataChanged { .. }));
        assert!(matches!(events[1], AppEvent::TimerCancelled { .. }));
        assert!(sink.is_empty());
    }
}
