//! # TimeGrid Core Library
//!
//! This library provides the core business logic for the TimeGrid time
//! tracker. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary, with any GUI shell being a thin
//! layer over the same core library.
//!
//! ## Architecture
//!
//! - **Timer**: A wall-clock-based tracker that derives elapsed time from
//!   timestamps passed in by the caller
//! - **Storage**: SQLite-based entry storage and TOML-based configuration
//! - **Queue**: Durable offline operation queue replayed against the sync
//!   server in FIFO order when connectivity returns
//! - **View**: Pure composition of stored entries and subscribed calendar
//!   feeds into day columns with overlap-aware block geometry
//!
//! ## Key Components
//!
//! - [`Tracker`]: Running-timer state machine
//! - [`Database`]: Entry, project and placeholder persistence
//! - [`Config`]: Application configuration management
//! - [`OperationQueue`]: Offline-first write buffering and replay
//! - [`view::compose`]: Calendar view assembly

pub mod error;
pub mod events;
pub mod feed;
pub mod layout;
pub mod model;
pub mod queue;
pub mod recurrence;
pub mod remote;
pub mod report;
pub mod storage;
pub mod timer;
pub mod view;

pub use error::{ApiError, ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::{AppEvent, EventSink, LogSink, NullSink, RecordingSink};
pub use feed::{EventFeed, HttpFeed};
pub use layout::{assign_columns, block_geometry, BlockGeometry, GridMetrics, LayoutItem, PositionedItem};
pub use model::{Calendar, Client, ExternalEvent, Project, Tag, TimeEntry};
pub use queue::{DrainReport, Operation, OperationQueue, QueueStatus, QueuedOperation, SkipReason};
pub use recurrence::{expand_entry, Frequency, Occurrence, RecurrenceRule};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use report::{ProjectTotal, TimeReport};
pub use storage::{Config, Database, Placeholder};
pub use timer::{EntryDraft, Tracker};
pub use view::{CalendarSelection, DayView, Segment, SegmentSource, ViewKind, ViewRange};
