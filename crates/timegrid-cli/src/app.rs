//! Per-invocation wiring: config, database, offline queue, sync server.
//!
//! Commands that mutate records go through [`App::submit`] so every write
//! takes the same path: local apply, enqueue, drain when a server is
//! configured and the connectivity flag says online.

use std::error::Error;

use timegrid_core::events::LogSink;
use timegrid_core::queue::{DrainReport, Operation, OperationQueue, QueueStore, SkipReason};
use timegrid_core::remote::HttpRemoteStore;
use timegrid_core::storage::{self, Config, Database};

pub struct App {
    pub config: Config,
    pub db: Database,
    pub queue: OperationQueue,
}

impl App {
    pub fn open() -> Result<App, Box<dyn Error>> {
        let config = Config::load()?;
        let db = Database::open()?;
        let mut queue = OperationQueue::with_store(
            QueueStore::new(),
            config.sync.max_retries,
            Box::new(LogSink),
        );
        queue.set_online(config.sync.online);
        Ok(App { config, db, queue })
    }

    /// Remote endpoint from config, `None` when no server is configured.
    pub fn remote(&self) -> Result<Option<HttpRemoteStore>, Box<dyn Error>> {
        match self.config.sync.server_url.as_deref() {
            Some(url) => {
                let token = storage::token::get()?;
                Ok(Some(HttpRemoteStore::new(url, token)?))
            }
            None => Ok(None),
        }
    }

    /// Queue an operation and push it to the server when reachable.
    ///
    /// `placeholder` marks an optimistic local record (entity, record id)
    /// that should be cleaned up once the operation leaves the queue.
    pub async fn submit(
        &mut self,
        op: Operation,
        placeholder: Option<(&str, &str)>,
    ) -> Result<DrainReport, Box<dyn Error>> {
        let op_id = self.queue.enqueue(op);
        if let Some((entity, record_id)) = placeholder {
            self.db.register_placeholder(&op_id, entity, record_id)?;
        }
        self.drain().await
    }

    /// Replay queued operations against the server, if one is configured.
    pub async fn drain(&mut self) -> Result<DrainReport, Box<dyn Error>> {
        match self.remote()? {
            Some(remote) => Ok(self.queue.drain(&remote, &mut self.db).await),
            None => Ok(DrainReport {
                succeeded: 0,
                failed: 0,
                discarded: 0,
                skipped: Some(SkipReason::Offline),
            }),
        }
    }

    /// One-line sync outcome to append to command output.
    pub fn describe_outcome(&self, report: &DrainReport) -> String {
        if !report.ran() {
            return format!("queued ({} pending)", self.queue.len());
        }
        if self.queue.is_empty() {
            "synced".to_string()
        } else {
            format!(
                "synced {}, {} still queued",
                report.succeeded,
                self.queue.len()
            )
        }
    }
}
