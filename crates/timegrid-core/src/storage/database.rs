//! SQLite-based local cache and bookkeeping.
//!
//! Provides persistent storage for:
//! - Time entries, projects, clients, tags, and calendars
//! - Optimistic placeholder registrations keyed by queued-operation id
//! - Key-value store for application state (running timer snapshot)
//! - Aggregation queries backing the reports

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};
use crate::model::{Calendar, Client, Project, Tag, TimeEntry};

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_datetime(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build a TimeEntry from a database row.
///
/// Column order must match the SELECT lists in the entry queries below.
fn row_to_entry(row: &rusqlite::Row) -> Result<TimeEntry, rusqlite::Error> {
    let tags_json: String = row.get(4)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

    let anchor_str: String = row.get(6)?;
    let start_str: Option<String> = row.get(7)?;
    let end_str: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(13)?;
    let updated_at_str: String = row.get(14)?;

    Ok(TimeEntry {
        id: row.get(0)?,
        project_id: row.get(1)?,
        calendar_id: row.get(2)?,
        description: row.get(3)?,
        tags,
        duration: row.get(5)?,
        anchor: parse_datetime_fallback(&anchor_str),
        start: parse_optional_datetime(start_str),
        end: parse_optional_datetime(end_str),
        billable: row.get(9)?,
        recurring: row.get(10)?,
        recurrence_rule: row.get(11)?,
        parent_id: row.get(12)?,
        created_at: parse_datetime_fallback(&created_at_str),
        updated_at: parse_datetime_fallback(&updated_at_str),
    })
}

fn row_to_project(row: &rusqlite::Row) -> Result<Project, rusqlite::Error> {
    let created_at_str: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        hourly_rate: row.get(3)?,
        client_id: row.get(4)?,
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

fn row_to_client(row: &rusqlite::Row) -> Result<Client, rusqlite::Error> {
    let created_at_str: String = row.get(3)?;
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        note: row.get(2)?,
        created_at: parse_datetime_fallback(&created_at_str),
    })
}

fn row_to_calendar(row: &rusqlite::Row) -> Result<Calendar, rusqlite::Error> {
    Ok(Calendar {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        owner: row.get(3)?,
    })
}

const ENTRY_COLUMNS: &str = "id, project_id, calendar_id, description, tags, duration, anchor,
    start_at, end_at, billable, recurring, recurrence_rule, parent_id, created_at, updated_at";

/// Registration of an unconfirmed optimistic local record.
///
/// Keyed by the queued-operation id; deleted when the queue confirms or
/// abandons the operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Placeholder {
    pub operation_id: String,
    pub entity: String,
    pub record_id: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for the local record cache.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/timegrid/timegrid.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = super::data_dir()?.join("timegrid.db");
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| DatabaseError::QueryFailed(err.to_string()))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS entries (
                    id              TEXT PRIMARY KEY,
                    project_id      TEXT,
                    calendar_id     TEXT,
                    description     TEXT NOT NULL DEFAULT '',
                    tags            TEXT NOT NULL DEFAULT '[]',
                    duration        INTEGER NOT NULL DEFAULT 0,
                    anchor          TEXT NOT NULL,
                    start_at        TEXT,
                    end_at          TEXT,
                    billable        INTEGER NOT NULL DEFAULT 0,
                    recurring       INTEGER NOT NULL DEFAULT 0,
                    recurrence_rule TEXT,
                    parent_id       TEXT,
                    created_at      TEXT NOT NULL,
                    updated_at      TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id          TEXT PRIMARY KEY,
                    name        TEXT NOT NULL,
                    color       TEXT NOT NULL DEFAULT '#3B82F6',
                    hourly_rate REAL,
                    client_id   TEXT,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS clients (
                    id         TEXT PRIMARY KEY,
                    name       TEXT NOT NULL,
                    note       TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tags (
                    name  TEXT PRIMARY KEY,
                    color TEXT
                );

                CREATE TABLE IF NOT EXISTS calendars (
                    id    TEXT PRIMARY KEY,
                    name  TEXT NOT NULL,
                    color TEXT NOT NULL DEFAULT '#10B981',
                    owner TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS placeholders (
                    operation_id TEXT PRIMARY KEY,
                    entity       TEXT NOT NULL,
                    record_id    TEXT NOT NULL,
                    created_at   TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                -- Create indexes for common query patterns
                CREATE INDEX IF NOT EXISTS idx_entries_anchor ON entries(anchor);
                CREATE INDEX IF NOT EXISTS idx_entries_project_id ON entries(project_id);",
            )
            .map_err(|err| DatabaseError::MigrationFailed(err.to_string()))?;
        Ok(())
    }

    // === Entries ===

    pub fn insert_entry(&self, entry: &TimeEntry) -> Result<()> {
        let tags_json = serde_json::to_string(&entry.tags)?;
        self.conn.execute(
            "INSERT INTO entries (
                id, project_id, calendar_id, description, tags, duration, anchor,
                start_at, end_at, billable, recurring, recurrence_rule, parent_id,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                entry.id,
                entry.project_id,
                entry.calendar_id,
                entry.description,
                tags_json,
                entry.duration,
                entry.anchor.to_rfc3339(),
                entry.start.map(|dt| dt.to_rfc3339()),
                entry.end.map(|dt| dt.to_rfc3339()),
                entry.billable,
                entry.recurring,
                entry.recurrence_rule,
                entry.parent_id,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<TimeEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"))?;
        let result = stmt.query_row(params![id], row_to_entry).optional()?;
        Ok(result)
    }

    /// All entries ordered by anchor instant.
    pub fn list_entries(&self) -> Result<Vec<TimeEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY anchor"))?;
        let rows = stmt.query_map([], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Entries relevant to a view window: every recurring entry (its
    /// occurrences may fall anywhere) plus non-recurring entries whose
    /// effective interval touches `[start, end)`.
    pub fn entries_for_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let entries = self.list_entries()?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.recurring || entry.overlaps_window(start, end))
            .collect())
    }

    pub fn update_entry(&self, entry: &TimeEntry) -> Result<()> {
        let tags_json = serde_json::to_string(&entry.tags)?;
        let changed = self.conn.execute(
            "UPDATE entries SET
                project_id = ?2, calendar_id = ?3, description = ?4, tags = ?5,
                duration = ?6, anchor = ?7, start_at = ?8, end_at = ?9,
                billable = ?10, recurring = ?11, recurrence_rule = ?12,
                parent_id = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                entry.id,
                entry.project_id,
                entry.calendar_id,
                entry.description,
                tags_json,
                entry.duration,
                entry.anchor.to_rfc3339(),
                entry.start.map(|dt| dt.to_rfc3339()),
                entry.end.map(|dt| dt.to_rfc3339()),
                entry.billable,
                entry.recurring,
                entry.recurrence_rule,
                entry.parent_id,
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "entry",
                id: entry.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn delete_entry(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "entry",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // === Projects ===

    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (id, name, color, hourly_rate, client_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.name,
                project.color,
                project.hourly_rate,
                project.client_id,
                project.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, hourly_rate, client_id, created_at
             FROM projects WHERE id = ?1",
        )?;
        let result = stmt.query_row(params![id], row_to_project).optional()?;
        Ok(result)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, hourly_rate, client_id, created_at
             FROM projects ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_project)?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    pub fn update_project(&self, project: &Project) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET name = ?2, color = ?3, hourly_rate = ?4, client_id = ?5
             WHERE id = ?1",
            params![
                project.id,
                project.name,
                project.color,
                project.hourly_rate,
                project.client_id,
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "project",
                id: project.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn delete_project(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "project",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // === Clients ===

    pub fn insert_client(&self, client: &Client) -> Result<()> {
        self.conn.execute(
            "INSERT INTO clients (id, name, note, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                client.id,
                client.name,
                client.note,
                client.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, note, created_at FROM clients WHERE id = ?1")?;
        let result = stmt.query_row(params![id], row_to_client).optional()?;
        Ok(result)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, note, created_at FROM clients ORDER BY name")?;
        let rows = stmt.query_map([], row_to_client)?;
        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }

    pub fn update_client(&self, client: &Client) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE clients SET name = ?2, note = ?3 WHERE id = ?1",
            params![client.id, client.name, client.note],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "client",
                id: client.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn delete_client(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "client",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // === Tags ===

    pub fn insert_tag(&self, tag: &Tag) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO tags (name, color) VALUES (?1, ?2)",
            params![tag.name, tag.color],
        )?;
        Ok(())
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, color FROM tags ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                name: row.get(0)?,
                color: row.get(1)?,
            })
        })?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE name = ?1", params![name])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "tag",
                id: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    // === Calendars ===

    pub fn insert_calendar(&self, calendar: &Calendar) -> Result<()> {
        self.conn.execute(
            "INSERT INTO calendars (id, name, color, owner) VALUES (?1, ?2, ?3, ?4)",
            params![calendar.id, calendar.name, calendar.color, calendar.owner],
        )?;
        Ok(())
    }

    pub fn get_calendar(&self, id: &str) -> Result<Option<Calendar>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, owner FROM calendars WHERE id = ?1")?;
        let result = stmt.query_row(params![id], row_to_calendar).optional()?;
        Ok(result)
    }

    pub fn list_calendars(&self) -> Result<Vec<Calendar>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, owner FROM calendars ORDER BY name")?;
        let rows = stmt.query_map([], row_to_calendar)?;
        let mut calendars = Vec::new();
        for row in rows {
            calendars.push(row?);
        }
        Ok(calendars)
    }

    // === Placeholders ===

    /// Register a local record as unconfirmed until the given operation
    /// is confirmed or abandoned by the queue.
    pub fn register_placeholder(
        &self,
        operation_id: &str,
        entity: &str,
        record_id: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO placeholders (operation_id, entity, record_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![operation_id, entity, record_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Drop the registration for an operation. Succeeds when none exists:
    /// not every queued operation registers a placeholder.
    pub fn remove_placeholder(&self, operation_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM placeholders WHERE operation_id = ?1",
            params![operation_id],
        )?;
        Ok(())
    }

    pub fn list_placeholders(&self) -> Result<Vec<Placeholder>> {
        let mut stmt = self.conn.prepare(
            "SELECT operation_id, entity, record_id, created_at
             FROM placeholders ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            let created_at_str: String = row.get(3)?;
            Ok(Placeholder {
                operation_id: row.get(0)?,
                entity: row.get(1)?,
                record_id: row.get(2)?,
                created_at: parse_datetime_fallback(&created_at_str),
            })
        })?;
        let mut placeholders = Vec::new();
        for row in rows {
            placeholders.push(row?);
        }
        Ok(placeholders)
    }

    // === Key-value store ===

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a value from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // === Report queries ===

    /// Total tracked seconds per project for entries anchored in
    /// `[start, end)`. Entries with no project group under `None`.
    pub fn project_totals(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(Option<String>, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT project_id, COALESCE(SUM(duration), 0)
             FROM entries
             WHERE anchor >= ?1 AND anchor < ?2
             GROUP BY project_id
             ORDER BY 2 DESC",
        )?;
        let rows = stmt.query_map(params![start.to_rfc3339(), end.to_rfc3339()], |row| {
            Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut totals = Vec::new();
        for row in rows {
            totals.push(row?);
        }
        Ok(totals)
    }

    /// Total tracked seconds for entries anchored in `[start, end)`.
    pub fn total_seconds(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration), 0) FROM entries
             WHERE anchor >= ?1 AND anchor < ?2",
            params![start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(total)
    }

    /// Billable subset of `total_seconds`.
    pub fn billable_seconds(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration), 0) FROM entries
             WHERE billable = 1 AND anchor >= ?1 AND anchor < ?2",
            params![start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(total)
    }
}

impl crate::queue::PlaceholderStore for Database {
    fn remove_placeholder(&mut self, operation_id: &str) -> Result<()> {
        Database::remove_placeholder(self, operation_id)
    }
}
