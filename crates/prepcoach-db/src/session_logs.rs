//! Session logs store: append-only, per-owner practice records.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::Database;

/// Data provided when persisting a finished practice run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionLog {
    pub owner: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub recommended: bool,
    /// JSON array of answer/feedback pairs, in question order
    pub entries: String,
    pub overall_score: u8,
    pub created_at: DateTime<Utc>,
}

/// A stored session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogRecord {
    pub id: String,
    pub owner: String,
    pub company: Option<String>,
    pub role: Option<String>,
    pub recommended: bool,
    pub entries: String,
    pub overall_score: u8,
    pub created_at: DateTime<Utc>,
}

/// Anything that can persist a finished session log.
pub trait SessionArchive: Send + Sync {
    /// Persist the log, returning its generated id.
    fn append(&self, log: &NewSessionLog) -> Result<String, rusqlite::Error>;
}

impl SessionArchive for Database {
    fn append(&self, log: &NewSessionLog) -> Result<String, rusqlite::Error> {
        self.session_logs().append(log)
    }
}

/// Session logs store with a borrowed connection.
pub struct SessionLogs<'db> {
    conn: MutexGuard<'db, Connection>,
    changes: &'db broadcast::Sender<String>,
}

impl<'db> SessionLogs<'db> {
    pub(crate) fn new(
        conn: MutexGuard<'db, Connection>,
        changes: &'db broadcast::Sender<String>,
    ) -> Self {
        Self { conn, changes }
    }

    /// Append a log, returning the generated UUID. Logs are never updated.
    pub fn append(&self, log: &NewSessionLog) -> Result<String, rusqlite::Error> {
        let id = Uuid::new_v4().to_string();

        self.conn.execute(
            r#"
            INSERT INTO session_logs (
                id, owner, company, role, recommended, entries, overall_score, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                log.owner,
                log.company,
                log.role,
                log.recommended,
                log.entries,
                log.overall_score as i64,
                log.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        debug!(id = %id, owner = %log.owner, "Session log appended");
        // No subscribers is fine
        let _ = self.changes.send(log.owner.clone());

        Ok(id)
    }

    /// Get a log by ID.
    pub fn get(&self, id: &str) -> Result<Option<SessionLogRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                r#"
                SELECT id, owner, company, role, recommended, entries, overall_score, created_at
                FROM session_logs WHERE id = ?1
                "#,
                params![id],
                Self::row_to_record,
            )
            .optional()
    }

    /// List an owner's logs, newest first.
    pub fn list(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionLogRecord>, rusqlite::Error> {
        let mut sql = String::from(
            r#"
            SELECT id, owner, company, role, recommended, entries, overall_score, created_at
            FROM session_logs WHERE owner = ?1
            ORDER BY created_at DESC
            "#,
        );

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<SessionLogRecord, rusqlite::Error> {
        let created_at_str: String = row.get(7)?;
        let score: i64 = row.get(6)?;

        Ok(SessionLogRecord {
            id: row.get(0)?,
            owner: row.get(1)?,
            company: row.get(2)?,
            role: row.get(3)?,
            recommended: row.get(4)?,
            entries: row.get(5)?,
            overall_score: score.clamp(0, 100) as u8,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// Live view of one owner's log collection.
pub struct LogSubscription<'db> {
    db: &'db Database,
    owner: String,
    limit: Option<usize>,
    changes: broadcast::Receiver<String>,
}

impl<'db> LogSubscription<'db> {
    pub(crate) fn new(
        db: &'db Database,
        owner: String,
        limit: Option<usize>,
        changes: broadcast::Receiver<String>,
    ) -> Self {
        Self {
            db,
            owner,
            limit,
            changes,
        }
    }

    /// The collection as it is now.
    pub fn current(&self) -> Result<Vec<SessionLogRecord>, rusqlite::Error> {
        self.db.session_logs().list(&self.owner, self.limit)
    }

    /// Wait for the next change to this owner's logs and return the
    /// refreshed list. Returns `None` once the database is dropped.
    pub async fn next(&mut self) -> Option<Result<Vec<SessionLogRecord>, rusqlite::Error>> {
        loop {
            match self.changes.recv().await {
                Ok(owner) if owner == self.owner => return Some(self.current()),
                Ok(_) => continue,
                // Missed notifications; a fresh read covers them
                Err(broadcast::error::RecvError::Lagged(_)) => return Some(self.current()),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Like [`next`](Self::next) but without waiting: returns the refreshed
    /// list if this owner's logs changed since the last call.
    pub fn try_next(&mut self) -> Option<Result<Vec<SessionLogRecord>, rusqlite::Error>> {
        let mut changed = false;
        loop {
            match self.changes.try_recv() {
                Ok(owner) => changed |= owner == self.owner,
                Err(broadcast::error::TryRecvError::Lagged(_)) => changed = true,
                Err(_) => break,
            }
        }
        changed.then(|| self.current())
    }
}
