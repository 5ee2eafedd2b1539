//! Database layer for prepcoach.
//!
//! Provides a unified `Database` struct that owns the SQLite connection
//! and provides access to the session-log and account stores. Change
//! notifications for both are published over tokio channels so callers can
//! subscribe to live updates.

mod accounts;
mod session_logs;

pub use accounts::{Accounts, AuthError, User};
pub use session_logs::{
    LogSubscription, NewSessionLog, SessionArchive, SessionLogRecord, SessionLogs,
};

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::{broadcast, watch};

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
    /// Owner ids whose log collection changed
    log_changes: broadcast::Sender<String>,
    current_user: watch::Sender<Option<User>>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/prepcoach/prepcoach.db`.
    pub fn open() -> Result<Self, rusqlite::Error> {
        let db_path = Self::default_path();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        Self::open_at(&db_path)
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        Self::init_schema(&conn)?;
        let signed_in = accounts::load_current_user(&conn)?;
        let (log_changes, _) = broadcast::channel(64);
        let (current_user, _) = watch::channel(signed_in);
        Ok(Self {
            conn: Mutex::new(conn),
            log_changes,
            current_user,
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prepcoach")
            .join("prepcoach.db")
    }

    /// Access the session logs store.
    pub fn session_logs(&self) -> SessionLogs<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        SessionLogs::new(conn, &self.log_changes)
    }

    /// Access the accounts store.
    pub fn accounts(&self) -> Accounts<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Accounts::new(conn, &self.current_user)
    }

    /// Subscribe to an owner's log collection.
    ///
    /// The subscription yields the refreshed list (newest first) every time
    /// a log is appended for `owner`.
    pub fn watch_logs(&self, owner: &str, limit: Option<usize>) -> LogSubscription<'_> {
        LogSubscription::new(self, owner.to_string(), limit, self.log_changes.subscribe())
    }

    /// Subscribe to sign-in / sign-out changes.
    pub fn watch_user(&self) -> watch::Receiver<Option<User>> {
        self.current_user.subscribe()
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_logs (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                company TEXT,
                role TEXT,
                recommended INTEGER NOT NULL DEFAULT 0,
                entries TEXT NOT NULL,
                overall_score INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_logs_owner_created
                ON session_logs(owner, created_at DESC);

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS auth_state (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                user_id TEXT REFERENCES users(id)
            );
            "#,
        )
    }
}
