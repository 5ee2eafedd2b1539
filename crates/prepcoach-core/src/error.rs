use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session log has no valid feedback to save")]
    NothingToSave,

    #[error("Failed to encode session log entries: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to store session log: {0}")]
    Storage(#[from] rusqlite::Error),
}
