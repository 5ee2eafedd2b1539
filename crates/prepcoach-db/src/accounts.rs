//! Local email/password accounts and the signed-in user.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// A signed-up user; `id` is the opaque owner identity for session logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Authentication failures, each carrying a stable error code.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("auth/invalid-email")]
    InvalidEmail,

    #[error("auth/wrong-password")]
    WrongPassword,

    #[error("auth/invalid-credential")]
    InvalidCredential,

    #[error("auth/user-not-found")]
    UserNotFound,

    #[error("auth/email-already-in-use")]
    EmailAlreadyInUse,

    #[error("auth/weak-password")]
    WeakPassword,

    #[error("auth/operation-not-allowed")]
    OperationNotAllowed,

    #[error("auth/internal-error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A code reported by some other provider
    #[error("{0}")]
    Other(String),
}

impl AuthError {
    pub fn code(&self) -> &str {
        match self {
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::InvalidCredential => "auth/invalid-credential",
            AuthError::UserNotFound => "auth/user-not-found",
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::WeakPassword => "auth/weak-password",
            AuthError::OperationNotAllowed => "auth/operation-not-allowed",
            AuthError::Storage(_) => "auth/internal-error",
            AuthError::Other(code) => code,
        }
    }

    /// Human-readable message for the error code
    pub fn user_message(&self) -> &'static str {
        user_message_for(self.code())
    }
}

/// Map an auth error code to the message shown to the user.
pub fn user_message_for(code: &str) -> &'static str {
    match code {
        "auth/wrong-password" | "auth/invalid-credential" => {
            "Incorrect email or password. Please try again."
        }
        "auth/user-not-found" => "No account found with this email. Please sign up first.",
        "auth/email-already-in-use" => "This email is already registered. Try signing in instead.",
        "auth/weak-password" => "Password is too weak. Use at least 6 characters.",
        "auth/invalid-email" => "Please enter a valid email address.",
        _ => "Authentication failed. Please try again.",
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

pub(crate) fn load_current_user(conn: &Connection) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        r#"
        SELECT u.id, u.email, u.created_at
        FROM auth_state s JOIN users u ON u.id = s.user_id
        WHERE s.slot = 0
        "#,
        [],
        row_to_user,
    )
    .optional()
}

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let created_at_str: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Accounts store with a borrowed connection.
pub struct Accounts<'db> {
    conn: MutexGuard<'db, Connection>,
    current_user: &'db watch::Sender<Option<User>>,
}

impl<'db> Accounts<'db> {
    pub(crate) fn new(
        conn: MutexGuard<'db, Connection>,
        current_user: &'db watch::Sender<Option<User>>,
    ) -> Self {
        Self { conn, current_user }
    }

    /// Create an account and sign it in.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.find_by_email(&email)?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Other(format!("auth/internal-error: {}", e)))?
            .to_string();

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.email, hash, user.created_at.to_rfc3339()],
        )?;

        info!(user_id = %user.id, "Account created");
        self.set_current(Some(user.clone()))?;
        Ok(user)
    }

    /// Sign in with email and password.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        let (user, hash) = self.find_by_email(&email)?.ok_or(AuthError::UserNotFound)?;

        let parsed = PasswordHash::new(&hash).map_err(|_| AuthError::InvalidCredential)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::WrongPassword)?;

        info!(user_id = %user.id, "Signed in");
        self.set_current(Some(user.clone()))?;
        Ok(user)
    }

    /// Federated (OAuth popup) providers are not available to a local store.
    pub fn sign_in_federated(&self, provider: &str) -> Result<User, AuthError> {
        info!(provider, "Federated sign-in requested");
        Err(AuthError::OperationNotAllowed)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.set_current(None)?;
        info!("Signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<User>, AuthError> {
        Ok(load_current_user(&self.conn)?)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, email, created_at, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row_to_user(row)?, row.get::<_, String>(3)?)),
            )
            .optional()
    }

    fn set_current(&self, user: Option<User>) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            r#"
            INSERT INTO auth_state (slot, user_id) VALUES (0, ?1)
            ON CONFLICT(slot) DO UPDATE SET user_id = excluded.user_id
            "#,
            params![user.as_ref().map(|u| u.id.clone())],
        )?;
        self.current_user.send_replace(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    use super::*;

    #[test]
    fn test_sign_up_then_sign_in() {
        let db = Database::open_in_memory().unwrap();
        let user = db.accounts().sign_up(" Ada@Example.com ", "hunter22").unwrap();
        assert_eq!(user.email, "ada@example.com");

        db.accounts().sign_out().unwrap();
        assert!(db.accounts().current_user().unwrap().is_none());

        let again = db.accounts().sign_in("ada@example.com", "hunter22").unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(db.accounts().current_user().unwrap(), Some(again));
    }

    #[test]
    fn test_error_codes() {
        let db = Database::open_in_memory().unwrap();
        db.accounts().sign_up("ada@example.com", "hunter22").unwrap();

        let err = db.accounts().sign_up("ada@example.com", "another1").unwrap_err();
        assert_eq!(err.code(), "auth/email-already-in-use");

        let err = db.accounts().sign_up("bob@example.com", "123").unwrap_err();
        assert_eq!(err.code(), "auth/weak-password");

        let err = db.accounts().sign_up("not-an-email", "hunter22").unwrap_err();
        assert_eq!(err.code(), "auth/invalid-email");

        let err = db.accounts().sign_in("ada@example.com", "wrong-pass").unwrap_err();
        assert_eq!(err.code(), "auth/wrong-password");

        let err = db.accounts().sign_in("eve@example.com", "hunter22").unwrap_err();
        assert_eq!(err.code(), "auth/user-not-found");

        let err = db.accounts().sign_in_federated("google").unwrap_err();
        assert_eq!(err.code(), "auth/operation-not-allowed");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::WrongPassword.user_message(),
            AuthError::InvalidCredential.user_message()
        );
        assert!(AuthError::UserNotFound.user_message().contains("sign up"));
        assert_eq!(
            AuthError::Other("auth/too-many-requests".into()).user_message(),
            "Authentication failed. Please try again."
        );
        assert_eq!(
            AuthError::OperationNotAllowed.user_message(),
            "Authentication failed. Please try again."
        );
    }

    #[test]
    fn test_watch_user_sees_changes() {
        let db = Database::open_in_memory().unwrap();
        let rx = db.watch_user();
        assert!(rx.borrow().is_none());

        db.accounts().sign_up("ada@example.com", "hunter22").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow().as_ref().map(|u| u.email.as_str()),
            Some("ada@example.com")
        );

        db.accounts().sign_out().unwrap();
        assert!(rx.borrow().is_none());
    }
}
