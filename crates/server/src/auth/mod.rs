//! Authentication
//!
//! Credential storage (bcrypt-hashed passwords in SQLite) plus the
//! stateless token service and the bearer-token middleware.

pub mod handlers;
pub mod middleware;
pub mod token;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Public user identity. The password hash never leaves this module.
#[derive(Debug, Clone, Serialize)]
pub struct UserIdentity {
    pub id: i64,
    pub email: String,
}

/// Hashes and verifies user passwords against the `users` table.
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the users table if missing.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::storage("Failed to initialize users table"))?;

        Ok(())
    }

    /// Register a new user. The stored hash is one-way and salted;
    /// only `{id, email}` is ever returned.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserIdentity> {
        validate_credentials(email, password)?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::storage("Registration failed"))?;

        if existing.is_some() {
            return Err(Error::Conflict("User already exists".to_string()));
        }

        let password_hash = hash(password, DEFAULT_COST).map_err(|e| {
            tracing::error!("Failed to hash password: {e}");
            Error::Storage("Registration failed")
        })?;

        let result =
            sqlx::query("INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)")
                .bind(email)
                .bind(&password_hash)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await
                .map_err(Error::storage("Registration failed"))?;

        let id = result.last_insert_rowid();

        info!("[Auth] User registered: {email}");

        Ok(UserIdentity {
            id,
            email: email.to_string(),
        })
    }

    /// Verify a login attempt. Unknown email and wrong password fail
    /// identically so callers cannot enumerate accounts.
    pub async fn verify(&self, email: &str, password: &str) -> Result<UserIdentity> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, password_hash FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::storage("Login failed"))?;

        let Some((id, password_hash)) = row else {
            warn!("[Auth] Failed login attempt for {email}");
            return Err(Error::InvalidCredentials);
        };

        let valid = verify(password, &password_hash).map_err(|e| {
            tracing::error!("Failed to verify password: {e}");
            Error::Storage("Login failed")
        })?;

        if !valid {
            warn!("[Auth] Failed login attempt for {email}");
            return Err(Error::InvalidCredentials);
        }

        Ok(UserIdentity {
            id,
            email: email.to_string(),
        })
    }
}

/// Basic `local@domain.tld` shape check plus minimum password length.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        return Err(Error::Validation("Email and password required".to_string()));
    }
    if !email_shape_ok(email) {
        return Err(Error::Validation("Invalid email format".to_string()));
    }
    if password.chars().count() < 6 {
        return Err(Error::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn email_shape_ok(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(email_shape_ok("user@example.com"));
        assert!(email_shape_ok("a.b@sub.example.org"));
        assert!(!email_shape_ok("userexample.com"));
        assert!(!email_shape_ok("user@example"));
        assert!(!email_shape_ok("@example.com"));
        assert!(!email_shape_ok("user@.com"));
        assert!(!email_shape_ok("user@example."));
        assert!(!email_shape_ok("us er@example.com"));
        assert!(!email_shape_ok("user@@example.com"));
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_credentials("user@example.com", "12345").is_err());
        assert!(validate_credentials("user@example.com", "123456").is_ok());
    }
}
