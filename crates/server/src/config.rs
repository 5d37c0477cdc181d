//! Inventory server configuration

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::token::TokenService;
use crate::auth::CredentialStore;
use crate::presence::PresenceBroadcaster;
use crate::store::AggregateStore;

/// Configuration for the inventory server
#[derive(Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Secret used to sign session tokens. Never logged.
    pub token_secret: String,
}

// The token secret must never appear in logs, so Debug redacts it.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            database_path: std::env::var("INVENTORY_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("inventory.sqlite")),
            token_secret: std::env::var("TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-only-secret".to_string()),
        }
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AggregateStore>,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub presence: Arc<PresenceBroadcaster>,
}
