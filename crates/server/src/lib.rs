//! Inventory Server Library
//!
//! Authenticated order/product aggregate API with a realtime presence
//! channel. REST surface under /api, WebSocket presence on /ws.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod error;
pub mod handlers;
pub mod models;
pub mod presence;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth::token::TokenService;
use auth::CredentialStore;
use config::{AppState, ServerConfig};
use presence::PresenceBroadcaster;
use store::AggregateStore;

/// Build the full router over the given state. Exposed so tests can
/// drive the HTTP surface without binding a socket.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/api/orders/{id}", delete(handlers::delete_order))
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/api/products/{id}", delete(handlers::delete_product))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::mw_require_auth,
        ));

    Router::new()
        // Public auth endpoints
        .route("/api/auth/register", post(auth::handlers::register))
        .route("/api/auth/login", post(auth::handlers::login))
        // Protected aggregate endpoints
        .merge(protected)
        // Presence channel (unauthenticated by scope)
        .route("/ws", get(presence::ws_presence))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire up state from configuration: one SQLite pool shared by the
/// credential store and the aggregate store, plus token service and
/// presence broadcaster.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let pool = store::connect(&config.database_path).await?;

    let credentials = CredentialStore::new(pool.clone());
    credentials.init().await?;

    let aggregate_store = AggregateStore::new(pool);
    aggregate_store.init().await?;

    Ok(AppState {
        store: Arc::new(aggregate_store),
        credentials: Arc::new(credentials),
        tokens: Arc::new(TokenService::new(&config.token_secret)),
        presence: Arc::new(PresenceBroadcaster::new()),
    })
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    let config = ServerConfig::default();

    info!("=== Inventory Server ===");
    info!("Database: {:?}", config.database_path);

    let state = build_state(&config).await?;
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server closed");
    Ok(())
}

async fn health_check() -> &'static str {
    "OK - Inventory Server"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, closing server");
}
