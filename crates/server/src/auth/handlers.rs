//! Auth handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{validate_credentials, UserIdentity};
use crate::config::AppState;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserIdentity>)> {
    info!("POST /api/auth/register - {}", req.email);

    let user = state.credentials.register(&req.email, &req.password).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    info!("POST /api/auth/login - {}", req.email);

    validate_credentials(&req.email, &req.password)?;

    let user = state.credentials.verify(&req.email, &req.password).await?;
    let token = state.tokens.issue(user.id, &user.email)?;

    Ok(Json(LoginResponse { token }))
}
