//! Server error taxonomy
//!
//! One enum covers every failure a handler can surface. Internal detail
//! (sqlx messages, bcrypt errors) is logged where it happens and never
//! reaches the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input, rejected before any write
    #[error("{0}")]
    Validation(String),

    /// Duplicate unique key (e.g. email already registered)
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials on login; unknown email and wrong password are
    /// deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Protected route called without an Authorization header
    #[error("No token")]
    NoToken,

    /// Token present but malformed, badly signed, or expired
    #[error("Invalid token")]
    InvalidToken,

    /// Auth middleware ran but left no context behind
    #[error("Auth context missing")]
    CtxMissing,

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unexpected persistence failure; the whole operation was aborted
    #[error("{0}")]
    Storage(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Convert a sqlx error into a `Storage` error with a safe,
    /// caller-facing message, logging the real cause.
    pub fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
        move |err| {
            tracing::error!("{context}: {err}");
            Error::Storage(context)
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::InvalidCredentials | Error::NoToken | Error::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Error::CtxMissing => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
