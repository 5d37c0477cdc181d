use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Hard gate in front of every protected route: no handler runs
/// without a verified bearer token.
pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(h) => h.to_str().map_err(|_| Error::InvalidToken)?,
        None => return Err(Error::NoToken),
    };

    // Format: "Bearer <token>"
    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Err(Error::InvalidToken);
    };

    let claims = state.tokens.verify(token)?;

    let ctx = Ctx::new(claims.sub, claims.email);
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
