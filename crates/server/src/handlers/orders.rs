//! Order handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::{NewOrder, Order};

/// GET /api/orders
pub async fn list_orders(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Vec<Order>>> {
    info!("GET /api/orders - {}", ctx.email());

    let orders = state.store.list_orders().await?;
    Ok(Json(orders))
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(input): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    info!("POST /api/orders - {}", ctx.email());

    let order = state.store.create_order(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// DELETE /api/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    info!("DELETE /api/orders/{id} - {}", ctx.email());

    state.store.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
