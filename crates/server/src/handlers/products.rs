//! Product handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::{NewProduct, Product};

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    /// Exact-match type filter
    #[serde(rename = "type")]
    pub product_type: Option<String>,
}

/// GET /api/products?type=
pub async fn list_products(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    info!("GET /api/products - {}", ctx.email());

    let products = state
        .store
        .list_products(filter.product_type.as_deref())
        .await?;
    Ok(Json(products))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    info!("POST /api/products - {}", ctx.email());

    let product = state.store.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// DELETE /api/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    info!("DELETE /api/products/{id} - {}", ctx.email());

    state.store.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
