//! HTTP handlers for the product catalogue and its batches

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Capability, Product, ProductBatch};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::product::{
    AdjustQuantityInput, AdjustmentResult, CreateProductInput, ProductService, UpdateProductInput,
};
use crate::services::stock::{AllocationPreview, StockService};
use crate::AppState;

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub quantity: i32,
}

pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    current_user.0.require(Capability::ViewProducts)?;
    let products = ProductService::new(state.db).list().await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<Product>> {
    current_user.0.require(Capability::ViewProducts)?;
    let product = ProductService::new(state.db).get(&product_id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    current_user.0.require(Capability::ManageProducts)?;
    let product = ProductService::new(state.db)
        .create(&current_user.0.staff_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    current_user.0.require(Capability::ManageProducts)?;
    let product = ProductService::new(state.db)
        .update(&product_id, input)
        .await?;
    Ok(Json(product))
}

pub async fn deactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<StatusCode> {
    current_user.0.require(Capability::ManageProducts)?;
    ProductService::new(state.db).deactivate(&product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn adjust_quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
    Json(input): Json<AdjustQuantityInput>,
) -> AppResult<Json<AdjustmentResult>> {
    current_user.0.require(Capability::ManageProducts)?;
    let result = ProductService::new(state.db)
        .adjust_quantity(&product_id, &current_user.0.staff_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<Vec<ProductBatch>>> {
    current_user.0.require(Capability::ViewProducts)?;
    let batches = ProductService::new(state.db).batches(&product_id).await?;
    Ok(Json(batches))
}

/// Batches with stock left, oldest first
pub async fn list_available_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
) -> AppResult<Json<Vec<ProductBatch>>> {
    current_user.0.require(Capability::ViewProducts)?;
    let batches = ProductService::new(state.db)
        .available_batches(&product_id)
        .await?;
    Ok(Json(batches))
}

pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((product_id, batch_id)): Path<(String, String)>,
) -> AppResult<Json<ProductBatch>> {
    current_user.0.require(Capability::ViewProducts)?;
    let batch = ProductService::new(state.db)
        .batch(&product_id, &batch_id)
        .await?;
    Ok(Json(batch))
}

/// Which batches a fulfillment of `quantity` would draw from
pub async fn preview_allocation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> AppResult<Json<AllocationPreview>> {
    current_user.0.require(Capability::FulfillRequests)?;
    let preview = StockService::new(state.db)
        .preview_allocation(&product_id, query.quantity)
        .await?;
    Ok(Json(preview))
}
