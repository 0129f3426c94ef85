//! HTTP handlers for stock movements

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Capability, Request, StockTransaction};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock::{
    FulfillItemInput, FulfillRequestInput, ItemFulfillment, StockInInput, StockInReceipt,
    StockService,
};
use crate::AppState;

pub async fn stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockInInput>,
) -> AppResult<(StatusCode, Json<StockInReceipt>)> {
    current_user.0.require(Capability::StockIn)?;
    let receipt = StockService::new(state.db)
        .add_stock_in(&current_user.0.staff_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockTransaction>>> {
    current_user.0.require(Capability::ViewStockTransactions)?;
    let transactions = StockService::new(state.db).list_transactions().await?;
    Ok(Json(transactions))
}

/// Movements recorded against one request or purchase order
pub async fn transactions_for_reference(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reference_id): Path<String>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    current_user.0.require(Capability::ViewStockTransactions)?;
    let transactions = StockService::new(state.db)
        .transactions_for_reference(&reference_id)
        .await?;
    Ok(Json(transactions))
}

pub async fn approved_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Request>>> {
    current_user.0.require(Capability::FulfillRequests)?;
    let requests = StockService::new(state.db).approved_requests().await?;
    Ok(Json(requests))
}

pub async fn fulfill_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FulfillItemInput>,
) -> AppResult<Json<ItemFulfillment>> {
    current_user.0.require(Capability::FulfillRequests)?;
    let result = StockService::new(state.db)
        .fulfill_item(&current_user.0.staff_id, input)
        .await?;
    Ok(Json(result))
}

/// Fulfill several lines of one request in a single transaction
pub async fn fulfill_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FulfillRequestInput>,
) -> AppResult<Json<Vec<ItemFulfillment>>> {
    current_user.0.require(Capability::FulfillRequests)?;
    let results = StockService::new(state.db)
        .fulfill_request(&current_user.0.staff_id, input)
        .await?;
    Ok(Json(results))
}
