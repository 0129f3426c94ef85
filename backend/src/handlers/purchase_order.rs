//! HTTP handlers for purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Capability, PurchaseOrder, PurchaseOrderStatus};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PricingInput, PurchaseOrderService, ReceiveInput,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct PurchaseOrderQuery {
    pub status: Option<String>,
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PurchaseOrderQuery>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    current_user.0.require(Capability::ViewPurchaseOrders)?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse::<PurchaseOrderStatus>().map_err(|m| {
            AppError::validation("status", &m, "สถานะใบสั่งซื้อไม่ถูกต้อง")
        })?),
    };
    let orders = PurchaseOrderService::new(state.db).list(status).await?;
    Ok(Json(orders))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<String>,
) -> AppResult<Json<PurchaseOrder>> {
    current_user.0.require(Capability::ViewPurchaseOrders)?;
    let order = PurchaseOrderService::new(state.db).get(&po_id).await?;
    Ok(Json(order))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrder>)> {
    current_user.0.require(Capability::CreatePurchaseOrders)?;
    let order = PurchaseOrderService::new(state.db)
        .create(&current_user.0.staff_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_pricing(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<String>,
    Json(input): Json<PricingInput>,
) -> AppResult<Json<PurchaseOrder>> {
    current_user.0.require(Capability::PricePurchaseOrders)?;
    let order = PurchaseOrderService::new(state.db)
        .update_pricing(&po_id, input)
        .await?;
    Ok(Json(order))
}

pub async fn receive_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<String>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<PurchaseOrder>> {
    current_user.0.require(Capability::ReceivePurchaseOrders)?;
    let order = PurchaseOrderService::new(state.db)
        .receive(&po_id, &current_user.0.staff_id, input)
        .await?;
    Ok(Json(order))
}
