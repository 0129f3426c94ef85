//! HTTP handlers for sales orders

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Capability, Order, OrderItem};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{CreateOrderInput, OrderService};
use crate::AppState;

pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    current_user.0.require(Capability::ViewOrders)?;
    let orders = OrderService::new(state.db).list().await?;
    Ok(Json(orders))
}

pub async fn list_confirmed_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    current_user.0.require(Capability::ViewOrders)?;
    let orders = OrderService::new(state.db).confirmed().await?;
    Ok(Json(orders))
}

pub async fn list_orders_ready_to_close(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    current_user.0.require(Capability::ViewOrders)?;
    let orders = OrderService::new(state.db).ready_to_close().await?;
    Ok(Json(orders))
}

pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    current_user.0.require(Capability::CreateOrders)?;
    let order = OrderService::new(state.db)
        .create(&current_user.0.staff_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_order_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<OrderItem>>> {
    current_user.0.require(Capability::ViewOrders)?;
    let items = OrderService::new(state.db).items(&order_id).await?;
    Ok(Json(items))
}

pub async fn close_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<Order>> {
    current_user.0.require(Capability::CloseOrders)?;
    let order = OrderService::new(state.db)
        .close(&order_id, &current_user.0.staff_id)
        .await?;
    Ok(Json(order))
}
