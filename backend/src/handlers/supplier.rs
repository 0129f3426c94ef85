//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Capability, Supplier};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::supplier::{SupplierInput, SupplierService};
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Supplier>>> {
    current_user.0.require(Capability::ViewSuppliers)?;
    let suppliers = SupplierService::new(state.db).list().await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<String>,
) -> AppResult<Json<Supplier>> {
    current_user.0.require(Capability::ViewSuppliers)?;
    let supplier = SupplierService::new(state.db).get(&supplier_id).await?;
    Ok(Json(supplier))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    current_user.0.require(Capability::ManageSuppliers)?;
    let supplier = SupplierService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<String>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    current_user.0.require(Capability::ManageSuppliers)?;
    let supplier = SupplierService::new(state.db)
        .update(&supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

pub async fn deactivate_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<String>,
) -> AppResult<StatusCode> {
    current_user.0.require(Capability::ManageSuppliers)?;
    SupplierService::new(state.db).deactivate(&supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
