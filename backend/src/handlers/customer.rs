//! HTTP handlers for customer endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Capability, Customer};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::customer::{CustomerInput, CustomerService};
use crate::AppState;

pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Customer>>> {
    current_user.0.require(Capability::ViewCustomers)?;
    let customers = CustomerService::new(state.db).list().await?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<String>,
) -> AppResult<Json<Customer>> {
    current_user.0.require(Capability::ViewCustomers)?;
    let customer = CustomerService::new(state.db).get(&customer_id).await?;
    Ok(Json(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    current_user.0.require(Capability::ManageCustomers)?;
    let customer = CustomerService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<String>,
    Json(input): Json<CustomerInput>,
) -> AppResult<Json<Customer>> {
    current_user.0.require(Capability::ManageCustomers)?;
    let customer = CustomerService::new(state.db)
        .update(&customer_id, input)
        .await?;
    Ok(Json(customer))
}

pub async fn deactivate_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<String>,
) -> AppResult<StatusCode> {
    current_user.0.require(Capability::ManageCustomers)?;
    CustomerService::new(state.db).deactivate(&customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
