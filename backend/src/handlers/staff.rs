//! HTTP handlers for staff administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Capability, Staff};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::staff::{CreateStaffInput, StaffService, UpdateStaffInput};
use crate::AppState;

pub async fn list_staff(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Staff>>> {
    current_user.0.require(Capability::ManageStaff)?;
    let staff = StaffService::new(state.db).list().await?;
    Ok(Json(staff))
}

pub async fn get_staff(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(staff_id): Path<String>,
) -> AppResult<Json<Staff>> {
    current_user.0.require(Capability::ManageStaff)?;
    let staff = StaffService::new(state.db).get(&staff_id).await?;
    Ok(Json(staff))
}

pub async fn create_staff(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStaffInput>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    current_user.0.require(Capability::ManageStaff)?;
    let staff = StaffService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(staff_id): Path<String>,
    Json(input): Json<UpdateStaffInput>,
) -> AppResult<Json<Staff>> {
    current_user.0.require(Capability::ManageStaff)?;
    let staff = StaffService::new(state.db).update(&staff_id, input).await?;
    Ok(Json(staff))
}

pub async fn deactivate_staff(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(staff_id): Path<String>,
) -> AppResult<StatusCode> {
    current_user.0.require(Capability::ManageStaff)?;
    StaffService::new(state.db).deactivate(&staff_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
