//! HTTP handlers for stock requests

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Capability, Request, RequestItem};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::request::{CreateRequestInput, RequestFilter, RequestService};
use crate::AppState;

#[derive(Deserialize)]
pub struct RequestListQuery {
    #[serde(default)]
    pub status: RequestFilter,
    pub order_id: Option<String>,
}

pub async fn list_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RequestListQuery>,
) -> AppResult<Json<Vec<Request>>> {
    current_user.0.require(Capability::ViewRequests)?;
    let requests = RequestService::new(state.db)
        .list(query.status, query.order_id.as_deref())
        .await?;
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<String>,
) -> AppResult<Json<Request>> {
    current_user.0.require(Capability::ViewRequests)?;
    let request = RequestService::new(state.db).get(&request_id).await?;
    Ok(Json(request))
}

pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<(StatusCode, Json<Request>)> {
    current_user.0.require(Capability::CreateRequests)?;
    let request = RequestService::new(state.db)
        .create(&current_user.0.staff_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_request_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<String>,
) -> AppResult<Json<Vec<RequestItem>>> {
    current_user.0.require(Capability::ViewRequests)?;
    let items = RequestService::new(state.db).items(&request_id).await?;
    Ok(Json(items))
}

pub async fn approve_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<String>,
) -> AppResult<Json<Request>> {
    current_user.0.require(Capability::ApproveRequests)?;
    let request = RequestService::new(state.db)
        .approve(&request_id, &current_user.0.staff_id)
        .await?;
    Ok(Json(request))
}

pub async fn reject_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<String>,
) -> AppResult<Json<Request>> {
    current_user.0.require(Capability::ApproveRequests)?;
    let request = RequestService::new(state.db)
        .reject(&request_id, &current_user.0.staff_id)
        .await?;
    Ok(Json(request))
}

pub async fn close_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<String>,
) -> AppResult<Json<Request>> {
    current_user.0.require(Capability::CloseRequests)?;
    let request = RequestService::new(state.db)
        .close(&request_id, &current_user.0.staff_id)
        .await?;
    Ok(Json(request))
}
