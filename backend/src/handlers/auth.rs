//! Authentication handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use shared::{visible_nav_items, Capability, Staff, VisibleNavItem};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::AuthSession;
use crate::services::{AuthService, StaffService};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in staff member and what they may do
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub staff: Staff,
    pub capabilities: Vec<Capability>,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthSession>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let session = auth_service.login(&body.email, &body.password).await?;
    Ok(Json(session))
}

pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let staff = StaffService::new(state.db)
        .get(&current_user.0.staff_id)
        .await?;
    Ok(Json(MeResponse {
        capabilities: staff.role.capabilities(),
        staff,
    }))
}

/// Dashboard sections visible to the caller's role
pub async fn navigation(current_user: CurrentUser) -> Json<Vec<VisibleNavItem>> {
    Json(visible_nav_items(current_user.0.role))
}
