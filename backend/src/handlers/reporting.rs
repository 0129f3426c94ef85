//! Reporting handlers for dashboard metrics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{Capability, ExportFormat};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{
    validate_range, DashboardMetrics, ExportKind, ReportingService, DEFAULT_LOW_STOCK_THRESHOLD,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub low_stock_threshold: Option<i32>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub kind: ExportKind,
    #[serde(default)]
    pub format: ExportFormat,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardMetrics>> {
    current_user.0.require(Capability::ViewReports)?;
    let threshold = query
        .low_stock_threshold
        .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let metrics = ReportingService::new(state.db)
        .get_dashboard_metrics(threshold)
        .await?;
    Ok(Json(metrics))
}

/// Download an export as CSV, HTML or JSON
pub async fn export_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    current_user.0.require(Capability::ExportReports)?;
    let range = validate_range(query.start_date, query.end_date)?;
    let file = ReportingService::new(state.db)
        .export(query.kind, query.format, &range)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    )
        .into_response())
}
