use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::booking::empty_as_none;
use crate::models::{BookingReport, DateWindow, PaymentReport, ReviewReport};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub service_id: Option<i64>,
}

impl ReportQuery {
    fn window(&self) -> Result<Option<DateWindow>, AppError> {
        let start = parse_date("start_date", self.start_date.as_deref())?;
        let end = parse_date("end_date", self.end_date.as_deref())?;
        DateWindow::from_bounds(start, end).map_err(AppError::Validation)
    }
}

/// Empty values count as absent.
fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{name} must be YYYY-MM-DD, got {v:?}"))),
    }
}

// GET /bookings/reports?start_date=&end_date=
pub async fn booking_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<BookingReport>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let report = state.reports.booking_report(query.window()?).await?;
    Ok(Json(report))
}

// GET /payments/reports?start_date=&end_date=&service_id=
pub async fn payment_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PaymentReport>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let report = state
        .reports
        .payment_report(query.window()?, query.service_id)
        .await?;
    Ok(Json(report))
}

// GET /reviews/reports?start_date=&end_date=&service_id=
pub async fn review_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReviewReport>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let report = state
        .reports
        .review_report(query.window()?, query.service_id)
        .await?;
    Ok(Json(report))
}
