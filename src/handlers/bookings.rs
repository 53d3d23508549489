use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingUpdate, CalendarMonth};
use crate::state::AppState;

// POST /bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(body) = payload?;
    let booking = state
        .bookings
        .create(body.user_id, body.service_id, body.date, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings?user_id=&service_id=
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list(filter).await?))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(id).await?))
}

// PUT /bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<BookingUpdate>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let Json(body) = payload?;
    Ok(Json(state.bookings.update(id, body).await?))
}

// DELETE /bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.bookings.delete(id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// PUT /bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = payload?;
    state.bookings.update_status(id, &body.status).await?;
    Ok(Json(serde_json::json!({"ok": true, "status": body.status})))
}

// GET /bookings/available-dates?service_id=&year=&month=
#[derive(Deserialize)]
pub struct AvailableDatesQuery {
    pub service_id: i64,
    pub year: i32,
    pub month: u32,
}

#[derive(Serialize)]
pub struct AvailableDatesResponse {
    service_id: i64,
    year: i32,
    month: u32,
    available_dates: Vec<NaiveDate>,
}

pub async fn available_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableDatesQuery>,
) -> Result<Json<AvailableDatesResponse>, AppError> {
    let month = CalendarMonth::new(query.year, query.month).map_err(AppError::Validation)?;
    let dates = state
        .availability
        .available_dates(query.service_id, month)
        .await?;

    Ok(Json(AvailableDatesResponse {
        service_id: query.service_id,
        year: month.year(),
        month: month.month(),
        available_dates: dates.iter().collect(),
    }))
}
