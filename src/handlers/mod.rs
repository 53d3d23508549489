pub mod bookings;
pub mod health;
pub mod reports;

use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/available-dates", get(bookings::available_dates))
        .route("/bookings/reports", get(reports::booking_report))
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/:id/status", put(bookings::update_booking_status))
        .route("/payments/reports", get(reports::payment_report))
        .route("/reviews/reports", get(reports::review_report))
        .with_state(state)
}
