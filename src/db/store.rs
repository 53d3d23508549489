use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{
    Booking, BookingFilter, BookingStatus, CalendarMonth, DateWindow, GroupTotal, NewBooking,
    NewPayment, NewReview, Payment, PaymentStatus, Review,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("slot already booked")]
    SlotTaken,

    #[error("database lock poisoned")]
    Poisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Durable storage for bookings and the satellite payment and review
/// records the reports read from.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Fails with [`StoreError::SlotTaken`] if an active booking already
    /// holds `(service_id, date)`.
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, StoreError>;

    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, StoreError>;

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError>;

    async fn replace_booking(&self, booking: &Booking) -> Result<bool, StoreError>;

    async fn update_booking_status(
        &self,
        id: i64,
        expected: Option<BookingStatus>,
        status: BookingStatus,
        at: NaiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn delete_booking(&self, id: i64) -> Result<bool, StoreError>;

    async fn is_slot_taken(&self, service_id: i64, date: NaiveDate) -> Result<bool, StoreError>;

    async fn booked_dates(
        &self,
        service_id: i64,
        month: CalendarMonth,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    async fn booking_status_totals(
        &self,
        window: Option<DateWindow>,
    ) -> Result<Vec<GroupTotal<BookingStatus>>, StoreError>;

    async fn payment_status_totals(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<Vec<GroupTotal<PaymentStatus>>, StoreError>;

    async fn review_rating_totals(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<Vec<GroupTotal<i64>>, StoreError>;

    async fn record_payment(&self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn record_review(&self, review: NewReview) -> Result<Review, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut conn = self.lock()?;
        queries::insert_booking(&mut conn, &booking)
    }

    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, StoreError> {
        let conn = self.lock()?;
        queries::get_booking_by_id(&conn, id)
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let conn = self.lock()?;
        queries::list_bookings(&conn, &filter)
    }

    async fn replace_booking(&self, booking: &Booking) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        queries::replace_booking(&conn, booking)
    }

    async fn update_booking_status(
        &self,
        id: i64,
        expected: Option<BookingStatus>,
        status: BookingStatus,
        at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        queries::update_booking_status(&conn, id, expected, status, at)
    }

    async fn delete_booking(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        queries::delete_booking(&conn, id)
    }

    async fn is_slot_taken(&self, service_id: i64, date: NaiveDate) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        queries::is_slot_taken(&conn, service_id, date)
    }

    async fn booked_dates(
        &self,
        service_id: i64,
        month: CalendarMonth,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let conn = self.lock()?;
        queries::booked_dates_between(&conn, service_id, month.first_day(), month.last_day())
    }

    async fn booking_status_totals(
        &self,
        window: Option<DateWindow>,
    ) -> Result<Vec<GroupTotal<BookingStatus>>, StoreError> {
        let conn = self.lock()?;
        queries::booking_status_totals(&conn, window.as_ref())
    }

    async fn payment_status_totals(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<Vec<GroupTotal<PaymentStatus>>, StoreError> {
        let conn = self.lock()?;
        queries::payment_status_totals(&conn, window.as_ref(), service_id)
    }

    async fn review_rating_totals(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<Vec<GroupTotal<i64>>, StoreError> {
        let conn = self.lock()?;
        queries::review_rating_totals(&conn, window.as_ref(), service_id)
    }

    async fn record_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let conn = self.lock()?;
        queries::insert_payment(&conn, &payment)
    }

    async fn record_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let conn = self.lock()?;
        queries::insert_review(&conn, &review)
    }
}
