use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;

use crate::clock;
use crate::db::{BookingStore, StoreError};
use crate::models::{
    Booking, BookingFilter, BookingStatus, BookingUpdate, NewBooking, TransitionPolicy,
};
use crate::services::availability::AvailabilityService;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking date {date} must be after {today}")]
    PastOrPresentDate { date: NaiveDate, today: NaiveDate },

    #[error("service {service_id} is already booked on {date}")]
    SlotUnavailable { service_id: i64, date: NaiveDate },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("cannot move booking from {from} to {to}")]
    IllegalTransition { from: BookingStatus, to: BookingStatus },

    #[error("booking {id} changed status while it was being updated")]
    StatusChanged { id: i64 },

    #[error("booking {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creation, overwrite, status changes and deletion of bookings.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    availability: AvailabilityService,
    clock: Arc<dyn Clock>,
    policy: TransitionPolicy,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        availability: AvailabilityService,
        clock: Arc<dyn Clock>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            store,
            availability,
            clock,
            policy,
        }
    }

    /// Books `date` for `service_id` as `Pending`.
    ///
    /// The date must be after today and the slot free. The store re-checks
    /// the slot inside its insert, so a racing request that passed the
    /// availability check still gets [`BookingError::SlotUnavailable`].
    pub async fn create(
        &self,
        user_id: i64,
        service_id: i64,
        date: NaiveDate,
        description: String,
    ) -> Result<Booking, BookingError> {
        let today = clock::today(self.clock.as_ref());
        if date <= today {
            tracing::warn!(service_id, date = %date, "rejected booking for past or present date");
            return Err(BookingError::PastOrPresentDate { date, today });
        }

        if !self.availability.is_service_available(service_id, date).await? {
            tracing::warn!(service_id, date = %date, "rejected booking for taken slot");
            return Err(BookingError::SlotUnavailable { service_id, date });
        }

        let booking = self
            .store
            .insert_booking(NewBooking {
                user_id,
                service_id,
                date,
                status: BookingStatus::Pending,
                description,
                created_at: clock::now(self.clock.as_ref()),
            })
            .await
            .map_err(|e| slot_error(e, service_id, date))?;

        tracing::info!(
            booking_id = booking.id,
            user_id,
            service_id,
            date = %date,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn get(&self, id: i64) -> Result<Booking, BookingError> {
        self.store
            .get_booking(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    pub async fn list(&self, filter: BookingFilter) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings(filter).await?)
    }

    /// Full overwrite. Neither the date nor the slot is re-validated, and the
    /// status is taken as given.
    pub async fn update(&self, id: i64, update: BookingUpdate) -> Result<Booking, BookingError> {
        let mut booking = self.get(id).await?;

        booking.user_id = update.user_id;
        booking.service_id = update.service_id;
        booking.date = update.date;
        booking.status = update.status;
        booking.description = update.description;
        booking.updated_at = clock::now(self.clock.as_ref());

        let found = self
            .store
            .replace_booking(&booking)
            .await
            .map_err(|e| slot_error(e, booking.service_id, booking.date))?;
        if !found {
            return Err(BookingError::NotFound(id));
        }

        tracing::info!(booking_id = id, status = %booking.status, "booking updated");
        Ok(booking)
    }

    /// Moves a booking to `new_status`.
    ///
    /// The label must be a canonical status that the policy lists as a
    /// target. With `enforce_graph` set, the move must also be legal from
    /// the current status, and the write only lands if that status is still
    /// current.
    pub async fn update_status(&self, id: i64, new_status: &str) -> Result<(), BookingError> {
        let target = BookingStatus::parse(new_status)
            .filter(|status| self.policy.permits_target(*status))
            .ok_or_else(|| BookingError::InvalidStatus(new_status.to_string()))?;

        let expected = if self.policy.enforce_graph {
            let current = self.get(id).await?.status;
            if !current.can_transition_to(target) {
                tracing::warn!(
                    booking_id = id,
                    from = %current,
                    to = %target,
                    "illegal status transition"
                );
                return Err(BookingError::IllegalTransition {
                    from: current,
                    to: target,
                });
            }
            Some(current)
        } else {
            None
        };

        let now = clock::now(self.clock.as_ref());
        let updated = self
            .store
            .update_booking_status(id, expected, target, now)
            .await?;

        if !updated {
            return match (expected, self.store.get_booking(id).await?) {
                (Some(_), Some(_)) => Err(BookingError::StatusChanged { id }),
                _ => Err(BookingError::NotFound(id)),
            };
        }

        tracing::info!(booking_id = id, status = %target, "booking status updated");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), BookingError> {
        if !self.store.delete_booking(id).await? {
            return Err(BookingError::NotFound(id));
        }
        tracing::info!(booking_id = id, "booking deleted");
        Ok(())
    }
}

fn slot_error(err: StoreError, service_id: i64, date: NaiveDate) -> BookingError {
    match err {
        StoreError::SlotTaken => BookingError::SlotUnavailable { service_id, date },
        other => BookingError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    use crate::clock::FixedClock;
    use crate::db::{self, SqliteStore};
    use crate::errors::AppError;
    use crate::models::{
        CalendarMonth, DateWindow, GroupTotal, NewPayment, NewReview, Payment, PaymentStatus,
        Review,
    };

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn wire(store: Arc<dyn BookingStore>, policy: TransitionPolicy) -> BookingService {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(d("2025-03-01")));
        let availability = AvailabilityService::new(store.clone(), clock.clone());
        BookingService::new(store, availability, clock, policy)
    }

    fn service_with(policy: TransitionPolicy) -> (Arc<SqliteStore>, BookingService) {
        let store = Arc::new(SqliteStore::new(db::init_db(":memory:").unwrap()));
        let service = wire(store.clone(), policy);
        (store, service)
    }

    fn setup() -> (Arc<SqliteStore>, BookingService) {
        service_with(TransitionPolicy::default())
    }

    fn literal_policy() -> TransitionPolicy {
        TransitionPolicy {
            enforce_graph: false,
            ..TransitionPolicy::default()
        }
    }

    async fn book(service: &BookingService, service_id: i64, date: &str) -> Booking {
        service
            .create(1, service_id, d(date), String::new())
            .await
            .unwrap()
    }

    fn overwrite(service_id: i64, date: &str, status: BookingStatus) -> BookingUpdate {
        BookingUpdate {
            user_id: 1,
            service_id,
            date: d(date),
            status,
            description: String::new(),
        }
    }

    /// Store whose status writes always lose the compare-and-set.
    struct LosesStatusRace(SqliteStore);

    #[async_trait]
    impl BookingStore for LosesStatusRace {
        async fn insert_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
            self.0.insert_booking(booking).await
        }

        async fn get_booking(&self, id: i64) -> Result<Option<Booking>, StoreError> {
            self.0.get_booking(id).await
        }

        async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
            self.0.list_bookings(filter).await
        }

        async fn replace_booking(&self, booking: &Booking) -> Result<bool, StoreError> {
            self.0.replace_booking(booking).await
        }

        async fn update_booking_status(
            &self,
            _id: i64,
            _expected: Option<BookingStatus>,
            _status: BookingStatus,
            _at: NaiveDateTime,
        ) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn delete_booking(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_booking(id).await
        }

        async fn is_slot_taken(
            &self,
            service_id: i64,
            date: NaiveDate,
        ) -> Result<bool, StoreError> {
            self.0.is_slot_taken(service_id, date).await
        }

        async fn booked_dates(
            &self,
            service_id: i64,
            month: CalendarMonth,
        ) -> Result<Vec<NaiveDate>, StoreError> {
            self.0.booked_dates(service_id, month).await
        }

        async fn booking_status_totals(
            &self,
            window: Option<DateWindow>,
        ) -> Result<Vec<GroupTotal<BookingStatus>>, StoreError> {
            self.0.booking_status_totals(window).await
        }

        async fn payment_status_totals(
            &self,
            window: Option<DateWindow>,
            service_id: Option<i64>,
        ) -> Result<Vec<GroupTotal<PaymentStatus>>, StoreError> {
            self.0.payment_status_totals(window, service_id).await
        }

        async fn review_rating_totals(
            &self,
            window: Option<DateWindow>,
            service_id: Option<i64>,
        ) -> Result<Vec<GroupTotal<i64>>, StoreError> {
            self.0.review_rating_totals(window, service_id).await
        }

        async fn record_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
            self.0.record_payment(payment).await
        }

        async fn record_review(&self, review: NewReview) -> Result<Review, StoreError> {
            self.0.record_review(review).await
        }
    }

    #[tokio::test]
    async fn test_create_sets_pending_and_takes_slot() {
        let (store, service) = setup();
        let booking = service
            .create(1, 7, d("2025-03-10"), "leaky tap".to_string())
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        let midnight = d("2025-03-01").and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(booking.created_at, midnight);
        assert!(store.is_slot_taken(7, d("2025-03-10")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_today_and_past() {
        let (store, service) = setup();
        for date in ["2025-03-01", "2025-02-28", "2024-12-31"] {
            let err = service
                .create(1, 7, d(date), String::new())
                .await
                .unwrap_err();
            assert!(matches!(err, BookingError::PastOrPresentDate { .. }), "{date}");
        }
        let all = store.list_bookings(BookingFilter::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_second_booking_on_same_slot_conflicts() {
        let (store, service) = setup();
        book(&service, 7, "2025-03-10").await;

        let err = service
            .create(2, 7, d("2025-03-10"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable { service_id: 7, .. }));

        let filter = BookingFilter {
            user_id: None,
            service_id: Some(7),
        };
        assert_eq!(store.list_bookings(filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_overwrites_without_revalidating_date() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;

        let update = BookingUpdate {
            user_id: 2,
            service_id: 8,
            date: d("2025-01-15"),
            status: BookingStatus::Completed,
            description: "done".to_string(),
        };
        let updated = service.update(booking.id, update).await.unwrap();

        assert_eq!(updated.date, d("2025-01-15"));
        assert_eq!(updated.status, BookingStatus::Completed);
        assert_eq!(service.get(booking.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_unknown_booking() {
        let (_store, service) = setup();
        let update = overwrite(7, "2025-03-10", BookingStatus::Pending);
        let err = service.update(42, update).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(42)));
    }

    #[tokio::test]
    async fn test_update_onto_taken_slot_conflicts() {
        let (_store, service) = setup();
        book(&service, 7, "2025-03-10").await;
        let other = book(&service, 7, "2025-03-11").await;

        let update = overwrite(7, "2025-03-10", BookingStatus::Pending);
        let err = service.update(other.id, update).await.unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_status_walks_the_graph() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;

        for status in ["Confirmed", "In Progress", "Completed"] {
            service.update_status(booking.id, status).await.unwrap();
        }
        let status = service.get(booking.id).await.unwrap().status;
        assert_eq!(status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_status_leaves_booking_untouched() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;

        for status in ["NotAStatus", "confirmed", "Pending", ""] {
            let err = service.update_status(booking.id, status).await.unwrap_err();
            assert!(matches!(err, BookingError::InvalidStatus(_)), "{status}");
        }
        let status = service.get(booking.id).await.unwrap().status;
        assert_eq!(status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;

        let err = service
            .update_status(booking.id, "Completed")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::IllegalTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Completed
            }
        ));
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;
        service.update_status(booking.id, "Cancelled").await.unwrap();

        let err = service
            .update_status(booking.id, "Confirmed")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_literal_policy_only_checks_membership() {
        let (_store, service) = service_with(literal_policy());
        let booking = book(&service, 7, "2025-03-10").await;

        service.update_status(booking.id, "Completed").await.unwrap();
        service.update_status(booking.id, "Confirmed").await.unwrap();
        let status = service.get(booking.id).await.unwrap().status;
        assert_eq!(status, BookingStatus::Confirmed);

        let err = service
            .update_status(booking.id, "Pending")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn test_status_update_missing_booking() {
        let (_store, strict) = setup();
        let err = strict.update_status(99, "Confirmed").await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(99)));

        let (_store, literal) = service_with(literal_policy());
        let err = literal.update_status(99, "Confirmed").await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_concurrent_status_change_is_a_conflict() {
        let inner = SqliteStore::new(db::init_db(":memory:").unwrap());
        let service = wire(
            Arc::new(LosesStatusRace(inner)),
            TransitionPolicy::default(),
        );
        let booking = book(&service, 7, "2025-03-10").await;

        let err = service
            .update_status(booking.id, "Confirmed")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::StatusChanged { id } if id == booking.id));
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));

        let status = service.get(booking.id).await.unwrap().status;
        assert_eq!(status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_lost_write_without_graph_means_booking_is_gone() {
        let inner = SqliteStore::new(db::init_db(":memory:").unwrap());
        let service = wire(Arc::new(LosesStatusRace(inner)), literal_policy());
        let booking = book(&service, 7, "2025-03-10").await;

        let err = service
            .update_status(booking.id, "Confirmed")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failures_surface_unchanged() {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute_batch("DROP TABLE bookings;").unwrap();
        let store = Arc::new(SqliteStore::new(conn));
        let service = wire(store.clone(), TransitionPolicy::default());

        let err = service
            .create(1, 7, d("2025-03-10"), String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Store(StoreError::Database(_))));
        assert!(matches!(AppError::from(err), AppError::Infrastructure(_)));

        let err = service.update_status(1, "Confirmed").await.unwrap_err();
        assert!(matches!(err, BookingError::Store(StoreError::Database(_))));

        let err = service.delete(1).await.unwrap_err();
        assert!(matches!(err, BookingError::Store(StoreError::Database(_))));

        let clock = Arc::new(FixedClock::on(d("2025-03-01")));
        let availability = AvailabilityService::new(store, clock);
        let err = availability
            .is_service_available(7, d("2025-03-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_cancelling_frees_the_slot() {
        let (_store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;
        service.update_status(booking.id, "Cancelled").await.unwrap();

        let rebooked = book(&service, 7, "2025-03-10").await;
        assert_ne!(rebooked.id, booking.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, service) = setup();
        let booking = book(&service, 7, "2025-03-10").await;

        service.delete(booking.id).await.unwrap();
        assert!(store.get_booking(booking.id).await.unwrap().is_none());
        let err = service.delete(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }
}
