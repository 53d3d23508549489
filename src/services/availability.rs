use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;

use crate::clock;
use crate::db::{BookingStore, StoreError};
use crate::models::CalendarMonth;

/// Bookable days of one month for one service.
///
/// Holds the booked set and "today" captured at query time; [`iter`] can be
/// called any number of times and always yields the same ascending dates.
///
/// [`iter`]: AvailableDates::iter
#[derive(Debug, Clone)]
pub struct AvailableDates {
    month: CalendarMonth,
    today: NaiveDate,
    booked: HashSet<NaiveDate>,
}

impl AvailableDates {
    pub fn new(
        month: CalendarMonth,
        today: NaiveDate,
        booked: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            month,
            today,
            booked: booked.into_iter().collect(),
        }
    }

    pub fn month(&self) -> CalendarMonth {
        self.month
    }

    /// Days strictly after today that no active booking holds.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.month
            .days()
            .filter(move |day| *day > self.today && !self.booked.contains(day))
    }

    /// Booked days of the month that are still in the future.
    pub fn future_booked_count(&self) -> usize {
        self.booked
            .iter()
            .filter(|day| **day > self.today && self.month.contains(**day))
            .count()
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn is_service_available(
        &self,
        service_id: i64,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let taken = self.store.is_slot_taken(service_id, date).await?;
        Ok(!taken)
    }

    /// One store query for the whole month, then a day-by-day walk.
    pub async fn available_dates(
        &self,
        service_id: i64,
        month: CalendarMonth,
    ) -> Result<AvailableDates, StoreError> {
        let booked = self.store.booked_dates(service_id, month).await?;
        let today = clock::today(self.clock.as_ref());

        tracing::debug!(
            service_id,
            year = month.year(),
            month = month.month(),
            booked = booked.len(),
            "computing available dates"
        );

        Ok(AvailableDates::new(month, today, booked))
    }
}
