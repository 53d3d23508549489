use std::sync::Arc;

use crate::db::{BookingStore, StoreError};
use crate::models::review::{MAX_RATING, MIN_RATING};
use crate::models::{
    BookingReport, BookingStatus, BookingStatusBucket, DateWindow, GroupTotal, PaymentReport,
    PaymentStatus, PaymentStatusBucket, RatingBucket, ReviewReport,
};

/// Buckets of the booking report, in output order.
pub const BOOKING_REPORT_STATUSES: [BookingStatus; 4] = [
    BookingStatus::Pending,
    BookingStatus::InProgress,
    BookingStatus::Completed,
    BookingStatus::Cancelled,
];

/// Buckets of the payment report, in output order.
pub const PAYMENT_REPORT_STATUSES: [PaymentStatus; 4] = [
    PaymentStatus::Paid,
    PaymentStatus::Pending,
    PaymentStatus::Refunded,
    PaymentStatus::Failed,
];

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report aggregation failed: {0}")]
    Aggregation(#[from] StoreError),
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn BookingStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn booking_report(
        &self,
        window: Option<DateWindow>,
    ) -> Result<BookingReport, ReportError> {
        let groups = self.store.booking_status_totals(window).await?;
        let report = summarize_bookings(&groups);
        tracing::debug!(total = report.total_count, ?window, "booking report");
        Ok(report)
    }

    pub async fn payment_report(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<PaymentReport, ReportError> {
        let groups = self.store.payment_status_totals(window, service_id).await?;
        let report = summarize_payments(&groups);
        tracing::debug!(total = report.total_count, ?window, ?service_id, "payment report");
        Ok(report)
    }

    pub async fn review_report(
        &self,
        window: Option<DateWindow>,
        service_id: Option<i64>,
    ) -> Result<ReviewReport, ReportError> {
        let groups = self.store.review_rating_totals(window, service_id).await?;
        let report = summarize_reviews(&groups);
        tracing::debug!(total = report.total_count, ?window, ?service_id, "review report");
        Ok(report)
    }
}

/// Grand count and amount over every group, including keys with no bucket.
fn grand_total<K>(groups: &[GroupTotal<K>]) -> (i64, f64) {
    groups
        .iter()
        .fold((0, 0.0), |(count, amount), g| (count + g.count, amount + g.amount))
}

/// Count and amount for one key, zero if the key has no rows.
fn bucket<K: PartialEq>(groups: &[GroupTotal<K>], key: &K) -> (i64, f64) {
    groups
        .iter()
        .find(|g| g.key == *key)
        .map(|g| (g.count, g.amount))
        .unwrap_or((0, 0.0))
}

pub fn summarize_bookings(groups: &[GroupTotal<BookingStatus>]) -> BookingReport {
    let (total_count, total_revenue) = grand_total(groups);
    let per_status = BOOKING_REPORT_STATUSES
        .iter()
        .map(|status| {
            let (count, revenue) = bucket(groups, status);
            BookingStatusBucket {
                status: *status,
                count,
                revenue,
            }
        })
        .collect();

    BookingReport {
        total_count,
        total_revenue,
        per_status,
    }
}

pub fn summarize_payments(groups: &[GroupTotal<PaymentStatus>]) -> PaymentReport {
    let (total_count, total_amount) = grand_total(groups);
    let per_status = PAYMENT_REPORT_STATUSES
        .iter()
        .map(|status| {
            let (count, amount) = bucket(groups, status);
            PaymentStatusBucket {
                status: *status,
                count,
                amount,
            }
        })
        .collect();

    PaymentReport {
        total_count,
        total_amount,
        per_status,
    }
}

/// Review groups carry the rating sum in `amount`.
pub fn summarize_reviews(groups: &[GroupTotal<i64>]) -> ReviewReport {
    let (total_count, rating_sum) = grand_total(groups);
    let average_rating = if total_count == 0 {
        0.0
    } else {
        rating_sum / total_count as f64
    };
    let rating_buckets = (MIN_RATING..=MAX_RATING)
        .map(|rating| RatingBucket {
            rating,
            count: bucket(groups, &rating).0,
        })
        .collect();

    ReviewReport {
        total_count,
        average_rating,
        rating_buckets,
    }
}
