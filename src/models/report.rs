use serde::Serialize;

use super::{BookingStatus, PaymentStatus};

/// Raw grouped row as returned by the store: one per distinct key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal<K> {
    pub key: K,
    pub count: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingReport {
    pub total_count: i64,
    pub total_revenue: f64,
    pub per_status: Vec<BookingStatusBucket>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingStatusBucket {
    pub status: BookingStatus,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentReport {
    pub total_count: i64,
    pub total_amount: f64,
    pub per_status: Vec<PaymentStatusBucket>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentStatusBucket {
    pub status: PaymentStatus,
    pub count: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewReport {
    pub total_count: i64,
    pub average_rating: f64,
    pub rating_buckets: Vec<RatingBucket>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingBucket {
    pub rating: i64,
    pub count: i64,
}
