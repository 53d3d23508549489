use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub booking_id: i64,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub booking_id: i64,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

