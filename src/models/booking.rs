use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A booking that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub description: String,
    pub created_at: NaiveDateTime,
}

/// Replacement values for every editable field of a booking.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingUpdate {
    pub user_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    pub status: BookingStatus,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BookingFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub service_id: Option<i64>,
}

/// Query-string values where `?key=` means the same as leaving `key` out.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::InProgress => "In Progress",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Exact, case-sensitive match against the canonical labels.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn successors(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::InProgress, BookingStatus::Cancelled],
            BookingStatus::InProgress => &[BookingStatus::Completed, BookingStatus::Cancelled],
            BookingStatus::Completed | BookingStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Whether a booking in this status holds its slot.
    pub fn is_active(&self) -> bool {
        *self != BookingStatus::Cancelled
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which status changes `update_status` accepts.
///
/// `allowed_targets` is the literal set a caller may ask for. When
/// `enforce_graph` is on, the move must also be an edge of
/// [`BookingStatus::successors`], which makes `Completed` and `Cancelled`
/// final.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPolicy {
    pub allowed_targets: Vec<BookingStatus>,
    pub enforce_graph: bool,
}

impl TransitionPolicy {
    pub fn permits_target(&self, target: BookingStatus) -> bool {
        self.allowed_targets.contains(&target)
    }

    /// Parses a comma separated list of canonical status labels.
    pub fn parse_targets(list: &str) -> Result<Vec<BookingStatus>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| BookingStatus::parse(s).ok_or_else(|| format!("unknown booking status: {s}")))
            .collect()
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            allowed_targets: vec![
                BookingStatus::Confirmed,
                BookingStatus::InProgress,
                BookingStatus::Completed,
                BookingStatus::Cancelled,
            ],
            enforce_graph: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(BookingStatus::parse("In Progress"), Some(BookingStatus::InProgress));
        assert_eq!(BookingStatus::parse("Pending"), Some(BookingStatus::Pending));
        assert_eq!(BookingStatus::parse("pending"), None);
        assert_eq!(BookingStatus::parse("in_progress"), None);
        assert_eq!(BookingStatus::parse("NotAStatus"), None);
    }

    #[test]
    fn test_serde_uses_canonical_labels() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let back: BookingStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(back, BookingStatus::Cancelled);
        assert!(serde_json::from_str::<BookingStatus>("\"cancelled\"").is_err());
    }

    #[test]
    fn test_transition_graph() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!InProgress.is_terminal());
    }

    #[test]
    fn test_parse_targets() {
        let targets = TransitionPolicy::parse_targets("Confirmed, In Progress,Cancelled").unwrap();
        assert_eq!(
            targets,
            vec![BookingStatus::Confirmed, BookingStatus::InProgress, BookingStatus::Cancelled]
        );
        assert!(TransitionPolicy::parse_targets("Confirmed,Rescheduled").is_err());
    }

    #[test]
    fn test_filter_treats_empty_values_as_absent() {
        let filter: BookingFilter =
            serde_json::from_str(r#"{"user_id": "", "service_id": "7"}"#).unwrap();
        assert_eq!(filter.user_id, None);
        assert_eq!(filter.service_id, Some(7));

        let missing: BookingFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.service_id, None);

        assert!(serde_json::from_str::<BookingFilter>(r#"{"user_id": "abc"}"#).is_err());
    }

    #[test]
    fn test_default_policy_excludes_pending() {
        let policy = TransitionPolicy::default();
        assert!(!policy.permits_target(BookingStatus::Pending));
        assert!(policy.permits_target(BookingStatus::Cancelled));
        assert!(policy.enforce_graph);
    }
}
