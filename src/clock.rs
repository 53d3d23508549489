use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use mockable::Clock;

/// Calendar date used for "is this in the future" decisions.
pub fn today(clock: &dyn Clock) -> NaiveDate {
    clock.utc().date_naive()
}

pub fn now(clock: &dyn Clock) -> NaiveDateTime {
    clock.utc().naive_utc()
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC of `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let clock = FixedClock::on(date);
        assert_eq!(today(&clock), date);
        assert_eq!(now(&clock).to_string(), "2025-03-01 00:00:00");
    }
}
