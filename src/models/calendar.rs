use chrono::{Datelike, NaiveDate};

/// A validated (year, month) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
    first: NaiveDate,
    last: NaiveDate,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("invalid month: {month}"));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| format!("invalid year: {year}"))?;
        // Day 0 of the following month.
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| format!("invalid year: {year}"))?;

        Ok(Self { year, month, first, last })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    pub fn days_in_month(&self) -> u32 {
        self.last.day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + Clone {
        let last = self.last;
        self.first.iter_days().take_while(move |d| *d <= last)
    }
}

/// Inclusive `[start, end]` report window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Both bounds or neither; `None` means all time.
    pub fn from_bounds(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<Self>, String> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) if start <= end => Ok(Some(Self { start, end })),
            (Some(start), Some(end)) => Err(format!(
                "start_date {start} is after end_date {end}"
            )),
            _ => Err("start_date and end_date must be given together".to_string()),
        }
    }
}
