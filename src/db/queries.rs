use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::db::store::StoreError;
use crate::models::{
    Booking, BookingFilter, BookingStatus, DateWindow, GroupTotal, NewBooking, NewPayment,
    NewReview, Payment, PaymentStatus, Review,
};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str =
    "id, user_id, service_id, date, status, description, created_at, updated_at";

// ── Bookings ──

/// Inserts a booking unless its slot is already held by an active booking.
///
/// The check and the insert share one immediate transaction, and the
/// partial unique index on `(service_id, date)` backs it up for writers
/// outside this connection.
pub fn insert_booking(conn: &mut Connection, booking: &NewBooking) -> Result<Booking, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if booking.status.is_active() && is_slot_taken(&tx, booking.service_id, booking.date)? {
        return Err(StoreError::SlotTaken);
    }

    let date = booking.date.format(DATE_FMT).to_string();
    let created_at = booking.created_at.format(TIMESTAMP_FMT).to_string();

    tx.execute(
        "INSERT INTO bookings
            (user_id, service_id, date, status, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            booking.user_id,
            booking.service_id,
            date,
            booking.status.as_str(),
            booking.description,
            created_at,
        ],
    )
    .map_err(slot_conflict)?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(Booking {
        id,
        user_id: booking.user_id,
        service_id: booking.service_id,
        date: booking.date,
        status: booking.status,
        description: booking.description.clone(),
        created_at: booking.created_at,
        updated_at: booking.created_at,
    })
}

pub fn get_booking_by_id(conn: &Connection, id: i64) -> Result<Option<Booking>, StoreError> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_bookings(
    conn: &Connection,
    filter: &BookingFilter,
) -> Result<Vec<Booking>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR user_id = ?1) AND (?2 IS NULL OR service_id = ?2)
         ORDER BY date ASC, id ASC"
    ))?;

    let rows = stmt.query_map(params![filter.user_id, filter.service_id], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Overwrites every mutable column. Returns `false` if the id is unknown.
pub fn replace_booking(conn: &Connection, booking: &Booking) -> Result<bool, StoreError> {
    let date = booking.date.format(DATE_FMT).to_string();
    let updated_at = booking.updated_at.format(TIMESTAMP_FMT).to_string();

    let count = conn
        .execute(
            "UPDATE bookings SET user_id = ?1, service_id = ?2, date = ?3, status = ?4,
                description = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                booking.user_id,
                booking.service_id,
                date,
                booking.status.as_str(),
                booking.description,
                updated_at,
                booking.id,
            ],
        )
        .map_err(slot_conflict)?;
    Ok(count > 0)
}

/// Sets the status, optionally only if the row still holds `expected`.
pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    expected: Option<BookingStatus>,
    status: BookingStatus,
    at: NaiveDateTime,
) -> Result<bool, StoreError> {
    let now = at.format(TIMESTAMP_FMT).to_string();
    let count = conn
        .execute(
            "UPDATE bookings SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND (?4 IS NULL OR status = ?4)",
            params![status.as_str(), now, id, expected.map(|s| s.as_str())],
        )
        .map_err(slot_conflict)?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn is_slot_taken(
    conn: &Connection,
    service_id: i64,
    date: NaiveDate,
) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE service_id = ?1 AND date = ?2 AND status <> 'Cancelled'",
        params![service_id, date.format(DATE_FMT).to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn booked_dates_between(
    conn: &Connection,
    service_id: i64,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<NaiveDate>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT date FROM bookings
         WHERE service_id = ?1 AND date >= ?2 AND date <= ?3 AND status <> 'Cancelled'
         ORDER BY date ASC",
    )?;

    let rows = stmt.query_map(
        params![
            service_id,
            first.format(DATE_FMT).to_string(),
            last.format(DATE_FMT).to_string(),
        ],
        |row| row.get::<_, String>(0),
    )?;

    let mut dates = vec![];
    for row in rows {
        dates.push(parse_date(&row?)?);
    }
    Ok(dates)
}

// ── Aggregates ──

/// Booking count and joined payment revenue, grouped by booking status.
pub fn booking_status_totals(
    conn: &Connection,
    window: Option<&DateWindow>,
) -> Result<Vec<GroupTotal<BookingStatus>>, StoreError> {
    let (start, end) = window_bounds(window);
    let mut stmt = conn.prepare(
        "SELECT b.status, COUNT(DISTINCT b.id), COALESCE(SUM(p.amount), 0.0)
         FROM bookings b
         LEFT JOIN payments p ON p.booking_id = b.id
         WHERE (?1 IS NULL OR b.date >= ?1) AND (?2 IS NULL OR b.date <= ?2)
         GROUP BY b.status",
    )?;

    let rows = stmt.query_map(params![start, end], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?))
    })?;

    let mut totals = vec![];
    for row in rows {
        let (status, count, amount) = row?;
        let key = BookingStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("booking status {status:?}")))?;
        totals.push(GroupTotal { key, count, amount });
    }
    Ok(totals)
}

/// Payment count and amount grouped by payment status, optionally scoped
/// to bookings of one service.
pub fn payment_status_totals(
    conn: &Connection,
    window: Option<&DateWindow>,
    service_id: Option<i64>,
) -> Result<Vec<GroupTotal<PaymentStatus>>, StoreError> {
    let (start, end) = window_bounds(window);
    let mut stmt = conn.prepare(
        "SELECT p.status, COUNT(*), COALESCE(SUM(p.amount), 0.0)
         FROM payments p
         JOIN bookings b ON b.id = p.booking_id
         WHERE (?1 IS NULL OR date(p.created_at) >= ?1)
           AND (?2 IS NULL OR date(p.created_at) <= ?2)
           AND (?3 IS NULL OR b.service_id = ?3)
         GROUP BY p.status",
    )?;

    let rows = stmt.query_map(params![start, end, service_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?))
    })?;

    let mut totals = vec![];
    for row in rows {
        let (status, count, amount) = row?;
        let key = PaymentStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("payment status {status:?}")))?;
        totals.push(GroupTotal { key, count, amount });
    }
    Ok(totals)
}

/// Review count per rating; `amount` carries the sum of ratings in the group.
pub fn review_rating_totals(
    conn: &Connection,
    window: Option<&DateWindow>,
    service_id: Option<i64>,
) -> Result<Vec<GroupTotal<i64>>, StoreError> {
    let (start, end) = window_bounds(window);
    let mut stmt = conn.prepare(
        "SELECT r.rating, COUNT(*), COALESCE(SUM(r.rating), 0)
         FROM reviews r
         JOIN bookings b ON b.id = r.booking_id
         WHERE (?1 IS NULL OR date(r.created_at) >= ?1)
           AND (?2 IS NULL OR date(r.created_at) <= ?2)
           AND (?3 IS NULL OR b.service_id = ?3)
         GROUP BY r.rating
         ORDER BY r.rating ASC",
    )?;

    let rows = stmt.query_map(params![start, end, service_id], |row| {
        Ok(GroupTotal {
            key: row.get(0)?,
            count: row.get(1)?,
            amount: row.get(2)?,
        })
    })?;

    let mut totals = vec![];
    for row in rows {
        totals.push(row?);
    }
    Ok(totals)
}

// ── Payments & Reviews ──

pub fn insert_payment(conn: &Connection, payment: &NewPayment) -> Result<Payment, StoreError> {
    conn.execute(
        "INSERT INTO payments (booking_id, amount, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            payment.booking_id,
            payment.amount,
            payment.status.as_str(),
            payment.created_at.format(TIMESTAMP_FMT).to_string(),
        ],
    )?;

    Ok(Payment {
        id: conn.last_insert_rowid(),
        booking_id: payment.booking_id,
        amount: payment.amount,
        status: payment.status,
        created_at: payment.created_at,
    })
}

pub fn insert_review(conn: &Connection, review: &NewReview) -> Result<Review, StoreError> {
    conn.execute(
        "INSERT INTO reviews (booking_id, rating, comment, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            review.booking_id,
            review.rating,
            review.comment,
            review.created_at.format(TIMESTAMP_FMT).to_string(),
        ],
    )?;

    Ok(Review {
        id: conn.last_insert_rowid(),
        booking_id: review.booking_id,
        rating: review.rating,
        comment: review.comment.clone(),
        created_at: review.created_at,
    })
}

// ── Row helpers ──

fn window_bounds(window: Option<&DateWindow>) -> (Option<String>, Option<String>) {
    match window {
        Some(w) => (
            Some(w.start.format(DATE_FMT).to_string()),
            Some(w.end.format(DATE_FMT).to_string()),
        ),
        None => (None, None),
    }
}

fn slot_conflict(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::SlotTaken
        }
        _ => StoreError::Database(err),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|_| StoreError::Corrupt(format!("date {s:?}")))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT)
        .map_err(|_| StoreError::Corrupt(format!("timestamp {s:?}")))
}

fn parse_booking_row(row: &rusqlite::Row) -> Result<Booking, StoreError> {
    let id: i64 = row.get(0)?;
    let user_id: i64 = row.get(1)?;
    let service_id: i64 = row.get(2)?;
    let date_str: String = row.get(3)?;
    let status_str: String = row.get(4)?;
    let description: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("booking status {status_str:?}")))?;

    Ok(Booking {
        id,
        user_id,
        service_id,
        date: parse_date(&date_str)?,
        status,
        description,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}
