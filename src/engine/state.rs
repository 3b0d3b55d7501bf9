//! Per-employee-per-day attendance state machine.
//!
//! A day runs `NONE -> CHECKED_IN -> COMPLETE` for each employee, where the
//! day boundary is midnight in the configured deployment time zone, applied
//! to each event's own timestamp. Comparing against server UTC instead would
//! silently shift the boundary for every zone that is not UTC.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// The kind of a recorded attendance event. Serialized as `check_in` /
/// `check_out` both on the wire and in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

/// What a new scan should do, given the employee's events so far today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RecordCheckIn,
    RecordCheckOut,
    AlreadyComplete,
}

/// Decide the action for a new scan from the *presence* of each event kind
/// among today's events, not a counter, so a re-scan of an already-recorded
/// day is naturally idempotent and the input order never matters.
pub fn decide(events_today: &[EventKind]) -> Action {
    let checked_in = events_today.contains(&EventKind::CheckIn);
    let checked_out = events_today.contains(&EventKind::CheckOut);

    match (checked_in, checked_out) {
        (false, _) => Action::RecordCheckIn,
        (true, false) => Action::RecordCheckOut,
        (true, true) => Action::AlreadyComplete,
    }
}

/// The calendar day an instant falls on in the given zone.
pub fn local_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// UTC bounds of a local calendar day: the half-open window
/// `[local midnight, next local midnight)`.
pub fn day_bounds_utc(day: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(day);
    (local_midnight_utc(day, tz), local_midnight_utc(next, tz))
}

fn local_midnight_utc(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let mut local = day.and_time(NaiveTime::MIN);
    // Midnight can be skipped by a DST transition; probe forward in
    // half-hour steps until the zone has a real instant for this day.
    for _ in 0..48 {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => local = local + Duration::minutes(30),
        }
    }
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn empty_day_records_check_in() {
        assert_eq!(decide(&[]), Action::RecordCheckIn);
    }

    #[test]
    fn open_day_records_check_out() {
        assert_eq!(decide(&[EventKind::CheckIn]), Action::RecordCheckOut);
    }

    #[test]
    fn complete_day_rejects() {
        assert_eq!(
            decide(&[EventKind::CheckIn, EventKind::CheckOut]),
            Action::AlreadyComplete
        );
    }

    #[test]
    fn decision_is_order_independent() {
        assert_eq!(
            decide(&[EventKind::CheckOut, EventKind::CheckIn]),
            Action::AlreadyComplete
        );
    }

    #[test]
    fn rescans_do_not_advance_the_state() {
        // Duplicate events change nothing: presence, not a counter.
        assert_eq!(
            decide(&[EventKind::CheckIn, EventKind::CheckIn]),
            Action::RecordCheckOut
        );
    }

    #[test]
    fn local_day_uses_the_configured_zone() {
        // 18:29 UTC is 23:59 IST; 18:31 UTC is 00:01 IST the next day.
        assert_eq!(
            local_day(utc(2025, 6, 1, 18, 29), Kolkata),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(
            local_day(utc(2025, 6, 1, 18, 31), Kolkata),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
    }

    #[test]
    fn day_bounds_are_local_midnights_in_utc() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let (from, to) = day_bounds_utc(day, Kolkata);
        // IST is UTC+05:30 year-round.
        assert_eq!(from, utc(2025, 6, 1, 18, 30));
        assert_eq!(to, utc(2025, 6, 2, 18, 30));
    }

    #[test]
    fn event_kind_wire_strings() {
        assert_eq!(EventKind::CheckIn.to_string(), "check_in");
        assert_eq!("check_out".parse::<EventKind>(), Ok(EventKind::CheckOut));
    }
}
