//! Projects the next date a recurring expense falls due.

use time::{Date, Duration, Month};

use crate::{
    Error,
    frequency::{Frequency, days_in_month},
};

/// The date one `frequency` step after `date`.
///
/// Daily and weekly steps add a fixed number of days. Monthly and yearly steps
/// move the calendar month or year and keep the day of the month, clamped to
/// the last day when the target month is shorter. So 2024-01-31 is followed
/// monthly by 2024-02-29 and 2024-02-29 yearly by 2025-02-28.
///
/// # Errors
///
/// Returns [Error::DateOutOfRange] if the next date falls outside the
/// supported calendar.
pub fn next_occurrence(date: Date, frequency: Frequency) -> Result<Date, Error> {
    let next = match frequency {
        Frequency::Daily => date.checked_add(Duration::days(1)),
        Frequency::Weekly => date.checked_add(Duration::weeks(1)),
        Frequency::Monthly => add_month(date),
        Frequency::Yearly => add_year(date),
    };

    next.ok_or(Error::DateOutOfRange(date))
}

fn add_month(date: Date) -> Option<Date> {
    let (year, month) = match date.month() {
        Month::December => (date.year().checked_add(1)?, Month::January),
        month => (date.year(), month.next()),
    };

    clamped_date(year, month, date.day())
}

fn add_year(date: Date) -> Option<Date> {
    clamped_date(date.year().checked_add(1)?, date.month(), date.day())
}

fn clamped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    Date::from_calendar_date(year, month, day.min(days_in_month(year, month))).ok()
}
