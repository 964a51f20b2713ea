//! Date bucketing: truncate dates to fixed interval starts and step
//! between buckets.
//!
//! Buckets are half-open: a date belongs to `[bucket_start, advance)`.
//! Weeks are ISO weeks starting Monday.

use chrono::{Datelike, Days, NaiveDate};

use crate::model::DateInterval;

/// Start of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, interval: DateInterval) -> NaiveDate {
    match interval {
        DateInterval::Day => date,
        DateInterval::Week => {
            let back = date.weekday().num_days_from_monday() as u64;
            date.checked_sub_days(Days::new(back)).unwrap_or(date)
        }
        DateInterval::Month => first_of_month(date.year(), date.month()),
        DateInterval::Quarter => {
            let quarter_month = ((date.month() - 1) / 3) * 3 + 1;
            first_of_month(date.year(), quarter_month)
        }
        DateInterval::Year => first_of_month(date.year(), 1),
    }
}

/// Start of the bucket after the one beginning at `start`.
///
/// `start` must itself be a bucket start; passing an interior date gives
/// the next bucket of the date's own bucket.
pub fn advance(start: NaiveDate, interval: DateInterval) -> NaiveDate {
    match interval {
        DateInterval::Day => start.checked_add_days(Days::new(1)).unwrap_or(start),
        DateInterval::Week => start.checked_add_days(Days::new(7)).unwrap_or(start),
        DateInterval::Month => add_months(bucket_start(start, interval), 1),
        DateInterval::Quarter => add_months(bucket_start(start, interval), 3),
        DateInterval::Year => first_of_month(start.year() + 1, 1),
    }
}

/// All bucket starts from `from` to `to` inclusive.
pub fn domain(from: NaiveDate, to: NaiveDate, interval: DateInterval) -> Vec<NaiveDate> {
    let mut ticks = vec![];
    let mut current = bucket_start(from, interval);
    let end = bucket_start(to, interval);
    while current <= end {
        ticks.push(current);
        let next = advance(current, interval);
        if next <= current {
            break;
        }
        current = next;
    }
    ticks
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // month is always 1..=12 here
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.month0() + months;
    let year = date.year() + (zero_based / 12) as i32;
    let month = zero_based % 12 + 1;
    first_of_month(year, month)
}
