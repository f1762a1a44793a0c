//! Business-day helpers.
//!
//! The snapping rule is a pure function of the date: Saturday moves back to
//! Friday, Sunday moves forward to Monday, every weekday is left alone.
//! Public holidays are not considered.
//!
//! ```
//! use chrono::NaiveDate;
//! use shared_utils::calendar::nearest_business_day;
//!
//! let sat = NaiveDate::from_ymd_opt(2023, 1, 7).unwrap();
//! assert_eq!(nearest_business_day(sat), NaiveDate::from_ymd_opt(2023, 1, 6).unwrap());
//! ```

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Returns `true` for Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Snap a date onto the nearest business day (Sat -> Fri, Sun -> Mon).
///
/// Idempotent: snapping an already snapped date returns it unchanged.
pub fn nearest_business_day(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Days::new(1),
        Weekday::Sun => date + Days::new(1),
        _ => date,
    }
}
