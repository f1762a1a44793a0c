//! Injectable source of "today".
//!
//! Range bounds and the default lookback window depend on the current date.
//! Components take a `Clock` so tests can pin the date with [`FixedClock`].

use chrono::{Local, NaiveDate};

use crate::calendar::nearest_business_day;

pub trait Clock: Send + Sync {
    /// The current calendar date, in the local time zone of the host.
    fn today(&self) -> NaiveDate;

    /// Today snapped onto a business day.
    fn business_today(&self) -> NaiveDate {
        nearest_business_day(self.today())
    }
}

/// Reads the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
