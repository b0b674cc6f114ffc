//! Budget periods.
//!
//! Every allocation, income line and debt payment is keyed by the first day of a
//! calendar month. `Period` makes that normalization impossible to forget: any date
//! converts into the period containing it. The last month chrono can represent has no
//! following month to bound it, so it is not a valid period.

use crate::errors::{Error, Result};
use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, represented by its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "NaiveDate", into = "NaiveDate")]
pub struct Period(NaiveDate);

impl Period {
    /// The period containing `date`, or `None` in the last representable month.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Option<Self> {
        let start = first_of_month(date);
        start.checked_add_months(Months::new(1)).map(|_| Self(start))
    }

    /// The period for `year`-`month`, or `None` if the month is out of range.
    #[must_use]
    pub fn from_year_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).and_then(Self::containing)
    }

    /// The month we are in right now (UTC).
    #[must_use]
    pub fn current() -> Self {
        Self(first_of_month(Utc::now().date_naive()))
    }

    /// First day of the month.
    #[must_use]
    pub const fn start(self) -> NaiveDate {
        self.0
    }

    /// First day of the following month, the exclusive upper bound of this one.
    #[must_use]
    pub fn end(self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX)
    }

    /// The following month.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.end())
    }

    /// True when `date` falls inside this month.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

impl TryFrom<NaiveDate> for Period {
    type Error = Error;

    fn try_from(date: NaiveDate) -> Result<Self> {
        Self::containing(date).ok_or(Error::InvalidPeriod { date })
    }
}

impl From<Period> for NaiveDate {
    fn from(period: Period) -> Self {
        period.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%B %Y"))
    }
}
