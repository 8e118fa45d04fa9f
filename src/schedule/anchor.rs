//! Reference Monday used to project weekday-only entries onto dates.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// The Monday of the week the schedule starts in.
///
/// Always a Monday: every constructor normalizes to the start of the week.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemesterAnchor(NaiveDate);

impl SemesterAnchor {
    /// Anchor for the week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday();
        Self(date - Duration::days(i64::from(offset)))
    }

    /// Anchor for the current week as seen from `zone`.
    pub fn today(zone: Tz) -> Self {
        Self::week_of(Utc::now().with_timezone(&zone).date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// First date on or after the anchor falling on `weekday`; always within
    /// the anchor week, even if that day has already passed.
    pub fn date_for(&self, weekday: Weekday) -> NaiveDate {
        let days_ahead =
            (7 + weekday.num_days_from_monday() - self.0.weekday().num_days_from_monday()) % 7;
        self.0 + Duration::days(i64::from(days_ahead))
    }
}

impl FromStr for SemesterAnchor {
    type Err = String;

    /// Parses `YYYY-MM-DD`; any day of the week is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self::week_of)
            .map_err(|e| format!("invalid anchor date '{}': {}", s, e))
    }
}

impl fmt::Display for SemesterAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
