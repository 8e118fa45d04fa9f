//! Weekday code expansion ("MWF", "TuTh") into day tokens.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A school-week day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayToken {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

/// Codes ordered longest first so two-letter codes win over one-letter ones.
const CODES: [(&str, DayToken); 5] = [
    ("Tu", DayToken::Tue),
    ("Th", DayToken::Thu),
    ("M", DayToken::Mon),
    ("W", DayToken::Wed),
    ("F", DayToken::Fri),
];

impl DayToken {
    /// The compact code used in schedule tables.
    pub fn code(self) -> &'static str {
        match self {
            DayToken::Mon => "M",
            DayToken::Tue => "Tu",
            DayToken::Wed => "W",
            DayToken::Thu => "Th",
            DayToken::Fri => "F",
        }
    }

    /// Two-letter iCalendar `BYDAY` value ("MO" through "FR").
    pub fn byday(self) -> &'static str {
        match self {
            DayToken::Mon => "MO",
            DayToken::Tue => "TU",
            DayToken::Wed => "WE",
            DayToken::Thu => "TH",
            DayToken::Fri => "FR",
        }
    }

    /// The token for a weekday; None for weekends.
    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(DayToken::Mon),
            Weekday::Tue => Some(DayToken::Tue),
            Weekday::Wed => Some(DayToken::Wed),
            Weekday::Thu => Some(DayToken::Thu),
            Weekday::Fri => Some(DayToken::Fri),
            Weekday::Sat | Weekday::Sun => None,
        }
    }

    pub fn weekday(self) -> Weekday {
        match self {
            DayToken::Mon => Weekday::Mon,
            DayToken::Tue => Weekday::Tue,
            DayToken::Wed => Weekday::Wed,
            DayToken::Thu => Weekday::Thu,
            DayToken::Fri => Weekday::Fri,
        }
    }
}

/// Expands a day code into the set of days it names.
///
/// Longest-match scan over the closed code set: at each position the
/// two-letter codes are tried first, and a match consumes its characters so
/// no day is counted twice. Characters that start no code are skipped.
/// Matching is case-sensitive.
pub fn expand(day_code: &str) -> BTreeSet<DayToken> {
    let mut days = BTreeSet::new();
    let mut rest = day_code;

    while let Some(first) = rest.chars().next() {
        match CODES.iter().find(|(code, _)| rest.starts_with(code)) {
            Some((code, day)) => {
                days.insert(*day);
                rest = &rest[code.len()..];
            }
            None => rest = &rest[first.len_utf8()..],
        }
    }

    days
}
