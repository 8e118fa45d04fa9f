//! Projects schedule entries onto dated, timezone-aware recurring events.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use super::anchor::SemesterAnchor;
use super::day_code;
use super::entry::ScheduleEntry;
use crate::calendar::CalendarEvent;
use crate::error::{Result, ScheduleError};
use crate::log;

/// Builds one weekly event per (entry, day) pair.
///
/// Each entry's first occurrence falls inside the anchor week. Entries whose
/// day code names no weekday contribute nothing; if no entry yields an event
/// the whole schedule is rejected. A start time that is not before the end
/// time is a validation error, never an overnight event.
pub fn materialize(
    entries: &[ScheduleEntry],
    anchor: SemesterAnchor,
    zone: Tz,
) -> Result<Vec<CalendarEvent>> {
    let mut events = Vec::new();

    for entry in entries {
        if entry.start_time >= entry.end_time {
            return Err(ScheduleError::validation(format!(
                "'{}' starts at {} but ends at {}; start must be before end",
                entry.course,
                entry.start_time.format("%H:%M"),
                entry.end_time.format("%H:%M")
            )));
        }

        let days = day_code::expand(&entry.day_code);
        if days.is_empty() {
            log(&format!(
                "Skipping '{}': day code '{}' names no weekday",
                entry.course, entry.day_code
            ));
            continue;
        }

        for day in days {
            let date = anchor.date_for(day.weekday());
            let start = localize(zone, date.and_time(entry.start_time))?;
            let end = localize(zone, date.and_time(entry.end_time))?;
            if start >= end {
                // Only reachable when a DST shift swallows the whole meeting
                return Err(ScheduleError::validation(format!(
                    "'{}' on {} has no duration in {}",
                    entry.course,
                    day.code(),
                    zone.name()
                )));
            }
            events.push(CalendarEvent::weekly(&entry.course, start, end, &entry.location));
        }
    }

    if events.is_empty() {
        return Err(ScheduleError::validation("No schedule entries found"));
    }

    log(&format!(
        "Materialized {} events from {} entries (anchor {})",
        events.len(),
        entries.len(),
        anchor
    ));

    Ok(events)
}

/// Attaches the zone to a wall-clock time. Ambiguous times take the earlier
/// instant; times skipped by a DST change are rejected.
fn localize(zone: Tz, local: NaiveDateTime) -> Result<DateTime<Tz>> {
    zone.from_local_datetime(&local).earliest().ok_or_else(|| {
        ScheduleError::validation(format!(
            "{} does not exist in {}",
            local.format("%Y-%m-%d %H:%M"),
            zone.name()
        ))
    })
}
