//! Calendar events produced from schedule entries.

use chrono::DateTime;
use chrono_tz::Tz;

/// Minutes before the start at which the reminder fires.
pub const REMINDER_LEAD_MINUTES: u32 = 15;

/// Repetition of an event. Schedules only ever repeat weekly, without end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recurrence {
    Weekly,
}

impl Recurrence {
    /// Value of the RRULE property.
    pub fn rule(self) -> &'static str {
        match self {
            Recurrence::Weekly => "FREQ=WEEKLY",
        }
    }

    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim() {
            "FREQ=WEEKLY" => Some(Recurrence::Weekly),
            _ => None,
        }
    }
}

/// Display reminder attached to an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alarm {
    pub minutes_before: u32,
    pub description: String,
}

impl Alarm {
    /// The standard pre-class reminder.
    pub fn reminder(course: &str) -> Self {
        Self {
            minutes_before: REMINDER_LEAD_MINUTES,
            description: format!("Reminder: {}", course),
        }
    }

    /// Value of the TRIGGER property, e.g. `-PT15M`.
    pub fn trigger(&self) -> String {
        format!("-PT{}M", self.minutes_before)
    }
}

/// One recurring class meeting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub location: String,
    pub recurrence: Recurrence,
    pub alarm: Alarm,
}

impl CalendarEvent {
    /// Weekly event with the standard reminder.
    pub fn weekly(title: &str, start: DateTime<Tz>, end: DateTime<Tz>, location: &str) -> Self {
        Self {
            uid: event_uid(title, &start, &end, location),
            title: title.to_string(),
            start,
            end,
            location: location.to_string(),
            recurrence: Recurrence::Weekly,
            alarm: Alarm::reminder(title),
        }
    }
}

/// Stable identifier from the course, meeting time and location.
///
/// Two sections of one course starting together differ in end time or room.
fn event_uid(title: &str, start: &DateTime<Tz>, end: &DateTime<Tz>, location: &str) -> String {
    let title = slug(title);
    let mut uid = format!(
        "{}-{}-{}",
        if title.is_empty() { "event" } else { title.as_str() },
        start.format("%Y%m%dT%H%M"),
        end.format("%H%M")
    );
    let room = slug(location);
    if !room.is_empty() {
        uid.push('-');
        uid.push_str(&room);
    }
    uid.push_str("@schedule-snap");
    uid
}

fn slug(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    #[test]
    fn test_weekly_event_defaults() {
        let start = New_York.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
        let end = New_York.with_ymd_and_hms(2026, 10, 14, 11, 0, 0).unwrap();
        let event = CalendarEvent::weekly("CS 101: Intro", start, end, "Hall 2");

        assert_eq!(event.uid, "cs-101-intro-20261014T1000-1100-hall-2@schedule-snap");
        assert_eq!(event.recurrence.rule(), "FREQ=WEEKLY");
        assert_eq!(event.alarm.trigger(), "-PT15M");
        assert_eq!(event.alarm.description, "Reminder: CS 101: Intro");
    }

    #[test]
    fn test_uid_for_symbol_only_title() {
        let start = New_York.with_ymd_and_hms(2026, 10, 12, 8, 30, 0).unwrap();
        let event = CalendarEvent::weekly("???", start, start, "");
        assert_eq!(event.uid, "event-20261012T0830-0830@schedule-snap");
    }

    #[test]
    fn test_sections_starting_together_get_distinct_uids() {
        let start = New_York.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap();
        let lecture_end = New_York.with_ymd_and_hms(2026, 10, 12, 9, 50, 0).unwrap();
        let lab_end = New_York.with_ymd_and_hms(2026, 10, 12, 10, 50, 0).unwrap();

        let lecture = CalendarEvent::weekly("Calc", start, lecture_end, "Hall 1");
        let lab = CalendarEvent::weekly("Calc", start, lab_end, "Lab 2");
        let other_room = CalendarEvent::weekly("Calc", start, lecture_end, "Hall 3");

        assert_eq!(lecture.uid, "calc-20261012T0900-0950-hall-1@schedule-snap");
        assert_ne!(lecture.uid, lab.uid);
        assert_ne!(lecture.uid, other_room.uid);
    }

    #[test]
    fn test_recurrence_from_rule() {
        assert_eq!(Recurrence::from_rule("FREQ=WEEKLY"), Some(Recurrence::Weekly));
        assert_eq!(Recurrence::from_rule("FREQ=DAILY"), None);
    }
}
