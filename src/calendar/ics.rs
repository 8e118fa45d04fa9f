//! iCalendar (RFC 5545) serialization of class events.
//!
//! Only the subset this tool produces is read back: one VEVENT per class
//! with a weekly RRULE and a single display VALARM.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::event::{Alarm, CalendarEvent, Recurrence};
use crate::error::{Result, ScheduleError};

pub const PRODID: &str = "-//schedule-snap//Class Schedule//EN";

/// Content lines longer than this many octets are folded.
const FOLD_OCTETS: usize = 75;

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Renders events as an iCalendar document with CRLF line endings.
pub fn write_calendar(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];
    if let Some(first) = events.first() {
        lines.push(format!("X-WR-TIMEZONE:{}", first.start.timezone().name()));
    }

    let stamp = stamp.format(UTC_FORMAT).to_string();
    for event in events {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", escape_text(&event.uid)));
        lines.push(format!("DTSTAMP:{}", stamp));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        lines.push(date_time_line("DTSTART", &event.start));
        lines.push(date_time_line("DTEND", &event.end));
        if !event.location.is_empty() {
            lines.push(format!("LOCATION:{}", escape_text(&event.location)));
        }
        lines.push(format!("RRULE:{}", event.recurrence.rule()));
        lines.push("BEGIN:VALARM".to_string());
        lines.push(format!("TRIGGER:{}", event.alarm.trigger()));
        lines.push("ACTION:DISPLAY".to_string());
        lines.push(format!("DESCRIPTION:{}", escape_text(&event.alarm.description)));
        lines.push("END:VALARM".to_string());
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

fn date_time_line(name: &str, value: &DateTime<Tz>) -> String {
    format!(
        "{};TZID={}:{}",
        name,
        value.timezone().name(),
        value.naive_local().format(LOCAL_FORMAT)
    )
}

/// Escapes a TEXT value.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a content line into 75-octet pieces without breaking UTF-8
/// sequences; continuation lines start with a space.
fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / FOLD_OCTETS * 3);
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > FOLD_OCTETS {
            out.push_str("\r\n ");
            // The leading space counts towards the next line
            used = 1;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out
}

/// Joins folded continuation lines back onto their content line.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// One parsed content line: `NAME;PARAM=VALUE:value`.
struct ContentLine<'a> {
    name: String,
    params: Vec<(String, &'a str)>,
    value: &'a str,
}

impl<'a> ContentLine<'a> {
    fn parse(line: &'a str) -> Result<Self> {
        let (head, value) = line
            .split_once(':')
            .ok_or_else(|| ScheduleError::parse(format!("malformed calendar line '{}'", line)))?;
        let mut parts = head.split(';');
        let name = parts.next().unwrap_or_default().to_ascii_uppercase();
        let params = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.to_ascii_uppercase(), v.trim_matches('"')))
            .collect();
        Ok(Self {
            name,
            params,
            value,
        })
    }

    fn param(&self, key: &str) -> Option<&'a str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

#[derive(Default)]
struct EventBuilder {
    uid: Option<String>,
    title: Option<String>,
    start: Option<DateTime<Tz>>,
    end: Option<DateTime<Tz>>,
    location: String,
    recurrence: Option<Recurrence>,
    alarm_minutes: Option<u32>,
    alarm_description: Option<String>,
}

impl EventBuilder {
    fn build(self) -> Result<CalendarEvent> {
        let missing = |field: &str| ScheduleError::parse(format!("event is missing {}", field));
        let title = self.title.ok_or_else(|| missing("SUMMARY"))?;
        let start = self.start.ok_or_else(|| missing("DTSTART"))?;
        let end = self.end.ok_or_else(|| missing("DTEND"))?;
        let recurrence = self.recurrence.ok_or_else(|| missing("RRULE"))?;
        let minutes_before = self.alarm_minutes.ok_or_else(|| missing("VALARM"))?;

        let mut event = CalendarEvent::weekly(&title, start, end, &self.location);
        event.recurrence = recurrence;
        event.alarm = Alarm {
            minutes_before,
            description: self
                .alarm_description
                .unwrap_or_else(|| Alarm::reminder(&title).description),
        };
        if let Some(uid) = self.uid {
            event.uid = uid;
        }
        Ok(event)
    }
}

/// Parses events back out of an iCalendar document.
pub fn read_calendar(text: &str) -> Result<Vec<CalendarEvent>> {
    let mut events = Vec::new();
    let mut default_zone = Tz::UTC;
    let mut current: Option<EventBuilder> = None;
    let mut in_alarm = false;

    for line in unfold(text) {
        let content = ContentLine::parse(&line)?;
        let name = content.name.as_str();

        if name == "X-WR-TIMEZONE" {
            default_zone = parse_zone(content.value)?;
            continue;
        }
        if name == "BEGIN" && content.value == "VEVENT" {
            current = Some(EventBuilder::default());
            in_alarm = false;
            continue;
        }
        if name == "END" && content.value == "VEVENT" {
            let builder = current
                .take()
                .ok_or_else(|| ScheduleError::parse("END:VEVENT without BEGIN:VEVENT"))?;
            events.push(builder.build()?);
            continue;
        }

        let Some(event) = current.as_mut() else {
            continue;
        };
        match name {
            "BEGIN" if content.value == "VALARM" => in_alarm = true,
            "END" if content.value == "VALARM" => in_alarm = false,
            "TRIGGER" if in_alarm => event.alarm_minutes = Some(parse_trigger(content.value)?),
            "DESCRIPTION" if in_alarm => {
                event.alarm_description = Some(unescape_text(content.value));
            }
            _ if in_alarm => {}
            "UID" => event.uid = Some(unescape_text(content.value)),
            "SUMMARY" => event.title = Some(unescape_text(content.value)),
            "LOCATION" => event.location = unescape_text(content.value),
            "DTSTART" => event.start = Some(parse_date_time(&content, default_zone)?),
            "DTEND" => event.end = Some(parse_date_time(&content, default_zone)?),
            "RRULE" => {
                let rule = Recurrence::from_rule(content.value).ok_or_else(|| {
                    ScheduleError::parse(format!("unsupported recurrence '{}'", content.value))
                })?;
                event.recurrence = Some(rule);
            }
            _ => {}
        }
    }

    if current.is_some() {
        return Err(ScheduleError::parse("unterminated VEVENT"));
    }

    Ok(events)
}

fn parse_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::parse(format!("unknown time zone '{}'", name)))
}

fn parse_date_time(content: &ContentLine, default_zone: Tz) -> Result<DateTime<Tz>> {
    let value = content.value.trim();
    let invalid = || ScheduleError::parse(format!("invalid date-time '{}'", value));

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, LOCAL_FORMAT).map_err(|_| invalid())?;
        let zone = match content.param("TZID") {
            Some(name) => parse_zone(name)?,
            None => default_zone,
        };
        return Ok(Utc.from_utc_datetime(&naive).with_timezone(&zone));
    }

    let zone = match content.param("TZID") {
        Some(name) => parse_zone(name)?,
        None => default_zone,
    };
    let naive = NaiveDateTime::parse_from_str(value, LOCAL_FORMAT).map_err(|_| invalid())?;
    zone.from_local_datetime(&naive).earliest().ok_or_else(invalid)
}

/// Parses a negative minute or hour offset such as `-PT15M` or `-PT1H`.
fn parse_trigger(value: &str) -> Result<u32> {
    let invalid = || ScheduleError::parse(format!("unsupported alarm trigger '{}'", value));
    let duration = value.trim().strip_prefix("-PT").ok_or_else(invalid)?;

    if let Some(minutes) = duration.strip_suffix('M') {
        minutes.parse().map_err(|_| invalid())
    } else if let Some(hours) = duration.strip_suffix('H') {
        hours
            .parse::<u32>()
            .map(|h| h * 60)
            .map_err(|_| invalid())
    } else {
        Err(invalid())
    }
}
