//! Schedule entries and validation of parser output.
//!
//! The language model is asked for JSON but nothing guarantees it returns
//! any. Output is checked field by field here so a malformed reply surfaces
//! as a parse error instead of failing later during date arithmetic.

use chrono::NaiveTime;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{Result, ScheduleError};

/// Accepts "10:00 AM", "4:20pm", "9 a.m.", "14:30" and "14:30:00".
const CLOCK_PATTERN: &str =
    r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?\s*(?:([AaPp])\.?\s*[Mm]\.?)?$";

static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLOCK_PATTERN).expect("clock pattern is valid"));

/// Keys under which a wrapped entry array may appear.
const WRAPPER_KEYS: [&str; 3] = ["schedule", "entries", "classes"];

/// One class meeting pattern from the schedule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub course: String,
    /// Compact weekday code such as "MWF" or "TuTh".
    pub day_code: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
}

/// Entry shape as it arrives in JSON, before time parsing.
#[derive(Debug, Deserialize)]
struct RawEntry {
    course: String,
    #[serde(alias = "days")]
    day_code: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    location: Option<String>,
}

impl RawEntry {
    fn into_entry(self, index: usize) -> Result<ScheduleEntry> {
        let start_time = parse_clock_time(&self.start_time)
            .map_err(|e| ScheduleError::parse(format!("entry {}: start_time: {}", index, e)))?;
        let end_time = parse_clock_time(&self.end_time)
            .map_err(|e| ScheduleError::parse(format!("entry {}: end_time: {}", index, e)))?;

        Ok(ScheduleEntry {
            course: self.course.trim().to_string(),
            day_code: self.day_code.trim().to_string(),
            start_time,
            end_time,
            location: self.location.unwrap_or_default().trim().to_string(),
        })
    }
}

/// Parses a wall-clock time in 12-hour or 24-hour notation.
pub fn parse_clock_time(text: &str) -> std::result::Result<NaiveTime, String> {
    let trimmed = text.trim();
    let caps = CLOCK_REGEX
        .captures(trimmed)
        .ok_or_else(|| format!("unrecognized time '{}'", trimmed))?;

    let number = |idx: usize| -> u32 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let mut hour = number(1);
    let minute = number(2);
    let second = number(3);

    match caps.get(4).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return Err(format!("hour out of range in '{}'", trimmed));
            }
            hour %= 12;
            if meridiem == "p" {
                hour += 12;
            }
        }
        None => {
            // A bare "9" could be morning or evening
            if caps.get(2).is_none() {
                return Err(format!("ambiguous time '{}'", trimmed));
            }
        }
    }

    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| format!("invalid time '{}'", trimmed))
}

/// Validates parser output and converts it into schedule entries.
///
/// Accepts a bare JSON array or an object wrapping the array under
/// `schedule`, `entries` or `classes`, optionally inside a Markdown code
/// fence. An empty array is valid and yields no entries.
pub fn parse_schedule_json(text: &str) -> Result<Vec<ScheduleEntry>> {
    let value = extract_json(text)?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ScheduleError::parse("response object holds no entry array"))?,
        _ => return Err(ScheduleError::parse("response is neither an array nor an object")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawEntry = serde_json::from_value(item)
                .map_err(|e| ScheduleError::parse(format!("entry {}: {}", index, e)))?;
            raw.into_entry(index)
        })
        .collect()
}

/// Finds the JSON document in a model reply.
fn extract_json(text: &str) -> Result<serde_json::Value> {
    let body = strip_code_fence(text.trim());
    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }

    // Fall back to the outermost bracketed span when prose surrounds it
    let start = body.find(['[', '{']);
    let end = body.rfind([']', '}']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&body[start..=end])
            .map_err(|e| ScheduleError::parse(format!("response is not valid JSON: {}", e))),
        _ => Err(ScheduleError::parse("response contains no JSON")),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = rest.find('\n').map_or("", |i| &rest[i + 1..]);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_clock_time_twelve_hour() {
        assert_eq!(parse_clock_time("10:00 AM").unwrap(), time(10, 0));
        assert_eq!(parse_clock_time("4:20 PM").unwrap(), time(16, 20));
        assert_eq!(parse_clock_time("12:15 AM").unwrap(), time(0, 15));
        assert_eq!(parse_clock_time("12:30 PM").unwrap(), time(12, 30));
        assert_eq!(parse_clock_time("9am").unwrap(), time(9, 0));
        assert_eq!(parse_clock_time("2:30p.m.").unwrap(), time(14, 30));
    }

    #[test]
    fn test_parse_clock_time_twenty_four_hour() {
        assert_eq!(parse_clock_time("14:30").unwrap(), time(14, 30));
        assert_eq!(parse_clock_time(" 08:05:00 ").unwrap(), time(8, 5));
    }

    #[test]
    fn test_parse_clock_time_rejects_garbage() {
        assert!(parse_clock_time("").is_err());
        assert!(parse_clock_time("noonish").is_err());
        assert!(parse_clock_time("13:00 PM").is_err());
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("10:75").is_err());
        assert!(parse_clock_time("9").is_err());
    }

    #[test]
    fn test_parse_schedule_json_array() {
        let json = r#"[
            {"course": "CS 101", "day_code": "MWF", "start_time": "10:00 AM",
             "end_time": "10:50 AM", "location": "Hall 2"}
        ]"#;
        let entries = parse_schedule_json(json).unwrap();

        assert_eq!(
            entries,
            vec![ScheduleEntry {
                course: "CS 101".to_string(),
                day_code: "MWF".to_string(),
                start_time: time(10, 0),
                end_time: time(10, 50),
                location: "Hall 2".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_schedule_json_wrapped_and_fenced() {
        let reply = "```json\n{\"schedule\": [{\"course\": \"Bio\", \"days\": \"TuTh\", \
                     \"start_time\": \"1:00 PM\", \"end_time\": \"2:15 PM\"}]}\n```";
        let entries = parse_schedule_json(reply).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].day_code, "TuTh");
        assert_eq!(entries[0].location, "");
    }

    #[test]
    fn test_parse_schedule_json_with_surrounding_prose() {
        let reply = "Here is the schedule:\n[{\"course\": \"Art\", \"day_code\": \"F\", \
                     \"start_time\": \"9:00 AM\", \"end_time\": \"11:00 AM\", \
                     \"location\": null}]\nLet me know if you need more.";
        let entries = parse_schedule_json(reply).unwrap();
        assert_eq!(entries[0].course, "Art");
    }

    #[test]
    fn test_parse_schedule_json_empty_array() {
        assert!(parse_schedule_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_schedule_json_not_json() {
        let err = parse_schedule_json("I could not read the table.").unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }

    #[test]
    fn test_parse_schedule_json_missing_field() {
        let json = r#"[{"course": "Math", "start_time": "9:00 AM", "end_time": "10:00 AM"}]"#;
        let err = parse_schedule_json(json).unwrap_err();

        assert!(matches!(err, ScheduleError::Parse(_)));
        assert!(err.to_string().contains("entry 0"));
    }

    #[test]
    fn test_parse_schedule_json_wrong_type() {
        let json = r#"[{"course": "Math", "day_code": 5, "start_time": "9:00 AM", "end_time": "10:00 AM"}]"#;
        assert!(matches!(
            parse_schedule_json(json).unwrap_err(),
            ScheduleError::Parse(_)
        ));
    }

    #[test]
    fn test_parse_schedule_json_bad_time() {
        let json = r#"[{"course": "Math", "day_code": "M", "start_time": "morning", "end_time": "10:00 AM"}]"#;
        let err = parse_schedule_json(json).unwrap_err();
        assert!(err.to_string().contains("start_time"));
    }

    #[test]
    fn test_parse_schedule_json_object_without_array() {
        let err = parse_schedule_json(r#"{"note": "nothing here"}"#).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }
}
