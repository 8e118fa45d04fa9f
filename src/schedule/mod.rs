//! Schedule entries: parsing, weekday expansion and projection onto dates.

pub mod anchor;
pub mod day_code;
pub mod entry;
pub mod materialize;
pub mod parser;

pub use anchor::SemesterAnchor;
pub use day_code::DayToken;
pub use entry::{parse_schedule_json, ScheduleEntry};
pub use materialize::materialize;
pub use parser::{JsonFileParser, LlmScheduleParser, ScheduleParser};
