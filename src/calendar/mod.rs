//! Recurring class events and their iCalendar form.

pub mod event;
pub mod ics;

pub use event::CalendarEvent;
pub use ics::{read_calendar, write_calendar};
