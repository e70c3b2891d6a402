use serde::{Deserialize, Serialize};
use std::fmt;

/// A scheduled session on the user's calendar.
///
/// `start` and `end` are timestamp strings, RFC 3339 for events created
/// locally or mirrored from a remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Option<i64>,
    pub user_id: i64,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub is_finished: bool,
}

impl CalendarEvent {
    pub fn new(
        user_id: i64,
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id,
            summary: summary.into(),
            start: start.into(),
            end: end.into(),
            is_finished: false,
        }
    }

    pub fn finished(mut self) -> Self {
        self.is_finished = true;
        self
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_finished { "x" } else { " " };
        write!(f, "[{}] {} ({} - {})", mark, self.summary, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_event_new_is_unfinished() {
        let event = CalendarEvent::new(1, "Leg day", "2025-01-01T09:00:00Z", "2025-01-01T10:00:00Z");
        assert!(!event.is_finished);
        assert!(event.clone().finished().is_finished);
    }

    #[test]
    fn test_calendar_event_display() {
        let event = CalendarEvent::new(1, "Leg day", "09:00", "10:00").finished();
        assert_eq!(event.to_string(), "[x] Leg day (09:00 - 10:00)");
    }
}
