use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::AttendanceStatus;

/// Every successful attendance change produces an Event.
/// The presentation layer drains them and shows [`Event::message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AttendanceMarked {
        subject: String,
        status: AttendanceStatus,
        date: NaiveDate,
        time_slot: String,
        at: DateTime<Utc>,
    },
    AttendanceToggled {
        subject: String,
        from: AttendanceStatus,
        to: AttendanceStatus,
        date: NaiveDate,
        time_slot: String,
        at: DateTime<Utc>,
    },
    /// A mark was removed; `status` is what it had been.
    AttendanceUndone {
        subject: String,
        status: AttendanceStatus,
        date: NaiveDate,
        time_slot: String,
        at: DateTime<Utc>,
    },
    SubjectsSeeded {
        count: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// One-line acknowledgment for the user.
    pub fn message(&self) -> String {
        match self {
            Event::AttendanceMarked {
                subject,
                status,
                date,
                time_slot,
                ..
            } => format!("Marked {status}: {subject} on {date} ({time_slot})"),
            Event::AttendanceToggled {
                subject,
                from,
                to,
                date,
                time_slot,
                ..
            } => format!("Changed {subject} on {date} ({time_slot}) from {from} to {to}"),
            Event::AttendanceUndone {
                subject,
                status,
                date,
                time_slot,
                ..
            } => format!("Undid {status} mark: {subject} on {date} ({time_slot})"),
            Event::SubjectsSeeded { count, .. } => match count {
                0 => "All timetable subjects already recorded".to_string(),
                1 => "Added 1 subject from the timetable".to_string(),
                n => format!("Added {n} subjects from the timetable"),
            },
        }
    }
}
