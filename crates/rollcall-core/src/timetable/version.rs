//! Timetable versions and the slots they schedule.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single scheduled class within one weekday of one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Time-range label as written, e.g. "9:00 AM" or "09:00-10:30".
    pub time: String,
    pub subject: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub room: String,
}

impl Slot {
    pub fn new(time: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            subject: subject.into(),
            instructor: String::new(),
            room: String::new(),
        }
    }

    pub fn with_instructor(mut self, instructor: impl Into<String>) -> Self {
        self.instructor = instructor.into();
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    /// Chronological start of the slot, if the label can be read as a time.
    pub fn start_time(&self) -> Option<NaiveTime> {
        parse_start_time(&self.time)
    }
}

/// A weekly timetable that applies from `effective_from` until the next
/// version takes over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableVersion {
    pub effective_from: NaiveDate,
    /// Weekday name -> slots. Keys are normalized to full lowercase names
    /// once the version is part of a [`super::Timetable`].
    #[serde(default)]
    pub days: BTreeMap<String, Vec<Slot>>,
}

impl TimetableVersion {
    pub fn new(effective_from: NaiveDate) -> Self {
        Self {
            effective_from,
            days: BTreeMap::new(),
        }
    }

    pub fn with_day(mut self, weekday: Weekday, slots: Vec<Slot>) -> Self {
        self.days.insert(weekday_key(weekday).to_string(), slots);
        self
    }

    pub fn slots_on(&self, weekday: Weekday) -> &[Slot] {
        self.days
            .get(weekday_key(weekday))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Validate slots and rewrite day keys to their canonical form.
    pub(crate) fn normalized(self) -> Result<Self, ValidationError> {
        let mut days: BTreeMap<String, Vec<Slot>> = BTreeMap::new();
        for (key, slots) in self.days {
            let weekday = parse_weekday(&key)?;
            let canonical = weekday_key(weekday);
            if days.contains_key(canonical) {
                return Err(ValidationError::invalid(
                    format!("days.{key}"),
                    format!("{canonical} is defined more than once"),
                ));
            }

            let mut trimmed: Vec<Slot> = Vec::with_capacity(slots.len());
            for (idx, mut slot) in slots.into_iter().enumerate() {
                slot.time = slot.time.trim().to_string();
                slot.subject = slot.subject.trim().to_string();
                if slot.time.is_empty() {
                    return Err(ValidationError::invalid(
                        format!("days.{canonical}[{idx}].time"),
                        "time label must not be empty",
                    ));
                }
                if slot.subject.is_empty() {
                    return Err(ValidationError::invalid(
                        format!("days.{canonical}[{idx}].subject"),
                        "subject must not be empty",
                    ));
                }
                // The label is part of the attendance key, so it must be
                // unique within a day.
                if trimmed.iter().any(|other| other.time == slot.time) {
                    return Err(ValidationError::invalid(
                        format!("days.{canonical}[{idx}].time"),
                        format!("time slot '{}' appears twice", slot.time),
                    ));
                }
                trimmed.push(slot);
            }

            days.insert(canonical.to_string(), trimmed);
        }

        Ok(Self {
            effective_from: self.effective_from,
            days,
        })
    }
}

/// Canonical day key for a weekday.
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Accepts full or three-letter weekday names in any case.
pub fn parse_weekday(key: &str) -> Result<Weekday, ValidationError> {
    key.trim()
        .parse::<Weekday>()
        .map_err(|_| ValidationError::UnknownWeekday(key.to_string()))
}

/// Parse the start of a time-range label.
///
/// Accepts `HH:MM` (24h), `H:MM AM`, `H AM` and bare hours; everything after
/// the first `-` or `–` is ignored.
pub fn parse_start_time(label: &str) -> Option<NaiveTime> {
    let start = label.split(['-', '–']).next()?.trim();
    if start.is_empty() {
        return None;
    }

    let mut normalized = start.to_ascii_uppercase();
    if !normalized.contains(':') {
        let digits = normalized
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        normalized.insert_str(digits, ":00");
    }

    ["%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&normalized, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_twelve_hour_labels() {
        assert_eq!(parse_start_time("9:00 AM"), Some(hm(9, 0)));
        assert_eq!(parse_start_time("2:00 PM"), Some(hm(14, 0)));
        assert_eq!(parse_start_time("12:30 pm"), Some(hm(12, 30)));
        assert_eq!(parse_start_time("11 AM"), Some(hm(11, 0)));
    }

    #[test]
    fn parses_ranges_and_twenty_four_hour_labels() {
        assert_eq!(parse_start_time("09:00-10:30"), Some(hm(9, 0)));
        assert_eq!(parse_start_time("14:15 – 15:15"), Some(hm(14, 15)));
        assert_eq!(parse_start_time("2:00 PM - 3:00 PM"), Some(hm(14, 0)));
        assert_eq!(parse_start_time("16"), Some(hm(16, 0)));
    }

    #[test]
    fn rejects_non_time_labels() {
        assert_eq!(parse_start_time("Lab"), None);
        assert_eq!(parse_start_time(""), None);
        assert_eq!(parse_start_time("25:00"), None);
    }

    #[test]
    fn weekday_keys_are_case_insensitive() {
        assert_eq!(parse_weekday("Monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("fri").unwrap(), Weekday::Fri);
        assert!(matches!(
            parse_weekday("Funday"),
            Err(ValidationError::UnknownWeekday(_))
        ));
    }

    #[test]
    fn normalized_rejects_duplicate_time_labels() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let version = TimetableVersion::new(date).with_day(
            Weekday::Mon,
            vec![Slot::new("9:00 AM", "Economics"), Slot::new("9:00 AM", "Statistics")],
        );
        assert!(version.normalized().is_err());
    }

    #[test]
    fn normalized_trims_labels_before_checking_duplicates() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let version = TimetableVersion::new(date).with_day(
            Weekday::Mon,
            vec![Slot::new("9:00 AM", "Economics"), Slot::new(" 9:00 AM", "Statistics")],
        );
        assert!(version.normalized().is_err());

        let version = TimetableVersion::new(date)
            .with_day(Weekday::Mon, vec![Slot::new("9:00 AM ", " Economics ")])
            .normalized()
            .unwrap();
        let slot = &version.slots_on(Weekday::Mon)[0];
        assert_eq!(slot.time, "9:00 AM");
        assert_eq!(slot.subject, "Economics");
    }

    #[test]
    fn normalized_rewrites_day_keys() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let mut version = TimetableVersion::new(date);
        version
            .days
            .insert("Tue".to_string(), vec![Slot::new("9:00 AM", "Economics")]);

        let version = version.normalized().unwrap();
        assert_eq!(version.slots_on(Weekday::Tue).len(), 1);
        assert!(version.days.contains_key("tuesday"));
    }
}
