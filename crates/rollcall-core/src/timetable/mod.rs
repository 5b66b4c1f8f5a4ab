//! Timetable resolution.
//!
//! A [`Timetable`] is a list of [`TimetableVersion`]s sorted by their
//! effective-from date. For any calendar date exactly one version is active:
//! the one with the latest effective-from date that is on or before it.
//!
//! ## Usage
//!
//! ```ignore
//! let timetable = Timetable::load(&path)?;
//! for slot in timetable.resolve(date)? {
//!     println!("{} {}", slot.time_slot, slot.subject);
//! }
//! ```

mod version;

pub use version::{parse_start_time, parse_weekday, weekday_key, Slot, TimetableVersion};

use std::collections::HashSet;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, TimetableError, ValidationError};

/// One entry of a resolved day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSlot {
    pub time_slot: String,
    pub subject: String,
    pub instructor: String,
    pub room: String,
}

impl From<&Slot> for ScheduledSlot {
    fn from(slot: &Slot) -> Self {
        Self {
            time_slot: slot.time.clone(),
            subject: slot.subject.clone(),
            instructor: slot.instructor.clone(),
            room: slot.room.clone(),
        }
    }
}

/// On-disk shape of `timetable.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TimetableFile {
    #[serde(default)]
    versions: Vec<TimetableVersion>,
}

/// All configured timetable versions, sorted by effective-from date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timetable {
    versions: Vec<TimetableVersion>,
}

impl Timetable {
    /// Build a timetable, validating every version.
    ///
    /// # Errors
    /// Returns an error if two versions share an effective-from date, a day
    /// key is not a weekday, or a slot is malformed.
    pub fn new(versions: Vec<TimetableVersion>) -> Result<Self, ValidationError> {
        let mut versions = versions
            .into_iter()
            .map(TimetableVersion::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort_by_key(|v| v.effective_from);

        if let Some(pair) = versions
            .windows(2)
            .find(|pair| pair[0].effective_from == pair[1].effective_from)
        {
            return Err(ValidationError::DuplicateVersion {
                effective_from: pair[0].effective_from,
            });
        }

        Ok(Self { versions })
    }

    /// Parse a timetable from TOML text.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let file: TimetableFile =
            toml::from_str(content).map_err(|e| TimetableError::Parse(e.to_string()))?;
        Ok(Self::new(file.versions)?)
    }

    /// Load a timetable file. A missing file yields an empty timetable.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Serialize back to the TOML file format.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, CoreError> {
        let file = TimetableFile {
            versions: self.versions.clone(),
        };
        toml::to_string_pretty(&file).map_err(|e| CoreError::Custom(e.to_string()))
    }

    pub fn versions(&self) -> &[TimetableVersion] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The version in force on `date`, if any.
    pub fn active_version(&self, date: NaiveDate) -> Option<&TimetableVersion> {
        let idx = self.versions.partition_point(|v| v.effective_from <= date);
        idx.checked_sub(1).map(|i| &self.versions[i])
    }

    /// Slots scheduled on `date`, ordered by start time.
    ///
    /// Weekdays with no entries resolve to an empty list.
    ///
    /// # Errors
    /// Returns [`TimetableError::NoTimetableConfigured`] if no version is in
    /// force on `date`.
    pub fn resolve(&self, date: NaiveDate) -> Result<Vec<ScheduledSlot>, TimetableError> {
        let version = self
            .active_version(date)
            .ok_or(TimetableError::NoTimetableConfigured { date })?;

        let mut slots: Vec<&Slot> = version.slots_on(date.weekday()).iter().collect();
        // Unparseable labels sort last; stable sort keeps their definition order.
        slots.sort_by_key(|slot| match slot.start_time() {
            Some(t) => (0, Some(t)),
            None => (1, None),
        });

        Ok(slots.into_iter().map(ScheduledSlot::from).collect())
    }

    /// Like [`Timetable::resolve`], recovering a missing timetable as an
    /// empty schedule.
    pub fn resolve_or_empty(&self, date: NaiveDate) -> Vec<ScheduledSlot> {
        match self.resolve(date) {
            Ok(slots) => slots,
            Err(err) => {
                tracing::warn!(%date, "{err}; showing an empty schedule");
                Vec::new()
            }
        }
    }

    /// Distinct subject names across all versions, in first-seen order.
    pub fn subject_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for version in &self.versions {
            for slots in version.days.values() {
                for slot in slots {
                    let name = slot.subject.trim();
                    if seen.insert(name.to_string()) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }
}
