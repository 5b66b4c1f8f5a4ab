//! Attendance ledger: subjects, attendance records and the store they live in.
//!
//! Every attendance fact is keyed by a [`TripleKey`] (subject, date,
//! time slot). A store holds at most one record per triple; writing the same
//! triple again replaces the earlier record.

mod memory;

pub use memory::MemoryStore;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, ValidationError};

/// Whether the user attended a lecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, AttendanceStatus::Present)
    }

    pub fn flipped(&self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        })
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(AttendanceStatus::Present),
            "absent" | "a" => Ok(AttendanceStatus::Absent),
            other => Err(ValidationError::invalid(
                "status",
                format!("expected 'present' or 'absent', got '{other}'"),
            )),
        }
    }
}

/// Identity of one attendance fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripleKey {
    pub subject_id: String,
    pub date: NaiveDate,
    pub time_slot: String,
}

impl TripleKey {
    pub fn new(
        subject_id: impl Into<String>,
        date: NaiveDate,
        time_slot: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            date,
            time_slot: time_slot.into(),
        }
    }
}

/// "On `date`, for `subject_id`, during `time_slot`, the user was `status`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: String,
    pub subject_id: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub status: AttendanceStatus,
    pub recorded_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn new(user_id: impl Into<String>, key: TripleKey, status: AttendanceStatus) -> Self {
        Self {
            user_id: user_id.into(),
            subject_id: key.subject_id,
            date: key.date,
            time_slot: key.time_slot,
            status,
            recorded_at: Utc::now(),
        }
    }

    pub fn key(&self) -> TripleKey {
        TripleKey::new(self.subject_id.clone(), self.date, self.time_slot.clone())
    }
}

/// A subject owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// Per-subject detention threshold; the configured `low` applies when unset.
    pub required_percentage: Option<u8>,
    /// Course credits, used to project the semester's lecture count.
    pub credits: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Input for an explicit subject add.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub required_percentage: Option<u8>,
    pub credits: Option<u32>,
}

impl NewSubject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns an error if the name is blank or the threshold exceeds 100.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "subject name must not be empty"));
        }
        if let Some(pct) = self.required_percentage {
            if pct > 100 {
                return Err(ValidationError::invalid(
                    "required_percentage",
                    format!("{pct} is above 100"),
                ));
            }
        }
        Ok(())
    }
}

/// Persistent store for subjects and attendance records.
///
/// All data is partitioned by the opaque `user_id` handed out by the
/// identity provider.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert the record, or replace the existing record for the same triple.
    /// Returns the record as stored.
    async fn upsert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, LedgerError>;

    /// Delete the record for a triple, returning it if one existed.
    async fn remove(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceRecord>, LedgerError>;

    async fn status_of(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceStatus>, LedgerError>;

    /// Every record owned by the user, in no particular order.
    async fn all_for_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, LedgerError>;

    /// Create subjects by name, ignoring names that already exist.
    /// Returns how many were created.
    async fn seed_subjects(&self, user_id: &str, names: &[String]) -> Result<usize, LedgerError>;

    /// Create a subject. If the name is already taken the existing subject is
    /// returned unchanged.
    async fn add_subject(&self, user_id: &str, subject: NewSubject)
        -> Result<Subject, LedgerError>;

    /// The user's subjects, sorted by name.
    async fn subjects_for_user(&self, user_id: &str) -> Result<Vec<Subject>, LedgerError>;
}
