//! In-memory projection of one user's attendance.
//!
//! The book mirrors the store: the user's subjects, the status of every
//! marked triple, and per-subject tallies kept up to date incrementally so
//! metrics never require a full recount.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{AttendanceRecord, AttendanceStatus, AttendanceStore, Subject, TripleKey};
use crate::stats::Tally;

/// Attendance state of one triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    Unmarked,
    Present,
    Absent,
}

impl MarkState {
    pub fn status(&self) -> Option<AttendanceStatus> {
        match self {
            MarkState::Unmarked => None,
            MarkState::Present => Some(AttendanceStatus::Present),
            MarkState::Absent => Some(AttendanceStatus::Absent),
        }
    }
}

impl From<AttendanceStatus> for MarkState {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Present => MarkState::Present,
            AttendanceStatus::Absent => MarkState::Absent,
        }
    }
}

impl From<Option<AttendanceStatus>> for MarkState {
    fn from(status: Option<AttendanceStatus>) -> Self {
        status.map_or(MarkState::Unmarked, MarkState::from)
    }
}

impl fmt::Display for MarkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MarkState::Unmarked => "Unmarked",
            MarkState::Present => "Present",
            MarkState::Absent => "Absent",
        })
    }
}

/// Saved book state for rolling back a failed write.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    subjects: Vec<Subject>,
    statuses: BTreeMap<TripleKey, AttendanceStatus>,
    tallies: HashMap<String, Tally>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceBook {
    user_id: String,
    subjects: Vec<Subject>,
    statuses: BTreeMap<TripleKey, AttendanceStatus>,
    tallies: HashMap<String, Tally>,
}

impl AttendanceBook {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Build a book from the store's current contents.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn load<S>(store: &S, user_id: &str) -> Result<Self, LedgerError>
    where
        S: AttendanceStore + ?Sized,
    {
        let subjects = store.subjects_for_user(user_id).await?;
        let records = store.all_for_user(user_id).await?;
        tracing::debug!(
            user_id,
            subjects = subjects.len(),
            records = records.len(),
            "loaded attendance book"
        );
        Ok(Self::from_parts(user_id, subjects, records))
    }

    pub fn from_parts(
        user_id: impl Into<String>,
        subjects: Vec<Subject>,
        records: Vec<AttendanceRecord>,
    ) -> Self {
        let mut book = Self::new(user_id);
        book.subjects = subjects;
        book.subjects.sort_by(|a, b| a.name.cmp(&b.name));
        for record in records {
            book.set(record.key(), Some(record.status));
        }
        book
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Subjects sorted by name.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Look up a subject by id, then by name. Name matching ignores
    /// surrounding whitespace and case.
    pub fn find_subject(&self, id_or_name: &str) -> Option<&Subject> {
        let needle = id_or_name.trim();
        self.subjects
            .iter()
            .find(|s| s.id == needle)
            .or_else(|| self.subjects.iter().find(|s| s.name == needle))
            .or_else(|| {
                self.subjects
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(needle))
            })
    }

    pub fn insert_subject(&mut self, subject: Subject) {
        if self.subjects.iter().any(|s| s.id == subject.id) {
            return;
        }
        let idx = self.subjects.partition_point(|s| s.name < subject.name);
        self.subjects.insert(idx, subject);
    }

    pub fn status(&self, key: &TripleKey) -> MarkState {
        self.statuses.get(key).copied().into()
    }

    pub fn tally(&self, subject_id: &str) -> Tally {
        self.tallies.get(subject_id).copied().unwrap_or_default()
    }

    pub fn tallies(&self) -> &HashMap<String, Tally> {
        &self.tallies
    }

    /// Set the status of a triple, adjusting its subject's tally. Returns the
    /// previous state.
    pub fn set(&mut self, key: TripleKey, status: Option<AttendanceStatus>) -> MarkState {
        let tally = self.tallies.entry(key.subject_id.clone()).or_default();
        let previous = match status {
            Some(status) => self.statuses.insert(key, status),
            None => self.statuses.remove(&key),
        };

        match (previous, status) {
            (None, Some(new)) => tally.record(new),
            (Some(old), Some(new)) => tally.switch(old, new),
            (Some(old), None) => tally.retract(old),
            (None, None) => {}
        }
        previous.into()
    }

    /// Take a stored record as the truth for its triple.
    pub fn adopt(&mut self, record: &AttendanceRecord) {
        self.set(record.key(), Some(record.status));
    }

    /// Tallies recounted from the marked triples alone.
    pub fn recompute(&self) -> HashMap<String, Tally> {
        let mut tallies: HashMap<String, Tally> = HashMap::new();
        for (key, status) in &self.statuses {
            tallies.entry(key.subject_id.clone()).or_default().record(*status);
        }
        tallies
    }

    /// Whether the incremental tallies agree with a full recount.
    pub fn is_consistent(&self) -> bool {
        let recomputed = self.recompute();
        let incremental_agrees = self
            .tallies
            .iter()
            .all(|(id, t)| recomputed.get(id).copied().unwrap_or_default() == *t);
        let recount_covered = recomputed
            .iter()
            .all(|(id, t)| self.tally(id) == *t);
        incremental_agrees && recount_covered
    }

    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            subjects: self.subjects.clone(),
            statuses: self.statuses.clone(),
            tallies: self.tallies.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: BookSnapshot) {
        self.subjects = snapshot.subjects;
        self.statuses = snapshot.statuses;
        self.tallies = snapshot.tallies;
    }
}
