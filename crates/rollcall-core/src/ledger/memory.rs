//! In-process attendance store.
//!
//! Same semantics as the SQLite store, without touching disk. Clones share
//! state, so a test can keep a handle while a controller owns another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AttendanceRecord, AttendanceStatus, AttendanceStore, NewSubject, Subject, TripleKey};
use crate::error::LedgerError;

#[derive(Default)]
struct MemoryState {
    subjects: Vec<Subject>,
    records: HashMap<(String, TripleKey), AttendanceRecord>,
}

impl MemoryState {
    fn insert_subject(
        &mut self,
        user_id: &str,
        subject: NewSubject,
    ) -> Result<Subject, LedgerError> {
        let name = subject.name.trim().to_string();
        if self
            .subjects
            .iter()
            .any(|s| s.user_id == user_id && s.name == name)
        {
            return Err(LedgerError::DuplicateKey {
                user_id: user_id.to_string(),
                name,
            });
        }

        let created = Subject {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            required_percentage: subject.required_percentage,
            credits: subject.credits,
            created_at: Utc::now(),
        };
        self.subjects.push(created.clone());
        Ok(created)
    }
}

/// Attendance store backed by process memory.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    reachable: Arc<AtomicBool>,
    writable: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            reachable: Arc::new(AtomicBool::new(true)),
            writable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate losing (or regaining) the connection to the store. While
    /// unreachable every call fails with [`LedgerError::Unreachable`].
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Let reads succeed while every write fails with
    /// [`LedgerError::Rejected`].
    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), LedgerError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unreachable("memory store is offline".into()))
        }
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        self.check_reachable()?;
        if self.writable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Rejected("memory store is read-only".into()))
        }
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn upsert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, LedgerError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        state
            .records
            .insert((record.user_id.clone(), record.key()), record.clone());
        Ok(record)
    }

    async fn remove(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceRecord>, LedgerError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        Ok(state.records.remove(&(user_id.to_string(), key.clone())))
    }

    async fn status_of(
        &self,
        user_id: &str,
        key: &TripleKey,
    ) -> Result<Option<AttendanceStatus>, LedgerError> {
        self.check_reachable()?;
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(&(user_id.to_string(), key.clone()))
            .map(|r| r.status))
    }

    async fn all_for_user(&self, user_id: &str) -> Result<Vec<AttendanceRecord>, LedgerError> {
        self.check_reachable()?;
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn seed_subjects(&self, user_id: &str, names: &[String]) -> Result<usize, LedgerError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let mut created = 0;
        for name in names {
            match state.insert_subject(user_id, NewSubject::named(name.as_str())) {
                Ok(_) => created += 1,
                Err(LedgerError::DuplicateKey { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    async fn add_subject(
        &self,
        user_id: &str,
        subject: NewSubject,
    ) -> Result<Subject, LedgerError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let name = subject.name.trim().to_string();
        match state.insert_subject(user_id, subject) {
            Err(LedgerError::DuplicateKey { .. }) => state
                .subjects
                .iter()
                .find(|s| s.user_id == user_id && s.name == name)
                .cloned()
                .ok_or_else(|| LedgerError::Rejected(format!("subject '{name}' vanished"))),
            other => other,
        }
    }

    async fn subjects_for_user(&self, user_id: &str) -> Result<Vec<Subject>, LedgerError> {
        self.check_reachable()?;
        let state = self.state.lock().await;
        let mut subjects: Vec<Subject> = state
            .subjects
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }
}
