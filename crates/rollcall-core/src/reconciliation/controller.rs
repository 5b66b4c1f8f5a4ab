//! Mark, toggle and undo attendance against a store.
//!
//! Each operation reads the prior status from the store, applies the change
//! to the in-memory book immediately, then awaits the write. If the write
//! fails the book is rolled back to its state before the operation and the
//! failure is returned as [`CoreError::Persistence`].

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::book::{AttendanceBook, MarkState};
use crate::error::{CoreError, LedgerError, TimetableError};
use crate::events::Event;
use crate::ledger::{
    AttendanceRecord, AttendanceStatus, AttendanceStore, NewSubject, Subject, TripleKey,
};
use crate::stats::{MetricsAggregator, MetricsReport, Tally};
use crate::timetable::{ScheduledSlot, Timetable};

/// Why an operation changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoopReason {
    NothingToUndo,
    NothingToToggle,
    UnknownSubject,
}

/// What an operation did to a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Unmarked triple received a mark.
    Marked,
    /// Marked triple was marked again, with the same or the opposite status.
    Remarked,
    Toggled,
    Undone,
    Noop(NoopReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// Empty when the subject could not be resolved.
    pub subject_id: String,
    pub subject_name: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub previous: MarkState,
    pub current: MarkState,
    pub transition: Transition,
    /// The subject's tally after the operation.
    pub tally: Tally,
}

/// A resolved slot joined with its mark state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlot {
    #[serde(flatten)]
    pub slot: ScheduledSlot,
    /// `None` until the subject has been recorded.
    pub subject_id: Option<String>,
    pub state: MarkState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// False when no timetable version covers `date`.
    pub timetable_configured: bool,
    pub slots: Vec<DaySlot>,
}

enum Operation {
    Mark(AttendanceStatus),
    Toggle,
}

pub struct ReconciliationController<S: AttendanceStore> {
    store: S,
    book: AttendanceBook,
    metrics: MetricsAggregator,
    events: Vec<Event>,
}

impl<S: AttendanceStore> ReconciliationController<S> {
    /// Load the user's book from `store`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn new(
        store: S,
        user_id: &str,
        metrics: MetricsAggregator,
    ) -> Result<Self, CoreError> {
        let book = AttendanceBook::load(&store, user_id).await?;
        Ok(Self {
            store,
            book,
            metrics,
            events: Vec::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn book(&self) -> &AttendanceBook {
        &self.book
    }

    pub fn user_id(&self) -> &str {
        self.book.user_id()
    }

    pub fn subjects(&self) -> &[Subject] {
        self.book.subjects()
    }

    /// Replace the book with the store's current contents.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn reload(&mut self) -> Result<(), CoreError> {
        let user_id = self.book.user_id().to_string();
        self.book = AttendanceBook::load(&self.store, &user_id).await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the store is unreachable or rejects the write.
    pub async fn mark_present(
        &mut self,
        subject: &str,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<TransitionOutcome, CoreError> {
        self.mark(subject, date, time_slot, AttendanceStatus::Present)
            .await
    }

    /// # Errors
    /// Returns an error if the store is unreachable or rejects the write.
    pub async fn mark_absent(
        &mut self,
        subject: &str,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<TransitionOutcome, CoreError> {
        self.mark(subject, date, time_slot, AttendanceStatus::Absent)
            .await
    }

    /// Record `status` for a lecture. `subject` is a subject id or name; an
    /// unknown name creates the subject.
    ///
    /// # Errors
    /// Returns an error if the subject name or time slot is blank, or the
    /// store is unreachable or rejects the write.
    pub async fn mark(
        &mut self,
        subject: &str,
        date: NaiveDate,
        time_slot: &str,
        status: AttendanceStatus,
    ) -> Result<TransitionOutcome, CoreError> {
        let time_slot = non_blank_slot(time_slot)?;
        let subject = self.resolve_or_create_subject(subject).await?;
        self.write(subject, date, time_slot, Operation::Mark(status))
            .await
    }

    /// Flip a marked lecture between present and absent.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or rejects the write.
    pub async fn toggle(
        &mut self,
        subject: &str,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<TransitionOutcome, CoreError> {
        let time_slot = non_blank_slot(time_slot)?;
        let Some(found) = self.lookup_subject(subject).await? else {
            return Ok(unknown_subject(subject, date, time_slot));
        };
        self.write(found, date, time_slot, Operation::Toggle).await
    }

    /// Remove the mark for a lecture.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or rejects the delete.
    pub async fn undo(
        &mut self,
        subject: &str,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<TransitionOutcome, CoreError> {
        let time_slot = non_blank_slot(time_slot)?;
        let Some(subject) = self.lookup_subject(subject).await? else {
            return Ok(unknown_subject(subject, date, time_slot));
        };

        let key = TripleKey::new(subject.id.clone(), date, time_slot);
        let previous = self.reconcile_prior(&key).await?;
        let Some(status) = previous.status() else {
            let transition = Transition::Noop(NoopReason::NothingToUndo);
            return Ok(self.outcome(&subject, &key, previous, transition));
        };

        let snapshot = self.book.snapshot();
        self.book.set(key.clone(), None);

        tracing::debug!(
            subject = %subject.name,
            %date,
            time_slot,
            "removing attendance record"
        );
        if let Err(err) = self.store.remove(self.book.user_id(), &key).await {
            self.book.restore(snapshot);
            return Err(self.rolled_back(&subject, &key, err));
        }

        let event = Event::AttendanceUndone {
            subject: subject.name.clone(),
            status,
            date,
            time_slot: key.time_slot.clone(),
            at: Utc::now(),
        };
        self.acknowledge(event);
        Ok(self.outcome(&subject, &key, previous, Transition::Undone))
    }

    async fn write(
        &mut self,
        subject: Subject,
        date: NaiveDate,
        time_slot: &str,
        operation: Operation,
    ) -> Result<TransitionOutcome, CoreError> {
        let key = TripleKey::new(subject.id.clone(), date, time_slot);
        let previous = self.reconcile_prior(&key).await?;

        let (status, transition) = match (operation, previous.status()) {
            (Operation::Mark(status), None) => (status, Transition::Marked),
            (Operation::Mark(status), Some(_)) => (status, Transition::Remarked),
            (Operation::Toggle, Some(prior)) => (prior.flipped(), Transition::Toggled),
            (Operation::Toggle, None) => {
                let transition = Transition::Noop(NoopReason::NothingToToggle);
                return Ok(self.outcome(&subject, &key, previous, transition));
            }
        };

        let snapshot = self.book.snapshot();
        self.book.set(key.clone(), Some(status));

        let record = AttendanceRecord::new(self.book.user_id(), key.clone(), status);
        tracing::debug!(
            subject = %subject.name,
            %date,
            time_slot,
            %status,
            "writing attendance record"
        );
        let stored = match self.store.upsert(record).await {
            Ok(stored) => stored,
            Err(err) => {
                self.book.restore(snapshot);
                return Err(self.rolled_back(&subject, &key, err));
            }
        };
        self.book.adopt(&stored);

        let event = match (transition, previous.status()) {
            (Transition::Toggled, Some(from)) => Event::AttendanceToggled {
                subject: subject.name.clone(),
                from,
                to: stored.status,
                date,
                time_slot: key.time_slot.clone(),
                at: stored.recorded_at,
            },
            _ => Event::AttendanceMarked {
                subject: subject.name.clone(),
                status: stored.status,
                date,
                time_slot: key.time_slot.clone(),
                at: stored.recorded_at,
            },
        };
        self.acknowledge(event);
        Ok(self.outcome(&subject, &key, previous, transition))
    }

    /// Read the stored status for `key`, bringing the book in line with it.
    async fn reconcile_prior(&mut self, key: &TripleKey) -> Result<MarkState, CoreError> {
        let stored = self.store.status_of(self.book.user_id(), key).await?;
        let stored_state = MarkState::from(stored);
        if self.book.status(key) != stored_state {
            tracing::debug!(?key, %stored_state, "book was stale, adopting stored status");
            self.book.set(key.clone(), stored);
        }
        Ok(stored_state)
    }

    /// Find a subject in the book, falling back to the store for subjects
    /// recorded by another session.
    async fn lookup_subject(&mut self, subject: &str) -> Result<Option<Subject>, CoreError> {
        if let Some(found) = self.book.find_subject(subject) {
            return Ok(Some(found.clone()));
        }
        let stored = self.store.subjects_for_user(self.book.user_id()).await?;
        for s in stored {
            self.book.insert_subject(s);
        }
        Ok(self.book.find_subject(subject).cloned())
    }

    async fn resolve_or_create_subject(&mut self, subject: &str) -> Result<Subject, CoreError> {
        if let Some(found) = self.lookup_subject(subject).await? {
            return Ok(found);
        }
        self.add_subject(NewSubject::named(subject.trim())).await
    }

    /// Record a subject explicitly. An existing subject of the same name is
    /// returned unchanged.
    ///
    /// # Errors
    /// Returns an error if the subject is invalid or the store fails.
    pub async fn add_subject(&mut self, subject: NewSubject) -> Result<Subject, CoreError> {
        subject.validate()?;
        let created = self
            .store
            .add_subject(self.book.user_id(), subject)
            .await?;
        self.book.insert_subject(created.clone());
        Ok(created)
    }

    /// Create a subject for every timetable subject not yet recorded.
    ///
    /// # Errors
    /// Returns an error if the store fails.
    pub async fn seed_from_timetable(
        &mut self,
        timetable: &Timetable,
    ) -> Result<usize, CoreError> {
        let names = timetable.subject_names();
        if names.is_empty() {
            return Ok(0);
        }

        let count = self
            .store
            .seed_subjects(self.book.user_id(), &names)
            .await?;
        self.reload().await?;

        tracing::info!(count, "seeded subjects from timetable");
        self.events.push(Event::SubjectsSeeded {
            count,
            at: Utc::now(),
        });
        Ok(count)
    }

    /// The day's timetable joined with current mark states. A date no
    /// timetable version covers yields an empty schedule.
    pub fn resolve_today(&self, timetable: &Timetable, date: NaiveDate) -> DaySchedule {
        let (timetable_configured, slots) = match timetable.resolve(date) {
            Ok(slots) => (true, slots),
            Err(err @ TimetableError::NoTimetableConfigured { .. }) => {
                tracing::warn!(%date, "{err}; showing an empty schedule");
                (false, Vec::new())
            }
            Err(err) => {
                tracing::warn!(%date, "{err}");
                (false, Vec::new())
            }
        };

        let slots = slots
            .into_iter()
            .map(|slot| {
                let subject_id = self
                    .book
                    .find_subject(&slot.subject)
                    .map(|s| s.id.clone());
                let state = subject_id
                    .as_ref()
                    .map(|id| {
                        let key = TripleKey::new(id.clone(), date, slot.time_slot.clone());
                        self.book.status(&key)
                    })
                    .unwrap_or(MarkState::Unmarked);
                DaySlot {
                    slot,
                    subject_id,
                    state,
                }
            })
            .collect();

        DaySchedule {
            date,
            timetable_configured,
            slots,
        }
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics
            .report_from_tallies(self.book.subjects(), self.book.tallies())
    }

    /// Take the acknowledgments produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn acknowledge(&mut self, event: Event) {
        tracing::info!("{}", event.message());
        self.events.push(event);
    }

    fn rolled_back(&self, subject: &Subject, key: &TripleKey, err: LedgerError) -> CoreError {
        tracing::warn!(
            subject = %subject.name,
            date = %key.date,
            time_slot = %key.time_slot,
            error = %err,
            "attendance write failed; local state rolled back"
        );
        CoreError::Persistence(err)
    }

    fn outcome(
        &self,
        subject: &Subject,
        key: &TripleKey,
        previous: MarkState,
        transition: Transition,
    ) -> TransitionOutcome {
        TransitionOutcome {
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            date: key.date,
            time_slot: key.time_slot.clone(),
            previous,
            current: self.book.status(key),
            transition,
            tally: self.book.tally(&subject.id),
        }
    }
}

fn non_blank_slot(time_slot: &str) -> Result<&str, CoreError> {
    let trimmed = time_slot.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ValidationError::invalid("time_slot", "must not be empty").into());
    }
    Ok(trimmed)
}

fn unknown_subject(subject: &str, date: NaiveDate, time_slot: &str) -> TransitionOutcome {
    TransitionOutcome {
        subject_id: String::new(),
        subject_name: subject.trim().to_string(),
        date,
        time_slot: time_slot.to_string(),
        previous: MarkState::Unmarked,
        current: MarkState::Unmarked,
        transition: Transition::Noop(NoopReason::UnknownSubject),
        tally: Tally::default(),
    }
}
