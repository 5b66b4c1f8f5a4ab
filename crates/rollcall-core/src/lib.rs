//! # Rollcall Core Library
//!
//! This library provides the core logic for tracking lecture attendance
//! against a versioned weekly timetable. The `rollcall-cli` binary is a thin
//! presentation layer over the same core.
//!
//! ## Architecture
//!
//! - **Timetable**: resolves a calendar date to its ordered lecture slots
//! - **Ledger**: attendance records keyed by (subject, date, time slot)
//! - **Stats**: percentages and risk bands per subject and overall
//! - **Reconciliation**: mark/toggle/undo with optimistic updates and rollback
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`Timetable`]: Versioned weekly schedule
//! - [`ReconciliationController`]: Attendance state machine over a store
//! - [`SqliteStore`]: Persistent attendance store
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod ledger;
pub mod reconciliation;
pub mod stats;
pub mod storage;
pub mod timetable;

pub use error::{ConfigError, CoreError, LedgerError, TimetableError, ValidationError};
pub use events::Event;
pub use ledger::{
    AttendanceRecord, AttendanceStatus, AttendanceStore, MemoryStore, NewSubject, Subject,
    TripleKey,
};
pub use reconciliation::{
    AttendanceBook, DaySchedule, DaySlot, MarkState, NoopReason, ReconciliationController,
    Transition, TransitionOutcome,
};
pub use stats::{
    MetricsAggregator, MetricsReport, OverallMetrics, RiskBand, RiskThresholds, SubjectMetrics,
    Tally,
};
pub use storage::{Config, SqliteStore};
pub use timetable::{ScheduledSlot, Slot, Timetable, TimetableVersion};
