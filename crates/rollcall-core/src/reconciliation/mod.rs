//! Reconciliation of user attendance actions with the store.
//!
//! [`ReconciliationController`] turns mark, toggle and undo requests into
//! store writes while keeping an [`AttendanceBook`] of incrementally
//! maintained tallies in step with them.

mod book;
mod controller;

pub use book::{AttendanceBook, BookSnapshot, MarkState};
pub use controller::{
    DaySchedule, DaySlot, NoopReason, ReconciliationController, Transition, TransitionOutcome,
};
