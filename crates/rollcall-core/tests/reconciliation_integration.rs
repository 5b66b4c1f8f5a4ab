//! Integration tests for the reconciliation controller.
//!
//! Scenarios run against the in-process store, SQLite in memory, and SQLite
//! on disk.

use chrono::{NaiveDate, Weekday};
use rollcall_core::{
    AttendanceStatus, AttendanceStore, CoreError, Event, LedgerError, MarkState, MemoryStore,
    MetricsAggregator, NoopReason, ReconciliationController, RiskBand, RiskThresholds, Slot,
    SqliteStore, Tally, Timetable, TimetableVersion, Transition,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn monday() -> NaiveDate {
    date(2025, 1, 6)
}

fn semester_timetable() -> Timetable {
    Timetable::new(vec![
        TimetableVersion::new(date(2025, 1, 6))
            .with_day(
                Weekday::Mon,
                vec![
                    Slot::new("9:00 AM", "Business Statistics")
                        .with_instructor("Dr. Rao")
                        .with_room("301"),
                    Slot::new("11:00 AM", "Financial Accounting"),
                ],
            )
            .with_day(Weekday::Wed, vec![Slot::new("2:00 PM", "Marketing Management")]),
        TimetableVersion::new(date(2025, 2, 3)).with_day(
            Weekday::Mon,
            vec![Slot::new("10:00 AM", "Organizational Behaviour")],
        ),
    ])
    .unwrap()
}

async fn controller<S: AttendanceStore>(store: S) -> ReconciliationController<S> {
    ReconciliationController::new(store, "student-1", MetricsAggregator::default())
        .await
        .unwrap()
}

async fn full_lifecycle<S: AttendanceStore>(store: S) {
    let mut ctl = controller(store).await;
    let timetable = semester_timetable();

    assert_eq!(ctl.seed_from_timetable(&timetable).await.unwrap(), 4);
    assert_eq!(ctl.seed_from_timetable(&timetable).await.unwrap(), 0);
    assert_eq!(ctl.subjects().len(), 4);

    let day = ctl.resolve_today(&timetable, monday());
    assert_eq!(day.slots.len(), 2);
    for entry in &day.slots {
        ctl.mark_present(&entry.slot.subject, monday(), &entry.slot.time_slot)
            .await
            .unwrap();
    }

    let out = ctl
        .toggle("Financial Accounting", monday(), "11:00 AM")
        .await
        .unwrap();
    assert_eq!(out.current, MarkState::Absent);

    let out = ctl
        .undo("Business Statistics", monday(), "9:00 AM")
        .await
        .unwrap();
    assert_eq!(out.transition, Transition::Undone);
    assert_eq!(out.tally, Tally::new(0, 0));

    let report = ctl.report();
    assert_eq!(report.overall.conducted, 1);
    assert_eq!(report.overall.attended, 0);
    assert_eq!(report.overall.band, RiskBand::Low);
    assert!(ctl.book().is_consistent());

    let events = ctl.drain_events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::SubjectsSeeded { .. } => "seeded",
            Event::AttendanceMarked { .. } => "marked",
            Event::AttendanceToggled { .. } => "toggled",
            Event::AttendanceUndone { .. } => "undone",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["seeded", "seeded", "marked", "marked", "toggled", "undone"]
    );
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn lifecycle_against_memory_store() {
    full_lifecycle(MemoryStore::new()).await;
}

#[tokio::test]
async fn lifecycle_against_sqlite_store() {
    full_lifecycle(SqliteStore::open_memory().unwrap()).await;
}

#[tokio::test]
async fn marks_survive_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollcall.db");

    {
        let mut ctl = controller(SqliteStore::open(&path).unwrap()).await;
        ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
        ctl.mark_absent("Economics", date(2025, 1, 7), "9:00 AM")
            .await
            .unwrap();
    }

    let ctl = controller(SqliteStore::open(&path).unwrap()).await;
    let report = ctl.report();
    assert_eq!(report.subjects.len(), 1);
    assert_eq!(report.subjects[0].attended, 1);
    assert_eq!(report.subjects[0].conducted, 2);
    assert_eq!(report.subjects[0].percentage, 50);
}

#[tokio::test]
async fn two_sessions_on_one_store_stay_consistent() {
    let store = MemoryStore::new();
    let mut first = controller(store.clone()).await;
    let mut second = controller(store.clone()).await;

    first.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    // The second session has never seen the mark but reads the prior status
    // from the store before acting.
    let out = second.undo("Economics", monday(), "9:00 AM").await.unwrap();
    assert_eq!(out.transition, Transition::Undone);
    assert_eq!(out.previous, MarkState::Present);
    assert!(store.all_for_user("student-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_store_surfaces_persistence_error() {
    let store = MemoryStore::new();
    let mut ctl = controller(store.clone()).await;
    ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    ctl.drain_events();

    store.set_reachable(false);
    let err = ctl
        .mark_absent("Economics", monday(), "9:00 AM")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Persistence(LedgerError::Unreachable(_))
    ));
    assert!(ctl.drain_events().is_empty());

    store.set_reachable(true);
    let out = ctl
        .mark_absent("Economics", monday(), "9:00 AM")
        .await
        .unwrap();
    assert_eq!(out.tally, Tally::new(0, 1));
}

#[tokio::test]
async fn rejected_undo_restores_tallies() {
    let store = MemoryStore::new();
    let mut ctl = controller(store.clone()).await;
    ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    let before = ctl.report();

    store.set_writable(false);
    assert!(ctl.undo("Economics", monday(), "9:00 AM").await.is_err());
    assert_eq!(ctl.report(), before);
    assert!(ctl.book().is_consistent());
    assert_eq!(
        store
            .all_for_user("student-1")
            .await
            .unwrap()
            .first()
            .map(|r| r.status),
        Some(AttendanceStatus::Present)
    );
}

#[tokio::test]
async fn noops_leave_store_untouched() {
    let mut ctl = controller(SqliteStore::open_memory().unwrap()).await;
    let out = ctl.undo("Economics", monday(), "9:00 AM").await.unwrap();
    assert_eq!(out.transition, Transition::Noop(NoopReason::UnknownSubject));

    ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    let out = ctl.toggle("Economics", date(2025, 1, 7), "9:00 AM").await.unwrap();
    assert_eq!(out.transition, Transition::Noop(NoopReason::NothingToToggle));
    assert_eq!(ctl.store().all_for_user("student-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn strict_threshold_scenarios() {
    // Only the detention threshold is in play.
    let thresholds = RiskThresholds::new(80, 80).unwrap();
    let mut ctl = ReconciliationController::new(
        MemoryStore::new(),
        "student-1",
        MetricsAggregator::new(thresholds),
    )
    .await
    .unwrap();

    // 18 of 22 lectures: 81.8% rounds to 82, above the 80 threshold.
    for i in 0..22u64 {
        let day = monday() + chrono::Days::new(i);
        if i < 18 {
            ctl.mark_present("Economics", day, "9:00 AM").await.unwrap();
        } else {
            ctl.mark_absent("Economics", day, "9:00 AM").await.unwrap();
        }
    }
    let report = ctl.report();
    assert_eq!(report.subjects[0].percentage, 82);
    assert_eq!(report.subjects[0].band, RiskBand::Safe);
}

#[tokio::test]
async fn mark_laws_hold_on_counts() {
    let mut ctl = controller(MemoryStore::new()).await;
    ctl.mark_present("Economics", date(2025, 1, 7), "9:00 AM")
        .await
        .unwrap();
    let base = ctl.report().overall;

    // Idempotence: marking present twice counts once.
    ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    let once = ctl.report().overall;
    ctl.mark_present("Economics", monday(), "9:00 AM").await.unwrap();
    assert_eq!(ctl.report().overall, once);

    // Present then absent: conducted unchanged, attended back to base.
    ctl.mark_absent("Economics", monday(), "9:00 AM").await.unwrap();
    let toggled = ctl.report().overall;
    assert_eq!(toggled.conducted, once.conducted);
    assert_eq!(toggled.attended, base.attended);

    // Undo returns to the pre-mark counts.
    ctl.undo("Economics", monday(), "9:00 AM").await.unwrap();
    assert_eq!(ctl.report().overall, base);
}

#[tokio::test]
async fn revised_timetable_applies_from_its_date() {
    let timetable = semester_timetable();
    let ctl = controller(MemoryStore::new()).await;

    let before = ctl.resolve_today(&timetable, date(2025, 1, 27));
    assert_eq!(before.slots.len(), 2);

    let after = ctl.resolve_today(&timetable, date(2025, 2, 3));
    assert_eq!(after.slots.len(), 1);
    assert_eq!(after.slots[0].slot.subject, "Organizational Behaviour");
    assert!(after.slots[0].subject_id.is_none());
}

#[tokio::test]
async fn padded_timetable_labels_share_the_marked_key() {
    let timetable = Timetable::from_toml_str(
        r#"
[[versions]]
effective_from = "2025-01-06"

[versions.days]
monday = [{ time = "9:00 AM ", subject = " Economics" }]
"#,
    )
    .unwrap();
    let mut ctl = controller(MemoryStore::new()).await;
    ctl.seed_from_timetable(&timetable).await.unwrap();

    let day = ctl.resolve_today(&timetable, monday());
    let slot = day.slots[0].slot.clone();
    assert_eq!(slot.time_slot, "9:00 AM");
    ctl.mark_present(&slot.subject, monday(), &slot.time_slot)
        .await
        .unwrap();

    let day = ctl.resolve_today(&timetable, monday());
    assert_eq!(day.slots[0].state, MarkState::Present);
    assert_eq!(ctl.subjects()[0].name, "Economics");
}

#[test]
fn labels_differing_only_in_padding_are_duplicates() {
    let result = Timetable::from_toml_str(
        r#"
[[versions]]
effective_from = "2025-01-06"

[versions.days]
monday = [
    { time = "9:00 AM", subject = "Economics" },
    { time = " 9:00 AM", subject = "Statistics" },
]
"#,
    );
    assert!(result.is_err());
}
