use rollcall_core::{AttendanceStatus, MarkState, Transition, TransitionOutcome};

use crate::session::{parse_date, Session};

pub async fn today(date: Option<String>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let date = parse_date(date.as_deref())?;
    let session = Session::open().await?;
    let timetable = session.timetable()?;
    let day = session.controller.resolve_today(&timetable, date);

    if json {
        println!("{}", serde_json::to_string_pretty(&day)?);
        return Ok(());
    }

    println!("{} ({})", day.date, day.date.format("%A"));
    if !day.timetable_configured {
        println!("No timetable configured for this date.");
        return Ok(());
    }
    if day.slots.is_empty() {
        println!("No lectures scheduled.");
        return Ok(());
    }
    for entry in &day.slots {
        let mark = match entry.state {
            MarkState::Unmarked => "-",
            MarkState::Present => "P",
            MarkState::Absent => "A",
        };
        let mut line = format!("[{mark}] {:<10} {}", entry.slot.time_slot, entry.slot.subject);
        if !entry.slot.instructor.is_empty() {
            line.push_str(&format!("  {}", entry.slot.instructor));
        }
        if !entry.slot.room.is_empty() {
            line.push_str(&format!("  room {}", entry.slot.room));
        }
        println!("{line}");
    }
    Ok(())
}

pub async fn mark(
    subject: &str,
    time_slot: &str,
    status: &str,
    date: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status: AttendanceStatus = status.parse()?;
    let date = parse_date(date.as_deref())?;
    let mut session = Session::open().await?;
    let outcome = session
        .controller
        .mark(subject, date, time_slot, status)
        .await?;
    report(&mut session, &outcome);
    Ok(())
}

pub async fn toggle(
    subject: &str,
    time_slot: &str,
    date: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let date = parse_date(date.as_deref())?;
    let mut session = Session::open().await?;
    let outcome = session.controller.toggle(subject, date, time_slot).await?;
    report(&mut session, &outcome);
    Ok(())
}

pub async fn undo(
    subject: &str,
    time_slot: &str,
    date: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let date = parse_date(date.as_deref())?;
    let mut session = Session::open().await?;
    let outcome = session.controller.undo(subject, date, time_slot).await?;
    report(&mut session, &outcome);
    Ok(())
}

fn report(session: &mut Session, outcome: &TransitionOutcome) {
    if let Transition::Noop(reason) = outcome.transition {
        println!(
            "Nothing to do for {} on {} ({}): {reason:?}",
            outcome.subject_name, outcome.date, outcome.time_slot
        );
        return;
    }
    session.acknowledge();
    println!(
        "{}: {}/{} attended ({}%)",
        outcome.subject_name,
        outcome.tally.attended,
        outcome.tally.conducted,
        outcome.tally.percentage()
    );
}
