use clap::Subcommand;

use crate::session::{parse_date, Session};

#[derive(Subcommand)]
pub enum TimetableAction {
    /// Show the slots the timetable schedules for a day
    Show {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record every timetable subject not yet recorded
    Seed,
}

pub async fn run(action: TimetableAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open().await?;
    let timetable = session.timetable()?;

    match action {
        TimetableAction::Show { date, json } => {
            let date = parse_date(date.as_deref())?;
            let slots = timetable.resolve_or_empty(date);
            if json {
                println!("{}", serde_json::to_string_pretty(&slots)?);
                return Ok(());
            }
            let Some(version) = timetable.active_version(date) else {
                println!("No timetable configured for this date.");
                return Ok(());
            };
            println!("Timetable effective from {}", version.effective_from);
            for slot in &slots {
                println!("{:<10} {}", slot.time_slot, slot.subject);
            }
        }
        TimetableAction::Seed => {
            session.controller.seed_from_timetable(&timetable).await?;
            session.acknowledge();
        }
    }
    Ok(())
}
