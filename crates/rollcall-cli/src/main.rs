use clap::{Parser, Subcommand};

mod commands;
mod session;

#[derive(Parser)]
#[command(name = "rollcall-cli", version, about = "Rollcall attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lectures scheduled for a day, with their attendance marks
    Today {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a lecture present or absent
    Mark {
        /// Subject name or id
        subject: String,
        /// Time slot label (e.g. "9:00 AM")
        time_slot: String,
        /// present | absent
        status: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Flip a marked lecture between present and absent
    Toggle {
        subject: String,
        time_slot: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove the mark for a lecture
    Undo {
        subject: String,
        time_slot: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Attendance percentages and risk bands
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Subject management
    Subject {
        #[command(subcommand)]
        action: commands::subject::SubjectAction,
    },
    /// Timetable inspection and subject seeding
    Timetable {
        #[command(subcommand)]
        action: commands::timetable::TimetableAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Today { date, json } => commands::attendance::today(date, json).await,
        Commands::Mark {
            subject,
            time_slot,
            status,
            date,
        } => commands::attendance::mark(&subject, &time_slot, &status, date).await,
        Commands::Toggle {
            subject,
            time_slot,
            date,
        } => commands::attendance::toggle(&subject, &time_slot, date).await,
        Commands::Undo {
            subject,
            time_slot,
            date,
        } => commands::attendance::undo(&subject, &time_slot, date).await,
        Commands::Stats { json } => commands::stats::run(json).await,
        Commands::Subject { action } => commands::subject::run(action).await,
        Commands::Timetable { action } => commands::timetable::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
