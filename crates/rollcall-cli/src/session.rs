//! Wiring shared by the attendance commands.

use chrono::{Local, NaiveDate};
use rollcall_core::{
    Config, CoreError, MetricsAggregator, ReconciliationController, SqliteStore, Timetable,
};

/// An open store, the user's book and the configuration behind them.
pub struct Session {
    pub config: Config,
    pub controller: ReconciliationController<SqliteStore>,
}

impl Session {
    pub async fn open() -> Result<Self, CoreError> {
        let config = Config::load()?;
        let store = SqliteStore::open(&config.database_path()?)?;
        let metrics = MetricsAggregator::new(config.thresholds()?);
        let controller = ReconciliationController::new(store, &config.user.id, metrics).await?;
        tracing::debug!(
            user_id = %config.user.id,
            subjects = controller.subjects().len(),
            "session opened"
        );
        Ok(Self { config, controller })
    }

    pub fn timetable(&self) -> Result<Timetable, CoreError> {
        Timetable::load(&self.config.timetable_path()?)
    }

    /// Print the acknowledgments produced by the last operation.
    pub fn acknowledge(&mut self) {
        for event in self.controller.drain_events() {
            println!("{}", event.message());
        }
    }
}

/// Parse `--date`, defaulting to the local calendar date.
pub fn parse_date(date: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            Box::<dyn std::error::Error>::from(format!(
                "invalid date '{s}' (expected YYYY-MM-DD): {e}"
            ))
        }),
        None => Ok(Local::now().date_naive()),
    }
}
