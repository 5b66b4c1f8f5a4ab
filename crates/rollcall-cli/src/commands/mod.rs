pub mod attendance;
pub mod config;
pub mod stats;
pub mod subject;
pub mod timetable;
