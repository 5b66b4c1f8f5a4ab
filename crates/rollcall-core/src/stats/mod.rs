//! Attendance metrics.
//!
//! Derives attended/conducted tallies, percentages and risk bands per
//! subject and across all subjects:
//! - **Low**: below the detention threshold
//! - **Warning**: at or above it, below the warning threshold
//! - **Safe**: at or above the warning threshold

mod aggregator;
mod risk;

pub use aggregator::{MetricsAggregator, MetricsReport, OverallMetrics, SubjectMetrics};
pub use risk::{percentage, RiskBand, RiskThresholds, Tally, LECTURES_PER_CREDIT};
