//! Attendance tallies, percentages and risk bands.
//!
//! Percentages are whole numbers computed in integer arithmetic, rounding
//! half up: 159 of 200 lectures is 79.5%, reported as 80.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ledger::AttendanceStatus;

/// Lectures held per course credit over a semester.
pub const LECTURES_PER_CREDIT: u32 = 15;

/// Attended and conducted lecture counts for one subject.
///
/// `attended <= conducted` always holds for tallies built through
/// [`Tally::record`], [`Tally::retract`] and [`Tally::switch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub attended: u32,
    pub conducted: u32,
}

impl Tally {
    pub fn new(attended: u32, conducted: u32) -> Self {
        Self {
            attended,
            conducted,
        }
    }

    pub fn missed(&self) -> u32 {
        self.conducted.saturating_sub(self.attended)
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.attended, self.conducted)
    }

    /// Count a newly marked lecture.
    pub fn record(&mut self, status: AttendanceStatus) {
        self.conducted += 1;
        if status.is_present() {
            self.attended += 1;
        }
    }

    /// Uncount a lecture whose mark was removed.
    pub fn retract(&mut self, status: AttendanceStatus) {
        self.conducted = self.conducted.saturating_sub(1);
        if status.is_present() {
            self.attended = self.attended.saturating_sub(1);
        }
    }

    /// Re-count a lecture whose mark changed. `conducted` is unchanged.
    pub fn switch(&mut self, from: AttendanceStatus, to: AttendanceStatus) {
        match (from.is_present(), to.is_present()) {
            (false, true) => self.attended += 1,
            (true, false) => self.attended = self.attended.saturating_sub(1),
            _ => {}
        }
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        Tally {
            attended: self.attended + rhs.attended,
            conducted: self.conducted + rhs.conducted,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), |acc, t| acc + t)
    }
}

/// Attendance percentage, rounded half up. Zero when nothing was conducted.
pub fn percentage(attended: u32, conducted: u32) -> u8 {
    if conducted == 0 {
        return 0;
    }
    let attended = u64::from(attended.min(conducted));
    let conducted = u64::from(conducted);
    let pct = (200 * attended + conducted) / (2 * conducted);
    // attended <= conducted bounds pct to 100
    u8::try_from(pct).unwrap_or(100)
}

/// Where an attendance percentage falls relative to the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    /// Below the detention threshold.
    Low,
    Warning,
    Safe,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Warning => "warning",
            RiskBand::Safe => "safe",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage cut-offs for [`RiskBand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    low: u8,
    warning: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 75,
            warning: 85,
        }
    }
}

impl RiskThresholds {
    /// # Errors
    /// Returns an error unless `low <= warning <= 100`.
    pub fn new(low: u8, warning: u8) -> Result<Self, ValidationError> {
        if warning > 100 {
            return Err(ValidationError::invalid(
                "thresholds.warning",
                format!("{warning} is above 100"),
            ));
        }
        if low > warning {
            return Err(ValidationError::invalid(
                "thresholds.low",
                format!("{low} is above the warning threshold {warning}"),
            ));
        }
        Ok(Self { low, warning })
    }

    pub fn low(&self) -> u8 {
        self.low
    }

    pub fn warning(&self) -> u8 {
        self.warning
    }

    /// Replace the detention threshold, raising `warning` to stay at or
    /// above it.
    pub fn with_low(self, low: u8) -> Self {
        let low = low.min(100);
        Self {
            low,
            warning: self.warning.max(low),
        }
    }

    pub fn classify(&self, pct: u8) -> RiskBand {
        if pct < self.low {
            RiskBand::Low
        } else if pct < self.warning {
            RiskBand::Warning
        } else {
            RiskBand::Safe
        }
    }
}
