//! Per-subject and overall attendance metrics.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::risk::{percentage, RiskBand, RiskThresholds, Tally, LECTURES_PER_CREDIT};
use crate::ledger::{AttendanceRecord, Subject};

/// Metrics for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMetrics {
    pub subject_id: String,
    pub name: String,
    pub attended: u32,
    pub conducted: u32,
    pub missed: u32,
    pub percentage: u8,
    pub band: RiskBand,
    /// Projected lectures for the semester, when the subject has credits.
    pub semester_total: Option<u32>,
}

/// Metrics across every subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallMetrics {
    pub attended: u32,
    pub conducted: u32,
    pub missed: u32,
    pub percentage: u8,
    pub band: RiskBand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub subjects: Vec<SubjectMetrics>,
    pub overall: OverallMetrics,
}

/// Derives metrics from attendance records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAggregator {
    thresholds: RiskThresholds,
}

impl MetricsAggregator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> RiskThresholds {
        self.thresholds
    }

    /// Count one subject's records.
    pub fn aggregate<'a>(&self, records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Tally {
        let mut tally = Tally::default();
        for record in records {
            tally.record(record.status);
        }
        tally
    }

    /// Thresholds in force for `subject`. A per-subject requirement replaces
    /// the configured detention threshold.
    pub fn thresholds_for(&self, subject: &Subject) -> RiskThresholds {
        match subject.required_percentage {
            Some(required) => self.thresholds.with_low(required),
            None => self.thresholds,
        }
    }

    pub fn subject_metrics(&self, subject: &Subject, tally: Tally) -> SubjectMetrics {
        let pct = tally.percentage();
        SubjectMetrics {
            subject_id: subject.id.clone(),
            name: subject.name.clone(),
            attended: tally.attended,
            conducted: tally.conducted,
            missed: tally.missed(),
            percentage: pct,
            band: self.thresholds_for(subject).classify(pct),
            semester_total: subject.credits.map(|c| c.saturating_mul(LECTURES_PER_CREDIT)),
        }
    }

    /// Build a report from raw records. Records for subjects not in
    /// `subjects` are ignored.
    pub fn report(&self, subjects: &[Subject], records: &[AttendanceRecord]) -> MetricsReport {
        let mut by_subject: HashMap<&str, Vec<&AttendanceRecord>> = HashMap::new();
        for record in records {
            by_subject
                .entry(record.subject_id.as_str())
                .or_default()
                .push(record);
        }

        let tallies: HashMap<String, Tally> = subjects
            .iter()
            .map(|s| {
                let tally = by_subject
                    .get(s.id.as_str())
                    .map(|rs| self.aggregate(rs.iter().copied()))
                    .unwrap_or_default();
                (s.id.clone(), tally)
            })
            .collect();

        self.report_from_tallies(subjects, &tallies)
    }

    /// Build a report from precomputed tallies. Subjects without a tally
    /// report 0/0.
    pub fn report_from_tallies(
        &self,
        subjects: &[Subject],
        tallies: &HashMap<String, Tally>,
    ) -> MetricsReport {
        let subjects: Vec<SubjectMetrics> = subjects
            .iter()
            .map(|s| {
                let tally = tallies.get(&s.id).copied().unwrap_or_default();
                self.subject_metrics(s, tally)
            })
            .collect();

        // Sum first, then one percentage; never an average of percentages.
        let Tally {
            attended,
            conducted,
        } = subjects
            .iter()
            .map(|m| Tally::new(m.attended, m.conducted))
            .sum();
        let pct = percentage(attended, conducted);

        MetricsReport {
            subjects,
            overall: OverallMetrics {
                attended,
                conducted,
                missed: conducted.saturating_sub(attended),
                percentage: pct,
                band: self.thresholds.classify(pct),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AttendanceStatus, TripleKey};
    use chrono::{NaiveDate, Utc};

    fn subject(id: &str, name: &str) -> Subject {
        Subject {
            id: id.into(),
            user_id: "u1".into(),
            name: name.into(),
            required_percentage: None,
            credits: None,
            created_at: Utc::now(),
        }
    }

    fn records(subject_id: &str, attended: u32, conducted: u32) -> Vec<AttendanceRecord> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        (0..conducted)
            .map(|i| {
                let status = if i < attended {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                };
                let date = start + chrono::Days::new(u64::from(i));
                AttendanceRecord::new("u1", TripleKey::new(subject_id, date, "9:00 AM"), status)
            })
            .collect()
    }

    #[test]
    fn aggregate_counts_statuses() {
        let agg = MetricsAggregator::default();
        let tally = agg.aggregate(&records("s1", 18, 22));
        assert_eq!(tally, Tally::new(18, 22));
        assert_eq!(tally.missed(), 4);
    }

    #[test]
    fn overall_is_computed_from_sums() {
        let agg = MetricsAggregator::default();
        let subjects = vec![subject("s1", "Economics"), subject("s2", "Statistics")];
        let mut all = records("s1", 1, 1);
        all.extend(records("s2", 1, 3));

        let report = agg.report(&subjects, &all);
        assert_eq!(report.subjects[0].percentage, 100);
        assert_eq!(report.subjects[1].percentage, 33);
        // (100 + 33) / 2 would give 67; 2 of 4 gives 50.
        assert_eq!(report.overall.percentage, 50);
        assert_eq!(report.overall.missed, 2);
        assert_eq!(report.overall.band, RiskBand::Low);
    }

    #[test]
    fn subjects_without_records_report_zero() {
        let agg = MetricsAggregator::default();
        let report = agg.report(&[subject("s1", "Economics")], &[]);
        let m = &report.subjects[0];
        assert_eq!((m.attended, m.conducted, m.percentage), (0, 0, 0));
        assert_eq!(report.overall.conducted, 0);
    }

    #[test]
    fn required_percentage_overrides_low() {
        let agg = MetricsAggregator::new(RiskThresholds::new(75, 85).unwrap());
        let mut strict = subject("s1", "Economics");
        strict.required_percentage = Some(80);

        let metrics = agg.subject_metrics(&strict, Tally::new(15, 20));
        assert_eq!(metrics.percentage, 75);
        assert_eq!(metrics.band, RiskBand::Low);

        let metrics = agg.subject_metrics(&subject("s2", "Statistics"), Tally::new(15, 20));
        assert_eq!(metrics.band, RiskBand::Warning);
    }

    #[test]
    fn semester_total_follows_credits() {
        let agg = MetricsAggregator::default();
        let mut s = subject("s1", "Economics");
        s.credits = Some(3);
        assert_eq!(agg.subject_metrics(&s, Tally::default()).semester_total, Some(45));
    }
}
