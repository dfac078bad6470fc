//! Metric extraction
//!
//! Aggregates the interaction log into one [`StudentMetrics`] per roster
//! student. Students without any records are skipped.

use crate::config::{AnalysisConfig, DEFAULT_LATE_SESSION_THRESHOLD, DEFAULT_NEUTRAL_RETENTION};
use crate::error::AnalysisError;
use crate::types::{InteractionRecord, StudentMetrics, StudentProfile};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Aggregates interaction records into per-student feature values
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    late_session_threshold: u32,
    neutral_retention: f64,
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LATE_SESSION_THRESHOLD, DEFAULT_NEUTRAL_RETENTION)
    }
}

impl MetricExtractor {
    /// Create an extractor with an explicit late-session threshold and neutral retention
    pub fn new(late_session_threshold: u32, neutral_retention: f64) -> Self {
        Self {
            late_session_threshold,
            neutral_retention,
        }
    }

    /// Create an extractor from the retention settings of a config
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.late_session_threshold, config.neutral_retention)
    }

    /// Extract metrics for every roster student that has at least one record.
    ///
    /// Output follows roster order.
    pub fn extract(
        &self,
        roster: &[StudentProfile],
        log: &[InteractionRecord],
    ) -> Result<Vec<StudentMetrics>, AnalysisError> {
        if roster.is_empty() {
            return Err(AnalysisError::EmptyInput("roster has no students".to_string()));
        }
        if log.is_empty() {
            return Err(AnalysisError::EmptyInput(
                "interaction log has no records".to_string(),
            ));
        }

        let mut by_student: HashMap<&str, Vec<&InteractionRecord>> = HashMap::new();
        for record in log {
            by_student
                .entry(record.student_id.as_str())
                .or_default()
                .push(record);
        }

        let roster_ids: HashSet<&str> = roster.iter().map(|s| s.student_id.as_str()).collect();
        let orphaned: usize = by_student
            .iter()
            .filter(|(id, _)| !roster_ids.contains(*id))
            .map(|(_, records)| records.len())
            .sum();
        if orphaned > 0 {
            warn!(
                records = orphaned,
                "interaction records reference students missing from the roster"
            );
        }

        let metrics: Vec<StudentMetrics> = roster
            .iter()
            .filter_map(|profile| {
                let records = by_student.get(profile.student_id.as_str());
                if records.is_none() {
                    debug!(student_id = %profile.student_id, "no interaction records, skipping");
                }
                records.and_then(|r| self.extract_student(profile, r))
            })
            .collect();

        if metrics.is_empty() {
            return Err(AnalysisError::EmptyInput(
                "no roster student has interaction records".to_string(),
            ));
        }

        debug!(
            students = metrics.len(),
            records = log.len(),
            "extracted student metrics"
        );
        Ok(metrics)
    }

    /// Aggregate one student's records. Returns `None` for an empty slice.
    pub fn extract_student(
        &self,
        profile: &StudentProfile,
        records: &[&InteractionRecord],
    ) -> Option<StudentMetrics> {
        if records.is_empty() {
            return None;
        }

        let accuracy = mean(records.iter().map(|r| indicator(r.correct)));
        let avg_response_time = mean(records.iter().map(|r| r.response_time));
        let retry_rate = mean(records.iter().map(|r| indicator(r.retried)));
        let sessions_completed = records
            .iter()
            .map(|r| r.session)
            .collect::<HashSet<_>>()
            .len() as u32;
        let retention = self.estimate_retention(records);

        Some(StudentMetrics {
            student_id: profile.student_id.clone(),
            name: profile.name.clone(),
            grade: profile.grade,
            accuracy,
            avg_response_time,
            retry_rate,
            mistake_freq: 1.0 - accuracy,
            sessions_completed,
            retention,
            interactions: records.len(),
        })
    }

    /// Accuracy over late sessions, or the neutral value if there are none
    fn estimate_retention(&self, records: &[&InteractionRecord]) -> f64 {
        let late: Vec<f64> = records
            .iter()
            .filter(|r| r.session >= self.late_session_threshold)
            .map(|r| indicator(r.correct))
            .collect();

        if late.is_empty() {
            return self.neutral_retention;
        }
        mean(late.into_iter())
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Mean of a non-empty sequence
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<StudentProfile> {
        vec![
            StudentProfile::new("STU001", "Emma", 9),
            StudentProfile::new("STU002", "Liam", 10),
            StudentProfile::new("STU003", "Olivia", 11),
        ]
    }

    fn log() -> Vec<InteractionRecord> {
        vec![
            InteractionRecord::new("STU001", 1, "Algebra", 40.0, true, false),
            InteractionRecord::new("STU001", 1, "Logic", 30.0, false, true),
            InteractionRecord::new("STU001", 16, "Algebra", 20.0, true, false),
            InteractionRecord::new("STU001", 20, "Calculus", 10.0, true, true),
            InteractionRecord::new("STU002", 2, "Geometry", 25.0, false, false),
            InteractionRecord::new("STU002", 3, "Geometry", 35.0, true, false),
        ]
    }

    #[test]
    fn test_extracts_means() {
        let metrics = MetricExtractor::default().extract(&roster(), &log()).unwrap();
        let emma = &metrics[0];

        assert_eq!(emma.student_id, "STU001");
        assert!((emma.accuracy - 0.75).abs() < 1e-12);
        assert!((emma.avg_response_time - 25.0).abs() < 1e-12);
        assert!((emma.retry_rate - 0.5).abs() < 1e-12);
        assert_eq!(emma.sessions_completed, 3);
        assert_eq!(emma.interactions, 4);
    }

    #[test]
    fn test_mistake_freq_complements_accuracy() {
        let metrics = MetricExtractor::default().extract(&roster(), &log()).unwrap();
        for m in &metrics {
            assert!((m.mistake_freq + m.accuracy - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_retention_uses_late_sessions() {
        let metrics = MetricExtractor::default().extract(&roster(), &log()).unwrap();
        // Sessions 16 and 20 are both correct
        assert_eq!(metrics[0].retention, 1.0);
    }

    #[test]
    fn test_retention_defaults_to_neutral_without_late_sessions() {
        let metrics = MetricExtractor::default().extract(&roster(), &log()).unwrap();
        assert_eq!(metrics[1].student_id, "STU002");
        assert_eq!(metrics[1].retention, 0.5);
    }

    #[test]
    fn test_retention_threshold_is_inclusive_and_configurable() {
        let extractor = MetricExtractor::new(3, 0.5);
        let metrics = extractor.extract(&roster(), &log()).unwrap();
        // Only the session 3 record (correct) counts for STU002
        assert_eq!(metrics[1].retention, 1.0);
    }

    #[test]
    fn test_students_without_records_are_skipped() {
        let metrics = MetricExtractor::default().extract(&roster(), &log()).unwrap();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().all(|m| m.student_id != "STU003"));
    }

    #[test]
    fn test_empty_log_is_an_error() {
        let result = MetricExtractor::default().extract(&roster(), &[]);
        assert!(matches!(result, Err(AnalysisError::EmptyInput(_))));
    }

    #[test]
    fn test_empty_roster_is_an_error() {
        let result = MetricExtractor::default().extract(&[], &log());
        assert!(matches!(result, Err(AnalysisError::EmptyInput(_))));
    }

    #[test]
    fn test_no_matching_students_is_an_error() {
        let roster = vec![StudentProfile::new("STU999", "Nobody", 6)];
        let result = MetricExtractor::default().extract(&roster, &log());
        assert!(matches!(result, Err(AnalysisError::EmptyInput(_))));
    }

    #[test]
    fn test_extract_student_on_empty_slice() {
        let profile = StudentProfile::new("STU001", "Emma", 9);
        assert!(MetricExtractor::default()
            .extract_student(&profile, &[])
            .is_none());
    }
}
