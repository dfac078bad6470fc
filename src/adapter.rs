//! Roster and interaction-log ingestion
//!
//! Parses the roster (JSON array) and the interaction log (JSON array or NDJSON),
//! validates each record, and converts them to the typed records the pipeline
//! consumes. Malformed records are rejected here so the core can assume
//! complete, well-typed input.

use crate::error::AnalysisError;
use crate::types::{derive_score, InteractionRecord, StudentProfile};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Interaction log encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON array of records
    #[default]
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

/// Interaction log record as it arrives from the data producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInteraction {
    pub student_id: String,
    pub session: u32,
    pub subject: String,
    pub response_time: f64,
    /// Accepts `true`/`false` or `1`/`0`
    #[serde(deserialize_with = "deserialize_flag")]
    pub correct: bool,
    /// Accepts `true`/`false` or `1`/`0`
    #[serde(deserialize_with = "deserialize_flag")]
    pub retried: bool,
    /// Derived from the outcome when absent
    #[serde(default)]
    pub score: Option<u32>,
}

impl RawInteraction {
    /// Check that the record is complete and internally consistent
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.student_id.trim().is_empty() {
            return Err(RecordValidationError::EmptyStudentId);
        }
        if self.subject.trim().is_empty() {
            return Err(RecordValidationError::EmptySubject);
        }
        if self.session == 0 {
            return Err(RecordValidationError::InvalidSession(self.session));
        }
        if !self.response_time.is_finite() || self.response_time <= 0.0 {
            return Err(RecordValidationError::InvalidResponseTime(
                self.response_time,
            ));
        }

        let expected = derive_score(self.correct, self.retried);
        match self.score {
            Some(actual) if actual != expected => {
                Err(RecordValidationError::ScoreMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn into_record(self) -> InteractionRecord {
        InteractionRecord::new(
            self.student_id,
            self.session,
            self.subject,
            self.response_time,
            self.correct,
            self.retried,
        )
    }
}

/// Validation errors for interaction records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordValidationError {
    #[error("student_id must not be empty")]
    EmptyStudentId,

    #[error("subject must not be empty")]
    EmptySubject,

    #[error("session must be a positive integer, got {0}")]
    InvalidSession(u32),

    #[error("response_time must be a positive number of seconds, got {0}")]
    InvalidResponseTime(f64),

    #[error("score {actual} does not match outcome (expected {expected})")]
    ScoreMismatch { expected: u32, actual: u32 },
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub student_id: String,
    pub error: RecordValidationError,
}

/// Adapter for converting producer JSON into pipeline records
pub struct InteractionAdapter;

impl InteractionAdapter {
    /// Parse and validate a roster JSON array
    pub fn parse_roster(json: &str) -> Result<Vec<StudentProfile>, AnalysisError> {
        let roster: Vec<StudentProfile> = serde_json::from_str(json)?;
        Self::validate_roster(&roster)?;
        Ok(roster)
    }

    /// Reject rosters with empty or duplicate student identifiers
    pub fn validate_roster(roster: &[StudentProfile]) -> Result<(), AnalysisError> {
        let mut seen = HashSet::new();
        for student in roster {
            if student.student_id.trim().is_empty() {
                return Err(AnalysisError::InvalidRoster(format!(
                    "student '{}' has an empty identifier",
                    student.name
                )));
            }
            if !seen.insert(student.student_id.as_str()) {
                return Err(AnalysisError::InvalidRoster(format!(
                    "duplicate student identifier '{}'",
                    student.student_id
                )));
            }
        }
        Ok(())
    }

    /// Parse a JSON string containing an array of raw interactions
    pub fn parse_array(json: &str) -> Result<Vec<RawInteraction>, AnalysisError> {
        let records: Vec<RawInteraction> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing raw interactions
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawInteraction>, AnalysisError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawInteraction>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(AnalysisError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse raw interactions in the given format without validating them
    pub fn parse_raw(input: &str, format: LogFormat) -> Result<Vec<RawInteraction>, AnalysisError> {
        match format {
            LogFormat::Json => Self::parse_array(input),
            LogFormat::Ndjson => Self::parse_ndjson(input),
        }
    }

    /// Parse, validate and convert an interaction log
    pub fn parse_log(input: &str, format: LogFormat) -> Result<Vec<InteractionRecord>, AnalysisError> {
        Self::to_records(Self::parse_raw(input, format)?)
    }

    /// Validate a batch of raw interactions, returning every failure
    pub fn validate_records(records: &[RawInteraction]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index: idx,
                    student_id: record.student_id.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Convert raw interactions to typed records, failing on the first invalid one
    pub fn to_records(raw: Vec<RawInteraction>) -> Result<Vec<InteractionRecord>, AnalysisError> {
        raw.into_iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .validate()
                    .map_err(|e| AnalysisError::InvalidRecord {
                        index,
                        reason: e.to_string(),
                    })?;
                Ok(record.into_record())
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(value) => Ok(value),
        FlagRepr::Int(0) => Ok(false),
        FlagRepr::Int(1) => Ok(true),
        FlagRepr::Int(other) => Err(de::Error::custom(format!(
            "expected boolean or 0/1, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log_json() -> &'static str {
        r#"[
            {"student_id": "STU001", "session": 1, "subject": "Algebra",
             "response_time": 41.2, "correct": 1, "retried": 0, "score": 10},
            {"student_id": "STU001", "session": 2, "subject": "Logic",
             "response_time": 38.0, "correct": false, "retried": true},
            {"student_id": "STU002", "session": 1, "subject": "Geometry",
             "response_time": 29.5, "correct": 0, "retried": 0}
        ]"#
    }

    #[test]
    fn test_parse_array_accepts_int_and_bool_flags() {
        let records = InteractionAdapter::parse_log(sample_log_json(), LogFormat::Json).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].correct);
        assert!(!records[0].retried);
        assert!(records[1].retried);
        assert_eq!(records[1].score, 5);
        assert_eq!(records[2].score, 0);
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"student_id": "STU001", "session": 1, "subject": "Algebra", "response_time": 30.0, "correct": true, "retried": false}

{"student_id": "STU001", "session": 2, "subject": "Algebra", "response_time": 25.0, "correct": false, "retried": false}
"#;
        let records = InteractionAdapter::parse_log(ndjson, LogFormat::Ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].session, 2);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"student_id\": \"STU001\"}\n";
        let err = InteractionAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_rejects_non_binary_flag() {
        let json = r#"[{"student_id": "STU001", "session": 1, "subject": "Algebra",
                        "response_time": 30.0, "correct": 2, "retried": 0}]"#;
        assert!(InteractionAdapter::parse_array(json).is_err());
    }

    #[test]
    fn test_validate_records_collects_all_failures() {
        let json = r#"[
            {"student_id": "", "session": 1, "subject": "Algebra",
             "response_time": 30.0, "correct": 1, "retried": 0},
            {"student_id": "STU001", "session": 0, "subject": "Algebra",
             "response_time": 30.0, "correct": 1, "retried": 0},
            {"student_id": "STU001", "session": 1, "subject": "Algebra",
             "response_time": -2.0, "correct": 1, "retried": 0},
            {"student_id": "STU001", "session": 1, "subject": "Algebra",
             "response_time": 30.0, "correct": 1, "retried": 0, "score": 5},
            {"student_id": "STU001", "session": 1, "subject": "Algebra",
             "response_time": 30.0, "correct": 1, "retried": 0}
        ]"#;
        let raw = InteractionAdapter::parse_array(json).unwrap();
        let failures = InteractionAdapter::validate_records(&raw);

        assert_eq!(failures.len(), 4);
        assert_eq!(failures[0].error, RecordValidationError::EmptyStudentId);
        assert_eq!(failures[1].error, RecordValidationError::InvalidSession(0));
        assert_eq!(failures[2].index, 2);
        assert_eq!(
            failures[3].error,
            RecordValidationError::ScoreMismatch {
                expected: 10,
                actual: 5
            }
        );
    }

    #[test]
    fn test_to_records_fails_on_first_invalid() {
        let json = r#"[
            {"student_id": "STU001", "session": 1, "subject": "Algebra",
             "response_time": 30.0, "correct": 1, "retried": 0},
            {"student_id": "STU001", "session": 1, "subject": "",
             "response_time": 30.0, "correct": 1, "retried": 0}
        ]"#;
        let result = InteractionAdapter::parse_log(json, LogFormat::Json);
        assert!(matches!(
            result,
            Err(AnalysisError::InvalidRecord { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_roster() {
        let json = r#"[
            {"student_id": "STU001", "name": "Emma", "grade": 9},
            {"student_id": "STU002", "name": "Liam", "grade": 11}
        ]"#;
        let roster = InteractionAdapter::parse_roster(json).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[1].name, "Liam");
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let json = r#"[
            {"student_id": "STU001", "name": "Emma", "grade": 9},
            {"student_id": "STU001", "name": "Liam", "grade": 11}
        ]"#;
        assert!(matches!(
            InteractionAdapter::parse_roster(json),
            Err(AnalysisError::InvalidRoster(_))
        ));
    }
}
