//! Report encoding
//!
//! This module encodes a finished analysis run into a JSON report payload
//! stamped with producer metadata, ready for presentation layers.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::normalizer::FeatureRange;
use crate::pipeline::AnalysisRun;
use crate::summary::{CohortSummary, LearningFunnel, PatternProfile, PatternTrajectory, SessionPoint};
use crate::types::{Archetype, ClassifiedStudent, Feature, RecommendationRow};
use crate::{COGNILEARN_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Per-student metrics and classification, one column per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRow {
    pub student_id: String,
    pub name: String,
    pub grade: u8,
    pub accuracy: f64,
    pub avg_response_time: f64,
    pub retry_rate: f64,
    pub mistake_freq: f64,
    pub sessions_completed: u32,
    pub retention: f64,
    pub pattern: Archetype,
    pub accuracy_norm: f64,
    pub avg_response_time_norm: f64,
    pub retry_rate_norm: f64,
    pub mistake_freq_norm: f64,
    pub retention_norm: f64,
}

impl From<&ClassifiedStudent> for StudentRow {
    fn from(student: &ClassifiedStudent) -> Self {
        let m = &student.metrics;
        let n = &student.normalized;
        Self {
            student_id: m.student_id.clone(),
            name: m.name.clone(),
            grade: m.grade,
            accuracy: m.accuracy,
            avg_response_time: m.avg_response_time,
            retry_rate: m.retry_rate,
            mistake_freq: m.mistake_freq,
            sessions_completed: m.sessions_completed,
            retention: m.retention,
            pattern: student.pattern,
            accuracy_norm: n.get(Feature::Accuracy),
            avg_response_time_norm: n.get(Feature::AvgResponseTime),
            retry_rate_norm: n.get(Feature::RetryRate),
            mistake_freq_norm: n.get(Feature::MistakeFreq),
            retention_norm: n.get(Feature::Retention),
        }
    }
}

/// Complete analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub config: AnalysisConfig,
    pub students: Vec<StudentRow>,
    pub recommendations: Vec<RecommendationRow>,
    pub summary: CohortSummary,
    pub pattern_profiles: Vec<PatternProfile>,
    pub session_trend: Vec<SessionPoint>,
    pub pattern_trajectories: Vec<PatternTrajectory>,
    pub learning_funnel: LearningFunnel,
    pub feature_ranges: Vec<FeatureRange>,
}

/// Report encoder for producing JSON payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Instance ID stamped into every report's producer block
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Encode an analysis run into a report
    pub fn encode(&self, run: &AnalysisRun, config: &AnalysisConfig) -> AnalysisReport {
        AnalysisReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: COGNILEARN_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            students: run.students.iter().map(StudentRow::from).collect(),
            recommendations: run.recommendations.clone(),
            summary: run.summary.clone(),
            pattern_profiles: run.pattern_profiles.clone(),
            session_trend: run.session_trend.clone(),
            pattern_trajectories: run.pattern_trajectories.clone(),
            learning_funnel: run.learning_funnel.clone(),
            feature_ranges: run.scaler.ranges().to_vec(),
        }
    }

    /// Encode an analysis run to a JSON string
    pub fn encode_to_json(
        &self,
        run: &AnalysisRun,
        config: &AnalysisConfig,
    ) -> Result<String, AnalysisError> {
        let report = self.encode(run, config);
        serde_json::to_string(&report).map_err(|e| AnalysisError::EncodingError(e.to_string()))
    }

    /// Encode an analysis run to a pretty-printed JSON string
    pub fn encode_to_json_pretty(
        &self,
        run: &AnalysisRun,
        config: &AnalysisConfig,
    ) -> Result<String, AnalysisError> {
        let report = self.encode(run, config);
        serde_json::to_string_pretty(&report)
            .map_err(|e| AnalysisError::EncodingError(e.to_string()))
    }
}
