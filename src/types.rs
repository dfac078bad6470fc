//! Core data types
//!
//! This module defines the records that enter the pipeline and the derived
//! values that flow between its stages: interaction records → student metrics
//! → normalized feature vectors → classified students → recommendation rows.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Points awarded for a correct answer
pub const CORRECT_SCORE: u32 = 10;

/// Points awarded for an incorrect answer that was retried
pub const RETRIED_SCORE: u32 = 5;

/// Number of features in a student feature vector
pub const FEATURE_COUNT: usize = 5;

/// Derive the per-question score from its outcome.
///
/// Correct answers earn 10, retried misses earn 5, abandoned misses earn 0.
pub fn derive_score(correct: bool, retried: bool) -> u32 {
    if correct {
        CORRECT_SCORE
    } else if retried {
        RETRIED_SCORE
    } else {
        0
    }
}

/// Format a `[0,1]` rate as a percentage with one decimal (`0.853` → `"85.3%"`)
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Student identifier
    pub student_id: String,
    /// Session number (1-based)
    pub session: u32,
    /// Subject of the question
    pub subject: String,
    /// Response time in seconds
    pub response_time: f64,
    /// Whether the answer was correct
    pub correct: bool,
    /// Whether the student retried the question
    pub retried: bool,
    /// Derived score (see [`derive_score`])
    pub score: u32,
}

impl InteractionRecord {
    /// Build a record, deriving its score from the outcome
    pub fn new(
        student_id: impl Into<String>,
        session: u32,
        subject: impl Into<String>,
        response_time: f64,
        correct: bool,
        retried: bool,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            session,
            subject: subject.into(),
            response_time,
            correct,
            retried,
            score: derive_score(correct, retried),
        }
    }
}

/// Static roster entry for a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    pub name: String,
    pub grade: u8,
}

impl StudentProfile {
    /// Build a roster entry
    pub fn new(student_id: impl Into<String>, name: impl Into<String>, grade: u8) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            grade,
        }
    }
}

/// A feature of the student feature vector, in fixed positional order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Accuracy,
    AvgResponseTime,
    RetryRate,
    MistakeFreq,
    Retention,
}

impl Feature {
    /// All features in vector order
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Accuracy,
        Feature::AvgResponseTime,
        Feature::RetryRate,
        Feature::MistakeFreq,
        Feature::Retention,
    ];

    /// Position of this feature inside a [`FeatureVector`]
    pub fn index(self) -> usize {
        match self {
            Feature::Accuracy => 0,
            Feature::AvgResponseTime => 1,
            Feature::RetryRate => 2,
            Feature::MistakeFreq => 3,
            Feature::Retention => 4,
        }
    }

    /// Snake-case feature name used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Accuracy => "accuracy",
            Feature::AvgResponseTime => "avg_response_time",
            Feature::RetryRate => "retry_rate",
            Feature::MistakeFreq => "mistake_freq",
            Feature::Retention => "retention",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 5-dimensional vector over [`Feature::ALL`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Wrap raw values given in feature order
    pub const fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Value of one feature
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    /// All values in feature order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Euclidean distance to another vector
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Aggregated behavior metrics for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentMetrics {
    pub student_id: String,
    pub name: String,
    pub grade: u8,
    /// Mean correctness (0-1)
    pub accuracy: f64,
    /// Mean response time in seconds
    pub avg_response_time: f64,
    /// Mean retried flag (0-1)
    pub retry_rate: f64,
    /// Always `1 - accuracy`
    pub mistake_freq: f64,
    /// Distinct session numbers seen
    pub sessions_completed: u32,
    /// Late-session accuracy (0-1)
    pub retention: f64,
    /// Number of interaction records aggregated
    pub interactions: usize,
}

impl StudentMetrics {
    /// Raw value of one feature
    pub fn feature(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Accuracy => self.accuracy,
            Feature::AvgResponseTime => self.avg_response_time,
            Feature::RetryRate => self.retry_rate,
            Feature::MistakeFreq => self.mistake_freq,
            Feature::Retention => self.retention,
        }
    }

    /// Raw (unnormalized) feature vector
    pub fn features(&self) -> FeatureVector {
        FeatureVector(Feature::ALL.map(|f| self.feature(f)))
    }
}

/// Learner archetype.
///
/// Declaration order is the tie-break priority: when a student is equidistant
/// from several profiles, the earliest archetype wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Archetype {
    #[serde(rename = "Visual Learner")]
    VisualLearner,
    #[serde(rename = "Analytical Thinker")]
    AnalyticalThinker,
    #[serde(rename = "Kinesthetic Learner")]
    KinestheticLearner,
    #[serde(rename = "Social Collaborator")]
    SocialCollaborator,
    #[serde(rename = "Mixed Learner")]
    MixedLearner,
}

impl Archetype {
    /// All archetypes in tie-break priority order
    pub const ALL: [Archetype; 5] = [
        Archetype::VisualLearner,
        Archetype::AnalyticalThinker,
        Archetype::KinestheticLearner,
        Archetype::SocialCollaborator,
        Archetype::MixedLearner,
    ];

    /// Display label, also used as the catalog key
    pub fn label(self) -> &'static str {
        match self {
            Archetype::VisualLearner => "Visual Learner",
            Archetype::AnalyticalThinker => "Analytical Thinker",
            Archetype::KinestheticLearner => "Kinesthetic Learner",
            Archetype::SocialCollaborator => "Social Collaborator",
            Archetype::MixedLearner => "Mixed Learner",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Archetype {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.label() == s.trim())
            .ok_or_else(|| AnalysisError::UnknownPattern(s.to_string()))
    }
}

/// A student's metrics together with their assigned archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedStudent {
    pub metrics: StudentMetrics,
    pub pattern: Archetype,
    /// Population-normalized feature vector used for classification
    pub normalized: FeatureVector,
    /// Distance from `normalized` to the assigned archetype profile
    pub distance: f64,
}

/// Intervention priority tier.
///
/// Ordering is by severity: `Critical < Moderate < OnTrack`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    Critical,
    Moderate,
    #[serde(rename = "On Track")]
    OnTrack,
}

impl Priority {
    /// Display label used in the recommendation table
    pub fn label(self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::Moderate => "Moderate",
            Priority::OnTrack => "On Track",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the intervention table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRow {
    #[serde(rename = "Student ID")]
    pub student_id: String,
    #[serde(rename = "Student")]
    pub student: String,
    #[serde(rename = "Pattern")]
    pub pattern: String,
    #[serde(rename = "Accuracy%")]
    pub accuracy_pct: String,
    #[serde(rename = "Retry Rate%")]
    pub retry_rate_pct: String,
    #[serde(rename = "Priority")]
    pub priority: Priority,
    #[serde(rename = "Top Recommendation")]
    pub top_recommendation: String,
}
