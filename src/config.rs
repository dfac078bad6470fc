//! Analysis configuration
//!
//! Thresholds and windows used across the pipeline. Every field has a default,
//! so a partial JSON document only overrides what it names.

use crate::error::AnalysisError;
use crate::types::Archetype;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Sessions at or beyond this number count toward retention
pub const DEFAULT_LATE_SESSION_THRESHOLD: u32 = 15;

/// Retention assigned when a student has no late-session records
pub const DEFAULT_NEUTRAL_RETENTION: f64 = 0.5;

/// Accuracy below this is Critical
pub const DEFAULT_CRITICAL_ACCURACY: f64 = 0.60;

/// Accuracy at or above this is On Track
pub const DEFAULT_ON_TRACK_ACCURACY: f64 = 0.72;

/// Retry rate strictly above this selects the second strategy
pub const DEFAULT_HIGH_RETRY_RATE: f64 = 0.50;

/// Last session of the early improvement window
pub const DEFAULT_EARLY_SESSION_WINDOW: u32 = 3;

/// First session of the late improvement window
pub const DEFAULT_LATE_SESSION_WINDOW_START: u32 = 18;

/// Learning funnel thresholds
pub const DEFAULT_PROFICIENT_ACCURACY: f64 = 0.75;
pub const DEFAULT_MASTERY_ACCURACY: f64 = 0.90;

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub late_session_threshold: u32,
    pub neutral_retention: f64,
    pub critical_accuracy: f64,
    pub on_track_accuracy: f64,
    pub high_retry_rate: f64,
    pub early_session_window: u32,
    pub late_session_window_start: u32,
    pub proficient_accuracy: f64,
    pub mastery_accuracy: f64,
    /// Strategy list used for pattern labels missing from the catalog.
    /// `None` turns unmapped labels into errors.
    pub fallback_pattern: Option<Archetype>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            late_session_threshold: DEFAULT_LATE_SESSION_THRESHOLD,
            neutral_retention: DEFAULT_NEUTRAL_RETENTION,
            critical_accuracy: DEFAULT_CRITICAL_ACCURACY,
            on_track_accuracy: DEFAULT_ON_TRACK_ACCURACY,
            high_retry_rate: DEFAULT_HIGH_RETRY_RATE,
            early_session_window: DEFAULT_EARLY_SESSION_WINDOW,
            late_session_window_start: DEFAULT_LATE_SESSION_WINDOW_START,
            proficient_accuracy: DEFAULT_PROFICIENT_ACCURACY,
            mastery_accuracy: DEFAULT_MASTERY_ACCURACY,
            fallback_pattern: Some(Archetype::MixedLearner),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnalysisError::InvalidConfig(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Check internal consistency of the thresholds
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let rates = [
            ("neutral_retention", self.neutral_retention),
            ("critical_accuracy", self.critical_accuracy),
            ("on_track_accuracy", self.on_track_accuracy),
            ("high_retry_rate", self.high_retry_rate),
            ("proficient_accuracy", self.proficient_accuracy),
            ("mastery_accuracy", self.mastery_accuracy),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.critical_accuracy > self.on_track_accuracy {
            return Err(AnalysisError::InvalidConfig(
                "critical_accuracy must not exceed on_track_accuracy".to_string(),
            ));
        }
        if self.proficient_accuracy > self.mastery_accuracy {
            return Err(AnalysisError::InvalidConfig(
                "proficient_accuracy must not exceed mastery_accuracy".to_string(),
            ));
        }
        if self.late_session_threshold == 0 {
            return Err(AnalysisError::InvalidConfig(
                "late_session_threshold must be at least 1".to_string(),
            ));
        }
        if self.early_session_window >= self.late_session_window_start {
            return Err(AnalysisError::InvalidConfig(
                "early_session_window must end before late_session_window_start".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.late_session_threshold, 15);
        assert_eq!(config.neutral_retention, 0.5);
        assert_eq!(config.fallback_pattern, Some(Archetype::MixedLearner));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json(r#"{"late_session_threshold": 10}"#).unwrap();
        assert_eq!(
            config,
            AnalysisConfig {
                late_session_threshold: 10,
                ..AnalysisConfig::default()
            }
        );
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let config = AnalysisConfig::from_json(r#"{"fallback_pattern": null}"#).unwrap();
        assert_eq!(config.fallback_pattern, None);

        let config =
            AnalysisConfig::from_json(r#"{"fallback_pattern": "Visual Learner"}"#).unwrap();
        assert_eq!(config.fallback_pattern, Some(Archetype::VisualLearner));
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let result = AnalysisConfig::from_json(r#"{"critical_accuracy": 1.5}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_tiers() {
        let result =
            AnalysisConfig::from_json(r#"{"critical_accuracy": 0.8, "on_track_accuracy": 0.7}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_overlapping_improvement_windows() {
        let result = AnalysisConfig::from_json(
            r#"{"early_session_window": 10, "late_session_window_start": 10}"#,
        );
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = AnalysisConfig::from_json("{ not json");
        assert!(matches!(result, Err(AnalysisError::JsonError(_))));
    }
}
