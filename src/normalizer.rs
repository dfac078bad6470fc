//! Population normalization
//!
//! Min-max scales each feature across the current cohort so that every
//! component of the resulting vector lies in `[0, 1]`. The fitted ranges are
//! cohort-relative and must be refitted for every analysis run.

use crate::error::AnalysisError;
use crate::types::{Feature, FeatureVector, StudentMetrics, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Observed range of one feature across the cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub feature: Feature,
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    /// Scale a value into `[0, 1]`. Zero-variance ranges map everything to 0.
    pub fn scale(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    /// True when every student shares the same value
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

/// Per-feature min-max scaler fitted to one cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    ranges: [FeatureRange; FEATURE_COUNT],
}

impl FeatureScaler {
    /// Fit ranges to a cohort's metrics
    pub fn fit(metrics: &[StudentMetrics]) -> Result<Self, AnalysisError> {
        if metrics.is_empty() {
            return Err(AnalysisError::EmptyInput(
                "cannot normalize an empty cohort".to_string(),
            ));
        }

        let ranges = Feature::ALL.map(|feature| {
            let (min, max) = metrics.iter().map(|m| m.feature(feature)).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), v| (lo.min(v), hi.max(v)),
            );
            FeatureRange { feature, min, max }
        });

        for range in ranges.iter().filter(|r| r.is_degenerate()) {
            debug!(feature = %range.feature, value = range.min, "zero-variance feature, normalizing to 0");
        }

        Ok(Self { ranges })
    }

    /// Normalize one student's metrics against the fitted ranges
    pub fn transform(&self, metrics: &StudentMetrics) -> FeatureVector {
        FeatureVector(self.ranges.map(|range| range.scale(metrics.feature(range.feature))))
    }

    /// Fitted range for one feature
    pub fn range(&self, feature: Feature) -> &FeatureRange {
        &self.ranges[feature.index()]
    }

    /// Fitted ranges in feature order
    pub fn ranges(&self) -> &[FeatureRange; FEATURE_COUNT] {
        &self.ranges
    }
}

/// Fit a scaler to the cohort and normalize every student, preserving order
pub fn normalize_cohort(
    metrics: &[StudentMetrics],
) -> Result<(FeatureScaler, Vec<FeatureVector>), AnalysisError> {
    let scaler = FeatureScaler::fit(metrics)?;
    let vectors = metrics.iter().map(|m| scaler.transform(m)).collect();
    Ok((scaler, vectors))
}
