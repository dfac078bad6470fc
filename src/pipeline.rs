//! Analysis pipeline orchestration
//!
//! This module provides the public API for cohort analysis. It runs the full
//! pipeline from roster and interaction log to a report:
//! extraction → normalization → classification → recommendation → summary.
//!
//! Every run refits normalization to its own cohort; nothing is carried over
//! between runs.

use crate::adapter::{InteractionAdapter, LogFormat};
use crate::classifier::PatternClassifier;
use crate::config::AnalysisConfig;
use crate::encoder::{AnalysisReport, ReportEncoder};
use crate::error::AnalysisError;
use crate::extractor::MetricExtractor;
use crate::normalizer::{normalize_cohort, FeatureScaler};
use crate::recommender::{RecommendationEngine, StrategyCatalog};
use crate::summary::{
    self, CohortSummary, LearningFunnel, PatternProfile, PatternTrajectory, SessionPoint,
};
use crate::types::{ClassifiedStudent, InteractionRecord, RecommendationRow, StudentProfile};
use std::collections::HashSet;
use tracing::debug;

/// Everything one analysis run derives from its input
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    /// Classified students, in roster order
    pub students: Vec<ClassifiedStudent>,
    /// Intervention table sorted by priority
    pub recommendations: Vec<RecommendationRow>,
    pub summary: CohortSummary,
    pub pattern_profiles: Vec<PatternProfile>,
    pub session_trend: Vec<SessionPoint>,
    pub pattern_trajectories: Vec<PatternTrajectory>,
    pub learning_funnel: LearningFunnel,
    /// Ranges the cohort was normalized against
    pub scaler: FeatureScaler,
}

impl AnalysisRun {
    /// Look up a classified student by ID
    pub fn student(&self, student_id: &str) -> Option<&ClassifiedStudent> {
        self.students
            .iter()
            .find(|s| s.metrics.student_id == student_id)
    }
}

/// Convert roster and interaction-log JSON to a report JSON (stateless, one-shot).
///
/// # Arguments
/// * `roster_json` - JSON array of `{student_id, name, grade}`
/// * `log_json` - JSON array of interaction records
///
/// # Returns
/// Report JSON payload string
///
/// # Example
/// ```ignore
/// let report_json = cohort_to_report(&roster_json, &log_json)?;
/// ```
pub fn cohort_to_report(roster_json: &str, log_json: &str) -> Result<String, AnalysisError> {
    CohortAnalyzer::new().analyze_json(roster_json, log_json, LogFormat::Json)
}

/// Configured analyzer holding the immutable profile table and strategy catalog.
///
/// The analyzer owns no per-run state, so one instance can serve any number of
/// independent runs.
pub struct CohortAnalyzer {
    config: AnalysisConfig,
    extractor: MetricExtractor,
    classifier: PatternClassifier,
    engine: RecommendationEngine,
    encoder: ReportEncoder,
}

impl Default for CohortAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CohortAnalyzer {
    /// Create an analyzer with the default configuration, profiles and catalog
    pub fn new() -> Self {
        let config = AnalysisConfig::default();
        Self {
            extractor: MetricExtractor::from_config(&config),
            classifier: PatternClassifier::default(),
            engine: RecommendationEngine::new(StrategyCatalog::default(), &config),
            encoder: ReportEncoder::new(),
            config,
        }
    }

    /// Create an analyzer with a validated custom configuration
    pub fn with_config(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            extractor: MetricExtractor::from_config(&config),
            classifier: PatternClassifier::default(),
            engine: RecommendationEngine::new(StrategyCatalog::default(), &config),
            encoder: ReportEncoder::new(),
            config,
        })
    }

    /// Replace the archetype profile table
    pub fn with_classifier(mut self, classifier: PatternClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the strategy catalog
    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.engine = RecommendationEngine::new(catalog, &self.config);
        self
    }

    /// Replace the report encoder
    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Classifier and its profile table
    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    /// Recommendation engine and its strategy catalog
    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Run the full pipeline over a roster and its interaction log
    pub fn analyze(
        &self,
        roster: &[StudentProfile],
        log: &[InteractionRecord],
    ) -> Result<AnalysisRun, AnalysisError> {
        InteractionAdapter::validate_roster(roster)?;

        // Stage 1: Aggregate metrics per student
        let metrics = self.extractor.extract(roster, log)?;

        // Stage 2: Normalize across the cohort
        let (scaler, normalized) = normalize_cohort(&metrics)?;

        // Stage 3: Classify against archetype profiles
        let students = self.classifier.classify_all(metrics, &normalized);

        // Stage 4: Prioritize and recommend
        let recommendations = self.engine.recommend_all(&students)?;

        // Stage 5: Summarize over the analyzed students' records only
        let analyzed: HashSet<&str> = students
            .iter()
            .map(|s| s.metrics.student_id.as_str())
            .collect();
        let analyzed_log: Vec<InteractionRecord> = log
            .iter()
            .filter(|r| analyzed.contains(r.student_id.as_str()))
            .cloned()
            .collect();

        let cohort_summary = summary::summarize(&students, &analyzed_log, &self.config)?;
        let pattern_profiles = summary::pattern_profiles(&students);
        let session_trend = summary::session_trend(&analyzed_log);
        let pattern_trajectories = summary::pattern_trajectories(&students, &analyzed_log);
        let learning_funnel = summary::learning_funnel(roster.len(), &students, &self.config);

        debug!(
            students = students.len(),
            at_risk = cohort_summary.at_risk_count,
            modal_pattern = %cohort_summary.modal_pattern,
            "analysis run complete"
        );

        Ok(AnalysisRun {
            students,
            recommendations,
            summary: cohort_summary,
            pattern_profiles,
            session_trend,
            pattern_trajectories,
            learning_funnel,
            scaler,
        })
    }

    /// Build the report for a finished run
    pub fn report(&self, run: &AnalysisRun) -> AnalysisReport {
        self.encoder.encode(run, &self.config)
    }

    /// Parse roster and log JSON, run the pipeline and return report JSON
    pub fn analyze_json(
        &self,
        roster_json: &str,
        log_input: &str,
        format: LogFormat,
    ) -> Result<String, AnalysisError> {
        // Stage 0: Parse and validate input
        let roster = InteractionAdapter::parse_roster(roster_json)?;
        let log = InteractionAdapter::parse_log(log_input, format)?;

        let run = self.analyze(&roster, &log)?;
        self.encoder.encode_to_json(&run, &self.config)
    }
}
