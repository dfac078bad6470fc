//! CogniLearn - Cognitive-style classification for learner telemetry
//!
//! CogniLearn turns raw question-level interaction logs into per-student
//! learning archetypes and a prioritized intervention list through a
//! deterministic pipeline: metric extraction → cohort normalization →
//! nearest-profile classification → priority scoring and recommendation.
//!
//! ## Modules
//!
//! - **Ingestion**: roster and interaction-log parsing and validation
//! - **Core pipeline**: extractor, normalizer, classifier, recommender
//! - **Reporting**: cohort summary statistics and the JSON report encoder

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod pipeline;
pub mod recommender;
pub mod summary;
pub mod types;

pub use classifier::{ArchetypeProfile, Classification, PatternClassifier, ARCHETYPE_PROFILES};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use pipeline::{cohort_to_report, AnalysisRun, CohortAnalyzer};
pub use recommender::{RecommendationEngine, StrategyCatalog};
pub use types::{
    Archetype, ClassifiedStudent, Feature, FeatureVector, InteractionRecord, Priority,
    RecommendationRow, StudentMetrics, StudentProfile,
};

/// CogniLearn version embedded in all reports
pub const COGNILEARN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "cognilearn";
