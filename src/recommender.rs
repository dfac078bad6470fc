//! Priority tiers and strategy recommendations
//!
//! Maps each classified student to an intervention priority (from accuracy
//! alone) and picks one strategy from their pattern's ordered strategy list.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{format_percent, Archetype, ClassifiedStudent, Priority, RecommendationRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Number of strategies listed per pattern
pub const STRATEGIES_PER_PATTERN: usize = 4;

/// Ordered strategies for one pattern: foundational first
pub type StrategyList = [String; STRATEGIES_PER_PATTERN];

/// Immutable pattern → strategy list catalog, keyed by pattern label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCatalog {
    strategies: BTreeMap<String, StrategyList>,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        let entries: [(Archetype, [&str; STRATEGIES_PER_PATTERN]); 5] = [
            (
                Archetype::VisualLearner,
                [
                    "Use mind maps for concept connection",
                    "Color-code study materials",
                    "Watch video tutorials before reading",
                    "Draw diagrams for math problems",
                ],
            ),
            (
                Archetype::AnalyticalThinker,
                [
                    "Break down problems into structured steps",
                    "Focus on understanding the 'why' behind formulas",
                    "Review systematic mistakes",
                    "Use logic puzzles for warm-ups",
                ],
            ),
            (
                Archetype::KinestheticLearner,
                [
                    "Use interactive simulations",
                    "Take frequent short breaks (Pomodoro)",
                    "Pace while memorizing facts",
                    "Use hands-on experiments",
                ],
            ),
            (
                Archetype::SocialCollaborator,
                [
                    "Join a peer study group",
                    "Teach concepts to a classmate",
                    "Participate in group discussions",
                    "Use flashcards with a partner",
                ],
            ),
            (
                Archetype::MixedLearner,
                [
                    "Alternate between reading and interactive practice",
                    "Set varied daily study formats",
                    "Combine visual and auditory inputs",
                    "Maintain a balanced study schedule",
                ],
            ),
        ];

        Self {
            strategies: entries
                .into_iter()
                .map(|(archetype, list)| (archetype.label().to_string(), list.map(String::from)))
                .collect(),
        }
    }
}

impl StrategyCatalog {
    /// Build a catalog from explicit entries
    pub fn new(strategies: impl IntoIterator<Item = (String, StrategyList)>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    /// Strategies for a pattern label, if cataloged
    pub fn get(&self, pattern: &str) -> Option<&StrategyList> {
        self.strategies.get(pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StrategyList)> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Accuracy and retry thresholds that drive tiering and strategy choice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityThresholds {
    pub critical_accuracy: f64,
    pub on_track_accuracy: f64,
    pub high_retry_rate: f64,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PriorityThresholds {
    /// Thresholds taken from a config
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            critical_accuracy: config.critical_accuracy,
            on_track_accuracy: config.on_track_accuracy,
            high_retry_rate: config.high_retry_rate,
        }
    }

    /// Tier from accuracy; each threshold value belongs to the tier above it
    pub fn priority(&self, accuracy: f64) -> Priority {
        if accuracy < self.critical_accuracy {
            Priority::Critical
        } else if accuracy < self.on_track_accuracy {
            Priority::Moderate
        } else {
            Priority::OnTrack
        }
    }

    /// Index into the pattern's strategy list
    pub fn strategy_index(&self, accuracy: f64, retry_rate: f64) -> usize {
        if accuracy < self.critical_accuracy {
            0
        } else if retry_rate > self.high_retry_rate {
            1
        } else {
            2
        }
    }
}

/// Produces priority tiers and recommendations for classified students
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    catalog: StrategyCatalog,
    thresholds: PriorityThresholds,
    fallback: Option<String>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(StrategyCatalog::default(), &AnalysisConfig::default())
    }
}

impl RecommendationEngine {
    /// Create an engine over a catalog with thresholds and fallback from a config
    pub fn new(catalog: StrategyCatalog, config: &AnalysisConfig) -> Self {
        Self {
            catalog,
            thresholds: PriorityThresholds::from_config(config),
            fallback: config.fallback_pattern.map(|a| a.label().to_string()),
        }
    }

    /// Injected strategy catalog
    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Active priority thresholds
    pub fn thresholds(&self) -> &PriorityThresholds {
        &self.thresholds
    }

    /// Priority tier for an accuracy value
    pub fn priority(&self, accuracy: f64) -> Priority {
        self.thresholds.priority(accuracy)
    }

    /// Strategy list for a pattern label, falling back when unmapped
    pub fn strategies_for(&self, pattern: &str) -> Result<&StrategyList, AnalysisError> {
        if let Some(list) = self.catalog.get(pattern) {
            return Ok(list);
        }

        let fallback = self
            .fallback
            .as_deref()
            .ok_or_else(|| AnalysisError::UnknownPattern(pattern.to_string()))?;
        warn!(pattern, fallback, "pattern missing from strategy catalog, using fallback");
        self.catalog.get(fallback).ok_or_else(|| {
            AnalysisError::UnknownPattern(format!(
                "{} (fallback '{}' is also missing)",
                pattern, fallback
            ))
        })
    }

    /// Pick a strategy for a pattern label given the student's accuracy and retry rate
    pub fn recommend_for(
        &self,
        pattern: &str,
        accuracy: f64,
        retry_rate: f64,
    ) -> Result<&str, AnalysisError> {
        let strategies = self.strategies_for(pattern)?;
        Ok(strategies[self.thresholds.strategy_index(accuracy, retry_rate)].as_str())
    }

    /// Pick a strategy for a classified student
    pub fn recommend(&self, student: &ClassifiedStudent) -> Result<&str, AnalysisError> {
        self.recommend_for(
            student.pattern.label(),
            student.metrics.accuracy,
            student.metrics.retry_rate,
        )
    }

    /// Build one intervention row
    pub fn row(&self, student: &ClassifiedStudent) -> Result<RecommendationRow, AnalysisError> {
        let metrics = &student.metrics;
        Ok(RecommendationRow {
            student_id: metrics.student_id.clone(),
            student: metrics.name.clone(),
            pattern: student.pattern.label().to_string(),
            accuracy_pct: format_percent(metrics.accuracy),
            retry_rate_pct: format_percent(metrics.retry_rate),
            priority: self.priority(metrics.accuracy),
            top_recommendation: self.recommend(student)?.to_string(),
        })
    }

    /// Build the intervention table sorted Critical → Moderate → On Track.
    ///
    /// The sort is stable, so input order is kept within a tier.
    pub fn recommend_all(
        &self,
        students: &[ClassifiedStudent],
    ) -> Result<Vec<RecommendationRow>, AnalysisError> {
        let mut rows = students
            .iter()
            .map(|s| self.row(s))
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(|r| r.priority);

        debug!(rows = rows.len(), "built recommendation table");
        Ok(rows)
    }
}
