//! Nearest-profile pattern classification
//!
//! Each archetype is an idealized point in normalized feature space. A student
//! is assigned the archetype whose profile is closest in Euclidean distance.
//!
//! Ties are resolved by profile table order: the classifier only replaces its
//! current best on a strictly smaller distance, so with the default table an
//! exact tie goes to Visual Learner, then Analytical Thinker, Kinesthetic
//! Learner, Social Collaborator, Mixed Learner.

use crate::error::AnalysisError;
use crate::types::{Archetype, ClassifiedStudent, FeatureVector, StudentMetrics};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An archetype's idealized normalized feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub archetype: Archetype,
    pub vector: FeatureVector,
}

impl ArchetypeProfile {
    /// Profile for an archetype from its five feature values
    pub const fn new(archetype: Archetype, values: [f64; 5]) -> Self {
        Self {
            archetype,
            vector: FeatureVector::new(values),
        }
    }
}

/// Fixed archetype profiles over
/// `[accuracy, avg_response_time, retry_rate, mistake_freq, retention]`,
/// in tie-break priority order.
pub const ARCHETYPE_PROFILES: [ArchetypeProfile; 5] = [
    // High retention, medium accuracy and speed
    ArchetypeProfile::new(Archetype::VisualLearner, [0.6, 0.5, 0.4, 0.4, 0.9]),
    // High accuracy, slow and methodical, rarely retries
    ArchetypeProfile::new(Archetype::AnalyticalThinker, [0.9, 0.8, 0.2, 0.1, 0.8]),
    // Fast, retries a lot
    ArchetypeProfile::new(Archetype::KinestheticLearner, [0.5, 0.2, 0.9, 0.5, 0.6]),
    // Consistent with high retention
    ArchetypeProfile::new(Archetype::SocialCollaborator, [0.7, 0.6, 0.6, 0.3, 0.8]),
    // Balanced
    ArchetypeProfile::new(Archetype::MixedLearner, [0.5, 0.5, 0.5, 0.5, 0.5]),
];

/// Result of classifying one normalized vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub pattern: Archetype,
    /// Distance to the assigned profile
    pub distance: f64,
    /// Distance to every profile, in table order
    pub distances: Vec<(Archetype, f64)>,
}

/// Stateless nearest-profile classifier over an immutable profile table
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    profiles: Vec<ArchetypeProfile>,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self {
            profiles: ARCHETYPE_PROFILES.to_vec(),
        }
    }
}

impl PatternClassifier {
    /// Build a classifier over a custom profile table.
    ///
    /// Table order is the tie-break order.
    pub fn with_profiles(profiles: Vec<ArchetypeProfile>) -> Result<Self, AnalysisError> {
        if profiles.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "profile table must not be empty".to_string(),
            ));
        }
        if let Some(bad) = profiles
            .iter()
            .find(|p| p.vector.values().iter().any(|v| !(0.0..=1.0).contains(v)))
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "profile '{}' has components outside [0, 1]",
                bad.archetype
            )));
        }
        Ok(Self { profiles })
    }

    /// Profile table in tie-break order
    pub fn profiles(&self) -> &[ArchetypeProfile] {
        &self.profiles
    }

    /// Classify a normalized feature vector
    pub fn classify(&self, normalized: &FeatureVector) -> Classification {
        let distances: Vec<(Archetype, f64)> = self
            .profiles
            .iter()
            .map(|p| (p.archetype, normalized.distance(&p.vector)))
            .collect();

        // Non-empty by construction
        let (pattern, distance) = distances
            .iter()
            .skip(1)
            .fold(distances[0], |best, &candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            });

        Classification {
            pattern,
            distance,
            distances,
        }
    }

    /// Classify every student, pairing metrics with their normalized vectors
    pub fn classify_all(
        &self,
        metrics: Vec<StudentMetrics>,
        normalized: &[FeatureVector],
    ) -> Vec<ClassifiedStudent> {
        debug_assert_eq!(metrics.len(), normalized.len());

        let classified: Vec<ClassifiedStudent> = metrics
            .into_iter()
            .zip(normalized.iter())
            .map(|(metrics, vector)| {
                let classification = self.classify(vector);
                ClassifiedStudent {
                    metrics,
                    pattern: classification.pattern,
                    normalized: *vector,
                    distance: classification.distance,
                }
            })
            .collect();

        debug!(students = classified.len(), "classified cohort");
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_vectors_classify_as_themselves() {
        let classifier = PatternClassifier::default();
        for profile in ARCHETYPE_PROFILES {
            let result = classifier.classify(&profile.vector);
            assert_eq!(result.pattern, profile.archetype);
            assert_eq!(result.distance, 0.0);
        }
    }

    #[test]
    fn test_nearest_profile_wins() {
        let classifier = PatternClassifier::default();
        // Fast, heavy retrier
        let vector = FeatureVector::new([0.4, 0.1, 1.0, 0.6, 0.5]);
        assert_eq!(
            classifier.classify(&vector).pattern,
            Archetype::KinestheticLearner
        );

        // Accurate and slow
        let vector = FeatureVector::new([1.0, 0.9, 0.1, 0.0, 0.9]);
        assert_eq!(
            classifier.classify(&vector).pattern,
            Archetype::AnalyticalThinker
        );
    }

    #[test]
    fn test_distances_cover_every_profile_in_order() {
        let classifier = PatternClassifier::default();
        let result = classifier.classify(&FeatureVector::default());
        let order: Vec<Archetype> = result.distances.iter().map(|(a, _)| *a).collect();
        assert_eq!(order, Archetype::ALL.to_vec());

        let min = result
            .distances
            .iter()
            .map(|(_, d)| *d)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(result.distance, min);
    }

    #[test]
    fn test_exact_tie_resolves_to_earlier_profile() {
        let a = ArchetypeProfile::new(Archetype::SocialCollaborator, [0.0, 0.0, 0.0, 0.0, 0.0]);
        let b = ArchetypeProfile::new(Archetype::VisualLearner, [1.0, 0.0, 0.0, 0.0, 0.0]);
        let midpoint = FeatureVector::new([0.5, 0.0, 0.0, 0.0, 0.0]);

        let forward = PatternClassifier::with_profiles(vec![a, b]).unwrap();
        assert_eq!(
            forward.classify(&midpoint).pattern,
            Archetype::SocialCollaborator
        );

        let reversed = PatternClassifier::with_profiles(vec![b, a]).unwrap();
        assert_eq!(reversed.classify(&midpoint).pattern, Archetype::VisualLearner);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = PatternClassifier::default();
        let vector = FeatureVector::new([0.33, 0.71, 0.12, 0.67, 0.45]);
        let first = classifier.classify(&vector);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&vector), first);
        }
    }

    #[test]
    fn test_every_vector_gets_a_known_label() {
        let classifier = PatternClassifier::default();
        let steps = [0.0, 0.25, 0.5, 0.75, 1.0];
        for &a in &steps {
            for &b in &steps {
                for &c in &steps {
                    let vector = FeatureVector::new([a, b, c, 1.0 - a, b]);
                    let result = classifier.classify(&vector);
                    assert!(Archetype::ALL.contains(&result.pattern));
                }
            }
        }
    }

    #[test]
    fn test_rejects_invalid_profile_tables() {
        assert!(PatternClassifier::with_profiles(vec![]).is_err());
        let bad = ArchetypeProfile::new(Archetype::MixedLearner, [1.5, 0.5, 0.5, 0.5, 0.5]);
        assert!(PatternClassifier::with_profiles(vec![bad]).is_err());
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let metrics: Vec<StudentMetrics> = ["a", "b"]
            .iter()
            .map(|id| StudentMetrics {
                student_id: id.to_string(),
                name: id.to_string(),
                grade: 7,
                accuracy: 0.7,
                avg_response_time: 30.0,
                retry_rate: 0.2,
                mistake_freq: 0.3,
                sessions_completed: 10,
                retention: 0.5,
                interactions: 10,
            })
            .collect();
        let vectors = vec![
            ARCHETYPE_PROFILES[1].vector,
            ARCHETYPE_PROFILES[2].vector,
        ];

        let classified = PatternClassifier::default().classify_all(metrics, &vectors);
        assert_eq!(classified[0].metrics.student_id, "a");
        assert_eq!(classified[0].pattern, Archetype::AnalyticalThinker);
        assert_eq!(classified[1].pattern, Archetype::KinestheticLearner);
        assert_eq!(classified[1].normalized, vectors[1]);
    }
}
