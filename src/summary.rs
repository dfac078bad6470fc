//! Cohort summary statistics
//!
//! Aggregates consumed by reports: headline KPIs, per-pattern mean profiles,
//! score trends by session, the learning funnel, and per-student drill-downs.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::{Archetype, ClassifiedStudent, FeatureVector, InteractionRecord, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Student with the highest overall accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformer {
    pub student_id: String,
    pub name: String,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: Archetype,
    pub count: usize,
}

/// Headline statistics for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub students_analyzed: usize,
    /// Distinct sessions × distinct students in the log
    pub total_sessions: usize,
    pub mean_accuracy: f64,
    pub mean_response_time: f64,
    pub mean_retention: f64,
    pub modal_pattern: Archetype,
    pub at_risk_count: usize,
    pub top_performer: TopPerformer,
    /// Mean late-window score minus mean early-window score, averaged over students
    pub mean_improvement: Option<f64>,
    /// Student count per archetype, in archetype order
    pub pattern_distribution: Vec<PatternCount>,
}

/// Mean normalized profile of the students assigned to one pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternProfile {
    pub pattern: Archetype,
    pub students: usize,
    pub mean_normalized: FeatureVector,
}

/// Aggregates for one session number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPoint {
    pub session: u32,
    pub mean_score: f64,
    pub mean_response_time: f64,
    pub interactions: usize,
}

/// Score trend for the students of one pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternTrajectory {
    pub pattern: Archetype,
    pub sessions: Vec<SessionPoint>,
}

/// Student counts by learning stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningFunnel {
    pub enrolled: usize,
    pub active: usize,
    pub progressing: usize,
    pub proficient: usize,
    pub mastery: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMistakes {
    pub subject: String,
    pub count: usize,
}

/// Per-student drill-down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub student_id: String,
    pub sessions: Vec<SessionPoint>,
    /// Incorrect answers by subject, most frequent first
    pub mistakes_by_subject: Vec<SubjectMistakes>,
}

/// Compute headline statistics over classified students and their log
pub fn summarize(
    students: &[ClassifiedStudent],
    log: &[InteractionRecord],
    config: &AnalysisConfig,
) -> Result<CohortSummary, AnalysisError> {
    let first = students
        .first()
        .ok_or_else(|| AnalysisError::EmptyInput("no classified students to summarize".to_string()))?;

    let top = students.iter().skip(1).fold(first, |best, s| {
        if s.metrics.accuracy > best.metrics.accuracy {
            s
        } else {
            best
        }
    });

    let pattern_distribution = pattern_distribution(students);
    // Ties keep the earlier archetype
    let modal_pattern = pattern_distribution
        .iter()
        .skip(1)
        .fold(&pattern_distribution[0], |best, c| {
            if c.count > best.count {
                c
            } else {
                best
            }
        })
        .pattern;

    let distinct_sessions = log.iter().map(|r| r.session).collect::<HashSet<_>>().len();
    let distinct_students = log
        .iter()
        .map(|r| r.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    Ok(CohortSummary {
        students_analyzed: students.len(),
        total_sessions: distinct_sessions * distinct_students,
        mean_accuracy: mean_by(students, |s| s.metrics.accuracy),
        mean_response_time: mean_by(students, |s| s.metrics.avg_response_time),
        mean_retention: mean_by(students, |s| s.metrics.retention),
        modal_pattern,
        at_risk_count: students
            .iter()
            .filter(|s| s.metrics.accuracy < config.critical_accuracy)
            .count(),
        top_performer: TopPerformer {
            student_id: top.metrics.student_id.clone(),
            name: top.metrics.name.clone(),
            accuracy: top.metrics.accuracy,
        },
        mean_improvement: mean_improvement(log, config),
        pattern_distribution,
    })
}

fn mean_by(students: &[ClassifiedStudent], f: impl Fn(&ClassifiedStudent) -> f64) -> f64 {
    students.iter().map(f).sum::<f64>() / students.len() as f64
}

/// Student count per archetype, zero counts included
pub fn pattern_distribution(students: &[ClassifiedStudent]) -> Vec<PatternCount> {
    Archetype::ALL
        .into_iter()
        .map(|pattern| PatternCount {
            pattern,
            count: students.iter().filter(|s| s.pattern == pattern).count(),
        })
        .collect()
}

/// Average per-student improvement between the early and late session windows.
///
/// Students missing either window are left out; `None` if nobody qualifies.
pub fn mean_improvement(log: &[InteractionRecord], config: &AnalysisConfig) -> Option<f64> {
    #[derive(Default)]
    struct Windows {
        early: (f64, usize),
        late: (f64, usize),
    }

    let mut by_student: BTreeMap<&str, Windows> = BTreeMap::new();
    for record in log {
        let score = record.score as f64;
        if record.session <= config.early_session_window {
            let w = by_student.entry(record.student_id.as_str()).or_default();
            w.early.0 += score;
            w.early.1 += 1;
        } else if record.session >= config.late_session_window_start {
            let w = by_student.entry(record.student_id.as_str()).or_default();
            w.late.0 += score;
            w.late.1 += 1;
        }
    }

    let deltas: Vec<f64> = by_student
        .values()
        .filter(|w| w.early.1 > 0 && w.late.1 > 0)
        .map(|w| w.late.0 / w.late.1 as f64 - w.early.0 / w.early.1 as f64)
        .collect();

    if deltas.is_empty() {
        None
    } else {
        Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
    }
}

/// Mean normalized vector per pattern, for patterns with at least one student
pub fn pattern_profiles(students: &[ClassifiedStudent]) -> Vec<PatternProfile> {
    Archetype::ALL
        .into_iter()
        .filter_map(|pattern| {
            let members: Vec<&ClassifiedStudent> =
                students.iter().filter(|s| s.pattern == pattern).collect();
            if members.is_empty() {
                return None;
            }

            let mut sums = [0.0; FEATURE_COUNT];
            for member in &members {
                for (sum, value) in sums.iter_mut().zip(member.normalized.values()) {
                    *sum += value;
                }
            }
            let count = members.len() as f64;

            Some(PatternProfile {
                pattern,
                students: members.len(),
                mean_normalized: FeatureVector(sums.map(|s| s / count)),
            })
        })
        .collect()
}

/// Mean score and response time per session number, ascending
pub fn session_trend<'a>(records: impl IntoIterator<Item = &'a InteractionRecord>) -> Vec<SessionPoint> {
    let mut by_session: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_session.entry(record.session).or_insert((0.0, 0.0, 0));
        entry.0 += record.score as f64;
        entry.1 += record.response_time;
        entry.2 += 1;
    }

    by_session
        .into_iter()
        .map(|(session, (score, rt, count))| SessionPoint {
            session,
            mean_score: score / count as f64,
            mean_response_time: rt / count as f64,
            interactions: count,
        })
        .collect()
}

/// Session trend per pattern, for patterns with at least one student
pub fn pattern_trajectories(
    students: &[ClassifiedStudent],
    log: &[InteractionRecord],
) -> Vec<PatternTrajectory> {
    let pattern_of: HashMap<&str, Archetype> = students
        .iter()
        .map(|s| (s.metrics.student_id.as_str(), s.pattern))
        .collect();

    Archetype::ALL
        .into_iter()
        .filter_map(|pattern| {
            let records = log
                .iter()
                .filter(|r| pattern_of.get(r.student_id.as_str()) == Some(&pattern));
            let sessions = session_trend(records);
            if sessions.is_empty() {
                None
            } else {
                Some(PatternTrajectory { pattern, sessions })
            }
        })
        .collect()
}

/// Count students at each learning stage
pub fn learning_funnel(
    enrolled: usize,
    students: &[ClassifiedStudent],
    config: &AnalysisConfig,
) -> LearningFunnel {
    let at_risk = students
        .iter()
        .filter(|s| s.metrics.accuracy < config.critical_accuracy)
        .count();

    LearningFunnel {
        enrolled,
        active: students.len(),
        progressing: enrolled.saturating_sub(at_risk),
        proficient: students
            .iter()
            .filter(|s| s.metrics.accuracy > config.proficient_accuracy)
            .count(),
        mastery: students
            .iter()
            .filter(|s| s.metrics.accuracy > config.mastery_accuracy)
            .count(),
    }
}

/// Session trend and mistake breakdown for one student, `None` without records
pub fn student_detail(student_id: &str, log: &[InteractionRecord]) -> Option<StudentDetail> {
    let records: Vec<&InteractionRecord> =
        log.iter().filter(|r| r.student_id == student_id).collect();
    if records.is_empty() {
        return None;
    }

    let mut mistakes: HashMap<&str, usize> = HashMap::new();
    for record in records.iter().filter(|r| !r.correct) {
        *mistakes.entry(record.subject.as_str()).or_insert(0) += 1;
    }
    let mut mistakes_by_subject: Vec<SubjectMistakes> = mistakes
        .into_iter()
        .map(|(subject, count)| SubjectMistakes {
            subject: subject.to_string(),
            count,
        })
        .collect();
    mistakes_by_subject.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.subject.cmp(&b.subject)));

    Some(StudentDetail {
        student_id: student_id.to_string(),
        sessions: session_trend(records),
        mistakes_by_subject,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentMetrics;
    use pretty_assertions::assert_eq;

    fn classified(id: &str, pattern: Archetype, accuracy: f64, normalized: [f64; 5]) -> ClassifiedStudent {
        ClassifiedStudent {
            metrics: StudentMetrics {
                student_id: id.to_string(),
                name: format!("name-{}", id),
                grade: 10,
                accuracy,
                avg_response_time: 20.0 + accuracy * 10.0,
                retry_rate: 0.2,
                mistake_freq: 1.0 - accuracy,
                sessions_completed: 20,
                retention: 0.5,
                interactions: 10,
            },
            pattern,
            normalized: FeatureVector(normalized),
            distance: 0.1,
        }
    }

    fn cohort() -> Vec<ClassifiedStudent> {
        vec![
            classified("a", Archetype::VisualLearner, 0.55, [0.0, 0.2, 0.4, 1.0, 0.6]),
            classified("b", Archetype::AnalyticalThinker, 0.95, [1.0, 0.8, 0.0, 0.0, 1.0]),
            classified("c", Archetype::VisualLearner, 0.80, [0.6, 0.4, 0.2, 0.4, 0.8]),
            classified("d", Archetype::MixedLearner, 0.95, [1.0, 0.5, 0.5, 0.0, 0.5]),
        ]
    }

    fn log() -> Vec<InteractionRecord> {
        vec![
            InteractionRecord::new("a", 1, "Algebra", 40.0, false, false), // 0
            InteractionRecord::new("a", 2, "Algebra", 30.0, false, true),  // 5
            InteractionRecord::new("a", 19, "Logic", 20.0, true, false),   // 10
            InteractionRecord::new("b", 3, "Logic", 50.0, true, false),    // 10
            InteractionRecord::new("b", 20, "Logic", 10.0, true, false),   // 10
            InteractionRecord::new("c", 1, "Calculus", 30.0, false, false), // 0, no late window
        ]
    }

    #[test]
    fn test_summary_headline_values() {
        let summary = summarize(&cohort(), &log(), &AnalysisConfig::default()).unwrap();

        assert_eq!(summary.students_analyzed, 4);
        assert!((summary.mean_accuracy - 0.8125).abs() < 1e-9);
        assert_eq!(summary.at_risk_count, 1);
        assert_eq!(summary.modal_pattern, Archetype::VisualLearner);
        // 5 distinct sessions × 3 distinct students
        assert_eq!(summary.total_sessions, 15);
    }

    #[test]
    fn test_top_performer_keeps_first_on_tie() {
        let summary = summarize(&cohort(), &log(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.top_performer.student_id, "b");
        assert_eq!(summary.top_performer.accuracy, 0.95);
    }

    #[test]
    fn test_modal_pattern_tie_uses_archetype_order() {
        let students = vec![
            classified("a", Archetype::MixedLearner, 0.7, [0.5; 5]),
            classified("b", Archetype::KinestheticLearner, 0.7, [0.5; 5]),
        ];
        let summary = summarize(&students, &log(), &AnalysisConfig::default()).unwrap();
        assert_eq!(summary.modal_pattern, Archetype::KinestheticLearner);
    }

    #[test]
    fn test_mean_improvement() {
        // a: late 10 - early 2.5 = 7.5; b: 10 - 10 = 0; c has no late records
        let improvement = mean_improvement(&log(), &AnalysisConfig::default()).unwrap();
        assert!((improvement - 3.75).abs() < 1e-9);
    }

    #[test]
    fn test_mean_improvement_none_without_both_windows() {
        let log = vec![InteractionRecord::new("a", 1, "Algebra", 40.0, true, false)];
        assert_eq!(mean_improvement(&log, &AnalysisConfig::default()), None);
    }

    #[test]
    fn test_pattern_distribution_lists_every_archetype() {
        let distribution = pattern_distribution(&cohort());
        let counts: Vec<usize> = distribution.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![2, 1, 0, 0, 1]);
    }

    #[test]
    fn test_pattern_profiles_average_members() {
        let profiles = pattern_profiles(&cohort());
        assert_eq!(profiles.len(), 3);

        let visual = &profiles[0];
        assert_eq!(visual.pattern, Archetype::VisualLearner);
        assert_eq!(visual.students, 2);
        let expected = [0.3, 0.3, 0.3, 0.7, 0.7];
        for (actual, expected) in visual.mean_normalized.values().iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_session_trend_is_sorted_and_averaged() {
        let trend = session_trend(&log());
        let sessions: Vec<u32> = trend.iter().map(|p| p.session).collect();
        assert_eq!(sessions, vec![1, 2, 3, 19, 20]);

        let first = &trend[0];
        assert_eq!(first.interactions, 2);
        assert_eq!(first.mean_score, 0.0);
        assert!((first.mean_response_time - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_trajectories() {
        let trajectories = pattern_trajectories(&cohort(), &log());
        // d (Mixed Learner) has no records
        let patterns: Vec<Archetype> = trajectories.iter().map(|t| t.pattern).collect();
        assert_eq!(
            patterns,
            vec![Archetype::VisualLearner, Archetype::AnalyticalThinker]
        );
        assert_eq!(trajectories[1].sessions.len(), 2);
    }

    #[test]
    fn test_learning_funnel() {
        let funnel = learning_funnel(5, &cohort(), &AnalysisConfig::default());
        assert_eq!(
            funnel,
            LearningFunnel {
                enrolled: 5,
                active: 4,
                progressing: 4,
                proficient: 3,
                mastery: 2,
            }
        );
    }

    #[test]
    fn test_student_detail() {
        let mut log = log();
        log.push(InteractionRecord::new("a", 2, "Logic", 25.0, false, false));
        let detail = student_detail("a", &log).unwrap();

        assert_eq!(detail.sessions.len(), 3);
        assert_eq!(
            detail.mistakes_by_subject,
            vec![
                SubjectMistakes {
                    subject: "Algebra".to_string(),
                    count: 2
                },
                SubjectMistakes {
                    subject: "Logic".to_string(),
                    count: 1
                },
            ]
        );
        assert!(student_detail("zzz", &log).is_none());
    }

    #[test]
    fn test_summarize_empty_is_an_error() {
        assert!(matches!(
            summarize(&[], &log(), &AnalysisConfig::default()),
            Err(AnalysisError::EmptyInput(_))
        ));
    }
}
