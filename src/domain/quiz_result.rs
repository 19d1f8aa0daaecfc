use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::preferences::{Difficulty, QuestionType, QuizPreferences};

/// How a single question ended for the taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub question_type: QuestionType,
    pub outcome: AnswerOutcome,
    pub time_taken_secs: u32,
}

impl RecordedAnswer {
    pub fn new(question_type: QuestionType, outcome: AnswerOutcome, time_taken_secs: u32) -> Self {
        Self {
            question_type,
            outcome,
            time_taken_secs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePerformance {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparativePerformance {
    #[serde(default)]
    pub overall: String,
    #[serde(default)]
    pub topic_specific: String,
    #[serde(default)]
    pub difficulty_specific: String,
}

/// AI-produced study guidance. Advisory only, so consumers must tolerate the
/// neutral placeholder returned when the oracle is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub comparative_performance: ComparativePerformance,
}

impl QuizAnalysis {
    /// Placeholder used whenever a personalised analysis cannot be produced.
    pub fn neutral() -> Self {
        Self {
            strengths: vec!["Good effort in completing the quiz.".to_string()],
            weaknesses: vec!["Could not generate a personalised analysis.".to_string()],
            recommendations: vec![
                "Review all questions and explanations.".to_string(),
                "Keep practicing to improve.".to_string(),
            ],
            comparative_performance: ComparativePerformance {
                overall: "No comparative data available.".to_string(),
                topic_specific: "No comparative data available.".to_string(),
                difficulty_specific: "No comparative data available.".to_string(),
            },
        }
    }
}

/// Verdict for a free-text answer. Produced by the oracle when reachable and
/// by a local heuristic otherwise, so this is always a value, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAssessment {
    pub is_correct: bool,
    pub score: f64,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Backend row id, present once the result has been stored.
    pub id: Option<String>,
    /// Topic and difficulty the quiz was taken under, kept so historical
    /// results can be compared like-for-like.
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub total_questions: u32,
    pub questions_attempted: u32,
    pub questions_skipped: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    pub raw_score: f64,
    pub percentage: f64,
    pub final_score: f64,
    pub negative_marks_deducted: f64,
    pub accuracy_rate: f64,
    pub completion_rate: f64,
    pub total_time_taken_secs: u32,
    pub question_type_performance: HashMap<String, TypePerformance>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub comparative_performance: Option<ComparativePerformance>,
    pub completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// Aggregates recorded answers into a scored result.
    ///
    /// Negative marking deducts `negative_marks` per incorrect answer when the
    /// preferences enable it. Skipped questions never attract a deduction.
    pub fn from_answers(answers: &[RecordedAnswer], preferences: &QuizPreferences) -> Self {
        let total = answers.len() as u32;
        let mut correct = 0u32;
        let mut incorrect = 0u32;
        let mut skipped = 0u32;
        let mut time_taken = 0u32;
        let mut per_type: HashMap<String, TypePerformance> = HashMap::new();

        for answer in answers {
            time_taken += answer.time_taken_secs;
            let entry = per_type
                .entry(answer.question_type.as_str().to_string())
                .or_default();
            entry.total += 1;
            match answer.outcome {
                AnswerOutcome::Correct => {
                    correct += 1;
                    entry.correct += 1;
                }
                AnswerOutcome::Incorrect => {
                    incorrect += 1;
                    entry.incorrect += 1;
                }
                AnswerOutcome::Skipped => skipped += 1,
            }
        }

        let attempted = correct + incorrect;
        let raw_score = f64::from(correct);
        let deducted = if preferences.negative_marking {
            f64::from(incorrect) * preferences.negative_marks
        } else {
            0.0
        };

        Self {
            id: None,
            topic: preferences.topic.clone(),
            difficulty: Some(preferences.difficulty),
            total_questions: total,
            questions_attempted: attempted,
            questions_skipped: skipped,
            correct_answers: correct,
            incorrect_answers: incorrect,
            raw_score,
            percentage: percent(correct, total),
            final_score: raw_score - deducted,
            negative_marks_deducted: deducted,
            accuracy_rate: percent(correct, attempted),
            completion_rate: percent(attempted, total),
            total_time_taken_secs: time_taken,
            question_type_performance: per_type,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            comparative_performance: None,
            completed_at: Utc::now(),
        }
    }

    pub fn apply_analysis(&mut self, analysis: QuizAnalysis) {
        self.strengths = analysis.strengths;
        self.weaknesses = analysis.weaknesses;
        self.recommendations = analysis.recommendations;
        self.comparative_performance = Some(analysis.comparative_performance);
    }
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}
