use serde::Deserialize;

use crate::domain::preferences::QuestionType;
use crate::domain::quiz_result::{ComparativePerformance, QuizAnalysis};

/// One question exactly as the oracle emitted it, before any rules run.
/// Parsing is strict: a field outside the known shape fails the item, and
/// with it the batch. `id` and `language` are accepted but overwritten
/// during assembly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RawQuestion {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub correct_options: Option<Vec<String>>,
    #[serde(default)]
    pub sequence: Option<Vec<String>>,
    #[serde(default)]
    pub correct_sequence: Option<Vec<String>>,
    #[serde(default)]
    pub case_study: Option<String>,
    #[serde(default)]
    pub situation: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

/// Verdict object for a free-text answer. Lenient on purpose: whatever the
/// oracle omits falls back to the zero value and the caller substitutes
/// default feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluationOutput {
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisOutput {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub comparative_performance: ComparativePerformance,
}

impl From<AnalysisOutput> for QuizAnalysis {
    fn from(output: AnalysisOutput) -> Self {
        Self {
            strengths: output.strengths,
            weaknesses: output.weaknesses,
            recommendations: output.recommendations,
            comparative_performance: output.comparative_performance,
        }
    }
}
