use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::application::session::ApiCredential;
use crate::application::use_cases::generation::llm_output::extract_json_object;
use crate::application::use_cases::generation::prompts::build_evaluation_prompt;
use crate::application::use_cases::generation::types::EvaluationOutput;
use crate::domain::error::{AppError, Result};
use crate::domain::quiz_result::AnswerAssessment;
use crate::infrastructure::llm_clients::{GenerativeClient, OracleRequest};
use crate::infrastructure::response::clean_oracle_text;

const EVALUATION_TEMPERATURE: f64 = 0.1;
const DEFAULT_FEEDBACK: &str = "No feedback available";

/// Grades free-text answers (short-answer and fill-blank kinds). This is an
/// advisory operation: when the oracle cannot be reached or replies with
/// something unusable, the deterministic local heuristic takes over and the
/// caller always receives a verdict.
pub struct EvaluateAnswerUseCase {
    oracle: Arc<dyn GenerativeClient + Send + Sync>,
    credential: Arc<ApiCredential>,
}

impl EvaluateAnswerUseCase {
    pub fn new(
        oracle: Arc<dyn GenerativeClient + Send + Sync>,
        credential: Arc<ApiCredential>,
    ) -> Self {
        Self { oracle, credential }
    }

    pub async fn execute(
        &self,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        keywords: &[String],
        language: &str,
        cancel: &CancellationToken,
    ) -> AnswerAssessment {
        match self
            .remote_assessment(question, user_answer, correct_answer, keywords, language, cancel)
            .await
        {
            Ok(assessment) => assessment,
            Err(error) => {
                warn!(%error, "answer evaluation fell back to the local heuristic");
                local_assessment(user_answer, correct_answer, keywords)
            }
        }
    }

    async fn remote_assessment(
        &self,
        question: &str,
        user_answer: &str,
        correct_answer: &str,
        keywords: &[String],
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<AnswerAssessment> {
        let api_key = self.credential.require()?;
        let prompt =
            build_evaluation_prompt(question, user_answer, correct_answer, keywords, language);

        let request = OracleRequest::new(prompt, api_key, EVALUATION_TEMPERATURE);
        let reply = self.oracle.generate(&request, cancel).await?;
        let text = clean_oracle_text(&reply);

        let span = extract_json_object(&text).ok_or_else(|| {
            AppError::ParseError("No JSON object found in the evaluation reply".to_string())
        })?;
        let output: EvaluationOutput = serde_json::from_str(span)
            .map_err(|e| AppError::ParseError(format!("Malformed evaluation reply: {}", e)))?;

        Ok(AnswerAssessment {
            is_correct: output.is_correct,
            score: output.score.clamp(0.0, 100.0),
            feedback: output
                .feedback
                .filter(|feedback| !feedback.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FEEDBACK.to_string()),
        })
    }
}

/// Case-insensitive exact match scores 100, a keyword hit scores 75 and
/// anything else scores 0.
pub(crate) fn local_assessment(
    user_answer: &str,
    correct_answer: &str,
    keywords: &[String],
) -> AnswerAssessment {
    let user = user_answer.trim().to_lowercase();
    let correct = correct_answer.trim().to_lowercase();
    let exact = user == correct;
    let has_keywords = keywords
        .iter()
        .any(|keyword| user.contains(&keyword.to_lowercase()));

    let (score, feedback) = if exact {
        (
            100.0,
            format!(
                "Your answer \"{}\" matches the expected answer \"{}\".",
                user_answer, correct_answer
            ),
        )
    } else if has_keywords {
        (
            75.0,
            format!(
                "Your answer \"{}\" contains key concepts from the expected answer \"{}\".",
                user_answer, correct_answer
            ),
        )
    } else {
        (
            0.0,
            format!(
                "Your answer \"{}\" does not match the expected answer \"{}\".",
                user_answer, correct_answer
            ),
        )
    };

    AnswerAssessment {
        is_correct: exact || has_keywords,
        score,
        feedback,
    }
}
