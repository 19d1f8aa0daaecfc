pub(crate) mod llm_output;
pub(crate) mod prompts;
pub(crate) mod types;
mod validation;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use validator::Validate;

use crate::application::session::ApiCredential;
use crate::domain::error::{AppError, Result};
use crate::domain::preferences::{QuestionType, QuizPreferences};
use crate::domain::question::Question;
use crate::infrastructure::llm_clients::{GenerativeClient, OracleRequest};
use crate::infrastructure::response::clean_oracle_text;

use llm_output::extract_json_array;
use prompts::PromptSeed;
use types::RawQuestion;

pub const PROMPT_VERSION: &str = "quizgen/v1";

const GENERATION_TEMPERATURE: f64 = 0.0;

/// Provenance of one generated batch, kept alongside the questions so a
/// caller can store or display how the batch was produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReceipt {
    pub session_id: String,
    pub seed: u64,
    pub variety_hint: String,
    pub prompt_version: String,
    pub input_digest: String,
    pub generated_at: DateTime<Utc>,
}

impl GenerationReceipt {
    fn new(seed: &PromptSeed, prompt: &str) -> Self {
        Self {
            session_id: seed.session_id.clone(),
            seed: seed.seed,
            variety_hint: seed.variety_hint.to_string(),
            prompt_version: PROMPT_VERSION.to_string(),
            input_digest: digest_prompt(prompt),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuiz {
    pub questions: Vec<Question>,
    pub receipt: GenerationReceipt,
}

pub struct GenerateQuizUseCase {
    oracle: Arc<dyn GenerativeClient + Send + Sync>,
    credential: Arc<ApiCredential>,
}

impl GenerateQuizUseCase {
    pub fn new(
        oracle: Arc<dyn GenerativeClient + Send + Sync>,
        credential: Arc<ApiCredential>,
    ) -> Self {
        Self { oracle, credential }
    }

    /// Builds the quiz prompt, runs one oracle round trip and turns the reply
    /// into validated questions. `historical_questions` are texts from the
    /// user's earlier quizzes on the same subject; the prompt instructs the
    /// model to avoid repeating them.
    pub async fn execute(
        &self,
        preferences: &QuizPreferences,
        historical_questions: &[String],
        cancel: &CancellationToken,
    ) -> Result<GeneratedQuiz> {
        preferences
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        let api_key = self.credential.require()?;

        let seed = PromptSeed::generate();
        let prompt = prompts::build_quiz_prompt(preferences, historical_questions, &seed);
        debug!(
            session_id = %seed.session_id,
            question_count = preferences.question_count,
            "requesting quiz generation"
        );

        let request = OracleRequest::new(prompt.clone(), api_key, GENERATION_TEMPERATURE);
        let reply = self.oracle.generate(&request, cancel).await?;
        let text = clean_oracle_text(&reply);

        let questions = parse_questions(&text, preferences)?;
        debug!(
            session_id = %seed.session_id,
            accepted = questions.len(),
            "quiz generation finished"
        );

        Ok(GeneratedQuiz {
            questions,
            receipt: GenerationReceipt::new(&seed, &prompt),
        })
    }
}

/// Extracts the JSON array from the model text, drops questions of kinds the
/// user did not ask for and validates the rest. Question ids are assigned by
/// position in the kept list, starting at 1.
fn parse_questions(text: &str, preferences: &QuizPreferences) -> Result<Vec<Question>> {
    let span = extract_json_array(text).ok_or_else(|| {
        AppError::ParseError(
            "No valid JSON found in the generated response. Please check your API key and try again."
                .to_string(),
        )
    })?;
    let values: Vec<serde_json::Value> = serde_json::from_str(span).map_err(|e| {
        AppError::ParseError(format!(
            "Failed to parse generated questions: {}. Please check your API key and try again.",
            e
        ))
    })?;
    if values.is_empty() {
        return Err(AppError::ParseError(
            "Invalid questions format - expected array of questions".to_string(),
        ));
    }

    let mut questions = Vec::new();
    for value in values {
        let tag = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        match QuestionType::from_tag(tag) {
            Some(kind) if preferences.wants(kind) => {}
            _ => continue,
        }

        let number = questions.len() as u32 + 1;
        let raw: RawQuestion = serde_json::from_value(value).map_err(|e| {
            AppError::ValidationError(format!("Question {} has an invalid shape: {}", number, e))
        })?;
        questions.push(validation::build_question(
            number,
            &preferences.language,
            raw,
        )?);
    }

    if questions.is_empty() {
        return Err(AppError::ValidationError(
            "No questions of the requested types were generated".to_string(),
        ));
    }
    Ok(questions)
}

fn digest_prompt(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::preferences::Difficulty;

    struct StaticOracle {
        reply: String,
    }

    #[async_trait]
    impl GenerativeClient for StaticOracle {
        async fn generate(
            &self,
            _request: &OracleRequest,
            _cancel: &CancellationToken,
        ) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl GenerativeClient for FailingOracle {
        async fn generate(
            &self,
            _request: &OracleRequest,
            _cancel: &CancellationToken,
        ) -> Result<String> {
            Err(AppError::Cancelled("Generation was cancelled".to_string()))
        }
    }

    fn preferences(kinds: Vec<QuestionType>) -> QuizPreferences {
        QuizPreferences {
            course: "Rust".to_string(),
            question_count: 2,
            question_types: kinds,
            difficulty: Difficulty::Medium,
            ..QuizPreferences::default()
        }
    }

    fn credential() -> Arc<ApiCredential> {
        let credential = ApiCredential::uninitialized();
        credential.set(Some("test-key".to_string()));
        Arc::new(credential)
    }

    const MC_BATCH: &str = r#"Here is your quiz:
    [
      {
        "type": "multiple-choice",
        "text": "Which keyword declares an immutable binding?",
        "options": ["let", "mut", "static", "const fn"],
        "correctAnswer": "let",
        "explanation": "Bindings are immutable unless marked mut."
      },
      {
        "type": "true-false",
        "text": "Shadowing a binding is allowed.",
        "options": ["True", "False"],
        "correctAnswer": "True",
        "explanation": "A new binding may reuse the name."
      }
    ]"#;

    #[tokio::test]
    async fn test_execute_filters_unrequested_kinds_and_renumbers() {
        let use_case = GenerateQuizUseCase::new(
            Arc::new(StaticOracle {
                reply: MC_BATCH.to_string(),
            }),
            credential(),
        );

        let quiz = use_case
            .execute(
                &preferences(vec![QuestionType::TrueFalse]),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(quiz.questions[0].id, 1);
        assert_eq!(
            quiz.questions[0].question_type(),
            QuestionType::TrueFalse
        );
        assert_eq!(quiz.questions[0].language, "English");
    }

    #[tokio::test]
    async fn test_execute_builds_receipt() {
        let use_case = GenerateQuizUseCase::new(
            Arc::new(StaticOracle {
                reply: MC_BATCH.to_string(),
            }),
            credential(),
        );

        let quiz = use_case
            .execute(
                &preferences(vec![QuestionType::MultipleChoice, QuestionType::TrueFalse]),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.receipt.prompt_version, PROMPT_VERSION);
        assert_eq!(quiz.receipt.session_id.len(), 13);
        assert_eq!(quiz.receipt.input_digest.len(), 64);
    }

    #[tokio::test]
    async fn test_execute_requires_api_key() {
        let use_case = GenerateQuizUseCase::new(
            Arc::new(StaticOracle {
                reply: MC_BATCH.to_string(),
            }),
            Arc::new(ApiCredential::uninitialized()),
        );

        let error = use_case
            .execute(
                &preferences(vec![QuestionType::MultipleChoice]),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::CredentialError(_)));
    }

    #[tokio::test]
    async fn test_execute_propagates_oracle_failure() {
        let use_case = GenerateQuizUseCase::new(Arc::new(FailingOracle), credential());
        let error = use_case
            .execute(
                &preferences(vec![QuestionType::MultipleChoice]),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Cancelled(_)));
    }

    #[test]
    fn test_parse_questions_rejects_reply_without_array() {
        let error =
            parse_questions("no json here", &preferences(vec![QuestionType::MultipleChoice]))
                .unwrap_err();
        assert!(matches!(error, AppError::ParseError(_)));
    }

    #[test]
    fn test_parse_questions_rejects_empty_array() {
        let error = parse_questions("[]", &preferences(vec![QuestionType::MultipleChoice]))
            .unwrap_err();
        match error {
            AppError::ParseError(msg) => {
                assert!(msg.contains("expected array of questions"))
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_questions_rejects_batch_of_only_unrequested_kinds() {
        let error = parse_questions(MC_BATCH, &preferences(vec![QuestionType::Sequence]))
            .unwrap_err();
        match error {
            AppError::ValidationError(msg) => {
                assert_eq!(msg, "No questions of the requested types were generated")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_questions_aborts_batch_when_one_item_is_invalid() {
        let reply = r#"[
          {
            "type": "multiple-choice",
            "text": "Pick the valid one.",
            "options": ["a", "b", "c", "d"],
            "correctAnswer": "a",
            "explanation": "x"
          },
          {
            "type": "multiple-choice",
            "text": "Too few options.",
            "options": ["a", "b", "c"],
            "correctAnswer": "a",
            "explanation": "x"
          }
        ]"#;
        let error = parse_questions(reply, &preferences(vec![QuestionType::MultipleChoice]))
            .unwrap_err();
        match error {
            AppError::ValidationError(msg) => {
                assert_eq!(
                    msg,
                    "Question 2 (multiple-choice) must have exactly 4 options and a correctAnswer"
                )
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_questions_rejects_unknown_payload_field() {
        let reply = r#"[
          {
            "type": "multiple-choice",
            "text": "Pick one.",
            "options": ["a", "b", "c", "d"],
            "correctAnswer": "a",
            "explanation": "x",
            "difficulty": "hard"
          }
        ]"#;
        let error = parse_questions(reply, &preferences(vec![QuestionType::MultipleChoice]))
            .unwrap_err();
        match error {
            AppError::ValidationError(msg) => {
                assert!(msg.contains("Question 1 has an invalid shape"), "message was: {}", msg)
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_digest_is_stable_for_same_prompt() {
        assert_eq!(digest_prompt("abc"), digest_prompt("abc"));
        assert_ne!(digest_prompt("abc"), digest_prompt("abd"));
    }
}
