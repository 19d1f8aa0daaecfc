use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::session::ApiCredential;
use crate::application::use_cases::generation::prompts::build_explanation_prompt;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::llm_clients::{GenerativeClient, OracleRequest};
use crate::infrastructure::response::clean_oracle_text;

const EXPLANATION_TEMPERATURE: f64 = 0.0;

/// Produces a deeper explanation of a question's correct answer on demand.
pub struct ExplainAnswerUseCase {
    oracle: Arc<dyn GenerativeClient + Send + Sync>,
    credential: Arc<ApiCredential>,
}

impl ExplainAnswerUseCase {
    pub fn new(
        oracle: Arc<dyn GenerativeClient + Send + Sync>,
        credential: Arc<ApiCredential>,
    ) -> Self {
        Self { oracle, credential }
    }

    pub async fn execute(
        &self,
        question: &str,
        correct_answer: &str,
        topic: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api_key = self.credential.require()?;
        let prompt = build_explanation_prompt(question, correct_answer, topic, language);
        debug!(topic, "requesting answer explanation");

        let request = OracleRequest::new(prompt, api_key, EXPLANATION_TEMPERATURE);
        let reply = self.oracle.generate(&request, cancel).await?;
        let text = clean_oracle_text(&reply);
        if text.is_empty() {
            return Err(AppError::InvalidResponseError(
                "The generation service returned an empty explanation".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

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

    fn use_case(reply: &str) -> ExplainAnswerUseCase {
        let credential = ApiCredential::uninitialized();
        credential.set(Some("test-key".to_string()));
        ExplainAnswerUseCase::new(
            Arc::new(StaticOracle {
                reply: reply.to_string(),
            }),
            Arc::new(credential),
        )
    }

    #[tokio::test]
    async fn test_execute_cleans_reasoning_markup() {
        let explanation = use_case("<think>chain of thought</think>42 is the answer.")
            .execute(
                "What is 6 * 7?",
                "42",
                "Arithmetic",
                "English",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(explanation, "42 is the answer.");
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_reply() {
        let error = use_case("<think>nothing else</think>")
            .execute(
                "What is 6 * 7?",
                "42",
                "Arithmetic",
                "English",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::InvalidResponseError(_)));
    }

    #[tokio::test]
    async fn test_execute_requires_api_key() {
        let use_case = ExplainAnswerUseCase::new(
            Arc::new(StaticOracle {
                reply: "irrelevant".to_string(),
            }),
            Arc::new(ApiCredential::uninitialized()),
        );
        let error = use_case
            .execute(
                "What is 6 * 7?",
                "42",
                "Arithmetic",
                "English",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::CredentialError(_)));
    }
}
