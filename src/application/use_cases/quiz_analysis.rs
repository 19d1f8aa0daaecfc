use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::application::session::ApiCredential;
use crate::application::use_cases::generation::llm_output::extract_json_object;
use crate::application::use_cases::generation::prompts::build_analysis_prompt;
use crate::application::use_cases::generation::types::AnalysisOutput;
use crate::domain::error::{AppError, Result};
use crate::domain::preferences::QuizPreferences;
use crate::domain::quiz_result::{QuizAnalysis, QuizResult};
use crate::infrastructure::llm_clients::{GenerativeClient, OracleRequest};
use crate::infrastructure::response::clean_oracle_text;

// Higher temperature than generation so the written analysis varies.
const ANALYSIS_TEMPERATURE: f64 = 0.7;

/// Writes a personalised post-quiz analysis from the current result and the
/// user's history. Advisory only: every failure path collapses to the neutral
/// placeholder so finishing a quiz is never blocked on the oracle.
pub struct AnalyzeQuizUseCase {
    oracle: Arc<dyn GenerativeClient + Send + Sync>,
    credential: Arc<ApiCredential>,
}

impl AnalyzeQuizUseCase {
    pub fn new(
        oracle: Arc<dyn GenerativeClient + Send + Sync>,
        credential: Arc<ApiCredential>,
    ) -> Self {
        Self { oracle, credential }
    }

    pub async fn execute(
        &self,
        current: &QuizResult,
        history: &[QuizResult],
        preferences: &QuizPreferences,
        cancel: &CancellationToken,
    ) -> QuizAnalysis {
        match self
            .remote_analysis(current, history, preferences, cancel)
            .await
        {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(%error, "quiz analysis fell back to the neutral placeholder");
                QuizAnalysis::neutral()
            }
        }
    }

    async fn remote_analysis(
        &self,
        current: &QuizResult,
        history: &[QuizResult],
        preferences: &QuizPreferences,
        cancel: &CancellationToken,
    ) -> Result<QuizAnalysis> {
        let api_key = self.credential.require()?;
        let prompt = build_analysis_prompt(current, history, preferences);

        let request = OracleRequest::new(prompt, api_key, ANALYSIS_TEMPERATURE);
        let reply = self.oracle.generate(&request, cancel).await?;
        let text = clean_oracle_text(&reply);

        let span = extract_json_object(&text).ok_or_else(|| {
            AppError::ParseError("No JSON object found in the analysis reply".to_string())
        })?;
        let output: AnalysisOutput = serde_json::from_str(span)
            .map_err(|e| AppError::ParseError(format!("Malformed analysis reply: {}", e)))?;
        Ok(output.into())
    }
}
