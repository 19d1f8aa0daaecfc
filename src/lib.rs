pub mod application;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use crate::application::{
    AnalyzeQuizUseCase, ApiCredential, EvaluateAnswerUseCase, ExplainAnswerUseCase,
    GenerateQuizUseCase, SessionStore,
};
use crate::infrastructure::backend::BackendClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::{GeminiClient, GenerativeClient};

pub use crate::application::{GeneratedQuiz, GenerationReceipt, SessionPhase, SessionState};
pub use crate::domain::error::{AppError, Result};
pub use crate::domain::preferences::{AnswerMode, Difficulty, QuestionType, QuizMode, QuizPreferences};
pub use crate::domain::question::{Question, QuestionKind};
pub use crate::domain::quiz_result::{AnswerAssessment, QuizAnalysis, QuizResult};
pub use crate::domain::user::{SignUpPayload, UserAccount};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

/// Composition root. Builds the backend client, the oracle client and the
/// session store once and hands out the use cases wired to them. Host
/// applications keep one instance for the process lifetime.
pub struct QuizGenius {
    pub backend: Arc<BackendClient>,
    pub credential: Arc<ApiCredential>,
    pub session: Arc<SessionStore>,
    pub generate_quiz: GenerateQuizUseCase,
    pub explain_answer: ExplainAnswerUseCase,
    pub evaluate_answer: EvaluateAnswerUseCase,
    pub analyze_quiz: AnalyzeQuizUseCase,
}

impl QuizGenius {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.ensure_valid()?;

        let backend = Arc::new(BackendClient::new(&config));
        let oracle: Arc<dyn GenerativeClient + Send + Sync> =
            Arc::new(GeminiClient::new(&config));
        let credential = Arc::new(ApiCredential::uninitialized());
        let session = Arc::new(SessionStore::new(
            Arc::clone(&backend),
            Arc::clone(&credential),
        ));

        Ok(Self {
            generate_quiz: GenerateQuizUseCase::new(
                Arc::clone(&oracle),
                Arc::clone(&credential),
            ),
            explain_answer: ExplainAnswerUseCase::new(
                Arc::clone(&oracle),
                Arc::clone(&credential),
            ),
            evaluate_answer: EvaluateAnswerUseCase::new(
                Arc::clone(&oracle),
                Arc::clone(&credential),
            ),
            analyze_quiz: AnalyzeQuizUseCase::new(Arc::clone(&oracle), Arc::clone(&credential)),
            backend,
            credential,
            session,
        })
    }

    /// Reads configuration from `quizgenius.toml` and `QUIZGENIUS_*`
    /// environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AppConfig::load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{BackendConfig, OracleConfig};

    #[test]
    fn test_composition_root_wires_shared_credential() {
        let app = QuizGenius::new(AppConfig {
            backend: BackendConfig {
                base_url: "https://project.supabase.co".to_string(),
                anon_key: "anon".to_string(),
            },
            oracle: OracleConfig::default(),
        })
        .unwrap();

        app.credential.set(Some("gm-123".to_string()));
        assert!(app.credential.is_set());
        assert_eq!(app.session.snapshot().phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn test_composition_root_rejects_invalid_backend_url() {
        let result = QuizGenius::new(AppConfig {
            backend: BackendConfig {
                base_url: "not a url".to_string(),
                anon_key: "anon".to_string(),
            },
            oracle: OracleConfig::default(),
        });
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
