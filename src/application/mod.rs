pub mod session;
pub mod use_cases;

pub use session::{ApiCredential, SessionPhase, SessionState, SessionStore};
pub use use_cases::answer_evaluation::EvaluateAnswerUseCase;
pub use use_cases::explanation::ExplainAnswerUseCase;
pub use use_cases::generation::{GeneratedQuiz, GenerateQuizUseCase, GenerationReceipt};
pub use use_cases::quiz_analysis::AnalyzeQuizUseCase;
