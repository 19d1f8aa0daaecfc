pub mod gemini;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Result;

pub use gemini::GeminiClient;

/// One oracle round trip: the fully built prompt, the user's model key and
/// the sampling temperature for this call.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub prompt: String,
    pub api_key: String,
    pub temperature: f64,
}

impl OracleRequest {
    pub fn new(prompt: String, api_key: String, temperature: f64) -> Self {
        Self {
            prompt,
            api_key,
            temperature,
        }
    }
}

#[async_trait]
pub trait GenerativeClient {
    /// Sends the prompt and returns the raw model text. Resolves early with
    /// `AppError::Cancelled` when the token fires before the reply lands.
    async fn generate(&self, request: &OracleRequest, cancel: &CancellationToken)
        -> Result<String>;
}
