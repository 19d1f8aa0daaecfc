use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{GenerativeClient, OracleRequest};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;

#[derive(Serialize)]
struct EdgeFunctionRequest<'a> {
    prompt: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    temperature: f64,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: String,
}

/// Client for the Gemini relay deployed as a backend edge function. The
/// user's model key travels in the body; the project anon key authenticates
/// the function call itself.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    anon_key: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(config.oracle.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: config.oracle_endpoint(),
            anon_key: config.backend.anon_key.clone(),
        }
    }

    async fn call_edge_function(&self, request: &OracleRequest) -> Result<String> {
        let body = EdgeFunctionRequest {
            prompt: &request.prompt,
            api_key: &request.api_key,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.anon_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &upstream_detail(&text)));
        }

        let json: GeminiResponse = response.json().await.map_err(|e| {
            AppError::InvalidResponseError(format!("Failed to parse oracle response: {}", e))
        })?;

        first_candidate_text(json)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(
        &self,
        request: &OracleRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled(
                "generation request was cancelled before completion".to_string(),
            )),
            result = self.call_edge_function(request) => result,
        }
    }
}

fn first_candidate_text(response: GeminiResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| {
            AppError::InvalidResponseError(
                "Invalid response format from the generation service - no content generated"
                    .to_string(),
            )
        })
}

/// Pulls a human-readable message out of an error body, which arrives either
/// as JSON with an `error`/`message` field or as plain text.
fn upstream_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(detail) = value.get(key).and_then(|v| v.as_str()) {
                return detail.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error detail provided".to_string()
    } else {
        trimmed.to_string()
    }
}

fn classify_status(status: StatusCode, detail: &str) -> AppError {
    match status.as_u16() {
        429 | 503 => AppError::RateLimitError(
            "Gemini API limit reached or service unavailable. Please try again after some time."
                .to_string(),
        ),
        401 => AppError::CredentialError(
            "Invalid API key. Please check your Gemini API key in settings.".to_string(),
        ),
        403 => AppError::CredentialError(
            "API key does not have permission to access the Gemini API. Please check your API key settings."
                .to_string(),
        ),
        _ => AppError::TransportError(format!("API error ({}): {}", status, detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_statuses_map_to_retry_later() {
        for code in [429u16, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                classify_status(status, ""),
                AppError::RateLimitError(_)
            ));
        }
    }

    #[test]
    fn test_auth_statuses_map_to_credential_errors() {
        for code in [401u16, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                classify_status(status, ""),
                AppError::CredentialError(_)
            ));
        }
    }

    #[test]
    fn test_other_statuses_map_to_transport_errors() {
        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, "upstream boom");
        match err {
            AppError::TransportError(msg) => assert!(msg.contains("upstream boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_upstream_detail_prefers_json_error_field() {
        assert_eq!(
            upstream_detail(r#"{"error": "quota exhausted"}"#),
            "quota exhausted"
        );
        assert_eq!(
            upstream_detail(r#"{"message": "bad request"}"#),
            "bad request"
        );
        assert_eq!(upstream_detail("plain text"), "plain text");
        assert_eq!(upstream_detail("  "), "no error detail provided");
    }

    #[test]
    fn test_first_candidate_text_returns_generated_payload() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "[{\"id\": 1}]"}]}}
            ]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_candidate_text(response).unwrap(), "[{\"id\": 1}]");
    }

    #[test]
    fn test_missing_candidates_is_an_invalid_response() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            first_candidate_text(response),
            Err(AppError::InvalidResponseError(_))
        ));
    }

    #[test]
    fn test_empty_parts_is_an_invalid_response() {
        let json = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            first_candidate_text(response),
            Err(AppError::InvalidResponseError(_))
        ));
    }
}
