pub mod api_keys;
pub mod auth;
pub mod favorites;
pub mod quiz_preferences;
pub mod quiz_results;

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::AppConfig;

/// Tokens and identity returned by a password grant. Held in process memory
/// only; nothing here is ever written to disk.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    /// Set by the auth server once the address is verified. Only presence is
    /// ever checked.
    pub email_confirmed_at: Option<String>,
}

/// REST client for the backend project: auth endpoints, row storage and edge
/// functions all hang off the same base URL. Row access goes through the
/// PostgREST interface, so filters are expressed as `column=eq.value` query
/// pairs.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            anon_key: config.backend.anon_key.clone(),
            session: RwLock::new(None),
        }
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub(crate) fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub(crate) fn functions_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub async fn set_session(&self, session: AuthSession) {
        *self.session.write().await = Some(session);
    }

    pub async fn clear_session(&self) -> Option<AuthSession> {
        self.session.write().await.take()
    }

    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub(crate) async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Attaches the project `apikey` header plus a bearer token, preferring
    /// the signed-in user's access token over the anon key.
    pub(crate) async fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self
            .access_token()
            .await
            .unwrap_or_else(|| self.anon_key.clone());
        builder.header("apikey", &self.anon_key).bearer_auth(token)
    }
}

/// Sends a request and converts non-success statuses into domain errors.
pub(crate) async fn send_checked(
    context: &str,
    builder: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| AppError::TransportError(format!("{}: {}", context, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(context, response).await);
    }
    Ok(response)
}

pub(crate) async fn error_from_response(context: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    match status.as_u16() {
        401 | 403 => AppError::CredentialError(format!("{}: {}", context, detail)),
        404 => AppError::NotFound(format!("{}: {}", context, detail)),
        _ => AppError::BackendError(format!("{} ({}): {}", context, status, detail)),
    }
}

/// Backend errors arrive in a few shapes: the auth server uses `msg` or
/// `error_description`, PostgREST uses `message`, edge functions use `error`.
pub(crate) fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        use crate::infrastructure::config::{BackendConfig, OracleConfig};

        AppConfig {
            backend: BackendConfig {
                base_url: "https://abc.supabase.co/".to_string(),
                anon_key: "anon".to_string(),
            },
            oracle: OracleConfig::default(),
        }
    }

    #[test]
    fn test_urls_are_rooted_at_the_project_base() {
        let client = BackendClient::new(&test_config());
        assert_eq!(
            client.auth_url("token"),
            "https://abc.supabase.co/auth/v1/token"
        );
        assert_eq!(
            client.rest_url("api_keys"),
            "https://abc.supabase.co/rest/v1/api_keys"
        );
        assert_eq!(
            client.functions_url("send-verification"),
            "https://abc.supabase.co/functions/v1/send-verification"
        );
    }

    #[test]
    fn test_error_detail_probes_known_fields() {
        assert_eq!(
            error_detail(r#"{"msg": "Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_detail(r#"{"message": "duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            error_detail(r#"{"error_description": "expired token"}"#),
            "expired token"
        );
        assert_eq!(error_detail("plain failure"), "plain failure");
        assert_eq!(error_detail(""), "no error detail provided");
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let client = BackendClient::new(&test_config());
        assert!(!client.has_session().await);

        client
            .set_session(AuthSession {
                access_token: "jwt".to_string(),
                refresh_token: None,
                user: AuthUser {
                    id: "user-1".to_string(),
                    email: Some("a@b.com".to_string()),
                    email_confirmed_at: Some("2024-01-01T00:00:00Z".to_string()),
                },
            })
            .await;

        assert!(client.has_session().await);
        assert_eq!(client.access_token().await.as_deref(), Some("jwt"));

        let removed = client.clear_session().await;
        assert_eq!(removed.unwrap().user.id, "user-1");
        assert!(!client.has_session().await);
    }
}
