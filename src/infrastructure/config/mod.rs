use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use url::Url;

use crate::domain::error::{AppError, Result};

/// Connection details for the backend project hosting auth, rows and the
/// generation edge function.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Publishable anonymous key, sent as the bearer on edge function calls
    /// and as the `apikey` header on every request.
    pub anon_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_path")]
    pub path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            path: default_oracle_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_oracle_path() -> String {
    "/functions/v1/gemini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl AppConfig {
    /// Loads configuration from `quizgenius.toml` overlaid with
    /// `QUIZGENIUS_`-prefixed environment variables, e.g.
    /// `QUIZGENIUS_BACKEND__BASE_URL`. A `.env` file is honoured when present.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config: AppConfig = Figment::new()
            .merge(Toml::file("quizgenius.toml"))
            .merge(Env::prefixed("QUIZGENIUS_").split("__"))
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        Url::parse(&self.backend.base_url).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid backend base URL: {}",
                self.backend.base_url
            ))
        })?;
        if self.backend.anon_key.trim().is_empty() {
            return Err(AppError::ConfigError(
                "Backend anon key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute URL of the generation edge function.
    pub fn oracle_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.backend.base_url.trim_end_matches('/'),
            self.oracle.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> AppConfig {
        Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_oracle_defaults_apply_when_section_is_absent() {
        let config = from_toml(
            r#"
            [backend]
            base_url = "https://abc.supabase.co"
            anon_key = "anon"
            "#,
        );
        assert_eq!(config.oracle.path, "/functions/v1/gemini");
        assert_eq!(config.oracle.timeout_secs, 120);
    }

    #[test]
    fn test_oracle_endpoint_joins_without_double_slash() {
        let config = from_toml(
            r#"
            [backend]
            base_url = "https://abc.supabase.co/"
            anon_key = "anon"
            "#,
        );
        assert_eq!(
            config.oracle_endpoint(),
            "https://abc.supabase.co/functions/v1/gemini"
        );
    }

    #[test]
    fn test_ensure_valid_rejects_malformed_base_url() {
        let config = from_toml(
            r#"
            [backend]
            base_url = "not a url"
            anon_key = "anon"
            "#,
        );
        assert!(matches!(
            config.ensure_valid(),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_ensure_valid_rejects_blank_anon_key() {
        let config = from_toml(
            r#"
            [backend]
            base_url = "https://abc.supabase.co"
            anon_key = "  "
            "#,
        );
        assert!(matches!(
            config.ensure_valid(),
            Err(AppError::ConfigError(_))
        ));
    }
}
