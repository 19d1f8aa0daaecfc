use serde::Deserialize;
use serde_json::json;

use super::{send_checked, BackendClient};
use crate::domain::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct ApiKeyRow {
    gemini_api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

fn update_columns(api_key: &str) -> serde_json::Value {
    json!({ "gemini_api_key": api_key })
}

fn insert_columns(user_id: &str, api_key: &str) -> serde_json::Value {
    json!({ "user_id": user_id, "gemini_api_key": api_key })
}

impl BackendClient {
    /// Returns the stored model key for the user, or `None` when no row
    /// exists yet.
    pub async fn get_api_key(&self, user_id: &str) -> Result<Option<String>> {
        let rows: Vec<ApiKeyRow> = send_checked(
            "Fetching API key failed",
            self.apply_auth(self.http().get(self.rest_url("api_keys")))
                .await
                .query(&[
                    ("select", "gemini_api_key"),
                    ("user_id", &format!("eq.{}", user_id)),
                ]),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed API key rows: {}", e)))?;

        Ok(rows.into_iter().next().and_then(|row| row.gemini_api_key))
    }

    /// Stores the model key, updating the existing row when the user already
    /// has one.
    pub async fn save_api_key(&self, user_id: &str, api_key: &str) -> Result<()> {
        let existing: Vec<IdRow> = send_checked(
            "Checking for existing API key failed",
            self.apply_auth(self.http().get(self.rest_url("api_keys")))
                .await
                .query(&[("select", "id"), ("user_id", &format!("eq.{}", user_id))]),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed API key rows: {}", e)))?;

        if let Some(row) = existing.into_iter().next() {
            send_checked(
                "Updating API key failed",
                self.apply_auth(self.http().patch(self.rest_url("api_keys")))
                    .await
                    .query(&[("id", &format!("eq.{}", row.id))])
                    .json(&update_columns(api_key)),
            )
            .await?;
        } else {
            send_checked(
                "Saving API key failed",
                self.apply_auth(self.http().post(self.rest_url("api_keys")))
                    .await
                    .json(&insert_columns(user_id, api_key)),
            )
            .await?;
        }
        Ok(())
    }
}
