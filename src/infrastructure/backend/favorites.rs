use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{send_checked, BackendClient};
use crate::domain::error::{AppError, Result};
use crate::domain::favorite::FavoriteQuestion;

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    id: String,
    #[serde(default)]
    question_text: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    explanation: String,
    topic: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl From<FavoriteRow> for FavoriteQuestion {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: Some(row.id),
            question_text: row.question_text,
            answer: row.answer,
            explanation: row.explanation,
            topic: row.topic,
            created_at: row.created_at,
        }
    }
}

fn insert_columns(user_id: &str, favorite: &FavoriteQuestion) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "question_text": favorite.question_text,
        "answer": favorite.answer,
        "explanation": favorite.explanation,
        "topic": favorite.topic,
    })
}

impl BackendClient {
    pub async fn save_favorite_question(
        &self,
        user_id: &str,
        favorite: &FavoriteQuestion,
    ) -> Result<String> {
        let body = insert_columns(user_id, favorite);

        let rows: Vec<IdRow> = send_checked(
            "Saving favorite failed",
            self.apply_auth(self.http().post(self.rest_url("favorite_questions")))
                .await
                .header("Prefer", "return=representation")
                .query(&[("select", "id")])
                .json(&body),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed insert response: {}", e)))?;

        rows.into_iter().next().map(|row| row.id).ok_or_else(|| {
            AppError::InvalidResponseError("Insert returned no favorite id".to_string())
        })
    }

    pub async fn list_favorite_questions(&self, user_id: &str) -> Result<Vec<FavoriteQuestion>> {
        let rows: Vec<FavoriteRow> = send_checked(
            "Fetching favorites failed",
            self.apply_auth(self.http().get(self.rest_url("favorite_questions")))
                .await
                .query(&[
                    ("select", "*"),
                    ("user_id", &format!("eq.{}", user_id)),
                    ("order", "created_at.desc"),
                ]),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed favorite rows: {}", e)))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn remove_favorite_question(&self, user_id: &str, favorite_id: &str) -> Result<()> {
        send_checked(
            "Removing favorite failed",
            self.apply_auth(self.http().delete(self.rest_url("favorite_questions")))
                .await
                .query(&[
                    ("user_id", &format!("eq.{}", user_id)),
                    ("id", &format!("eq.{}", favorite_id)),
                ]),
        )
        .await?;
        Ok(())
    }
}
