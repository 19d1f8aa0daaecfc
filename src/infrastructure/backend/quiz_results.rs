use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use super::{send_checked, BackendClient};
use crate::domain::error::{AppError, Result};
use crate::domain::preferences::{Difficulty, QuizPreferences};
use crate::domain::quiz_result::{ComparativePerformance, QuizResult, TypePerformance};

#[derive(Debug, Deserialize)]
struct QuizResultRow {
    id: String,
    topic: Option<String>,
    difficulty: Option<Difficulty>,
    total_questions: Option<u32>,
    questions_attempted: Option<u32>,
    questions_skipped: Option<u32>,
    questions_correct: Option<u32>,
    questions_incorrect: Option<u32>,
    raw_score: Option<f64>,
    percentage_score: Option<f64>,
    final_score: Option<f64>,
    negative_marks_deducted: Option<f64>,
    accuracy_rate: Option<f64>,
    completion_rate: Option<f64>,
    total_time_taken: Option<u32>,
    question_type_performance: Option<HashMap<String, TypePerformance>>,
    strengths: Option<Vec<String>>,
    weaknesses: Option<Vec<String>>,
    recommendations: Option<Vec<String>>,
    comparative_performance: Option<ComparativePerformance>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl From<QuizResultRow> for QuizResult {
    fn from(row: QuizResultRow) -> Self {
        Self {
            id: Some(row.id),
            topic: row.topic,
            difficulty: row.difficulty,
            total_questions: row.total_questions.unwrap_or(0),
            questions_attempted: row.questions_attempted.unwrap_or(0),
            questions_skipped: row.questions_skipped.unwrap_or(0),
            correct_answers: row.questions_correct.unwrap_or(0),
            incorrect_answers: row.questions_incorrect.unwrap_or(0),
            raw_score: row.raw_score.unwrap_or(0.0),
            percentage: row.percentage_score.unwrap_or(0.0),
            final_score: row.final_score.unwrap_or(0.0),
            negative_marks_deducted: row.negative_marks_deducted.unwrap_or(0.0),
            accuracy_rate: row.accuracy_rate.unwrap_or(0.0),
            completion_rate: row.completion_rate.unwrap_or(0.0),
            total_time_taken_secs: row.total_time_taken.unwrap_or(0),
            question_type_performance: row.question_type_performance.unwrap_or_default(),
            strengths: row.strengths.unwrap_or_default(),
            weaknesses: row.weaknesses.unwrap_or_default(),
            recommendations: row.recommendations.unwrap_or_default(),
            comparative_performance: row.comparative_performance,
            completed_at: row.completed_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Stored session ids look like `quiz_1712345678901_k3tq0b7xe`.
fn new_session_id() -> String {
    format!(
        "quiz_{}_{}",
        Utc::now().timestamp_millis(),
        random_base36(9)
    )
}

fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

impl BackendClient {
    /// Inserts a completed quiz outcome and returns the new row id. Results
    /// are written once and never updated.
    pub async fn save_quiz_result(
        &self,
        user_id: &str,
        result: &QuizResult,
        preferences: &QuizPreferences,
    ) -> Result<String> {
        let body = json!({
            "user_id": user_id,
            "session_id": new_session_id(),
            "course": preferences.course,
            "topic": preferences.topic,
            "subtopic": preferences.subtopic,
            "difficulty": preferences.difficulty,
            "language": preferences.language,
            "mode": preferences.mode,
            "question_types": preferences.question_types,
            "time_limit_enabled": preferences.time_limit_enabled,
            "time_limit_per_question": preferences.time_limit,
            "total_time_limit": preferences.total_time_limit,
            "negative_marking_applied": preferences.negative_marking,
            "total_questions": result.total_questions,
            "questions_attempted": result.questions_attempted,
            "questions_skipped": result.questions_skipped,
            "questions_correct": result.correct_answers,
            "questions_incorrect": result.incorrect_answers,
            "raw_score": result.raw_score,
            "percentage_score": result.percentage,
            "final_score": result.final_score,
            "negative_marks_deducted": result.negative_marks_deducted,
            "accuracy_rate": result.accuracy_rate,
            "completion_rate": result.completion_rate,
            "total_time_taken": result.total_time_taken_secs,
            "question_type_performance": result.question_type_performance,
            "strengths": result.strengths,
            "weaknesses": result.weaknesses,
            "recommendations": result.recommendations,
            "comparative_performance": result.comparative_performance,
            "completed_at": result.completed_at.to_rfc3339(),
        });

        let rows: Vec<IdRow> = send_checked(
            "Saving quiz result failed",
            self.apply_auth(self.http().post(self.rest_url("quiz_results")))
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
            AppError::InvalidResponseError("Insert returned no quiz result id".to_string())
        })
    }

    /// Past results for the user, most recent first.
    pub async fn list_quiz_results(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<QuizResult>> {
        let user_filter = format!("eq.{}", user_id);
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", user_filter),
            ("order", "completed_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let rows: Vec<QuizResultRow> = send_checked(
            "Fetching quiz results failed",
            self.apply_auth(self.http().get(self.rest_url("quiz_results")))
                .await
                .query(&query),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed result rows: {}", e)))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_quiz_result(&self, result_id: &str) -> Result<QuizResult> {
        let rows: Vec<QuizResultRow> = send_checked(
            "Fetching quiz result failed",
            self.apply_auth(self.http().get(self.rest_url("quiz_results")))
                .await
                .query(&[("select", "*"), ("id", &format!("eq.{}", result_id))]),
        )
        .await?
        .json()
        .await
        .map_err(|e| AppError::InvalidResponseError(format!("Malformed result rows: {}", e)))?;

        rows.into_iter()
            .next()
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Quiz result {} not found", result_id)))
    }

    pub async fn delete_quiz_result(&self, result_id: &str) -> Result<()> {
        send_checked(
            "Deleting quiz result failed",
            self.apply_auth(self.http().delete(self.rest_url("quiz_results")))
                .await
                .query(&[("id", &format!("eq.{}", result_id))]),
        )
        .await?;
        Ok(())
    }
}
