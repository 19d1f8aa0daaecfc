use serde::Deserialize;
use serde_json::json;

use super::{send_checked, BackendClient};
use crate::domain::error::{AppError, Result};
use crate::domain::preferences::{Difficulty, QuestionType, QuizMode, QuizPreferences};

#[derive(Debug, Deserialize)]
struct PreferencesRow {
    course: Option<String>,
    topic: Option<String>,
    subtopic: Option<String>,
    question_count: Option<u32>,
    question_types: Option<Vec<QuestionType>>,
    language: Option<String>,
    difficulty: Option<Difficulty>,
    time_limit: Option<u32>,
    total_time_limit: Option<u32>,
    time_limit_enabled: Option<bool>,
    negative_marking: Option<bool>,
    negative_marks: Option<f64>,
    mode: Option<QuizMode>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl From<PreferencesRow> for QuizPreferences {
    fn from(row: PreferencesRow) -> Self {
        let defaults = QuizPreferences::default();
        Self {
            course: row.course.unwrap_or(defaults.course),
            topic: row.topic,
            subtopic: row.subtopic,
            question_count: row.question_count.unwrap_or(defaults.question_count),
            question_types: row
                .question_types
                .filter(|types| !types.is_empty())
                .unwrap_or(defaults.question_types),
            language: row.language.unwrap_or(defaults.language),
            difficulty: row.difficulty.unwrap_or(defaults.difficulty),
            time_limit: row.time_limit,
            total_time_limit: row.total_time_limit,
            time_limit_enabled: row.time_limit_enabled.unwrap_or(false),
            negative_marking: row.negative_marking.unwrap_or(false),
            negative_marks: row.negative_marks.unwrap_or(0.0),
            mode: row.mode.unwrap_or(defaults.mode),
        }
    }
}

/// The two timer columns are stored mutually exclusively: a per-question
/// limit only when no global limit is set, and vice versa. Disabled timing
/// blanks both.
fn stored_time_limits(preferences: &QuizPreferences) -> (Option<u32>, Option<u32>) {
    let time_limit = if preferences.time_limit_enabled && preferences.total_time_limit.is_none() {
        preferences.time_limit
    } else {
        None
    };
    let total_time_limit = if preferences.time_limit_enabled && preferences.time_limit.is_none() {
        preferences.total_time_limit
    } else {
        None
    };
    (time_limit, total_time_limit)
}

/// The columns written on save. The answer mode is derived from `mode`
/// on read and never stored, and the penalty is zeroed whenever negative
/// marking is off.
fn preference_columns(preferences: &QuizPreferences) -> serde_json::Value {
    let (time_limit, total_time_limit) = stored_time_limits(preferences);
    let negative_marks = if preferences.negative_marking {
        preferences.negative_marks
    } else {
        0.0
    };
    json!({
        "course": preferences.course,
        "topic": preferences.topic,
        "subtopic": preferences.subtopic,
        "question_count": preferences.question_count,
        "question_types": preferences.question_types,
        "language": preferences.language,
        "difficulty": preferences.difficulty,
        "time_limit": time_limit,
        "total_time_limit": total_time_limit,
        "time_limit_enabled": preferences.time_limit_enabled,
        "negative_marking": preferences.negative_marking,
        "negative_marks": negative_marks,
        "mode": preferences.mode,
    })
}

impl BackendClient {
    /// Returns the saved preferences, or `None` for a user who has never
    /// saved any. Missing columns fall back to the documented defaults.
    pub async fn get_quiz_preferences(&self, user_id: &str) -> Result<Option<QuizPreferences>> {
        let rows: Vec<PreferencesRow> = send_checked(
            "Fetching quiz preferences failed",
            self.apply_auth(self.http().get(self.rest_url("quiz_preferences")))
                .await
                .query(&[("select", "*"), ("user_id", &format!("eq.{}", user_id))]),
        )
        .await?
        .json()
        .await
        .map_err(|e| {
            AppError::InvalidResponseError(format!("Malformed preference rows: {}", e))
        })?;

        Ok(rows.into_iter().next().map(Into::into))
    }

    /// Saves the preferences, updating the existing row when there is one.
    pub async fn save_quiz_preferences(
        &self,
        user_id: &str,
        preferences: &QuizPreferences,
    ) -> Result<()> {
        let mut body = preference_columns(preferences);

        let existing: Vec<IdRow> = send_checked(
            "Checking for existing preferences failed",
            self.apply_auth(self.http().get(self.rest_url("quiz_preferences")))
                .await
                .query(&[("select", "id"), ("user_id", &format!("eq.{}", user_id))]),
        )
        .await?
        .json()
        .await
        .map_err(|e| {
            AppError::InvalidResponseError(format!("Malformed preference rows: {}", e))
        })?;

        if let Some(row) = existing.into_iter().next() {
            send_checked(
                "Updating quiz preferences failed",
                self.apply_auth(self.http().patch(self.rest_url("quiz_preferences")))
                    .await
                    .query(&[("id", &format!("eq.{}", row.id))])
                    .json(&body),
            )
            .await?;
        } else {
            body["user_id"] = json!(user_id);
            send_checked(
                "Saving quiz preferences failed",
                self.apply_auth(self.http().post(self.rest_url("quiz_preferences")))
                    .await
                    .json(&body),
            )
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_row_falls_back_to_defaults() {
        let row: PreferencesRow = serde_json::from_str("{}").unwrap();
        let prefs: QuizPreferences = row.into();

        assert_eq!(prefs.question_count, 5);
        assert_eq!(prefs.question_types, vec![QuestionType::MultipleChoice]);
        assert_eq!(prefs.language, "English");
        assert_eq!(prefs.difficulty, Difficulty::Medium);
        assert_eq!(prefs.mode, QuizMode::Practice);
    }

    #[test]
    fn test_row_with_values_overrides_defaults() {
        let row: PreferencesRow = serde_json::from_str(
            r#"{
                "course": "Physics",
                "question_count": 10,
                "question_types": ["sequence", "multi-select"],
                "difficulty": "hard",
                "mode": "exam",
                "negative_marking": true,
                "negative_marks": 0.5
            }"#,
        )
        .unwrap();
        let prefs: QuizPreferences = row.into();

        assert_eq!(prefs.course, "Physics");
        assert_eq!(prefs.question_count, 10);
        assert_eq!(
            prefs.question_types,
            vec![QuestionType::Sequence, QuestionType::MultiSelect]
        );
        assert_eq!(prefs.difficulty, Difficulty::Hard);
        assert_eq!(prefs.mode, QuizMode::Exam);
        assert!(prefs.negative_marking);
        assert_eq!(prefs.negative_marks, 0.5);
    }

    #[test]
    fn test_empty_kind_list_in_row_falls_back_to_default_kind() {
        let row: PreferencesRow = serde_json::from_str(r#"{"question_types": []}"#).unwrap();
        let prefs: QuizPreferences = row.into();
        assert_eq!(prefs.question_types, vec![QuestionType::MultipleChoice]);
    }

    #[test]
    fn test_stored_time_limits_are_mutually_exclusive() {
        let mut prefs = QuizPreferences {
            time_limit_enabled: true,
            time_limit: Some(30),
            total_time_limit: None,
            ..QuizPreferences::default()
        };
        assert_eq!(stored_time_limits(&prefs), (Some(30), None));

        prefs.time_limit = None;
        prefs.total_time_limit = Some(20);
        assert_eq!(stored_time_limits(&prefs), (None, Some(20)));

        prefs.time_limit = Some(30);
        assert_eq!(stored_time_limits(&prefs), (None, None));
    }

    #[test]
    fn test_disabled_timing_blanks_both_columns() {
        let prefs = QuizPreferences {
            time_limit_enabled: false,
            time_limit: Some(30),
            total_time_limit: Some(20),
            ..QuizPreferences::default()
        };
        assert_eq!(stored_time_limits(&prefs), (None, None));
    }

    #[test]
    fn test_stored_columns_match_backend_table() {
        let body = preference_columns(&QuizPreferences::default());

        let mut keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "course",
                "difficulty",
                "language",
                "mode",
                "negative_marking",
                "negative_marks",
                "question_count",
                "question_types",
                "subtopic",
                "time_limit",
                "time_limit_enabled",
                "topic",
                "total_time_limit",
            ]
        );
    }

    #[test]
    fn test_negative_marks_zeroed_when_marking_disabled() {
        let mut prefs = QuizPreferences {
            negative_marking: false,
            negative_marks: 0.5,
            ..QuizPreferences::default()
        };
        assert_eq!(preference_columns(&prefs)["negative_marks"], json!(0.0));

        prefs.negative_marking = true;
        assert_eq!(preference_columns(&prefs)["negative_marks"], json!(0.5));
    }
}
