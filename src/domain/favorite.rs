use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::question::Question;

/// A question the user bookmarked for later revision, denormalised so it
/// survives independently of the quiz batch it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteQuestion {
    pub id: Option<String>,
    pub question_text: String,
    pub answer: String,
    pub explanation: String,
    pub topic: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FavoriteQuestion {
    pub fn from_question(question: &Question, topic: Option<String>) -> Self {
        Self {
            id: None,
            question_text: question.text.clone(),
            answer: question.kind.answer_text(),
            explanation: question.explanation.clone(),
            topic,
            created_at: None,
        }
    }
}
