use serde::{Deserialize, Serialize};
use validator::Validate;

/// Question kinds the generator knows how to request and validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    MultiSelect,
    Sequence,
    CaseStudy,
    Situation,
    ShortAnswer,
    FillBlank,
}

impl QuestionType {
    /// Wire tag as it appears in generated JSON and stored rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::MultiSelect => "multi-select",
            QuestionType::Sequence => "sequence",
            QuestionType::CaseStudy => "case-study",
            QuestionType::Situation => "situation",
            QuestionType::ShortAnswer => "short-answer",
            QuestionType::FillBlank => "fill-blank",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "multiple-choice" => Some(QuestionType::MultipleChoice),
            "true-false" => Some(QuestionType::TrueFalse),
            "multi-select" => Some(QuestionType::MultiSelect),
            "sequence" => Some(QuestionType::Sequence),
            "case-study" => Some(QuestionType::CaseStudy),
            "situation" => Some(QuestionType::Situation),
            "short-answer" => Some(QuestionType::ShortAnswer),
            "fill-blank" => Some(QuestionType::FillBlank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Practice,
    Exam,
}

/// When answers are revealed to the taker. Derived from the mode, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Immediate,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizPreferences {
    #[validate(length(min = 1))]
    pub course: String,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    #[validate(range(min = 1))]
    pub question_count: u32,
    #[validate(length(min = 1))]
    pub question_types: Vec<QuestionType>,
    pub language: String,
    pub difficulty: Difficulty,
    /// Seconds allowed per question, when per-question timing is used.
    pub time_limit: Option<u32>,
    /// Minutes allowed for the whole quiz, when a global timer is used.
    pub total_time_limit: Option<u32>,
    pub time_limit_enabled: bool,
    pub negative_marking: bool,
    #[validate(range(min = 0.0))]
    pub negative_marks: f64,
    pub mode: QuizMode,
}

impl QuizPreferences {
    pub fn answer_mode(&self) -> AnswerMode {
        match self.mode {
            QuizMode::Practice => AnswerMode::Immediate,
            QuizMode::Exam => AnswerMode::End,
        }
    }

    pub fn wants(&self, kind: QuestionType) -> bool {
        self.question_types.contains(&kind)
    }
}

impl Default for QuizPreferences {
    fn default() -> Self {
        Self {
            course: String::new(),
            topic: None,
            subtopic: None,
            question_count: 5,
            question_types: vec![QuestionType::MultipleChoice],
            language: "English".to_string(),
            difficulty: Difficulty::Medium,
            time_limit: None,
            total_time_limit: None,
            time_limit_enabled: false,
            negative_marking: false,
            negative_marks: 0.0,
            mode: QuizMode::Practice,
        }
    }
}
