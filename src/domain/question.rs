use serde::{Deserialize, Serialize};

use crate::domain::preferences::QuestionType;

/// Kind-specific payload of a quiz question. Tagged so that untyped oracle
/// output cannot travel past the validation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuestionKind {
    #[serde(rename = "multiple-choice", rename_all = "camelCase")]
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
    },
    #[serde(rename = "true-false", rename_all = "camelCase")]
    TrueFalse {
        options: Vec<String>,
        correct_answer: String,
    },
    #[serde(rename = "multi-select", rename_all = "camelCase")]
    MultiSelect {
        options: Vec<String>,
        correct_options: Vec<String>,
    },
    #[serde(rename = "sequence", rename_all = "camelCase")]
    Sequence {
        sequence: Vec<String>,
        correct_sequence: Vec<String>,
    },
    #[serde(rename = "case-study", rename_all = "camelCase")]
    CaseStudy {
        case_study: String,
        question: String,
        options: Vec<String>,
        correct_answer: String,
    },
    #[serde(rename = "situation", rename_all = "camelCase")]
    Situation {
        situation: String,
        question: String,
        options: Vec<String>,
        correct_answer: String,
    },
    #[serde(rename = "short-answer", rename_all = "camelCase")]
    ShortAnswer {
        correct_answer: String,
        keywords: Vec<String>,
    },
    #[serde(rename = "fill-blank", rename_all = "camelCase")]
    FillBlank {
        correct_answer: String,
        keywords: Vec<String>,
    },
}

impl QuestionKind {
    /// Human-readable rendering of the correct answer, used when a question is
    /// bookmarked or quoted back to the oracle.
    pub fn answer_text(&self) -> String {
        match self {
            QuestionKind::MultipleChoice { correct_answer, .. }
            | QuestionKind::TrueFalse { correct_answer, .. }
            | QuestionKind::CaseStudy { correct_answer, .. }
            | QuestionKind::Situation { correct_answer, .. }
            | QuestionKind::ShortAnswer { correct_answer, .. }
            | QuestionKind::FillBlank { correct_answer, .. } => correct_answer.clone(),
            QuestionKind::MultiSelect {
                correct_options, ..
            } => correct_options.join(", "),
            QuestionKind::Sequence {
                correct_sequence, ..
            } => correct_sequence.join(" -> "),
        }
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::MultiSelect { .. } => QuestionType::MultiSelect,
            QuestionKind::Sequence { .. } => QuestionType::Sequence,
            QuestionKind::CaseStudy { .. } => QuestionType::CaseStudy,
            QuestionKind::Situation { .. } => QuestionType::Situation,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::FillBlank { .. } => QuestionType::FillBlank,
        }
    }
}

/// A validated quiz question. Ids are assigned sequentially per batch and the
/// language is stamped from the preferences that produced the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub explanation: String,
    pub language: String,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn kind_tag(&self) -> &'static str {
        self.question_type().as_str()
    }
}
