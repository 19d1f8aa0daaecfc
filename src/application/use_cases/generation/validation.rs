use std::collections::HashSet;

use super::types::RawQuestion;
use crate::domain::error::{AppError, Result};
use crate::domain::preferences::QuestionType;
use crate::domain::question::{Question, QuestionKind};

const BLANK_MARKER: &str = "_____";
const MIN_SCENARIO_CHARS: usize = 100;

/// Validates a raw question and assembles the typed form. `number` is the
/// 1-based position in the accepted batch; it becomes the question id and is
/// used in every error message. The whole batch is rejected on the first
/// failing question.
pub(crate) fn build_question(number: u32, language: &str, raw: RawQuestion) -> Result<Question> {
    if raw.text.trim().is_empty() || raw.explanation.trim().is_empty() {
        return Err(validation_error(
            number,
            "missing required base fields (text, type, or explanation)",
        ));
    }
    reject_unexpected_fields(number, &raw)?;

    let kind = match raw.question_type {
        QuestionType::MultipleChoice => {
            let (options, correct_answer) = match (raw.options, raw.correct_answer) {
                (Some(options), Some(answer)) if options.len() == 4 && !answer.is_empty() => {
                    (options, answer)
                }
                _ => {
                    return Err(validation_error(
                        number,
                        "(multiple-choice) must have exactly 4 options and a correctAnswer",
                    ))
                }
            };
            if !all_distinct(&options) {
                return Err(validation_error(
                    number,
                    "(multiple-choice) options must be distinct",
                ));
            }
            if !options.contains(&correct_answer) {
                return Err(validation_error(
                    number,
                    "correctAnswer must match one of the options exactly",
                ));
            }
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            }
        }

        QuestionType::TrueFalse => {
            let options = raw.options.unwrap_or_default();
            if options.len() != 2 || options[0] != "True" || options[1] != "False" {
                return Err(validation_error(
                    number,
                    "(true-false) must have options [\"True\", \"False\"]",
                ));
            }
            let correct_answer = raw.correct_answer.unwrap_or_default();
            if correct_answer != "True" && correct_answer != "False" {
                return Err(validation_error(
                    number,
                    "correctAnswer must be \"True\" or \"False\"",
                ));
            }
            QuestionKind::TrueFalse {
                options,
                correct_answer,
            }
        }

        QuestionType::MultiSelect => {
            let options = raw.options.unwrap_or_default();
            if options.len() != 6 {
                return Err(validation_error(
                    number,
                    "(multi-select) must have exactly 6 options",
                ));
            }
            if !all_distinct(&options) {
                return Err(validation_error(
                    number,
                    "(multi-select) options must be distinct",
                ));
            }
            let correct_options = raw
                .correct_options
                .ok_or_else(|| validation_error(number, "must have correctOptions array"))?;
            if correct_options.len() < 2 || correct_options.len() > 3 {
                return Err(validation_error(
                    number,
                    &format!(
                        "must have exactly 2 or 3 correct options (found {})",
                        correct_options.len()
                    ),
                ));
            }
            if !correct_options.iter().all(|opt| options.contains(opt)) {
                return Err(validation_error(
                    number,
                    "correctOptions must match options exactly",
                ));
            }
            QuestionKind::MultiSelect {
                options,
                correct_options,
            }
        }

        QuestionType::Sequence => {
            let (sequence, correct_sequence) = match (raw.sequence, raw.correct_sequence) {
                (Some(sequence), Some(correct)) => (sequence, correct),
                _ => {
                    return Err(validation_error(
                        number,
                        "must have sequence and correctSequence arrays",
                    ))
                }
            };
            if sequence.len() < 4
                || sequence.len() > 6
                || sequence.len() != correct_sequence.len()
            {
                return Err(validation_error(
                    number,
                    "must have 4-6 matching steps in sequence and correctSequence",
                ));
            }
            if !same_steps(&sequence, &correct_sequence) {
                return Err(validation_error(
                    number,
                    "sequence and correctSequence must contain the same steps",
                ));
            }
            QuestionKind::Sequence {
                sequence,
                correct_sequence,
            }
        }

        QuestionType::CaseStudy => {
            let (case_study, question, options, correct_answer) = match (
                raw.case_study,
                raw.question,
                raw.options,
                raw.correct_answer,
            ) {
                (Some(scenario), Some(question), Some(options), Some(answer))
                    if !scenario.is_empty()
                        && !question.is_empty()
                        && options.len() == 4
                        && !answer.is_empty() =>
                {
                    (scenario, question, options, answer)
                }
                _ => {
                    return Err(validation_error(
                        number,
                        "(case-study) must have caseStudy, question, exactly 4 options, and correctAnswer",
                    ))
                }
            };
            if case_study.chars().count() < MIN_SCENARIO_CHARS {
                return Err(validation_error(
                    number,
                    "case study description must be at least 100 characters",
                ));
            }
            if !options.contains(&correct_answer) {
                return Err(validation_error(
                    number,
                    "correctAnswer must match one of the options exactly",
                ));
            }
            QuestionKind::CaseStudy {
                case_study,
                question,
                options,
                correct_answer,
            }
        }

        QuestionType::Situation => {
            let (situation, question, options, correct_answer) = match (
                raw.situation,
                raw.question,
                raw.options,
                raw.correct_answer,
            ) {
                (Some(scenario), Some(question), Some(options), Some(answer))
                    if !scenario.is_empty()
                        && !question.is_empty()
                        && options.len() == 4
                        && !answer.is_empty() =>
                {
                    (scenario, question, options, answer)
                }
                _ => {
                    return Err(validation_error(
                        number,
                        "(situation) must have situation, question, exactly 4 options, and correctAnswer",
                    ))
                }
            };
            if situation.chars().count() < MIN_SCENARIO_CHARS {
                return Err(validation_error(
                    number,
                    "situation description must be at least 100 characters",
                ));
            }
            if !options.contains(&correct_answer) {
                return Err(validation_error(
                    number,
                    "correctAnswer must match one of the options exactly",
                ));
            }
            QuestionKind::Situation {
                situation,
                question,
                options,
                correct_answer,
            }
        }

        QuestionType::ShortAnswer => {
            let (correct_answer, keywords) = match (raw.correct_answer, raw.keywords) {
                (Some(answer), Some(keywords)) if !answer.is_empty() && !keywords.is_empty() => {
                    (answer, keywords)
                }
                _ => {
                    return Err(validation_error(
                        number,
                        "(short-answer) must have correctAnswer and keywords array",
                    ))
                }
            };
            QuestionKind::ShortAnswer {
                correct_answer,
                keywords,
            }
        }

        QuestionType::FillBlank => {
            let (correct_answer, keywords) = match (raw.correct_answer, raw.keywords) {
                (Some(answer), Some(keywords)) if !answer.is_empty() && !keywords.is_empty() => {
                    (answer, keywords)
                }
                _ => {
                    return Err(validation_error(
                        number,
                        "(fill-blank) must have correctAnswer and keywords array",
                    ))
                }
            };
            if !raw.text.contains(BLANK_MARKER) {
                return Err(validation_error(
                    number,
                    "(fill-blank) must contain _____ in the text",
                ));
            }
            QuestionKind::FillBlank {
                correct_answer,
                keywords,
            }
        }
    };

    Ok(Question {
        id: number,
        text: raw.text,
        kind,
        explanation: raw.explanation,
        language: language.to_string(),
    })
}

fn validation_error(number: u32, rule: &str) -> AppError {
    AppError::ValidationError(format!("Question {} {}", number, rule))
}

/// A question may only carry the payload fields its own kind mandates;
/// anything borrowed from another kind fails it.
fn reject_unexpected_fields(number: u32, raw: &RawQuestion) -> Result<()> {
    let kind = raw.question_type;
    let mut unexpected = Vec::new();

    let allows_options = matches!(
        kind,
        QuestionType::MultipleChoice
            | QuestionType::TrueFalse
            | QuestionType::MultiSelect
            | QuestionType::CaseStudy
            | QuestionType::Situation
    );
    let allows_correct_answer = !matches!(kind, QuestionType::MultiSelect | QuestionType::Sequence);
    let allows_scenario_question =
        matches!(kind, QuestionType::CaseStudy | QuestionType::Situation);
    let allows_keywords = matches!(kind, QuestionType::ShortAnswer | QuestionType::FillBlank);

    if raw.options.is_some() && !allows_options {
        unexpected.push("options");
    }
    if raw.correct_answer.is_some() && !allows_correct_answer {
        unexpected.push("correctAnswer");
    }
    if raw.correct_options.is_some() && kind != QuestionType::MultiSelect {
        unexpected.push("correctOptions");
    }
    if raw.sequence.is_some() && kind != QuestionType::Sequence {
        unexpected.push("sequence");
    }
    if raw.correct_sequence.is_some() && kind != QuestionType::Sequence {
        unexpected.push("correctSequence");
    }
    if raw.case_study.is_some() && kind != QuestionType::CaseStudy {
        unexpected.push("caseStudy");
    }
    if raw.situation.is_some() && kind != QuestionType::Situation {
        unexpected.push("situation");
    }
    if raw.question.is_some() && !allows_scenario_question {
        unexpected.push("question");
    }
    if raw.keywords.is_some() && !allows_keywords {
        unexpected.push("keywords");
    }

    if unexpected.is_empty() {
        Ok(())
    } else {
        Err(validation_error(
            number,
            &format!(
                "({}) carries fields of another kind: {}",
                kind.as_str(),
                unexpected.join(", ")
            ),
        ))
    }
}

fn all_distinct(items: &[String]) -> bool {
    let unique: HashSet<&String> = items.iter().collect();
    unique.len() == items.len()
}

/// Order-insensitive comparison that counts duplicates, so a step repeated in
/// one list but not the other is caught.
fn same_steps(a: &[String], b: &[String]) -> bool {
    let mut left = a.to_vec();
    let mut right = b.to_vec();
    left.sort();
    right.sort();
    left == right
}
