pub mod answer_evaluation;
pub mod explanation;
pub mod generation;
pub mod quiz_analysis;
