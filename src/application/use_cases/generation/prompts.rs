use chrono::Utc;
use rand::Rng;

use crate::domain::preferences::{QuestionType, QuizPreferences};
use crate::domain::quiz_result::QuizResult;

/// Rotating angles that steer each batch toward a different flavour of
/// question, so repeated runs on the same topic do not converge.
pub(crate) const VARIETY_HINTS: [&str; 8] = [
    "Focus on practical applications and real-world scenarios",
    "Emphasize theoretical concepts and fundamental principles",
    "Include problem-solving and analytical thinking questions",
    "Cover historical context and evolution of concepts",
    "Focus on current trends and modern developments",
    "Include comparative analysis and critical thinking",
    "Emphasize hands-on implementation and technical details",
    "Cover interdisciplinary connections and broader implications",
];

/// Per-batch randomisation inputs. Drawn once up front so the prompt built
/// from them is reproducible and the receipt can echo them back.
#[derive(Debug, Clone)]
pub(crate) struct PromptSeed {
    pub session_id: String,
    pub seed: u64,
    pub variety_hint: &'static str,
}

impl PromptSeed {
    pub(crate) fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            session_id: random_base36(13),
            seed: Utc::now().timestamp_millis() as u64 + rng.gen_range(0..1_000_000),
            variety_hint: VARIETY_HINTS[rng.gen_range(0..VARIETY_HINTS.len())],
        }
    }
}

fn random_base36(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

fn subject_line(preferences: &QuizPreferences) -> String {
    let mut subject = preferences.course.clone();
    if let Some(topic) = preferences.topic.as_ref() {
        subject.push_str(&format!(" - {}", topic));
    }
    if let Some(subtopic) = preferences.subtopic.as_ref() {
        subject.push_str(&format!(" ({})", subtopic));
    }
    subject
}

fn requested_kinds(preferences: &QuizPreferences) -> Vec<QuestionType> {
    let mut kinds = Vec::new();
    for kind in &preferences.question_types {
        if !kinds.contains(kind) {
            kinds.push(*kind);
        }
    }
    kinds
}

pub(crate) fn build_quiz_prompt(
    preferences: &QuizPreferences,
    historical_questions: &[String],
    seed: &PromptSeed,
) -> String {
    let kinds = requested_kinds(preferences);
    let kind_list = kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut body = String::new();
    body.push_str(&format!(
        "QUIZ GENERATION SESSION: {} | VARIETY SEED: {}\n\n",
        seed.session_id, seed.seed
    ));
    body.push_str(&format!(
        "Generate a UNIQUE and DIVERSE premium-quality quiz about \"{}\" with exactly {} questions.\n",
        subject_line(preferences),
        preferences.question_count
    ));

    body.push_str(&format!(
        r#"
CRITICAL UNIQUENESS REQUIREMENTS:
1. VARIETY FOCUS: {hint}
2. RANDOMIZATION SEED: {seed} - Use this to ensure different question angles
3. AVOID COMMON PATTERNS: Do not use typical textbook examples or standard questions
4. PERSPECTIVE SHIFTS: Approach topics from multiple angles (practical, theoretical, historical, futuristic)
5. DIFFICULTY VARIATION: Within {difficulty} level, vary complexity from basic to advanced
6. CONTEXT DIVERSITY: Use different scenarios, industries, time periods, and applications
7. QUESTION STEM VARIETY: Use different question formats and phrasings
8. CONTENT DEPTH: Mix surface-level and deep conceptual understanding
"#,
        hint = seed.variety_hint,
        seed = seed.seed,
        difficulty = preferences.difficulty.as_str()
    ));

    body.push_str(
        r#"
ADVANCED QUESTION DIVERSIFICATION:
- Use different cognitive levels: Remember, Understand, Apply, Analyze, Evaluate, Create
- Include questions from different subtopics within the main topic
- Vary the context: academic, professional, personal, societal applications
- Use different time frames: historical, current, future implications
- Mix concrete examples with abstract concepts
- Use different cultural and geographical contexts when appropriate
"#,
    );

    if !historical_questions.is_empty() {
        body.push_str(
            "\nCRITICAL REPETITION AVOIDANCE:\nDO NOT generate questions that are similar in concept, phrasing, or core idea to the following past questions. Focus on semantic uniqueness, not just lexical differences. Avoid re-using the same examples or scenarios.\n",
        );
        for (index, question) in historical_questions.iter().enumerate() {
            body.push_str(&format!("{}. {}\n", index + 1, question));
        }
    }

    body.push_str(&format!(
        r#"
STRICT COMMERCIAL REQUIREMENTS:
1. CORE PARAMETERS:
- Course/Stream: {course}
- Topic: {topic}
"#,
        course = preferences.course,
        topic = preferences
            .topic
            .as_deref()
            .unwrap_or("General concepts and principles"),
    ));
    if let Some(subtopic) = preferences.subtopic.as_ref() {
        body.push_str(&format!("- Subtopic: {}\n", subtopic));
    }
    body.push_str(&format!(
        r#"- Language: {language} (flawless grammar)
- Difficulty: {difficulty} (with natural variation)
- Question Types: ONLY {kinds} - DO NOT include any other question types
- Each question must be unique and not repetitive
- Include practical applications and real-world scenarios
- AVOID standard textbook questions - be creative and original

2. STRICT QUESTION TYPE REQUIREMENTS:
"#,
        language = preferences.language,
        difficulty = preferences.difficulty.as_str(),
        kinds = kind_list,
    ));

    for kind in &kinds {
        body.push_str(kind_contract(*kind));
    }

    body.push_str(&format!(
        r#"
CRITICAL REQUIREMENTS:
1. Every question MUST include:
   - Complete "text" field with a clear question
   - Appropriate fields for its type (see examples)
   - Detailed "explanation" field
   - All text in {language}

2. Format as a valid JSON array with no trailing commas
3. Use double quotes for strings and escape quotes within strings
4. No text outside the JSON array
5. No missing or null fields
6. For multi-select questions, ALWAYS include EXACTLY 2 OR 3 correct options - no more, no less
7. For case-study and situation questions, ALWAYS include a detailed scenario (100+ words)
8. For short-answer and fill-blank questions, ALWAYS include a keywords array for flexible matching
9. CRITICAL: Generate ONLY questions of the specified types: {kinds}"#,
        language = preferences.language,
        kinds = kind_list,
    ));

    body
}

fn kind_contract(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::MultipleChoice => {
            r#"
For multiple-choice:
- MUST have "text": clear, complete question
- MUST have "options": array of EXACTLY 4 distinct, complete answers
- MUST have "correctAnswer": exact match of the correct option
- MUST have "explanation": detailed explanation of why the answer is correct
- Ensure the correct answer is NOT always the first option. Randomize the order of options for each question.
Example:
{
  "type": "multiple-choice",
  "text": "What is the primary function of a CPU in a computer system?",
  "options": [
    "Execute instructions and perform calculations",
    "Store long-term data permanently",
    "Display graphics on the monitor",
    "Connect to the internet"
  ],
  "correctAnswer": "Execute instructions and perform calculations",
  "explanation": "The CPU executes program instructions and performs the arithmetic and logic the rest of the system depends on."
}
"#
        }
        QuestionType::TrueFalse => {
            r#"
For true-false:
- MUST have "text": clear, complete statement to evaluate
- MUST have "options": ["True", "False"]
- MUST have "correctAnswer": either "True" or "False"
- MUST have "explanation": detailed explanation of why true or false
Example:
{
  "type": "true-false",
  "text": "The binary number system uses only 0s and 1s.",
  "options": ["True", "False"],
  "correctAnswer": "True",
  "explanation": "Binary is a base-2 system, so every value is expressed with the digits 0 and 1."
}
"#
        }
        QuestionType::MultiSelect => {
            r#"
For multi-select:
- MUST have "text": clear question specifying "Select all that apply"
- MUST have "options": array of EXACTLY 6 complete, distinct options
- MUST have "correctOptions": array of EXACTLY 2 OR 3 correct options (no more, no less)
- MUST have "explanation": explain why each correct option is right AND why the others are wrong
Example:
{
  "type": "multi-select",
  "text": "Which of the following are object-oriented programming languages? (Select all that apply)",
  "options": ["Java", "C", "Python", "Assembly", "Ruby", "COBOL"],
  "correctOptions": ["Java", "Python", "Ruby"],
  "explanation": "Java, Python, and Ruby support encapsulation, inheritance, and polymorphism. C is procedural, Assembly is low-level, and COBOL is primarily procedural."
}
"#
        }
        QuestionType::Sequence => {
            r#"
For sequence:
- MUST have "text": clear instruction about what to sequence
- MUST have "sequence": array of 4-6 complete steps in RANDOM order
- MUST have "correctSequence": the same steps in CORRECT order
- MUST have "explanation": explain the logic behind EACH step in the sequence
Example:
{
  "type": "sequence",
  "text": "Arrange the following steps of the TCP three-way handshake in the correct order:",
  "sequence": ["Client sends ACK", "Server sends SYN-ACK", "Client sends SYN", "Connection established"],
  "correctSequence": ["Client sends SYN", "Server sends SYN-ACK", "Client sends ACK", "Connection established"],
  "explanation": "1. The client requests a connection with SYN. 2. The server acknowledges with SYN-ACK. 3. The client confirms with ACK. 4. The connection is established."
}
"#
        }
        QuestionType::CaseStudy => {
            r#"
For case-study:
- MUST have "text": brief introduction
- MUST have "caseStudy": detailed scenario description (minimum 100 words)
- MUST have "question": specific question about the case
- MUST have "options": array of EXACTLY 4 possible solutions
- MUST have "correctAnswer": the best solution (exact match)
- MUST have "explanation": detailed analysis of ALL options
Example:
{
  "type": "case-study",
  "text": "Analyze this e-commerce scaling scenario:",
  "caseStudy": "An e-commerce platform built as a monolith on a single server slows down and occasionally crashes during flash sales. CPU reaches 100%, database connections are exhausted, and the application becomes unresponsive. The company wants to handle ten times more concurrent users while keeping response times under 500ms.",
  "question": "What is the most effective immediate solution to handle the traffic spikes?",
  "options": [
    "Implement horizontal scaling with load balancing",
    "Upgrade to a more powerful server",
    "Switch to a NoSQL database",
    "Add application caching"
  ],
  "correctAnswer": "Implement horizontal scaling with load balancing",
  "explanation": "Horizontal scaling removes the single-server bottleneck and scales with demand. A bigger server only delays the limit, a database swap does not address the CPU bottleneck, and caching alone cannot absorb the concurrent load."
}
"#
        }
        QuestionType::Situation => {
            r#"
For situation:
- MUST have "text": brief introduction
- MUST have "situation": detailed scenario description (minimum 100 words)
- MUST have "question": specific question about the situation
- MUST have "options": array of EXACTLY 4 possible actions
- MUST have "correctAnswer": most appropriate action (exact match)
- MUST have "explanation": detailed analysis of ALL options and their consequences
Example:
{
  "type": "situation",
  "text": "Handle a critical production incident:",
  "situation": "You are the developer on call when the main API starts returning 500 errors for a third of requests at 2 AM. Logs show database connection timeouts and memory spikes. The last deployment, six hours ago, included schema changes and new endpoints. A twelve-hour-old backup exists but restoring it loses customer data, and downtime costs are mounting every hour.",
  "question": "What should be your first action?",
  "options": [
    "Immediately roll back the last deployment",
    "Scale up database resources",
    "Analyze logs and metrics for root cause",
    "Restore from the latest backup"
  ],
  "correctAnswer": "Analyze logs and metrics for root cause",
  "explanation": "Diagnosing first identifies the real fault with the least risk. Rolling back blindly can corrupt state, scaling may waste time if the database is not the bottleneck, and restoring a backup guarantees data loss."
}
"#
        }
        QuestionType::ShortAnswer => {
            r#"
For short-answer:
- MUST have "text": clear, specific question
- MUST have "correctAnswer": concise, accurate answer (1-3 words typically)
- MUST have "explanation": detailed explanation of the answer
- MUST have "keywords": array of key terms that should be present in a correct answer
Example:
{
  "type": "short-answer",
  "text": "What is the time complexity of the binary search algorithm?",
  "correctAnswer": "O(log n)",
  "explanation": "Binary search halves the remaining range on every comparison, so the number of steps grows logarithmically.",
  "keywords": ["O(log n)", "logarithmic", "log n"]
}
"#
        }
        QuestionType::FillBlank => {
            r#"
For fill-blank:
- MUST have "text": sentence with ONE blank marked as _____
- MUST have "correctAnswer": the word or phrase that fills the blank
- MUST have "explanation": detailed explanation
- MUST have "keywords": array of acceptable variations of the answer
Example:
{
  "type": "fill-blank",
  "text": "The _____ design pattern ensures that a class has only one instance and provides global access to it.",
  "correctAnswer": "Singleton",
  "explanation": "The Singleton pattern restricts instantiation of a class to one object and exposes a global access point to it.",
  "keywords": ["Singleton", "singleton"]
}
"#
        }
    }
}

pub(crate) fn build_explanation_prompt(
    question: &str,
    correct_answer: &str,
    topic: &str,
    language: &str,
) -> String {
    format!(
        r#"Explain why "{correct_answer}" is the correct answer to this {topic} question: "{question}"

Requirements:
- Use {language} language
- Be clear and concise
- Include relevant concepts
- Explain step-by-step if applicable
- Add examples if helpful"#
    )
}

pub(crate) fn build_evaluation_prompt(
    question: &str,
    user_answer: &str,
    correct_answer: &str,
    keywords: &[String],
    language: &str,
) -> String {
    format!(
        r#"Evaluate this student answer for the question:

Question: "{question}"
Correct Answer: "{correct_answer}"
Student Answer: "{user_answer}"
Key Terms: {keywords}

Evaluation Criteria:
1. Check if the student answer contains the core concepts
2. Look for key terms or their synonyms
3. Consider spelling variations and abbreviations
4. Evaluate partial correctness
5. Provide constructive feedback

Respond in JSON format:
{{
  "isCorrect": boolean (true if the answer demonstrates understanding, even with minor errors),
  "score": number (0-100, percentage of correctness),
  "feedback": "detailed explanation in {language}"
}}

Be lenient with:
- Minor spelling mistakes
- Different word order
- Synonyms and abbreviations
- Partial answers that show understanding

Be strict with:
- Completely wrong concepts
- Missing core elements
- Contradictory information"#,
        keywords = keywords.join(", "),
    )
}

pub(crate) fn build_analysis_prompt(
    current: &QuizResult,
    history: &[QuizResult],
    preferences: &QuizPreferences,
) -> String {
    let mut body = String::new();
    body.push_str(
        "Analyze the user's quiz performance and provide personalized strengths, weaknesses, recommendations, and comparative performance.\n",
    );

    body.push_str(&format!(
        r#"
Current Quiz Result:
- Score: {percentage}%
- Correct Answers: {correct}/{total}
- Time Taken: {time} seconds
- Accuracy Rate: {accuracy}%
- Completion Rate: {completion}%
- Question Type Performance: {per_type}
- Quiz Preferences: Course: {course}, Topic: {topic}, Difficulty: {difficulty}, Language: {language}
"#,
        percentage = current.percentage,
        correct = current.correct_answers,
        total = current.total_questions,
        time = current.total_time_taken_secs,
        accuracy = current.accuracy_rate,
        completion = current.completion_rate,
        per_type = performance_json(current),
        course = preferences.course,
        topic = preferences.topic.as_deref().unwrap_or("General"),
        difficulty = preferences.difficulty.as_str(),
        language = preferences.language,
    ));

    if history.is_empty() {
        body.push_str("\nNo historical quiz results are available; base the analysis solely on the current quiz.\n");
    } else {
        body.push_str(&format!(
            "\nHistorical Quiz Results (last {} quizzes, sorted by date descending):\n",
            history.len()
        ));
        for (index, result) in history.iter().enumerate() {
            body.push_str(&format!(
                r#"
  Quiz {number}:
  - Date: {date}
  - Score: {percentage}%
  - Correct: {correct}/{total}
  - Time: {time}s
  - Accuracy: {accuracy}%
  - Topic: {topic}
  - Difficulty: {difficulty}
  - Question Types: {per_type}
"#,
                number = index + 1,
                date = result.completed_at.format("%Y-%m-%d"),
                percentage = result.percentage,
                correct = result.correct_answers,
                total = result.total_questions,
                time = result.total_time_taken_secs,
                accuracy = result.accuracy_rate,
                topic = result.topic.as_deref().unwrap_or("General"),
                difficulty = result
                    .difficulty
                    .map(|d| d.as_str())
                    .unwrap_or("unspecified"),
                per_type = performance_json(result),
            ));
        }
    }

    body.push_str(
        r#"
Based on the current quiz and historical data, provide the following in JSON format:
{
  "strengths": ["List of specific strengths based on performance patterns"],
  "weaknesses": ["List of specific weaknesses based on performance patterns"],
  "recommendations": ["Actionable recommendations for improvement"],
  "comparativePerformance": {
    "overall": "How current performance compares to the historical average",
    "topicSpecific": "How current performance compares to past quizzes on the same topic (if available)",
    "difficultySpecific": "How current performance compares to past quizzes of the same difficulty (if available)"
  }
}

Consider:
- Consistency in performance over time.
- Improvement or decline in specific topics or question types.
- Efficiency (time taken vs. score).
- Areas where the user consistently performs well or struggles.
- Provide actionable and encouraging recommendations.
- If no historical data, base the analysis solely on the current quiz.
"#,
    );

    body
}

fn performance_json(result: &QuizResult) -> String {
    serde_json::to_string(&result.question_type_performance)
        .unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::Difficulty;
    use crate::domain::quiz_result::{AnswerOutcome, RecordedAnswer};

    fn prefs() -> QuizPreferences {
        QuizPreferences {
            course: "Computer Science".to_string(),
            topic: Some("Networking".to_string()),
            subtopic: Some("TCP".to_string()),
            question_count: 3,
            question_types: vec![QuestionType::MultipleChoice, QuestionType::Sequence],
            difficulty: Difficulty::Hard,
            ..QuizPreferences::default()
        }
    }

    fn seed() -> PromptSeed {
        PromptSeed {
            session_id: "abc123def4567".to_string(),
            seed: 1_700_000_000_123,
            variety_hint: VARIETY_HINTS[0],
        }
    }

    #[test]
    fn test_quiz_prompt_embeds_session_and_seed() {
        let prompt = build_quiz_prompt(&prefs(), &[], &seed());
        assert!(prompt.contains("QUIZ GENERATION SESSION: abc123def4567"));
        assert!(prompt.contains("VARIETY SEED: 1700000000123"));
        assert!(prompt.contains(VARIETY_HINTS[0]));
    }

    #[test]
    fn test_quiz_prompt_carries_core_parameters() {
        let prompt = build_quiz_prompt(&prefs(), &[], &seed());
        assert!(prompt.contains("\"Computer Science - Networking (TCP)\""));
        assert!(prompt.contains("exactly 3 questions"));
        assert!(prompt.contains("Language: English"));
        assert!(prompt.contains("Difficulty: hard"));
        assert!(prompt.contains("ONLY multiple-choice, sequence"));
    }

    #[test]
    fn test_quiz_prompt_includes_only_requested_contracts() {
        let prompt = build_quiz_prompt(&prefs(), &[], &seed());
        assert!(prompt.contains("For multiple-choice:"));
        assert!(prompt.contains("For sequence:"));
        assert!(!prompt.contains("For multi-select:"));
        assert!(!prompt.contains("For fill-blank:"));
    }

    #[test]
    fn test_quiz_prompt_numbers_historical_questions() {
        let history = vec![
            "What is TCP?".to_string(),
            "Explain the three-way handshake.".to_string(),
        ];
        let prompt = build_quiz_prompt(&prefs(), &history, &seed());
        assert!(prompt.contains("CRITICAL REPETITION AVOIDANCE"));
        assert!(prompt.contains("1. What is TCP?"));
        assert!(prompt.contains("2. Explain the three-way handshake."));
    }

    #[test]
    fn test_quiz_prompt_omits_avoidance_block_without_history() {
        let prompt = build_quiz_prompt(&prefs(), &[], &seed());
        assert!(!prompt.contains("CRITICAL REPETITION AVOIDANCE"));
    }

    #[test]
    fn test_duplicate_kinds_listed_once() {
        let mut preferences = prefs();
        preferences.question_types = vec![
            QuestionType::MultipleChoice,
            QuestionType::MultipleChoice,
            QuestionType::TrueFalse,
        ];
        let prompt = build_quiz_prompt(&preferences, &[], &seed());
        assert!(prompt.contains("ONLY multiple-choice, true-false"));
        assert_eq!(prompt.matches("For multiple-choice:").count(), 1);
    }

    #[test]
    fn test_prompt_seed_shape() {
        let seed = PromptSeed::generate();
        assert_eq!(seed.session_id.len(), 13);
        assert!(seed
            .session_id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(VARIETY_HINTS.contains(&seed.variety_hint));
        assert!(seed.seed > 0);
    }

    #[test]
    fn test_explanation_prompt_quotes_question_and_answer() {
        let prompt =
            build_explanation_prompt("What is DNS?", "Domain Name System", "networking", "English");
        assert!(prompt.contains("\"Domain Name System\""));
        assert!(prompt.contains("\"What is DNS?\""));
        assert!(prompt.contains("Use English language"));
    }

    #[test]
    fn test_evaluation_prompt_lists_key_terms() {
        let prompt = build_evaluation_prompt(
            "Define latency.",
            "delay before transfer",
            "The delay before a transfer of data begins",
            &["delay".to_string(), "latency".to_string()],
            "English",
        );
        assert!(prompt.contains("Key Terms: delay, latency"));
        assert!(prompt.contains("\"isCorrect\": boolean"));
        assert!(prompt.contains("detailed explanation in English"));
    }

    #[test]
    fn test_analysis_prompt_includes_history_entries() {
        let preferences = prefs();
        let current = QuizResult::from_answers(
            &[RecordedAnswer::new(
                QuestionType::MultipleChoice,
                AnswerOutcome::Correct,
                12,
            )],
            &preferences,
        );
        let mut past = QuizResult::from_answers(
            &[RecordedAnswer::new(
                QuestionType::MultipleChoice,
                AnswerOutcome::Incorrect,
                40,
            )],
            &preferences,
        );
        past.topic = Some("Routing".to_string());

        let prompt = build_analysis_prompt(&current, &[past], &preferences);
        assert!(prompt.contains("Historical Quiz Results (last 1 quizzes"));
        assert!(prompt.contains("Topic: Routing"));
        assert!(prompt.contains("\"comparativePerformance\""));
    }

    #[test]
    fn test_analysis_prompt_flags_missing_history() {
        let preferences = prefs();
        let current = QuizResult::from_answers(&[], &preferences);
        let prompt = build_analysis_prompt(&current, &[], &preferences);
        assert!(prompt.contains("No historical quiz results are available"));
    }
}
