//! crates/learnstake_core/src/generation.rs
//!
//! Turns a course's content into a prompt, asks the text generator for a batch
//! of multiple-choice questions and stores the ones that pass validation.
//!
//! An unreadable reply (not a JSON array once code fences are stripped) fails the
//! whole batch. A malformed item only fails itself and is listed in the report.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Course, Lesson};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, QuizGenerationService};
use crate::quiz::{persist_question, OptionDraft, QuestionWithOptions};

/// Every generated question must carry exactly this many options.
pub const OPTIONS_PER_GENERATED_QUESTION: usize = 4;

/// Largest batch a single request may ask for.
pub const MAX_GENERATED_QUESTIONS: u32 = 50;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub course_id: Uuid,
    pub question_count: u32,
    pub difficulty: String,
}

#[derive(Debug, Clone)]
pub struct GenerationFailure {
    /// The item exactly as the generator produced it.
    pub item: Value,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub generated: usize,
    pub saved: Vec<QuestionWithOptions>,
    pub failed: Vec<GenerationFailure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    #[serde(default)]
    question_text: String,
    #[serde(default)]
    options: Vec<GeneratedOption>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedOption {
    #[serde(default)]
    option_text: String,
    #[serde(default)]
    is_correct: bool,
}

//=========================================================================================
// Prompt Construction
//=========================================================================================

/// Summarizes a course as a single paragraph: title, description and lesson titles.
pub fn describe_course(course: &Course, lessons: &[Lesson]) -> String {
    let lesson_titles = lessons
        .iter()
        .map(|lesson| lesson.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Course Name: {}. Description: {}. Lessons: {}.",
        course.title, course.description, lesson_titles
    )
}

pub fn build_prompt(paragraph: &str, request: &GenerationRequest) -> String {
    format!(
        r#"Generate {count} multiple-choice questions (MCQs) from the following source paragraph.
Difficulty level: {difficulty}, course ID: {course_id}.

Your output must be valid JSON: an array of question objects with these keys:
- questionText: string
- options: array of {options} option objects with:
  - optionText: string
  - isCorrect: boolean (exactly one true)

Example:
[
  {{
    "questionText": "What is...?",
    "options": [
      {{"optionText": "A", "isCorrect": false}},
      {{"optionText": "B", "isCorrect": true}},
      {{"optionText": "C", "isCorrect": false}},
      {{"optionText": "D", "isCorrect": false}}
    ]
  }}
]

Generate from this paragraph:
"{paragraph}"
"#,
        count = request.question_count,
        difficulty = request.difficulty,
        course_id = request.course_id,
        options = OPTIONS_PER_GENERATED_QUESTION,
        paragraph = paragraph,
    )
}

//=========================================================================================
// Reply Parsing
//=========================================================================================

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z]*").expect("fence pattern is valid"))
}

/// Removes markdown code-fence markers (with or without a language tag).
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}

/// Parses the generator's reply into its list of raw items.
pub fn parse_generated(raw: &str) -> ServiceResult<Vec<Value>> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(ServiceError::UpstreamFormat(format!(
            "expected a JSON array of questions, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ServiceError::UpstreamFormat(format!(
            "Failed to parse generator output: {}",
            e
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validates one generated item. On success returns its text, its options and
/// the index of the correct option.
fn check_item(item: &Value) -> Result<(String, Vec<OptionDraft>, usize), String> {
    let parsed: GeneratedQuestion = serde_json::from_value(item.clone())
        .map_err(|e| format!("Invalid question format: {}", e))?;

    if parsed.question_text.trim().is_empty() {
        return Err("questionText is missing or blank".to_string());
    }
    if parsed.options.len() != OPTIONS_PER_GENERATED_QUESTION {
        return Err(format!(
            "expected {} options, got {}",
            OPTIONS_PER_GENERATED_QUESTION,
            parsed.options.len()
        ));
    }
    if let Some(position) = parsed
        .options
        .iter()
        .position(|o| o.option_text.trim().is_empty())
    {
        return Err(format!("option {} has no text", position + 1));
    }

    let correct: Vec<usize> = parsed
        .options
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_correct)
        .map(|(i, _)| i)
        .collect();
    if correct.len() != 1 {
        return Err(format!(
            "Must have exactly one correct answer, got {}",
            correct.len()
        ));
    }

    let options = parsed
        .options
        .into_iter()
        .map(|o| OptionDraft::new(o.option_text, o.is_correct))
        .collect();
    Ok((parsed.question_text, options, correct[0]))
}

//=========================================================================================
// Orchestration
//=========================================================================================

fn validate_request(request: &GenerationRequest) -> ServiceResult<()> {
    if request.question_count == 0 || request.question_count > MAX_GENERATED_QUESTIONS {
        return Err(ServiceError::validation(format!(
            "questionCount must be between 1 and {}",
            MAX_GENERATED_QUESTIONS
        )));
    }
    if request.difficulty.trim().is_empty() {
        return Err(ServiceError::validation("difficulty is required"));
    }
    Ok(())
}

/// Generates and stores a batch of questions for a course.
pub async fn generate_questions(
    db: &dyn DatabaseService,
    generator: &dyn QuizGenerationService,
    request: GenerationRequest,
) -> ServiceResult<GenerationReport> {
    validate_request(&request)?;

    let course = db.get_course_by_id(request.course_id).await?;
    let lessons = db.list_lessons_by_course(request.course_id).await?;

    let paragraph = describe_course(&course, &lessons);
    let prompt = build_prompt(&paragraph, &request);

    info!(
        "Requesting {} {} questions for course {}",
        request.question_count, request.difficulty, request.course_id
    );
    let raw = generator.generate(&prompt).await?;
    let items = parse_generated(&raw).inspect_err(|e| {
        warn!("Discarding generator reply for course {}: {}", request.course_id, e);
    })?;

    let mut report = GenerationReport {
        generated: items.len(),
        ..Default::default()
    };

    for item in items {
        let (question_text, options, correct_index) = match check_item(&item) {
            Ok(checked) => checked,
            Err(reason) => {
                warn!("Rejected generated question: {}", reason);
                report.failed.push(GenerationFailure { item, reason });
                continue;
            }
        };

        match persist_question(db, course.id, &question_text, &options, correct_index).await {
            Ok(saved) => report.saved.push(saved),
            Err(e) => {
                warn!("Failed to save generated question: {}", e);
                report.failed.push(GenerationFailure {
                    item,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Generation for course {} finished: {} generated, {} saved, {} failed",
        course.id,
        report.generated,
        report.saved.len(),
        report.failed.len()
    );
    Ok(report)
}
