//! crates/learnstake_core/src/quiz.rs
//!
//! The quiz consistency service. It orchestrates writes across questions and
//! their options so that, after every successful create or update, a question
//! references exactly one of its own options as the correct answer.
//!
//! None of the multi-step sequences below are transactional. A failure part way
//! through can leave a question without a correct answer or with stray options;
//! the caller sees the error and nothing is rolled back.
//!
//! The store has no joins, so reads fetch questions and options separately and
//! merge them here. `is_correct` is never stored on an option; it is computed by
//! comparing the option id against the question's correct-answer reference.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{AnswerOption, Question};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;

/// Fewest options a question may have.
pub const MIN_OPTIONS: usize = 2;

//=========================================================================================
// Inputs and Views
//=========================================================================================

/// An incoming option. `id` is set when the option already exists (updates only).
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDraft {
    pub id: Option<Uuid>,
    pub option_text: String,
    pub is_correct: bool,
}

impl OptionDraft {
    pub fn new(option_text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: None,
            option_text: option_text.into(),
            is_correct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub course_id: Uuid,
    pub question_text: String,
    pub options: Vec<OptionDraft>,
}

#[derive(Debug, Clone)]
pub struct QuestionEdit {
    pub question_text: String,
    pub options: Vec<OptionDraft>,
}

/// An option as reported to callers, tagged with whether it is the correct one.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionWithOptions {
    pub question: Question,
    pub options: Vec<ScoredOption>,
}

impl QuestionWithOptions {
    /// Tags each option by comparing its id with the question's correct-answer reference.
    pub fn assemble(question: Question, options: Vec<AnswerOption>) -> Self {
        let options = options
            .into_iter()
            .map(|option| ScoredOption {
                is_correct: question.correct_answer_id == Some(option.id),
                id: option.id,
                question_id: option.question_id,
                option_text: option.option_text,
            })
            .collect();
        Self { question, options }
    }

    pub fn correct_option(&self) -> Option<&ScoredOption> {
        self.options.iter().find(|option| option.is_correct)
    }
}

//=========================================================================================
// Validation
//=========================================================================================

/// Checks the option set and returns the index of the single correct option.
fn validate_options(options: &[OptionDraft]) -> ServiceResult<usize> {
    if options.len() < MIN_OPTIONS {
        return Err(ServiceError::validation(format!(
            "at least {} options are required, got {}",
            MIN_OPTIONS,
            options.len()
        )));
    }

    if let Some(position) = options.iter().position(|o| o.option_text.trim().is_empty()) {
        return Err(ServiceError::validation(format!(
            "option {} has no text",
            position + 1
        )));
    }

    let mut flagged = options.iter().enumerate().filter(|(_, o)| o.is_correct);
    match (flagged.next(), flagged.next()) {
        (Some((index, _)), None) => Ok(index),
        (None, _) => Err(ServiceError::validation("No correct answer specified")),
        (Some(_), Some(_)) => Err(ServiceError::validation(
            "exactly one option must be marked correct",
        )),
    }
}

fn validate_question_text(question_text: &str) -> ServiceResult<()> {
    if question_text.trim().is_empty() {
        return Err(ServiceError::validation("questionText is required"));
    }
    Ok(())
}

//=========================================================================================
// Operations
//=========================================================================================

/// Creates a question and its options after checking the course exists.
pub async fn create_question(
    db: &dyn DatabaseService,
    draft: QuestionDraft,
) -> ServiceResult<QuestionWithOptions> {
    validate_question_text(&draft.question_text)?;
    let correct_index = validate_options(&draft.options)?;

    db.get_course_by_id(draft.course_id).await?;

    persist_question(
        db,
        draft.course_id,
        &draft.question_text,
        &draft.options,
        correct_index,
    )
    .await
}

/// Writes an already validated question: the question first, then each option in
/// input order, then the correct-answer reference.
pub(crate) async fn persist_question(
    db: &dyn DatabaseService,
    course_id: Uuid,
    question_text: &str,
    options: &[OptionDraft],
    correct_index: usize,
) -> ServiceResult<QuestionWithOptions> {
    let mut question = db.create_question(course_id, question_text).await?;
    debug!("Question {} saved for course {}", question.id, course_id);

    let mut created = Vec::with_capacity(options.len());
    for option in options {
        created.push(db.create_option(question.id, &option.option_text).await?);
    }

    let correct_id = created
        .get(correct_index)
        .map(|option| option.id)
        .ok_or_else(|| ServiceError::validation("correct option index out of range"))?;
    db.set_correct_answer(question.id, correct_id).await?;
    question.correct_answer_id = Some(correct_id);

    info!(
        "Question {} created with {} options, correct answer {}",
        question.id,
        created.len(),
        correct_id
    );
    Ok(QuestionWithOptions::assemble(question, created))
}

/// Replaces a question's text and option set.
///
/// Options carrying an id are edited in place, options without one are inserted,
/// and stored options missing from the payload are deleted. The payload must flag
/// exactly one option as correct; an update with no flagged option is rejected
/// rather than keeping the previous reference.
pub async fn update_question(
    db: &dyn DatabaseService,
    question_id: Uuid,
    edit: QuestionEdit,
) -> ServiceResult<QuestionWithOptions> {
    validate_question_text(&edit.question_text)?;
    let correct_index = validate_options(&edit.options)?;

    db.get_question_by_id(question_id).await?;
    let existing: HashSet<Uuid> = db
        .list_options_for_question(question_id)
        .await?
        .into_iter()
        .map(|option| option.id)
        .collect();

    let mut keep = Vec::new();
    for id in edit.options.iter().filter_map(|o| o.id) {
        if !existing.contains(&id) {
            return Err(ServiceError::validation(format!(
                "option {} does not belong to question {}",
                id, question_id
            )));
        }
        if keep.contains(&id) {
            return Err(ServiceError::validation(format!(
                "option {} appears more than once",
                id
            )));
        }
        keep.push(id);
    }

    let removed = db.delete_options_except(question_id, &keep).await?;
    debug!("Removed {} options from question {}", removed, question_id);

    let mut correct_id = None;
    for (index, option) in edit.options.iter().enumerate() {
        if let Some(id) = option.id {
            db.update_option_text(id, &option.option_text).await?;
            if index == correct_index {
                correct_id = Some(id);
            }
        }
    }
    for (index, option) in edit.options.iter().enumerate() {
        if option.id.is_none() {
            let created = db.create_option(question_id, &option.option_text).await?;
            if index == correct_index {
                correct_id = Some(created.id);
            }
        }
    }

    let correct_id = correct_id
        .ok_or_else(|| ServiceError::validation("No correct answer specified"))?;
    db.update_question_text(question_id, &edit.question_text).await?;
    db.set_correct_answer(question_id, correct_id).await?;

    info!("Question {} updated, correct answer {}", question_id, correct_id);
    fetch_question(db, question_id).await
}

/// Deletes the question's options, then the question. The option delete always
/// runs; the question delete reports `NotFound` when there was nothing to remove.
/// Returns the number of options removed.
pub async fn delete_question(db: &dyn DatabaseService, question_id: Uuid) -> ServiceResult<u64> {
    let removed = db.delete_options_for_question(question_id).await?;
    db.delete_question(question_id).await?;
    info!("Question {} deleted with {} options", question_id, removed);
    Ok(removed)
}

pub async fn fetch_question(
    db: &dyn DatabaseService,
    question_id: Uuid,
) -> ServiceResult<QuestionWithOptions> {
    let question = db.get_question_by_id(question_id).await?;
    let options = db.list_options_for_question(question_id).await?;
    Ok(QuestionWithOptions::assemble(question, options))
}

/// Fetches every question of a course, each with its own options attached.
pub async fn fetch_course_questions(
    db: &dyn DatabaseService,
    course_id: Uuid,
) -> ServiceResult<Vec<QuestionWithOptions>> {
    let questions = db.list_questions_by_course(course_id).await?;
    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let options = db.list_options_for_questions(&question_ids).await?;

    let mut by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionWithOptions::assemble(question, options)
        })
        .collect())
}

/// Deletes every question of a course, options first. Returns the number of questions removed.
pub async fn delete_course_questions(
    db: &dyn DatabaseService,
    course_id: Uuid,
) -> ServiceResult<usize> {
    let questions = db.list_questions_by_course(course_id).await?;
    for question in &questions {
        delete_question(db, question.id).await?;
    }
    Ok(questions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewCourse;
    use crate::memory::InMemoryStore;
    use crate::ports::PortError;

    async fn store_with_course() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::default();
        let course = store
            .create_course(NewCourse {
                title: "Rust Basics".to_string(),
                description: "Ownership and borrowing".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        (store, course.id)
    }

    fn draft(course_id: Uuid, options: Vec<OptionDraft>) -> QuestionDraft {
        QuestionDraft {
            course_id,
            question_text: "Which keyword moves a closure's captures?".to_string(),
            options,
        }
    }

    fn correct_count(question: &QuestionWithOptions) -> usize {
        question.options.iter().filter(|o| o.is_correct).count()
    }

    #[tokio::test]
    async fn create_then_fetch_reports_single_correct_option() {
        let (store, course_id) = store_with_course().await;
        let created = create_question(
            &store,
            draft(
                course_id,
                vec![OptionDraft::new("A", false), OptionDraft::new("B", true)],
            ),
        )
        .await
        .unwrap();

        let fetched = fetch_question(&store, created.question.id).await.unwrap();
        assert_eq!(fetched.options.len(), 2);
        assert_eq!(correct_count(&fetched), 1);
        assert_eq!(fetched.correct_option().unwrap().option_text, "B");
        assert_eq!(fetched.options[0].option_text, "A");
        assert!(!fetched.options[0].is_correct);
    }

    #[tokio::test]
    async fn create_rejects_bad_option_sets_without_writing() {
        let (store, course_id) = store_with_course().await;
        let cases = vec![
            vec![OptionDraft::new("only", true)],
            vec![OptionDraft::new("A", false), OptionDraft::new("B", false)],
            vec![OptionDraft::new("A", true), OptionDraft::new("B", true)],
            vec![OptionDraft::new("A", true), OptionDraft::new("  ", false)],
        ];

        for options in cases {
            let err = create_question(&store, draft(course_id, options))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "got {err:?}");
        }

        assert!(store.questions().is_empty());
        assert!(store.options().is_empty());
    }

    #[tokio::test]
    async fn create_requires_existing_course() {
        let store = InMemoryStore::default();
        let err = create_question(
            &store,
            draft(
                Uuid::new_v4(),
                vec![OptionDraft::new("A", true), OptionDraft::new("B", false)],
            ),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Port(PortError::NotFound(_))));
        assert!(store.questions().is_empty());
    }

    #[tokio::test]
    async fn update_edits_inserts_and_removes_options() {
        let (store, course_id) = store_with_course().await;
        let created = create_question(
            &store,
            draft(
                course_id,
                vec![
                    OptionDraft::new("keep", true),
                    OptionDraft::new("drop", false),
                    OptionDraft::new("rename", false),
                ],
            ),
        )
        .await
        .unwrap();
        let keep_id = created.options[0].id;
        let rename_id = created.options[2].id;

        let updated = update_question(
            &store,
            created.question.id,
            QuestionEdit {
                question_text: "Updated text".to_string(),
                options: vec![
                    OptionDraft {
                        id: Some(keep_id),
                        option_text: "keep".to_string(),
                        is_correct: false,
                    },
                    OptionDraft {
                        id: Some(rename_id),
                        option_text: "renamed".to_string(),
                        is_correct: false,
                    },
                    OptionDraft::new("fresh", true),
                ],
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.question.question_text, "Updated text");
        let texts: Vec<&str> = updated.options.iter().map(|o| o.option_text.as_str()).collect();
        assert_eq!(texts, vec!["keep", "renamed", "fresh"]);
        assert_eq!(correct_count(&updated), 1);
        assert_eq!(updated.correct_option().unwrap().option_text, "fresh");
        assert_eq!(store.options().len(), 3);
    }

    #[tokio::test]
    async fn update_without_flagged_option_is_rejected_and_keeps_state() {
        let (store, course_id) = store_with_course().await;
        let created = create_question(
            &store,
            draft(
                course_id,
                vec![OptionDraft::new("A", true), OptionDraft::new("B", false)],
            ),
        )
        .await
        .unwrap();

        let err = update_question(
            &store,
            created.question.id,
            QuestionEdit {
                question_text: "Changed".to_string(),
                options: vec![OptionDraft::new("C", false), OptionDraft::new("D", false)],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let fetched = fetch_question(&store, created.question.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_rejects_option_from_another_question() {
        let (store, course_id) = store_with_course().await;
        let first = create_question(
            &store,
            draft(
                course_id,
                vec![OptionDraft::new("A", true), OptionDraft::new("B", false)],
            ),
        )
        .await
        .unwrap();
        let second = create_question(
            &store,
            draft(
                course_id,
                vec![OptionDraft::new("C", true), OptionDraft::new("D", false)],
            ),
        )
        .await
        .unwrap();

        let err = update_question(
            &store,
            first.question.id,
            QuestionEdit {
                question_text: "Stolen".to_string(),
                options: vec![
                    OptionDraft {
                        id: Some(second.options[0].id),
                        option_text: "C".to_string(),
                        is_correct: true,
                    },
                    OptionDraft::new("E", false),
                ],
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.options().len(), 4);
    }

    #[tokio::test]
    async fn update_of_missing_question_is_not_found() {
        let (store, _) = store_with_course().await;
        let err = update_question(
            &store,
            Uuid::new_v4(),
            QuestionEdit {
                question_text: "Nothing".to_string(),
                options: vec![OptionDraft::new("A", true), OptionDraft::new("B", false)],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Port(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_question_and_all_options() {
        let (store, course_id) = store_with_course().await;
        for count in [2usize, 3, 6] {
            let options = (0..count)
                .map(|i| OptionDraft::new(format!("option {i}"), i == 0))
                .collect();
            let created = create_question(&store, draft(course_id, options))
                .await
                .unwrap();

            let removed = delete_question(&store, created.question.id).await.unwrap();
            assert_eq!(removed, count as u64);
            assert!(store.options().is_empty());
            assert!(store.questions().is_empty());
        }
    }

    #[tokio::test]
    async fn delete_of_missing_question_is_not_found() {
        let (store, _) = store_with_course().await;
        let err = delete_question(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Port(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn course_fetch_groups_options_by_question() {
        let (store, course_id) = store_with_course().await;
        let first = create_question(
            &store,
            draft(
                course_id,
                vec![OptionDraft::new("A", false), OptionDraft::new("B", true)],
            ),
        )
        .await
        .unwrap();
        let second = create_question(
            &store,
            draft(
                course_id,
                vec![
                    OptionDraft::new("C", true),
                    OptionDraft::new("D", false),
                    OptionDraft::new("E", false),
                ],
            ),
        )
        .await
        .unwrap();

        let all = fetch_course_questions(&store, course_id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all[1], second);
        for question in &all {
            assert_eq!(correct_count(question), 1);
            assert!(question
                .options
                .iter()
                .all(|o| o.question_id == question.question.id));
        }

        assert_eq!(delete_course_questions(&store, course_id).await.unwrap(), 2);
        assert!(fetch_course_questions(&store, course_id)
            .await
            .unwrap()
            .is_empty());
    }
}
