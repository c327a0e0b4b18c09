//! crates/learnstake_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the document store, the media host and the text generator.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::domain::{
    AnswerOption, Course, CourseChanges, Lesson, LessonChanges, NewCourse, NewLesson, NewUser,
    Question, StoredMedia, User, UserChanges, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// A third-party service answered, but reported a failure.
    #[error("Upstream service error: {0}")]
    Upstream(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Every persistence call is an independent round trip; nothing here is transactional.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>>;

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User>;

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Courses ---
    async fn create_course(&self, course: NewCourse) -> PortResult<Course>;

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course>;

    async fn find_course_by_title(&self, title: &str) -> PortResult<Option<Course>>;

    async fn list_courses(&self) -> PortResult<Vec<Course>>;

    async fn update_course(&self, course_id: Uuid, changes: CourseChanges) -> PortResult<Course>;

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()>;

    /// Appends to the end of the course's ordered lesson list.
    async fn append_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()>;

    async fn remove_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()>;

    // --- Lessons ---
    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson>;

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson>;

    async fn find_lesson_by_title(&self, course_id: Uuid, title: &str)
        -> PortResult<Option<Lesson>>;

    async fn list_lessons(&self) -> PortResult<Vec<Lesson>>;

    async fn list_lessons_by_course(&self, course_id: Uuid) -> PortResult<Vec<Lesson>>;

    async fn update_lesson(&self, lesson_id: Uuid, changes: LessonChanges) -> PortResult<Lesson>;

    async fn delete_lesson(&self, lesson_id: Uuid) -> PortResult<()>;

    async fn delete_lessons_by_course(&self, course_id: Uuid) -> PortResult<u64>;

    // --- Questions ---
    async fn create_question(&self, course_id: Uuid, question_text: &str) -> PortResult<Question>;

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question>;

    async fn list_questions_by_course(&self, course_id: Uuid) -> PortResult<Vec<Question>>;

    async fn update_question_text(&self, question_id: Uuid, question_text: &str)
        -> PortResult<()>;

    async fn set_correct_answer(&self, question_id: Uuid, option_id: Uuid) -> PortResult<()>;

    /// Fails with `NotFound` when no question has this id.
    async fn delete_question(&self, question_id: Uuid) -> PortResult<()>;

    // --- Options ---
    async fn create_option(&self, question_id: Uuid, option_text: &str)
        -> PortResult<AnswerOption>;

    async fn list_options_for_question(&self, question_id: Uuid) -> PortResult<Vec<AnswerOption>>;

    async fn list_options_for_questions(
        &self,
        question_ids: &[Uuid],
    ) -> PortResult<Vec<AnswerOption>>;

    async fn update_option_text(&self, option_id: Uuid, option_text: &str) -> PortResult<()>;

    /// Removes every option of the question. Returns how many were removed.
    async fn delete_options_for_question(&self, question_id: Uuid) -> PortResult<u64>;

    /// Removes the options of the question whose id is not in `keep`.
    async fn delete_options_except(&self, question_id: Uuid, keep: &[Uuid]) -> PortResult<u64>;
}

#[async_trait]
pub trait MediaStorageService: Send + Sync {
    /// Stores a video under `public_id` and returns its public location.
    async fn upload_video(
        &self,
        data: Bytes,
        file_name: &str,
        public_id: &str,
        content_type: &str,
    ) -> PortResult<StoredMedia>;

    async fn delete_video(&self, public_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait QuizGenerationService: Send + Sync {
    /// Sends a prompt to the text generator and returns its raw reply.
    async fn generate(&self, prompt: &str) -> PortResult<String>;
}
