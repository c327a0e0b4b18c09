//! services/api/src/web/protocol.rs
//!
//! Defines the JSON protocol between the browser client and the API server:
//! the success envelope, the request payloads and the response views.
//! Every field is camelCase on the wire.

use axum::Json;
use chrono::{DateTime, Utc};
use learnstake_core::domain::{Course, Lesson, StoredMedia, User};
use learnstake_core::generation::{GenerationFailure, GenerationReport};
use learnstake_core::quiz::{OptionDraft, QuestionWithOptions, ScoredOption};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::token::Claims;

//=========================================================================================
// Success Envelope
//=========================================================================================
// NOTE: failures are rendered by `ApiError` as `{ success: false, error, message }`.
//=========================================================================================

#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

//=========================================================================================
// Requests FROM the Client
//=========================================================================================
// Fields are optional here and checked in the handlers, so a missing field is a
// `ValidationError` envelope rather than a deserializer rejection.
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// `admin` or `user`; defaults to `user`.
    pub role: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<Uuid>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub price: Option<f64>,
    pub enrolled_students: Option<Vec<Uuid>>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub duration: Option<i32>,
    pub order: Option<i32>,
    pub resources: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, ToSchema, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionInput {
    /// Present when editing an existing option.
    #[serde(alias = "_id")]
    pub id: Option<Uuid>,
    pub option_text: String,
    pub is_correct: bool,
}

impl From<OptionInput> for OptionDraft {
    fn from(input: OptionInput) -> Self {
        OptionDraft {
            id: input.id,
            option_text: input.option_text,
            is_correct: input.is_correct,
        }
    }
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQuestionRequest {
    pub course_id: Option<Uuid>,
    pub question_text: String,
    pub options: Vec<OptionInput>,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateQuestionRequest {
    pub question_text: String,
    pub options: Vec<OptionInput>,
}

#[derive(Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct DeleteLessonQuery {
    /// Also delete the video from the media host.
    pub delete_media: bool,
}

//=========================================================================================
// Views Sent TO the Client
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.to_string(),
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct LoginData {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct TokenData {
    pub id: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for TokenData {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            iat: claims.iat,
            exp: claims.exp,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor: Option<Uuid>,
    pub category: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub lessons: Vec<Uuid>,
    pub enrolled_students: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Course> for CourseView {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor: course.instructor_id,
            category: course.category,
            thumbnail: course.thumbnail,
            price: course.price,
            lessons: course.lesson_ids,
            enrolled_students: course.enrolled_student_ids,
            created_at: course.created_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub course: Uuid,
    pub duration: Option<i32>,
    pub video_url: String,
    pub video_public_id: Option<String>,
    pub resources: Vec<String>,
    pub quiz: Option<Uuid>,
    pub order: Option<i32>,
}

impl From<Lesson> for LessonView {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title,
            content: lesson.content,
            course: lesson.course_id,
            duration: lesson.duration,
            video_url: lesson.video_url,
            video_public_id: lesson.video_public_id,
            resources: lesson.resources,
            quiz: lesson.quiz_id,
            order: lesson.order,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MediaView {
    pub secure_url: String,
    pub public_id: String,
}

impl From<StoredMedia> for MediaView {
    fn from(media: StoredMedia) -> Self {
        Self {
            secure_url: media.secure_url,
            public_id: media.public_id,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: Uuid,
    pub question: Uuid,
    pub option_text: String,
    /// Computed from the question's correct-answer reference.
    pub is_correct: bool,
}

impl From<ScoredOption> for OptionView {
    fn from(option: ScoredOption) -> Self {
        Self {
            id: option.id,
            question: option.question_id,
            option_text: option.option_text,
            is_correct: option.is_correct,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: Uuid,
    pub course: Uuid,
    pub question_text: String,
    pub correct_answer: Option<Uuid>,
    pub options: Vec<OptionView>,
}

impl From<QuestionWithOptions> for QuestionView {
    fn from(full: QuestionWithOptions) -> Self {
        Self {
            id: full.question.id,
            course: full.question.course_id,
            question_text: full.question.question_text,
            correct_answer: full.question.correct_answer_id,
            options: full.options.into_iter().map(OptionView::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct FailureView {
    /// The generated item as received.
    #[schema(value_type = Object)]
    pub item: Value,
    pub reason: String,
}

impl From<GenerationFailure> for FailureView {
    fn from(failure: GenerationFailure) -> Self {
        Self {
            item: failure.item,
            reason: failure.reason,
        }
    }
}

/// Outcome of a generation batch.
#[derive(Serialize, ToSchema, Debug)]
pub struct GenerationView {
    pub generated: usize,
    pub saved: usize,
    pub errors: usize,
    pub questions: Vec<QuestionView>,
    pub failed: Vec<FailureView>,
}

impl From<GenerationReport> for GenerationView {
    fn from(report: GenerationReport) -> Self {
        Self {
            generated: report.generated,
            saved: report.saved.len(),
            errors: report.failed.len(),
            questions: report.saved.into_iter().map(QuestionView::from).collect(),
            failed: report.failed.into_iter().map(FailureView::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct DeletedView {
    pub id: Uuid,
}
