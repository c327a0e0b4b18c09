//! services/api/src/web/questions.rs
//!
//! Quiz endpoints. The handlers only translate between the wire format and the
//! quiz consistency service in the core crate; every invariant lives there.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use learnstake_core::generation::{self, GenerationRequest};
use learnstake_core::quiz::{self, OptionDraft, QuestionDraft, QuestionEdit};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::{
    extract::{ApiJson, ApiPath},
    protocol::{
        ApiResponse, CreateQuestionRequest, DeletedView, GenerationView, OptionInput,
        QuestionView, UpdateQuestionRequest,
    },
    state::AppState,
};

fn drafts(options: Vec<OptionInput>) -> Vec<OptionDraft> {
    options.into_iter().map(OptionDraft::from).collect()
}

/// POST /api/questions - Create a question with its options
#[utoipa::path(
    post,
    path = "/api/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionView),
        (status = 400, description = "Missing field, fewer than two options or not exactly one correct"),
        (status = 404, description = "Course not found")
    ),
    tag = "questions"
)]
pub async fn create_question_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateQuestionRequest>,
) -> ApiResult<impl IntoResponse> {
    let course_id = req
        .course_id
        .ok_or_else(|| ApiError::validation("courseId is required"))?;

    let created = quiz::create_question(
        state.db.as_ref(),
        QuestionDraft {
            course_id,
            question_text: req.question_text,
            options: drafts(req.options),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Question created successfully.", QuestionView::from(created)),
    ))
}

/// GET /api/questions/{id}
#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "The question with scored options", body = QuestionView),
        (status = 404, description = "Question not found")
    ),
    tag = "questions"
)]
pub async fn get_question_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let question = quiz::fetch_question(state.db.as_ref(), id).await?;
    Ok(ApiResponse::ok(
        "Question retrieved successfully.",
        QuestionView::from(question),
    ))
}

/// GET /api/questions/course/{course_id}
#[utoipa::path(
    get,
    path = "/api/questions/course/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Questions of the course", body = [QuestionView])),
    tag = "questions"
)]
pub async fn list_course_questions_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let questions = quiz::fetch_course_questions(state.db.as_ref(), course_id).await?;
    let views: Vec<QuestionView> = questions.into_iter().map(QuestionView::from).collect();
    Ok(ApiResponse::ok(
        "Questions and options retrieved successfully.",
        views,
    ))
}

/// PUT /api/questions/{id} - Replace the question text and option set
#[utoipa::path(
    put,
    path = "/api/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Updated question", body = QuestionView),
        (status = 400, description = "Invalid option set"),
        (status = 404, description = "Question not found")
    ),
    tag = "questions"
)]
pub async fn update_question_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateQuestionRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = quiz::update_question(
        state.db.as_ref(),
        id,
        QuestionEdit {
            question_text: req.question_text,
            options: drafts(req.options),
        },
    )
    .await?;
    Ok(ApiResponse::ok(
        "Question updated successfully.",
        QuestionView::from(updated),
    ))
}

/// DELETE /api/questions/{id} - Delete a question and all of its options
#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question deleted", body = DeletedView),
        (status = 404, description = "Question not found")
    ),
    tag = "questions"
)]
pub async fn delete_question_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    quiz::delete_question(state.db.as_ref(), id).await?;
    Ok(ApiResponse::ok(
        "Question and its options deleted successfully.",
        DeletedView { id },
    ))
}

/// GET /api/questions/log/{course_id}/{question_count}/{difficulty} - Generate questions
///
/// Asks the text generator for a batch of four-option questions about the course
/// and stores every item that passes validation. Malformed items are reported
/// alongside the saved ones; an unreadable reply fails the whole request.
#[utoipa::path(
    get,
    path = "/api/questions/log/{course_id}/{question_count}/{difficulty}",
    params(
        ("course_id" = Uuid, Path, description = "Course id"),
        ("question_count" = u32, Path, description = "How many questions to ask for (1-50)"),
        ("difficulty" = String, Path, description = "Difficulty wording passed to the generator")
    ),
    responses(
        (status = 200, description = "Batch report", body = GenerationView),
        (status = 400, description = "Invalid count or difficulty"),
        (status = 404, description = "Course not found"),
        (status = 502, description = "Generator failed or replied with unreadable output")
    ),
    tag = "questions"
)]
pub async fn generate_questions_handler(
    State(state): State<Arc<AppState>>,
    ApiPath((course_id, question_count, difficulty)): ApiPath<(Uuid, String, String)>,
) -> ApiResult<impl IntoResponse> {
    let question_count = question_count
        .parse::<u32>()
        .map_err(|_| ApiError::validation("questionCount must be a positive number"))?;

    let report = generation::generate_questions(
        state.db.as_ref(),
        state.generator.as_ref(),
        GenerationRequest {
            course_id,
            question_count,
            difficulty,
        },
    )
    .await?;

    info!(
        "Generated {} questions for course {} ({} saved)",
        report.generated,
        course_id,
        report.saved.len()
    );
    Ok(ApiResponse::ok(
        "Questions generated successfully.",
        GenerationView::from(report),
    ))
}
