//! services/api/src/web/courses.rs
//!
//! Course CRUD. Titles are unique across courses; deleting a course removes its
//! questions (options first) and its lessons before the course itself.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension};
use learnstake_core::domain::{CourseChanges, NewCourse};
use learnstake_core::quiz;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::{
    extract::{ApiJson, ApiPath},
    protocol::{ApiResponse, CourseRequest, CourseView, DeletedView},
    state::AppState,
    token::AuthUser,
};

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// POST /api/courses
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = CourseView),
        (status = 400, description = "Missing title/description or title already used"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "courses"
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(req): ApiJson<CourseRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = trimmed(req.title)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("title is required"))?;
    let description = trimmed(req.description)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::validation("description is required"))?;

    if state.db.find_course_by_title(&title).await?.is_some() {
        return Err(ApiError::validation(
            "Course name already exists. Please choose a different name.",
        ));
    }

    let course = state
        .db
        .create_course(NewCourse {
            title,
            description,
            instructor_id: req.instructor.or(Some(caller.user_id)),
            category: req.category,
            thumbnail: req.thumbnail,
            price: req.price.unwrap_or(0.0),
            enrolled_student_ids: req.enrolled_students.unwrap_or_default(),
        })
        .await?;
    info!("Course {} created by {}", course.id, caller.user_id);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Course created successfully!", CourseView::from(course)),
    ))
}

/// GET /api/courses
#[utoipa::path(
    get,
    path = "/api/courses",
    responses((status = 200, description = "All courses", body = [CourseView])),
    tag = "courses"
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let courses = state.db.list_courses().await?;
    let views: Vec<CourseView> = courses.into_iter().map(CourseView::from).collect();
    Ok(ApiResponse::ok("Courses retrieved successfully.", views))
}

/// GET /api/courses/{id}
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "The course", body = CourseView),
        (status = 404, description = "Course not found")
    ),
    tag = "courses"
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let course = state.db.get_course_by_id(id).await?;
    Ok(ApiResponse::ok("Course retrieved successfully.", CourseView::from(course)))
}

/// PUT /api/courses/{id}
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Updated course", body = CourseView),
        (status = 400, description = "Blank field or title already used"),
        (status = 404, description = "Course not found")
    ),
    tag = "courses"
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CourseRequest>,
) -> ApiResult<impl IntoResponse> {
    state.db.get_course_by_id(id).await?;

    let title = trimmed(req.title);
    let description = trimmed(req.description);
    if matches!(&title, Some(t) if t.is_empty()) {
        return Err(ApiError::validation("title cannot be blank"));
    }
    if matches!(&description, Some(d) if d.is_empty()) {
        return Err(ApiError::validation("description cannot be blank"));
    }
    if let Some(title) = &title {
        if let Some(other) = state.db.find_course_by_title(title).await? {
            if other.id != id {
                return Err(ApiError::validation(
                    "Course name already exists. Please choose a different name.",
                ));
            }
        }
    }

    let course = state
        .db
        .update_course(
            id,
            CourseChanges {
                title,
                description,
                instructor_id: req.instructor,
                category: req.category,
                thumbnail: req.thumbnail,
                price: req.price,
                enrolled_student_ids: req.enrolled_students,
            },
        )
        .await?;
    info!("Course {} updated", id);
    Ok(ApiResponse::ok("Course updated successfully.", CourseView::from(course)))
}

/// DELETE /api/courses/{id}
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course and its content deleted", body = DeletedView),
        (status = 404, description = "Course not found")
    ),
    tag = "courses"
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.db.get_course_by_id(id).await?;

    let questions = quiz::delete_course_questions(state.db.as_ref(), id).await?;
    let lessons = state.db.delete_lessons_by_course(id).await?;
    state.db.delete_course(id).await?;
    info!(
        "Course {} deleted with {} questions and {} lessons",
        id, questions, lessons
    );

    Ok(ApiResponse::ok("Course deleted", DeletedView { id }))
}
