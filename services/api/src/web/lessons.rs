//! services/api/src/web/lessons.rs
//!
//! Lesson endpoints, including the video upload path.
//!
//! A lesson upload is checked completely (content type, required fields, owning
//! course, duplicate title) before a single byte goes to the media host. If the
//! lesson cannot be stored or linked to its course after the upload succeeded,
//! the uploaded video is deleted again on a best-effort basis.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use learnstake_core::domain::{LessonChanges, NewLesson};
use learnstake_core::ports::PortError;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::{
    extract::{ApiJson, ApiPath},
    protocol::{
        ApiResponse, DeleteLessonQuery, DeletedView, LessonView, MediaView, UpdateLessonRequest,
    },
    state::AppState,
};

//=========================================================================================
// Multipart Form Handling
//=========================================================================================

struct VideoFile {
    data: Bytes,
    file_name: String,
    content_type: String,
}

#[derive(Default)]
struct LessonForm {
    video: Option<VideoFile>,
    title: Option<String>,
    content: Option<String>,
    course: Option<String>,
    duration: Option<String>,
    order: Option<String>,
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(e.body_text())
}

/// Reads the form. The video's content type is checked before its bytes are read.
async fn read_lesson_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<LessonForm> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let mut form = LessonForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "video" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            if !content_type.starts_with("video/") {
                warn!("Rejected upload with content type '{}'", content_type);
                return Err(ApiError::validation("Only video files are allowed!"));
            }
            let file_name = field.file_name().unwrap_or("video").to_string();
            let data = field.bytes().await.map_err(bad_multipart)?;
            form.video = Some(VideoFile {
                data,
                file_name,
                content_type,
            });
            continue;
        }

        let slot = match name.as_str() {
            "title" => &mut form.title,
            "content" => &mut form.content,
            "course" => &mut form.course,
            "duration" => &mut form.duration,
            "order" => &mut form.order,
            _ => continue,
        };
        let text = field.text().await.map_err(bad_multipart)?;
        let text = text.trim();
        if !text.is_empty() {
            *slot = Some(text.to_string());
        }
    }

    Ok(form)
}

fn parse_number(raw: Option<&str>, field: &str) -> ApiResult<Option<i32>> {
    raw.map(|value| {
        value
            .parse::<i32>()
            .map_err(|_| ApiError::validation(format!("{} must be a whole number", field)))
    })
    .transpose()
}

fn sanitize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join("_").to_lowercase()
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Builds the remote file name `<course>-<order>-<title>-<millis><ext>` and the
/// public id (the same name without its extension).
pub fn lesson_media_name(
    course: &str,
    order: Option<i32>,
    title: &str,
    millis: i64,
    original_name: &str,
) -> (String, String) {
    let order = order.map_or_else(|| "order".to_string(), |o| o.to_string());
    let public_id = format!("{}-{}-{}-{}", sanitize(course), order, sanitize(title), millis);
    (format!("{}{}", public_id, extension_of(original_name)), public_id)
}

async fn discard_media(state: &AppState, public_id: &str) {
    match state.media.delete_video(public_id).await {
        Ok(()) => info!("Discarded orphaned media {}", public_id),
        Err(e) => warn!("Could not discard orphaned media {}: {}", public_id, e),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/lessons/uploadLesson - Upload a video and create the lesson that plays it
///
/// Multipart fields: `video` (file), `title`, `course`, and optionally `content`,
/// `duration` (minutes) and `order`.
#[utoipa::path(
    post,
    path = "/api/lessons/uploadLesson",
    request_body(content_type = "multipart/form-data", description = "The video plus lesson metadata."),
    responses(
        (status = 201, description = "Lesson created", body = LessonView),
        (status = 400, description = "Not a video, missing field or duplicate title"),
        (status = 404, description = "Course not found"),
        (status = 502, description = "Media host failed")
    ),
    tag = "lessons"
)]
pub async fn upload_lesson_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let form = read_lesson_form(multipart).await?;

    // 1. Validate everything before touching the media host
    let video = form
        .video
        .ok_or_else(|| ApiError::validation("Video file is required."))?;
    let (title, course_raw) = match (form.title, form.course) {
        (Some(title), Some(course)) => (title, course),
        _ => return Err(ApiError::validation("Title and course are required.")),
    };
    let course_id = Uuid::parse_str(&course_raw)
        .map_err(|_| ApiError::validation("course must be a valid id"))?;
    let duration = parse_number(form.duration.as_deref(), "duration")?;
    let order = parse_number(form.order.as_deref(), "order")?;

    state.db.get_course_by_id(course_id).await?;
    if state
        .db
        .find_lesson_by_title(course_id, &title)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(
            "Lesson title already exists for this course.",
        ));
    }

    // 2. Store the video
    let (file_name, public_id) = lesson_media_name(
        &course_raw,
        order,
        &title,
        Utc::now().timestamp_millis(),
        &video.file_name,
    );
    let stored = state
        .media
        .upload_video(video.data, &file_name, &public_id, &video.content_type)
        .await?;

    // 3. Persist the lesson, undoing the upload if that fails
    let lesson = match state
        .db
        .create_lesson(NewLesson {
            title,
            content: form.content,
            course_id,
            duration,
            video_url: stored.secure_url.clone(),
            video_public_id: Some(stored.public_id.clone()),
            order,
        })
        .await
    {
        Ok(lesson) => lesson,
        Err(e) => {
            error!("Failed to save lesson for course {}: {}", course_id, e);
            discard_media(&state, &stored.public_id).await;
            return Err(e.into());
        }
    };

    // 4. Link it to the course
    if let Err(e) = state.db.append_course_lesson(course_id, lesson.id).await {
        error!("Failed to link lesson {} to course {}: {}", lesson.id, course_id, e);
        if let Err(cleanup) = state.db.delete_lesson(lesson.id).await {
            warn!("Could not remove unlinked lesson {}: {}", lesson.id, cleanup);
        }
        discard_media(&state, &stored.public_id).await;
        return Err(e.into());
    }

    info!("Lesson {} created in course {}", lesson.id, course_id);
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Lesson created successfully.", LessonView::from(lesson)),
    ))
}

/// POST /api/lessons/upload - Store a video without creating a lesson
#[utoipa::path(
    post,
    path = "/api/lessons/upload",
    request_body(content_type = "multipart/form-data", description = "A single `video` file."),
    responses(
        (status = 200, description = "Video stored", body = MediaView),
        (status = 400, description = "Missing or non-video file"),
        (status = 502, description = "Media host failed")
    ),
    tag = "lessons"
)]
pub async fn upload_video_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let form = read_lesson_form(multipart).await?;
    let video = form
        .video
        .ok_or_else(|| ApiError::validation("No video file uploaded."))?;

    let public_id = format!("video-{}", Utc::now().timestamp_millis());
    let file_name = format!("{}{}", public_id, extension_of(&video.file_name));
    let stored = state
        .media
        .upload_video(video.data, &file_name, &public_id, &video.content_type)
        .await?;

    Ok(ApiResponse::ok(
        "Video uploaded successfully!",
        MediaView::from(stored),
    ))
}

/// GET /api/lessons
#[utoipa::path(
    get,
    path = "/api/lessons",
    responses((status = 200, description = "All lessons", body = [LessonView])),
    tag = "lessons"
)]
pub async fn list_lessons_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let lessons = state.db.list_lessons().await?;
    let views: Vec<LessonView> = lessons.into_iter().map(LessonView::from).collect();
    Ok(ApiResponse::ok("Lessons retrieved successfully.", views))
}

/// GET /api/lessons/{id}
#[utoipa::path(
    get,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "The lesson", body = LessonView),
        (status = 404, description = "Lesson not found")
    ),
    tag = "lessons"
)]
pub async fn get_lesson_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state.db.get_lesson_by_id(id).await?;
    Ok(ApiResponse::ok("Lesson retrieved successfully.", LessonView::from(lesson)))
}

/// GET /api/lessons/course/{course_id}
#[utoipa::path(
    get,
    path = "/api/lessons/course/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course id")),
    responses((status = 200, description = "Lessons of the course", body = [LessonView])),
    tag = "lessons"
)]
pub async fn list_course_lessons_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(course_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let lessons = state.db.list_lessons_by_course(course_id).await?;
    let views: Vec<LessonView> = lessons.into_iter().map(LessonView::from).collect();
    Ok(ApiResponse::ok("Lessons retrieved successfully.", views))
}

/// PUT /api/lessons/{id} - Edit lesson metadata
#[utoipa::path(
    put,
    path = "/api/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Updated lesson", body = LessonView),
        (status = 400, description = "Blank title or title already used in the course"),
        (status = 404, description = "Lesson not found")
    ),
    tag = "lessons"
)]
pub async fn update_lesson_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateLessonRequest>,
) -> ApiResult<impl IntoResponse> {
    let current = state.db.get_lesson_by_id(id).await?;

    let title = req.title.map(|t| t.trim().to_string());
    if let Some(title) = &title {
        if title.is_empty() {
            return Err(ApiError::validation("title cannot be blank"));
        }
        if let Some(other) = state
            .db
            .find_lesson_by_title(current.course_id, title)
            .await?
        {
            if other.id != id {
                return Err(ApiError::validation(
                    "Lesson title already exists for this course.",
                ));
            }
        }
    }

    let lesson = state
        .db
        .update_lesson(
            id,
            LessonChanges {
                title,
                content: req.content,
                duration: req.duration,
                order: req.order,
                resources: req.resources,
            },
        )
        .await?;
    info!("Lesson {} updated", id);
    Ok(ApiResponse::ok("Lesson updated successfully.", LessonView::from(lesson)))
}

/// DELETE /api/lessons/{id} - Delete a lesson, optionally with its video
#[utoipa::path(
    delete,
    path = "/api/lessons/{id}",
    params(
        ("id" = Uuid, Path, description = "Lesson id"),
        DeleteLessonQuery
    ),
    responses(
        (status = 200, description = "Lesson deleted", body = DeletedView),
        (status = 404, description = "Lesson not found"),
        (status = 502, description = "Media host failed")
    ),
    tag = "lessons"
)]
pub async fn delete_lesson_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    Query(query): Query<DeleteLessonQuery>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state.db.get_lesson_by_id(id).await?;

    if query.delete_media {
        match lesson.video_public_id.as_deref() {
            Some(public_id) => match state.media.delete_video(public_id).await {
                Ok(()) => {}
                Err(PortError::NotFound(_)) => {
                    warn!("Video of lesson {} was already gone", id);
                }
                Err(e) => return Err(e.into()),
            },
            None => warn!("Lesson {} has no stored media id; keeping its video", id),
        }
    }

    state.db.delete_lesson(id).await?;
    state.db.remove_course_lesson(lesson.course_id, id).await?;
    info!("Lesson {} deleted", id);

    Ok(ApiResponse::ok("Lesson deleted successfully.", DeletedView { id }))
}
