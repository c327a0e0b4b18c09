mod common;

use axum::http::StatusCode;
use common::{
    admin_token, empty_request, json_request, multipart_request, FilePart, FlakyLessonStore,
    LessonFault, TestApp,
};
use serde_json::{json, Value};
use uuid::Uuid;

const CLIP: FilePart<'static> = FilePart {
    field: "video",
    file_name: "intro clip.mp4",
    content_type: "video/mp4",
    data: b"not really a video",
};

async fn upload_lesson(
    app: &TestApp,
    token: &str,
    course_id: Uuid,
    title: &str,
) -> (StatusCode, Value) {
    let course = course_id.to_string();
    app.send(multipart_request(
        "/api/lessons/uploadLesson",
        token,
        &[("title", title), ("course", &course), ("order", "1")],
        Some(CLIP),
    ))
    .await
}

#[tokio::test]
async fn uploaded_lesson_is_stored_and_linked_to_its_course() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let (status, body) = upload_lesson(&app, &token, course_id, "Ownership").await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["title"], "Ownership");
    assert_eq!(body["data"]["course"], course_id.to_string());
    assert_eq!(body["data"]["order"], 1);
    assert!(body["data"]["videoUrl"].as_str().unwrap().starts_with("https://"));
    assert_eq!(app.media.upload_count(), 1);
    let lesson_id = body["data"]["id"].clone();

    let (_, course) = app
        .send(empty_request("GET", &format!("/api/courses/{}", course_id), None))
        .await;
    assert_eq!(course["data"]["lessons"], json!([lesson_id]));

    let (_, lessons) = app
        .send(empty_request(
            "GET",
            &format!("/api/lessons/course/{}", course_id),
            None,
        ))
        .await;
    assert_eq!(lessons["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_video_files_are_refused_before_upload() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;
    let course = course_id.to_string();

    let (status, body) = app
        .send(multipart_request(
            "/api/lessons/uploadLesson",
            &token,
            &[("title", "Notes"), ("course", &course)],
            Some(FilePart {
                field: "video",
                file_name: "notes.pdf",
                content_type: "application/pdf",
                data: b"%PDF-1.4",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only video files are allowed!");
    assert_eq!(app.media.upload_count(), 0);
    assert!(app.db.lessons().is_empty());
}

#[tokio::test]
async fn missing_parts_are_refused_before_upload() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;
    let course = course_id.to_string();

    let (status, body) = app
        .send(multipart_request(
            "/api/lessons/uploadLesson",
            &token,
            &[("title", "No video"), ("course", &course)],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Video file is required.");

    let (status, body) = app
        .send(multipart_request(
            "/api/lessons/uploadLesson",
            &token,
            &[("course", &course)],
            Some(CLIP),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title and course are required.");

    let (status, _) = upload_lesson(&app, &token, Uuid::new_v4(), "Orphan").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.media.upload_count(), 0);
}

#[tokio::test]
async fn duplicate_title_in_a_course_is_rejected_before_upload() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let (status, _) = upload_lesson(&app, &token, course_id, "Ownership").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = upload_lesson(&app, &token, course_id, "Ownership").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Lesson title already exists for this course.");
    assert_eq!(app.media.upload_count(), 1);

    // Same title in another course is fine.
    let other = app.create_course(&token, "Advanced Rust").await;
    let (status, _) = upload_lesson(&app, &token, other, "Ownership").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn uploads_require_a_token() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let mut request = multipart_request(
        "/api/lessons/uploadLesson",
        &token,
        &[("title", "Ownership"), ("course", &course_id.to_string())],
        Some(CLIP),
    );
    request.headers_mut().remove(axum::http::header::AUTHORIZATION);
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.media.upload_count(), 0);
}

#[tokio::test]
async fn delete_with_media_removes_video_and_course_link() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let (_, body) = upload_lesson(&app, &token, course_id, "Ownership").await;
    let lesson_id = body["data"]["id"].as_str().unwrap().to_string();
    let public_id = body["data"]["videoPublicId"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/lessons/{}?deleteMedia=true", lesson_id),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(app.media.deleted(), vec![public_id]);
    assert!(app.db.lessons().is_empty());

    let (_, course) = app
        .send(empty_request("GET", &format!("/api/courses/{}", course_id), None))
        .await;
    assert_eq!(course["data"]["lessons"], json!([]));
}

#[tokio::test]
async fn delete_without_flag_keeps_the_video() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let (_, body) = upload_lesson(&app, &token, course_id, "Ownership").await;
    let lesson_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/lessons/{}", lesson_id),
            Some(&token),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.media.deleted().is_empty());
    assert!(app.db.lessons().is_empty());
}

#[tokio::test]
async fn update_keeps_titles_unique_within_the_course() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    upload_lesson(&app, &token, course_id, "Ownership").await;
    let (_, body) = upload_lesson(&app, &token, course_id, "Borrowing").await;
    let lesson_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/lessons/{}", lesson_id);

    let (status, _) = app
        .send(json_request("PUT", &uri, Some(&token), json!({ "title": "Ownership" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "PUT",
            &uri,
            Some(&token),
            json!({ "title": "Lifetimes", "duration": 12 }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["title"], "Lifetimes");
    assert_eq!(body["data"]["duration"], 12);
}

async fn failed_save_discards_the_upload(fault: LessonFault) -> TestApp {
    let app = TestApp::with_store(|db| FlakyLessonStore::shared(db, fault));
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;

    let (status, body) = upload_lesson(&app, &token, course_id, "Ownership").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
    assert_eq!(body["error"], "ServerError");

    let uploaded = app.media.uploaded();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(app.media.deleted(), uploaded);
    app
}

#[tokio::test]
async fn lesson_save_failure_removes_the_uploaded_video() {
    let app = failed_save_discards_the_upload(LessonFault::Create).await;
    assert!(app.db.lessons().is_empty());
}

#[tokio::test]
async fn course_link_failure_removes_the_lesson_and_its_video() {
    let app = failed_save_discards_the_upload(LessonFault::LinkToCourse).await;
    assert!(app.db.lessons().is_empty());
}

#[tokio::test]
async fn standalone_upload_returns_the_stored_location() {
    let app = TestApp::new();
    let token = admin_token();

    let (status, body) = app
        .send(multipart_request("/api/lessons/upload", &token, &[], Some(CLIP)))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);

    let public_id = body["data"]["publicId"].as_str().unwrap();
    assert!(public_id.starts_with("lessons_videos/video-"), "{}", public_id);
    assert_eq!(
        body["data"]["secureUrl"],
        format!("https://media.example/{}.mp4", public_id)
    );
    assert_eq!(app.media.uploaded(), vec![public_id.to_string()]);
    assert!(app.db.lessons().is_empty());

    let (status, body) = app
        .send(multipart_request("/api/lessons/upload", &token, &[], None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No video file uploaded.");
}

#[tokio::test]
async fn only_upload_routes_accept_large_bodies() {
    let app = TestApp::new();
    let token = admin_token();
    let course_id = app.create_course(&token, "Rust Basics").await;
    let large = vec![b'x'; 3 * 1024 * 1024];

    let course = course_id.to_string();
    let (status, body) = app
        .send(multipart_request(
            "/api/lessons/uploadLesson",
            &token,
            &[("title", "Long take"), ("course", &course)],
            Some(FilePart {
                data: &large,
                ..CLIP
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let padding = String::from_utf8(large).unwrap();
    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/courses",
            Some(&token),
            json!({ "title": "Padded", "description": padding }),
        ))
        .await;
    assert!(status.is_client_error(), "{}", status);

    let (_, courses) = app.send(empty_request("GET", "/api/courses", None)).await;
    assert_eq!(courses["data"].as_array().unwrap().len(), 1);
}
