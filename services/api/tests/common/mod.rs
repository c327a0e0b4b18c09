//! Shared harness for the HTTP integration tests: the real router wired to the
//! in-memory store, a recording media host and a scripted generator.

#![allow(dead_code)]

use api_lib::{
    config::Config,
    web::{build_router, state::AppState, token::issue_token},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use learnstake_core::{
    memory::InMemoryStore, AnswerOption, Course, CourseChanges, DatabaseService, Lesson,
    LessonChanges, MediaStorageService, NewCourse, NewLesson, NewUser, PortError, PortResult,
    Question, QuizGenerationService, Role, StoredMedia, User, UserChanges, UserCredentials,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-secret";

//=========================================================================================
// Fakes
//=========================================================================================

#[derive(Default)]
pub struct FakeMediaStore {
    pub uploads: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeMediaStore {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStorageService for FakeMediaStore {
    async fn upload_video(
        &self,
        _data: Bytes,
        _file_name: &str,
        public_id: &str,
        _content_type: &str,
    ) -> PortResult<StoredMedia> {
        let public_id = format!("lessons_videos/{}", public_id);
        self.uploads.lock().unwrap().push(public_id.clone());
        Ok(StoredMedia {
            secure_url: format!("https://media.example/{}.mp4", public_id),
            public_id,
        })
    }

    async fn delete_video(&self, public_id: &str) -> PortResult<()> {
        self.deletes.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

pub struct FakeGenerator {
    reply: Result<String, String>,
}

impl FakeGenerator {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
        }
    }
}

#[async_trait]
impl QuizGenerationService for FakeGenerator {
    async fn generate(&self, _prompt: &str) -> PortResult<String> {
        self.reply.clone().map_err(PortError::Upstream)
    }
}

/// Lesson writes that `FlakyLessonStore` can be told to fail.
#[derive(Clone, Copy, PartialEq)]
pub enum LessonFault {
    Create,
    LinkToCourse,
}

/// The in-memory store with one lesson write forced to fail.
pub struct FlakyLessonStore {
    inner: Arc<InMemoryStore>,
    fault: LessonFault,
}

impl FlakyLessonStore {
    pub fn shared(inner: Arc<InMemoryStore>, fault: LessonFault) -> Arc<dyn DatabaseService> {
        Arc::new(Self { inner, fault })
    }

    fn injected(&self, fault: LessonFault) -> PortResult<()> {
        if self.fault == fault {
            Err(PortError::Unexpected("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DatabaseService for FlakyLessonStore {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        self.inner.create_user(user).await
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.inner.get_user_by_id(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.inner.get_user_credentials_by_email(email).await
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User> {
        self.inner.update_user(user_id, changes).await
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        self.inner.delete_user(user_id).await
    }

    async fn create_course(&self, course: NewCourse) -> PortResult<Course> {
        self.inner.create_course(course).await
    }

    async fn get_course_by_id(&self, course_id: Uuid) -> PortResult<Course> {
        self.inner.get_course_by_id(course_id).await
    }

    async fn find_course_by_title(&self, title: &str) -> PortResult<Option<Course>> {
        self.inner.find_course_by_title(title).await
    }

    async fn list_courses(&self) -> PortResult<Vec<Course>> {
        self.inner.list_courses().await
    }

    async fn update_course(&self, course_id: Uuid, changes: CourseChanges) -> PortResult<Course> {
        self.inner.update_course(course_id, changes).await
    }

    async fn delete_course(&self, course_id: Uuid) -> PortResult<()> {
        self.inner.delete_course(course_id).await
    }

    async fn append_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        self.injected(LessonFault::LinkToCourse)?;
        self.inner.append_course_lesson(course_id, lesson_id).await
    }

    async fn remove_course_lesson(&self, course_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        self.inner.remove_course_lesson(course_id, lesson_id).await
    }

    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson> {
        self.injected(LessonFault::Create)?;
        self.inner.create_lesson(lesson).await
    }

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        self.inner.get_lesson_by_id(lesson_id).await
    }

    async fn find_lesson_by_title(
        &self,
        course_id: Uuid,
        title: &str,
    ) -> PortResult<Option<Lesson>> {
        self.inner.find_lesson_by_title(course_id, title).await
    }

    async fn list_lessons(&self) -> PortResult<Vec<Lesson>> {
        self.inner.list_lessons().await
    }

    async fn list_lessons_by_course(&self, course_id: Uuid) -> PortResult<Vec<Lesson>> {
        self.inner.list_lessons_by_course(course_id).await
    }

    async fn update_lesson(&self, lesson_id: Uuid, changes: LessonChanges) -> PortResult<Lesson> {
        self.inner.update_lesson(lesson_id, changes).await
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> PortResult<()> {
        self.inner.delete_lesson(lesson_id).await
    }

    async fn delete_lessons_by_course(&self, course_id: Uuid) -> PortResult<u64> {
        self.inner.delete_lessons_by_course(course_id).await
    }

    async fn create_question(&self, course_id: Uuid, question_text: &str) -> PortResult<Question> {
        self.inner.create_question(course_id, question_text).await
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question> {
        self.inner.get_question_by_id(question_id).await
    }

    async fn list_questions_by_course(&self, course_id: Uuid) -> PortResult<Vec<Question>> {
        self.inner.list_questions_by_course(course_id).await
    }

    async fn update_question_text(
        &self,
        question_id: Uuid,
        question_text: &str,
    ) -> PortResult<()> {
        self.inner.update_question_text(question_id, question_text).await
    }

    async fn set_correct_answer(&self, question_id: Uuid, option_id: Uuid) -> PortResult<()> {
        self.inner.set_correct_answer(question_id, option_id).await
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        self.inner.delete_question(question_id).await
    }

    async fn create_option(
        &self,
        question_id: Uuid,
        option_text: &str,
    ) -> PortResult<AnswerOption> {
        self.inner.create_option(question_id, option_text).await
    }

    async fn list_options_for_question(&self, question_id: Uuid) -> PortResult<Vec<AnswerOption>> {
        self.inner.list_options_for_question(question_id).await
    }

    async fn list_options_for_questions(
        &self,
        question_ids: &[Uuid],
    ) -> PortResult<Vec<AnswerOption>> {
        self.inner.list_options_for_questions(question_ids).await
    }

    async fn update_option_text(&self, option_id: Uuid, option_text: &str) -> PortResult<()> {
        self.inner.update_option_text(option_id, option_text).await
    }

    async fn delete_options_for_question(&self, question_id: Uuid) -> PortResult<u64> {
        self.inner.delete_options_for_question(question_id).await
    }

    async fn delete_options_except(&self, question_id: Uuid, keep: &[Uuid]) -> PortResult<u64> {
        self.inner.delete_options_except(question_id, keep).await
    }
}

//=========================================================================================
// Application Harness
//=========================================================================================

pub fn test_config() -> Config {
    Config::from_vars(|name| match name {
        "DATABASE_URL" => Some("postgres://unused/learnstake".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryStore>,
    pub media: Arc<FakeMediaStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_generator(FakeGenerator::replying("[]"))
    }

    pub fn with_generator(generator: FakeGenerator) -> Self {
        Self::build(generator, |db| db as Arc<dyn DatabaseService>)
    }

    /// Routes every persistence call through `wrap`; `db` still exposes the
    /// underlying in-memory tables.
    pub fn with_store(
        wrap: impl FnOnce(Arc<InMemoryStore>) -> Arc<dyn DatabaseService>,
    ) -> Self {
        Self::build(FakeGenerator::replying("[]"), wrap)
    }

    fn build(
        generator: FakeGenerator,
        wrap: impl FnOnce(Arc<InMemoryStore>) -> Arc<dyn DatabaseService>,
    ) -> Self {
        let db = Arc::new(InMemoryStore::new());
        let media = Arc::new(FakeMediaStore::default());
        let state = Arc::new(AppState {
            db: wrap(db.clone()),
            config: Arc::new(test_config()),
            media: media.clone(),
            generator: Arc::new(generator),
        });
        Self {
            router: build_router(state),
            db,
            media,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Registers an account through the public route and returns its id.
    pub async fn register(&self, email: &str, password: &str, role: &str) -> Uuid {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/users/register",
                None,
                serde_json::json!({
                    "name": "Test User",
                    "email": email,
                    "password": password,
                    "role": role,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Creates a course through the protected route.
    pub async fn create_course(&self, token: &str, title: &str) -> Uuid {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/courses",
                Some(token),
                serde_json::json!({
                    "title": title,
                    "description": "A course used by the tests",
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }
}

/// A valid admin token for an arbitrary identity.
pub fn admin_token() -> String {
    issue_token(
        &UserCredentials {
            user_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            hashed_password: String::new(),
        },
        JWT_SECRET,
    )
    .unwrap()
}

//=========================================================================================
// Request Builders
//=========================================================================================

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "learnstake-test-boundary";

/// A file part for `multipart_request`: field name, file name, content type, bytes.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<FilePart<'_>>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap()
}
