//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, collected from the
//! `#[utoipa::path]` annotations on every REST handler. The router serves it
//! through Swagger UI.

use utoipa::OpenApi;

use crate::web::{auth, courses, lessons, protocol, questions, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::verify_token_handler,
        users::register_user_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        courses::create_course_handler,
        courses::list_courses_handler,
        courses::get_course_handler,
        courses::update_course_handler,
        courses::delete_course_handler,
        lessons::upload_lesson_handler,
        lessons::upload_video_handler,
        lessons::list_lessons_handler,
        lessons::get_lesson_handler,
        lessons::list_course_lessons_handler,
        lessons::update_lesson_handler,
        lessons::delete_lesson_handler,
        questions::create_question_handler,
        questions::get_question_handler,
        questions::list_course_questions_handler,
        questions::update_question_handler,
        questions::delete_question_handler,
        questions::generate_questions_handler,
    ),
    components(
        schemas(
            protocol::LoginRequest,
            protocol::RegisterUserRequest,
            protocol::UpdateUserRequest,
            protocol::CourseRequest,
            protocol::UpdateLessonRequest,
            protocol::OptionInput,
            protocol::CreateQuestionRequest,
            protocol::UpdateQuestionRequest,
            protocol::UserView,
            protocol::UserSummary,
            protocol::LoginData,
            protocol::TokenData,
            protocol::CourseView,
            protocol::LessonView,
            protocol::MediaView,
            protocol::OptionView,
            protocol::QuestionView,
            protocol::FailureView,
            protocol::GenerationView,
            protocol::DeletedView,
        )
    ),
    tags(
        (name = "auth", description = "Login and token checks."),
        (name = "users", description = "User accounts."),
        (name = "courses", description = "Course catalogue."),
        (name = "lessons", description = "Lessons and their videos."),
        (name = "questions", description = "Quiz authoring and generation.")
    )
)]
pub struct ApiDoc;
