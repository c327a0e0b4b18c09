pub mod auth;
pub mod courses;
pub mod extract;
pub mod lessons;
pub mod middleware;
pub mod protocol;
pub mod questions;
pub mod rest;
pub mod state;
pub mod token;
pub mod users;

pub use middleware::require_auth;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{rest::ApiDoc, state::AppState};

/// Builds the complete HTTP application around the shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/verify-token", post(auth::verify_token_handler))
        .route("/api/users/register", post(users::register_user_handler))
        .route("/api/courses", get(courses::list_courses_handler))
        .route("/api/courses/{id}", get(courses::get_course_handler))
        .route("/api/lessons", get(lessons::list_lessons_handler))
        .route("/api/lessons/{id}", get(lessons::get_lesson_handler))
        .route(
            "/api/lessons/course/{course_id}",
            get(lessons::list_course_lessons_handler),
        )
        .route("/api/questions/{id}", get(questions::get_question_handler))
        .route(
            "/api/questions/course/{course_id}",
            get(questions::list_course_questions_handler),
        );

    // Video uploads get their own body limit; everything else keeps axum's default.
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/users/all", get(users::list_users_handler))
        .route("/api/users/{id}", get(users::get_user_handler))
        .route("/api/users/update/{id}", put(users::update_user_handler))
        .route(
            "/api/users/delete/{id}",
            axum::routing::delete(users::delete_user_handler),
        )
        .route("/api/courses", post(courses::create_course_handler))
        .route(
            "/api/courses/{id}",
            put(courses::update_course_handler).delete(courses::delete_course_handler),
        )
        .route(
            "/api/lessons/uploadLesson",
            post(lessons::upload_lesson_handler).layer(upload_limit),
        )
        .route(
            "/api/lessons/upload",
            post(lessons::upload_video_handler).layer(upload_limit),
        )
        .route(
            "/api/lessons/{id}",
            put(lessons::update_lesson_handler).delete(lessons::delete_lesson_handler),
        )
        .route("/api/questions", post(questions::create_question_handler))
        .route(
            "/api/questions/{id}",
            put(questions::update_question_handler).delete(questions::delete_question_handler),
        )
        .route(
            "/api/questions/log/{course_id}/{question_count}/{difficulty}",
            get(questions::generate_questions_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::AUTH_TOKEN_HEADER),
        ]);

    // Combine API routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
