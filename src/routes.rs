// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, quiz, submission},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quizzes/submissions, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Quiz authoring, reads, and the submission flow. All require an
    // authenticated caller; role checks happen in the handlers, which need
    // the caller's role for answer visibility anyway.
    let quiz_routes = Router::new()
        .route(
            "/subjects/{subject_id}/offerings/{offering_id}/quizzes",
            post(quiz::create_quiz),
        )
        .route("/offerings/{offering_id}/quizzes", get(quiz::list_quizzes))
        .route(
            "/quizzes/{quiz_id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/quizzes/{quiz_id}/submit", post(submission::submit_quiz))
        .route(
            "/quizzes/{quiz_id}/submissions",
            get(submission::list_submissions),
        )
        .route(
            "/quizzes/{quiz_id}/submissions/{student_id}",
            get(submission::get_submission),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", quiz_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
