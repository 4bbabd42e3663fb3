// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{profile, questions, quizzes, subjects, submissions, webhooks},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (webhooks, subjects, questions, quizzes, submissions).
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

    // Identity-provider webhook: shared-secret header, no session token.
    let webhook_routes = Router::new().route("/users", post(webhooks::sync_user));

    let subject_routes = Router::new()
        .route("/", get(subjects::list_subjects))
        .merge(
            Router::new()
                .route("/", post(subjects::create_subject))
                .route(
                    "/{id}",
                    put(subjects::update_subject).delete(subjects::delete_subject),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        );

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route(
            "/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .layer(middleware::from_fn(teacher_middleware));

    let quiz_routes = Router::new()
        // Discovery: any authenticated user
        .route("/", get(quizzes::list_quizzes))
        .route("/{id}", get(quizzes::get_quiz))
        // Authoring and dashboard: teachers only
        .merge(
            Router::new()
                .route("/", post(quizzes::create_quiz))
                .route(
                    "/{id}",
                    put(quizzes::update_quiz).delete(quizzes::delete_quiz),
                )
                .route("/{id}/attempts", get(quizzes::list_quiz_attempts))
                .layer(middleware::from_fn(teacher_middleware)),
        );

    let submission_routes = Router::new()
        .route("/{quiz_id}/submit", post(submissions::submit_quiz))
        .route("/{quiz_id}/eligibility", get(submissions::check_eligibility))
        .layer(middleware::from_fn(student_middleware));

    let attempt_routes = Router::new()
        .route("/", get(submissions::list_my_attempts))
        .route("/{id}", get(submissions::get_attempt))
        .layer(middleware::from_fn(student_middleware));

    // Everything under /api except the webhook requires a session token.
    let api_routes = Router::new()
        .nest("/subjects", subject_routes)
        .nest("/questions", question_routes)
        .nest("/quizzes", quiz_routes)
        .nest("/quiz", submission_routes)
        .nest("/attempts", attempt_routes)
        .route("/me", get(profile::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/webhooks", webhook_routes)
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
