// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, instructor, profile, quiz, student},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Nests every sub-router under `/api`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/count", get(profile::count_users))
        .merge(
            Router::new()
                .route(
                    "/profile",
                    get(profile::get_profile).put(profile::update_profile),
                )
                .layer(require_auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route(
            "/{id}",
            get(quiz::get_quiz)
                .put(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route("/{id}/edit", get(quiz::get_quiz_for_edit))
        .route("/{id}/attempt", post(quiz::submit_attempt))
        .route("/{id}/results", get(quiz::get_results))
        .route("/{id}/statistics", get(quiz::get_statistics))
        .route(
            "/{id}/resultsForInstructor",
            get(quiz::results_for_instructor),
        )
        .layer(require_auth.clone());

    let student_routes = Router::new()
        .route("/dashboard", get(student::get_dashboard))
        .layer(require_auth.clone());

    let instructor_routes = Router::new()
        .route("/quizzes", get(instructor::list_quizzes))
        .route("/dashboard", get(instructor::get_dashboard))
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/approve", put(admin::approve_instructor))
        .route("/users/{id}/role", put(admin::change_role))
        .route("/students/{id}/progress", get(admin::student_progress))
        .route("/statistics", get(admin::platform_statistics))
        .route("/notifications", get(admin::pending_instructors))
        // Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/students", student_routes)
        .nest("/api/instructors", instructor_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (trace outermost)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
