/// Application routes configuration
use crate::handlers::{
    auth, get_schedule, get_spec_file, get_status, get_visibility, get_weather, health,
    list_spec_options, list_targets, submit_form, validate_form, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Password gate
        .route("/auth", post(auth))
        // Dashboard endpoints
        .route("/weather", get(get_weather))
        .route("/dashboard/status", get(get_status))
        .route("/dashboard/schedule", get(get_schedule))
        // Request form endpoints
        .route("/form/targets", get(list_targets))
        .route("/form/spec-options", get(list_spec_options))
        .route("/form/spec-file", get(get_spec_file))
        .route("/form/visibility", get(get_visibility))
        .route("/form/validate", post(validate_form))
        .route("/form/submit", post(submit_form))
        .with_state(state)
}
