pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};

use crate::application::form::MAX_RESUME_BYTES;
use crate::application::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Application forms
        .route("/api/v1/jobs/:job_id/form", post(handlers::handle_open_form))
        .route(
            "/api/v1/forms/:id",
            get(handlers::handle_get_form).delete(handlers::handle_cancel_form),
        )
        .route("/api/v1/forms/:id/skills/:name", put(handlers::handle_rate_skill))
        .route(
            "/api/v1/forms/:id/custom-skills",
            post(handlers::handle_add_custom_skill),
        )
        .route(
            "/api/v1/forms/:id/custom-skills/:index",
            put(handlers::handle_rate_custom_skill).delete(handlers::handle_remove_custom_skill),
        )
        .route(
            "/api/v1/forms/:id/qualifiers",
            patch(handlers::handle_update_qualifiers),
        )
        .route(
            "/api/v1/forms/:id/cover-letter",
            put(handlers::handle_set_cover_letter),
        )
        .route(
            "/api/v1/forms/:id/cover-letter/regenerate",
            post(handlers::handle_regenerate_cover_letter),
        )
        .route(
            "/api/v1/forms/:id/resume/profile",
            put(handlers::handle_use_profile_resume),
        )
        // Oversized files must reach the handler so the user gets the size message.
        .route(
            "/api/v1/forms/:id/resume",
            post(handlers::handle_upload_resume)
                .layer(DefaultBodyLimit::max(2 * MAX_RESUME_BYTES)),
        )
        .route("/api/v1/forms/:id/submit", post(handlers::handle_submit))
        .route("/api/v1/forms/:id/confirm", post(handlers::handle_confirm))
        .with_state(state)
}
