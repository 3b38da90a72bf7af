use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only campground pages and the account flow. Nothing here mutates a campground.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::home))
        // GET /campgrounds
        .route("/campgrounds", get(handlers::list_campgrounds))
        // GET /campgrounds/{id}
        // Detail page with reviews, or a flash + redirect when the id is unknown.
        .route("/campgrounds/{id}", get(handlers::show_campground))
        // --- Accounts ---
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register_user),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
}
