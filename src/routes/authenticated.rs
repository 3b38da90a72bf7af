use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every campground write. The router returned here is wrapped with
/// `auth::require_login` in `create_router`, so each handler can rely on a resolved
/// `AuthUser`; the ones that mutate also run the `Valid` guard on their body.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /campgrounds/new
        .route("/campgrounds/new", get(handlers::new_campground_form))
        // POST /campgrounds
        // Creates a campground owned by the caller.
        .route("/campgrounds", post(handlers::create_campground))
        // GET /campgrounds/{id}/edit
        .route("/campgrounds/{id}/edit", get(handlers::edit_campground_form))
        // PUT/PATCH/DELETE /campgrounds/{id}
        // Browsers reach these through `POST ...?_method=PUT|PATCH|DELETE`.
        .route(
            "/campgrounds/{id}",
            put(handlers::update_campground)
                .patch(handlers::update_campground)
                .delete(handlers::delete_campground),
        )
}
