use std::collections::HashMap;

use axum::{
    Router,
    extract::{FromRef, Query, Request},
    http::{HeaderName, Method},
    middleware,
};
use tower::{Layer, ServiceBuilder, util::{MapRequest, MapRequestLayer}};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod validation;
pub mod views;

// Routing split by access level (public, authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use accounts::{AccountsState, PostgresAuthProvider};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{PostgresRepository, RepositoryState};
pub use views::{HtmlRenderer, RendererState};

/// AppState
///
/// Single immutable container for every shared service. Cloned per request; the
/// collaborators behind it are `Arc` handles.
#[derive(Clone)]
pub struct AppState {
    /// Campground persistence.
    pub repo: RepositoryState,
    /// Accounts and credential checks.
    pub accounts: AccountsState,
    /// View rendering.
    pub views: RendererState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors (`Session`, `AuthUser`) pull just the part of the state they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AccountsState {
    fn from_ref(app_state: &AppState) -> AccountsState {
        app_state.accounts.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// The complete service: the router behind the method-override rewrite.
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// create_app
///
/// Wraps the router so `POST ...?_method=PUT` is rewritten before routing happens.
/// Serve it with `axum::ServiceExt::into_make_service`.
pub fn create_app(state: AppState) -> App {
    MapRequestLayer::new(method_override as fn(Request) -> Request).layer(create_router(state))
}

/// create_router
///
/// Assembles the routing structure, applies the auth guard to the protected routes and
/// wraps everything in the request-id, tracing and panic layers.
pub fn create_router(state: AppState) -> Router {
    // Header name for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(public::public_routes())
        // Protected routes: the guard runs before any handler extractor.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_login,
            )),
        )
        .fallback(handlers::not_found)
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id))
            // Innermost, so a panicking handler still gets traced and a request id.
            .layer(CatchPanicLayer::custom(error::handle_panic)),
    )
}

/// method_override
///
/// HTML forms can only GET or POST. A POST carrying `_method=PUT|PATCH|DELETE` in its
/// query string is treated as that method.
fn method_override(mut request: Request) -> Request {
    if request.method() != Method::POST {
        return request;
    }
    let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(request.uri()) else {
        return request;
    };
    let method = match params.get("_method").map(|m| m.to_ascii_uppercase()).as_deref() {
        Some("PUT") => Method::PUT,
        Some("PATCH") => Method::PATCH,
        Some("DELETE") => Method::DELETE,
        _ => return request,
    };
    *request.method_mut() = method;
    request
}

/// trace_span_logger
///
/// Span for every request carrying method, uri and the `x-request-id`, so all log
/// lines of one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
