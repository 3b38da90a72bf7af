use std::any::Any;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{accounts::AuthError, repository::RepositoryError, validation::FieldError, views};

/// AppError
///
/// A failure that is shown to the end user as an error page carrying `status` and
/// `message`. Every handler returns [`AppResult`], so any fault raised with `?` lands
/// in the single translation point below instead of escaping the request.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

/// Convenience alias used by handlers and extractors.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    /// Generic 500. The detailed cause belongs in the log, never in the page.
    pub fn internal() -> Self {
        Self::new("Something went wrong", StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// validation
    ///
    /// Builds the 400 raised by the validation guard: every field message, comma-joined.
    pub fn validation(errors: &[FieldError]) -> Self {
        let message = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Self::bad_request(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, message = %self.message, "request rejected");
        }

        let body = views::error_page(self.status, &self.message);
        (self.status, Html(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!(error = ?err, "repository failure");
        Self::internal()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        // Account failures the user can act on keep their message; the rest are faults.
        if err.is_user_facing() {
            return Self::bad_request(err.to_string());
        }
        tracing::error!(error = ?err, "account store failure");
        Self::internal()
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!(error = ?err, "failed to sign session cookie");
        Self::internal()
    }
}

impl From<std::fmt::Error> for AppError {
    fn from(_: std::fmt::Error) -> Self {
        tracing::error!("failed to write view");
        Self::internal()
    }
}

/// handle_panic
///
/// Used by `CatchPanicLayer`: a handler that panics still produces the regular
/// 500 error page rather than a dropped connection.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");
    AppError::internal().into_response()
}
