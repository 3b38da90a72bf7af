use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{
    accounts::AccountsState,
    config::AppConfig,
    error::AppError,
    session::{FlashKind, Session},
};

pub const LOGIN_REQUIRED_MESSAGE: &str = "you must be signed in first";

/// AuthUser
///
/// The resolved identity of an authenticated request. Using it as a handler argument
/// (or passing through [`require_login`]) is what makes a route protected.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// AuthRejection
///
/// Why a request could not be authenticated. Anonymous visitors are sent to the login
/// page with an explanatory flash; a failing account store is a regular fault.
#[derive(Debug)]
pub enum AuthRejection {
    LoginRequired(Session),
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRequired(session) => {
                match session.flash(FlashKind::Error, LOGIN_REQUIRED_MESSAGE) {
                    Ok(session) => (session, Redirect::to("/login")).into_response(),
                    Err(e) => e.into_response(),
                }
            }
            Self::Failed(e) => e.into_response(),
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Reuses an identity already resolved by [`require_login`] for this request.
/// 2. Otherwise decodes the signed session cookie.
/// 3. Confirms the account still exists, so a session outliving its user is rejected.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AccountsState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err(never) => match never {},
        };
        let Some(session_user) = session.user().cloned() else {
            tracing::debug!(path = %parts.uri.path(), "anonymous request to protected route");
            return Err(AuthRejection::LoginRequired(session));
        };

        let accounts = AccountsState::from_ref(state);
        match accounts.find_user(session_user.id).await {
            Ok(Some(user)) => Ok(AuthUser {
                id: user.id,
                username: user.username,
            }),
            Ok(None) => {
                tracing::info!(user_id = %session_user.id, "session refers to a missing user");
                Err(AuthRejection::LoginRequired(session.logout()))
            }
            Err(e) => Err(AuthRejection::Failed(e.into())),
        }
    }
}

/// require_login
///
/// Route layer for every protected route. Runs before any handler extractor, so an
/// anonymous request is turned away before its body is read or validated.
pub async fn require_login(user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}
