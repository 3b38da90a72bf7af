use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppResult, models::User};

pub const SESSION_COOKIE: &str = "yelpcamp.session";
pub const FLASH_COOKIE: &str = "yelpcamp.flash";

// A flash only has to survive one redirect.
const FLASH_TTL_MINUTES: i64 = 5;

/// Claims
///
/// Payload of the signed session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id.
    pub sub: Uuid,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// The identity carried by a session, as seen by views and guards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// Flash
///
/// A one-shot message shown by the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FlashClaims {
    kind: FlashKind,
    message: String,
    exp: i64,
}

/// Session
///
/// Request-scoped context handed to every handler: who is logged in, plus the ability
/// to write a flash message or start/end the login. It owns the request's cookie jar
/// and must be returned as part of the response for its changes to reach the browser.
#[derive(Debug, Clone)]
pub struct Session {
    jar: CookieJar,
    config: AppConfig,
    user: Option<SessionUser>,
}

impl Session {
    /// Builds the session from an incoming jar. A missing, expired or tampered session
    /// cookie simply yields an anonymous session.
    pub fn new(jar: CookieJar, config: &AppConfig) -> Self {
        let user = jar
            .get(SESSION_COOKIE)
            .and_then(|c| decode_session(&config.session_secret, c.value()));
        Self {
            jar,
            config: config.clone(),
            user,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Queues a flash for the next rendered view.
    pub fn flash(mut self, kind: FlashKind, message: impl Into<String>) -> AppResult<Self> {
        let token = encode_flash(&self.config.session_secret, kind, message.into())?;
        let cookie = self.cookie(FLASH_COOKIE, token);
        self.jar = self.jar.add(cookie);
        Ok(self)
    }

    /// take_flash
    ///
    /// Reads the pending flash, if any, and clears it so it is shown exactly once.
    pub fn take_flash(mut self) -> (Self, Option<Flash>) {
        let Some(cookie) = self.jar.get(FLASH_COOKIE) else {
            return (self, None);
        };
        let flash = decode_flash(&self.config.session_secret, cookie.value());
        self.jar = self.jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/"));
        (self, flash)
    }

    /// Starts an authenticated session for `user`.
    pub fn login(mut self, user: &User) -> AppResult<Self> {
        let session_user = SessionUser {
            id: user.id,
            username: user.username.clone(),
        };
        let token = encode_session(&self.config, &session_user)?;
        let cookie = self.cookie(SESSION_COOKIE, token);
        self.jar = self.jar.add(cookie);
        self.user = Some(session_user);
        Ok(self)
    }

    pub fn logout(mut self) -> Self {
        self.jar = self.jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
        self.user = None;
        self
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.secure_cookies())
            .build()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state).await?;
        Ok(Self::new(jar, &config))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}

// --- Token encoding ---

/// Signs a session token for `user`, valid for the configured session lifetime.
pub fn encode_session(
    config: &AppConfig,
    user: &SessionUser,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(config.session_ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.session_secret.as_bytes()),
    )
}

pub fn decode_session(secret: &str, token: &str) -> Option<SessionUser> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(SessionUser {
            id: data.claims.sub,
            username: data.claims.username,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring invalid session cookie");
            None
        }
    }
}

fn encode_flash(
    secret: &str,
    kind: FlashKind,
    message: String,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = FlashClaims {
        kind,
        message,
        exp: (Utc::now() + Duration::minutes(FLASH_TTL_MINUTES)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_flash(secret: &str, token: &str) -> Option<Flash> {
    decode::<FlashClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| Flash {
        kind: data.claims.kind,
        message: data.claims.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::from_u128(7),
            email: "tim@example.com".to_string(),
            username: "tim".to_string(),
        }
    }

    #[test]
    fn anonymous_without_cookie() {
        let session = Session::new(CookieJar::new(), &AppConfig::default());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn login_cookie_round_trips_into_a_new_session() {
        let config = AppConfig::default();
        let session = Session::new(CookieJar::new(), &config).login(&user()).unwrap();
        let token = session.jar.get(SESSION_COOKIE).unwrap().value().to_string();

        let next = Session::new(CookieJar::new().add(Cookie::new(SESSION_COOKIE, token)), &config);

        assert_eq!(
            next.user(),
            Some(&SessionUser {
                id: Uuid::from_u128(7),
                username: "tim".to_string()
            })
        );
    }

    #[test]
    fn token_signed_with_another_secret_is_ignored() {
        let other = AppConfig {
            session_secret: "someone-else".to_string(),
            ..AppConfig::default()
        };
        let token = encode_session(
            &other,
            &SessionUser {
                id: Uuid::from_u128(1),
                username: "mallory".to_string(),
            },
        )
        .unwrap();

        assert!(decode_session(&AppConfig::default().session_secret, &token).is_none());
    }

    #[test]
    fn flash_is_read_once() {
        let config = AppConfig::default();
        let written = Session::new(CookieJar::new(), &config)
            .flash(FlashKind::Success, "saved")
            .unwrap();
        let token = written.jar.get(FLASH_COOKIE).unwrap().value().to_string();

        let incoming = Session::new(CookieJar::new().add(Cookie::new(FLASH_COOKIE, token)), &config);
        let (after, flash) = incoming.take_flash();

        assert_eq!(
            flash,
            Some(Flash {
                kind: FlashKind::Success,
                message: "saved".to_string()
            })
        );
        assert!(after.jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn logout_drops_the_user() {
        let session = Session::new(CookieJar::new(), &AppConfig::default())
            .login(&user())
            .unwrap()
            .logout();
        assert!(session.user().is_none());
        assert!(session.jar.get(SESSION_COOKIE).is_none());
    }
}
