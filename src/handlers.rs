use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{CampgroundInput, LoginForm, NewUser, RegisterForm},
    session::{FlashKind, Session, SessionUser},
    validation::Valid,
    views::{Page, View},
};
use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    response::{Html, IntoResponse, Redirect, Response},
};
use uuid::Uuid;

pub const NOT_FOUND_MESSAGE: &str = "cannot find that campground here";
pub const UNREADABLE_REGISTRATION_MESSAGE: &str = "The registration form could not be read";

// --- Helpers ---

/// render
///
/// Builds the view locals from the session (current user, pending flash), renders
/// the page and returns it together with the session's cookie changes. The current
/// user is confirmed against the account store; a session naming a deleted account
/// is ended here.
async fn render(state: &AppState, session: Session, page: Page) -> AppResult<Response> {
    let (mut session, flash) = session.take_flash();
    let current_user = match session.user().cloned() {
        Some(claimed) => match state.accounts.find_user(claimed.id).await? {
            Some(user) => Some(SessionUser {
                id: user.id,
                username: user.username,
            }),
            None => {
                tracing::info!(user_id = %claimed.id, "dropping session of a missing user");
                session = session.logout();
                None
            }
        },
        None => None,
    };
    let view = View {
        page,
        current_user,
        flash,
    };
    let body = state.views.render(&view)?;
    Ok((session, Html(body)).into_response())
}

fn redirect_with_flash(session: Session, kind: FlashKind, message: &str, to: &str) -> AppResult<Response> {
    let session = session.flash(kind, message)?;
    Ok((session, Redirect::to(to)).into_response())
}

/// The "not found" outcome for a campground id: flash plus a trip back to the listing.
fn campground_not_found(session: Session) -> AppResult<Response> {
    redirect_with_flash(session, FlashKind::Error, NOT_FOUND_MESSAGE, "/campgrounds")
}

// Ids that do not parse cannot name a campground.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

// --- Campground Handlers ---

/// home
///
/// [Public Route] Landing page.
pub async fn home(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    render(&state, session, Page::Home).await
}

/// list_campgrounds
///
/// [Public Route] Every campground, newest first.
pub async fn list_campgrounds(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let campgrounds = state.repo.find_campgrounds().await?;
    render(&state, session, Page::CampgroundIndex { campgrounds }).await
}

/// new_campground_form
///
/// [Authenticated Route] Empty creation form.
pub async fn new_campground_form(
    _user: AuthUser,
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    render(&state, session, Page::NewCampground).await
}

/// create_campground
///
/// [Authenticated Route] Persists a validated campground owned by the current user
/// and redirects to its detail page.
pub async fn create_campground(
    user: AuthUser,
    State(state): State<AppState>,
    session: Session,
    Valid(input): Valid<CampgroundInput>,
) -> AppResult<Response> {
    let campground = state.repo.create_campground(input, user.id).await?;
    redirect_with_flash(
        session,
        FlashKind::Success,
        "successfully create a new campground here",
        &format!("/campgrounds/{}", campground.id),
    )
}

/// show_campground
///
/// [Public Route] Detail page with reviews. An unknown id is not a fault: it is
/// reported with a flash and a redirect to the listing.
pub async fn show_campground(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(id) = parse_id(&id) else {
        return campground_not_found(session);
    };
    match state.repo.find_campground_with_reviews(id).await? {
        Some(campground) => render(&state, session, Page::ShowCampground { campground }).await,
        None => campground_not_found(session),
    }
}

/// edit_campground_form
///
/// [Authenticated Route] Edit form pre-filled with the stored values.
pub async fn edit_campground_form(
    _user: AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(id) = parse_id(&id) else {
        return campground_not_found(session);
    };
    match state.repo.find_campground(id).await? {
        Some(campground) => render(&state, session, Page::EditCampground { campground }).await,
        None => campground_not_found(session),
    }
}

/// update_campground
///
/// [Authenticated Route] Replaces the campground's fields with the validated payload.
pub async fn update_campground(
    _user: AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Valid(input): Valid<CampgroundInput>,
) -> AppResult<Response> {
    let Some(id) = parse_id(&id) else {
        return campground_not_found(session);
    };
    match state.repo.update_campground(id, input).await? {
        Some(campground) => redirect_with_flash(
            session,
            FlashKind::Success,
            "successfully updated campground",
            &format!("/campgrounds/{}", campground.id),
        ),
        None => campground_not_found(session),
    }
}

/// delete_campground
///
/// [Authenticated Route] Removes the campground (and its reviews).
pub async fn delete_campground(
    _user: AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(id) = parse_id(&id) else {
        return campground_not_found(session);
    };
    if state.repo.delete_campground(id).await? {
        redirect_with_flash(
            session,
            FlashKind::Success,
            "successfully deleted a campground here",
            "/campgrounds",
        )
    } else {
        campground_not_found(session)
    }
}

// --- User / Session Handlers ---

/// register_form
///
/// [Public Route]
pub async fn register_form(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    render(&state, session, Page::Register).await
}

/// register_user
///
/// [Public Route] Creates the account through the auth provider and logs the new
/// user in. Any provider failure (taken username, missing password, ...) is shown as
/// a flash on the registration page instead of an error page, and so is a body that
/// is not a urlencoded form.
pub async fn register_user(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::info!(reason = %rejection.body_text(), "unreadable registration form");
            return redirect_with_flash(
                session,
                FlashKind::Error,
                UNREADABLE_REGISTRATION_MESSAGE,
                "/register",
            );
        }
    };
    let new_user = NewUser {
        email: form.email,
        username: form.username,
    };

    match state.accounts.register(new_user, &form.password).await {
        Ok(user) => {
            let session = session.login(&user)?;
            redirect_with_flash(session, FlashKind::Success, "Welcome to YelpCamp", "/campgrounds")
        }
        Err(e) => {
            let message = if e.is_user_facing() {
                tracing::info!(reason = %e, "registration refused");
                e.to_string()
            } else {
                tracing::error!(error = ?e, "registration failed");
                AppError::internal().message
            };
            redirect_with_flash(session, FlashKind::Error, &message, "/register")
        }
    }
}

/// login_form
///
/// [Public Route]
pub async fn login_form(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    render(&state, session, Page::Login).await
}

/// login
///
/// [Public Route] Bad credentials send the user back to the login page with a flash;
/// an unavailable account store is a fault, and an unreadable body is a bad request.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    match state.accounts.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user logged in");
            let session = session.login(&user)?;
            redirect_with_flash(session, FlashKind::Success, "welcome back", "/campgrounds")
        }
        Err(e) if e.is_user_facing() => {
            redirect_with_flash(session, FlashKind::Error, &e.to_string(), "/login")
        }
        Err(e) => Err(e.into()),
    }
}

/// logout
///
/// [Public Route] Ends the session whether or not one existed.
pub async fn logout(session: Session) -> AppResult<Response> {
    redirect_with_flash(session.logout(), FlashKind::Success, "you have logged out", "/campgrounds")
}

/// not_found
///
/// Router fallback: unknown paths take the error-page track.
pub async fn not_found() -> AppError {
    AppError::not_found("Page Not Found")
}
