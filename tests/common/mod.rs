#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tower::util::ServiceExt;
use uuid::Uuid;
use yelpcamp::{
    AppConfig, AppResult, AppState, create_app,
    accounts::{AuthError, AuthProvider},
    models::{Campground, CampgroundDetails, CampgroundInput, NewUser, Review, User},
    repository::{RepoResult, Repository},
    session::{self, FLASH_COOKIE, Flash, SESSION_COOKIE, SessionUser},
    views::{Renderer, View},
};

// --- MOCK REPOSITORY ---

/// In-memory campground store that records every write it receives.
#[derive(Default)]
pub struct MockRepoControl {
    pub campgrounds: Mutex<Vec<Campground>>,
    pub reviews: Mutex<Vec<Review>>,
    pub writes: Mutex<Vec<&'static str>>,
}

impl MockRepoControl {
    pub fn with_campgrounds(campgrounds: Vec<Campground>) -> Self {
        Self {
            campgrounds: Mutex::new(campgrounds),
            ..Self::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn count(&self) -> usize {
        self.campgrounds.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> Option<Campground> {
        self.campgrounds
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn find_campgrounds(&self) -> RepoResult<Vec<Campground>> {
        Ok(self.campgrounds.lock().unwrap().clone())
    }

    async fn find_campground(&self, id: Uuid) -> RepoResult<Option<Campground>> {
        Ok(self.get(id))
    }

    async fn find_campground_with_reviews(&self, id: Uuid) -> RepoResult<Option<CampgroundDetails>> {
        Ok(self.get(id).map(|campground| CampgroundDetails {
            reviews: self
                .reviews
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.campground_id == id)
                .cloned()
                .collect(),
            campground,
        }))
    }

    async fn create_campground(&self, input: CampgroundInput, owner_id: Uuid) -> RepoResult<Campground> {
        self.writes.lock().unwrap().push("create");
        let now = Utc::now();
        let campground = Campground {
            id: Uuid::new_v4(),
            title: input.title,
            location: input.location,
            price: input.price,
            description: input.description,
            image: input.image,
            owner_id: Some(owner_id),
            created_at: now,
            updated_at: now,
        };
        self.campgrounds.lock().unwrap().push(campground.clone());
        Ok(campground)
    }

    async fn update_campground(&self, id: Uuid, input: CampgroundInput) -> RepoResult<Option<Campground>> {
        self.writes.lock().unwrap().push("update");
        let mut campgrounds = self.campgrounds.lock().unwrap();
        Ok(campgrounds.iter_mut().find(|c| c.id == id).map(|c| {
            c.title = input.title;
            c.location = input.location;
            c.price = input.price;
            c.description = input.description;
            c.image = input.image;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_campground(&self, id: Uuid) -> RepoResult<bool> {
        self.writes.lock().unwrap().push("delete");
        let mut campgrounds = self.campgrounds.lock().unwrap();
        let before = campgrounds.len();
        campgrounds.retain(|c| c.id != id);
        Ok(campgrounds.len() < before)
    }
}

// --- MOCK ACCOUNTS ---

/// Account store keyed by username; passwords are kept in clear, this is a test double.
#[derive(Default)]
pub struct MockAccounts {
    pub users: Mutex<HashMap<String, (User, String)>>,
}

impl MockAccounts {
    pub fn with_user(username: &str, password: &str) -> (Self, User) {
        let accounts = Self::default();
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
        };
        accounts
            .users
            .lock()
            .unwrap()
            .insert(username.to_string(), (user.clone(), password.to_string()));
        (accounts, user)
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthProvider for MockAccounts {
    async fn register(&self, user: NewUser, password: &str) -> Result<User, AuthError> {
        if user.email.trim().is_empty() {
            return Err(AuthError::MissingEmail);
        }
        if user.username.is_empty() {
            return Err(AuthError::MissingUsername);
        }
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(AuthError::UserExists);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username.clone(),
        };
        users.insert(user.username, (created.clone(), password.to_string()));
        Ok(created)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        match self.users.lock().unwrap().get(username) {
            Some((user, stored)) if stored == password => Ok(user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }
}

// --- JSON RENDERER ---

/// Renders the view as JSON so tests can inspect exactly what a page was given.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, view: &View) -> AppResult<String> {
        Ok(serde_json::to_string(view).unwrap())
    }
}

// --- TEST UTILITIES ---

pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<MockRepoControl>,
    pub accounts: Arc<MockAccounts>,
}

impl TestApp {
    pub fn new(repo: MockRepoControl, accounts: MockAccounts) -> Self {
        let repo = Arc::new(repo);
        let accounts = Arc::new(accounts);
        let state = AppState {
            repo: repo.clone(),
            accounts: accounts.clone(),
            views: Arc::new(JsonRenderer),
            config: AppConfig::default(),
        };
        Self {
            state,
            repo,
            accounts,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        create_app(self.state.clone()).oneshot(request).await.unwrap()
    }

    /// `Cookie` header value carrying a valid session for `user`.
    pub fn session_cookie(&self, user: &User) -> String {
        let token = session::encode_session(
            &self.state.config,
            &SessionUser {
                id: user.id,
                username: user.username.clone(),
            },
        )
        .unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    /// The flash set by `response`, decoded.
    pub fn flash(&self, response: &Response<Body>) -> Option<Flash> {
        set_cookie_value(response, FLASH_COOKIE)
            .and_then(|v| session::decode_flash(&self.state.config.session_secret, &v))
    }
}

pub fn test_campground(title: &str) -> Campground {
    Campground {
        id: Uuid::new_v4(),
        title: title.to_string(),
        location: "Moab, Utah".to_string(),
        price: 25.0,
        description: "Red rock views".to_string(),
        image: "https://images.example.com/moab.jpg".to_string(),
        owner_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub const VALID_FORM: &str = "campground%5Btitle%5D=Misty+Bay&campground%5Blocation%5D=Oregon\
    &campground%5Bprice%5D=18.5&campground%5Bdescription%5D=Foggy+mornings\
    &campground%5Bimage%5D=https%3A%2F%2Fimages.example.com%2Fbay.jpg";

pub fn form_request(method: &str, uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Value of the `Set-Cookie` entry named `name`; an empty value means it was cleared.
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}
