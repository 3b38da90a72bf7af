use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::AppError,
    validation::{Field, Schema, Validate},
};

// --- Stored Records ---

/// Campground
///
/// A listing from the `campgrounds` table. `id` is generated on insert and never
/// changes for the lifetime of the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Campground {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub price: f64,
    pub description: String,
    // URL of the cover image.
    pub image: String,
    // The user who created the listing. Null for rows seeded without an owner.
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review
///
/// Row from the `reviews` table. Only read here, to populate a campground's detail page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub author_id: Option<Uuid>,
    pub body: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// CampgroundDetails
///
/// A campground with its reviews populated, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CampgroundDetails {
    #[serde(flatten)]
    pub campground: Campground,
    pub reviews: Vec<Review>,
}

/// User
///
/// Public identity of an account. The password hash stays inside the account store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
}

/// NewUser
///
/// The identity half of a registration; the password travels separately to the provider.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub username: String,
}

// --- Request Payloads ---

/// Declared shape of the `campground[...]` form sent by the new and edit pages.
pub static CAMPGROUND_SCHEMA: Schema = Schema {
    object: "campground",
    fields: &[
        Field::text("title"),
        Field::number("price").min(0.0),
        Field::text("image"),
        Field::text("location"),
        Field::text("description"),
    ],
};

/// CampgroundInput
///
/// Validated body of a create or update request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CampgroundInput {
    pub title: String,
    pub location: String,
    pub price: f64,
    pub description: String,
    pub image: String,
}

impl Validate for CampgroundInput {
    fn schema() -> &'static Schema {
        &CAMPGROUND_SCHEMA
    }

    fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let schema = Self::schema();
        let text = |name: &str| -> Result<String, AppError> {
            fields
                .get(&schema.key(name))
                .map(|v| v.trim().to_string())
                .ok_or_else(|| AppError::bad_request(format!("\"{}\" is required", schema.path(name))))
        };
        let price = text("price")?
            .parse::<f64>()
            .map_err(|_| AppError::bad_request(format!("\"{}\" must be a number", schema.path("price"))))?;

        Ok(Self {
            title: text("title")?,
            location: text("location")?,
            price,
            description: text("description")?,
            image: text("image")?,
        })
    }
}

/// RegisterForm
///
/// Body of `POST /register`. Missing fields decode as empty so the account store can
/// report them with its own messages.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// LoginForm
///
/// Body of `POST /login`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}
