use crate::models::{Campground, CampgroundDetails, CampgroundInput, Review};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Any failure reaching the campground store. Handlers never inspect it; it is turned
/// into a generic 500 page by `AppError`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Abstract contract for campground persistence, so handlers can run against Postgres
/// in production and against a recording mock in tests.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Retrieval ---
    async fn find_campgrounds(&self) -> RepoResult<Vec<Campground>>;
    async fn find_campground(&self, id: Uuid) -> RepoResult<Option<Campground>>;
    // Campground plus its reviews, oldest first.
    async fn find_campground_with_reviews(&self, id: Uuid) -> RepoResult<Option<CampgroundDetails>>;

    // --- Mutation ---
    async fn create_campground(&self, input: CampgroundInput, owner_id: Uuid) -> RepoResult<Campground>;
    // `None` when no campground has this id.
    async fn update_campground(&self, id: Uuid, input: CampgroundInput) -> RepoResult<Option<Campground>>;
    // `false` when no campground has this id. Its reviews go with it.
    async fn delete_campground(&self, id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the `campgrounds` and `reviews` tables.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CAMPGROUND_COLUMNS: &str =
    "id, title, location, price, description, image, owner_id, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_campgrounds(&self) -> RepoResult<Vec<Campground>> {
        let campgrounds = sqlx::query_as::<_, Campground>(&format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(campgrounds)
    }

    async fn find_campground(&self, id: Uuid) -> RepoResult<Option<Campground>> {
        let campground = sqlx::query_as::<_, Campground>(&format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(campground)
    }

    /// find_campground_with_reviews
    ///
    /// Two reads: the campground, then its reviews. A missing campground short-circuits
    /// before the second query.
    async fn find_campground_with_reviews(&self, id: Uuid) -> RepoResult<Option<CampgroundDetails>> {
        let Some(campground) = self.find_campground(id).await? else {
            return Ok(None);
        };

        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, campground_id, author_id, body, rating, created_at
            FROM reviews
            WHERE campground_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CampgroundDetails { campground, reviews }))
    }

    async fn create_campground(&self, input: CampgroundInput, owner_id: Uuid) -> RepoResult<Campground> {
        let campground = sqlx::query_as::<_, Campground>(&format!(
            r#"
            INSERT INTO campgrounds (id, title, location, price, description, image, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CAMPGROUND_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.title)
        .bind(input.location)
        .bind(input.price)
        .bind(input.description)
        .bind(input.image)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(campground_id = %campground.id, %owner_id, "created campground");
        Ok(campground)
    }

    async fn update_campground(&self, id: Uuid, input: CampgroundInput) -> RepoResult<Option<Campground>> {
        let campground = sqlx::query_as::<_, Campground>(&format!(
            r#"
            UPDATE campgrounds
            SET title = $2, location = $3, price = $4, description = $5, image = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CAMPGROUND_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.title)
        .bind(input.location)
        .bind(input.price)
        .bind(input.description)
        .bind(input.image)
        .fetch_optional(&self.pool)
        .await?;

        if campground.is_some() {
            tracing::info!(campground_id = %id, "updated campground");
        }
        Ok(campground)
    }

    async fn delete_campground(&self, id: Uuid) -> RepoResult<bool> {
        // Reviews are removed by ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(campground_id = %id, "deleted campground");
        }
        Ok(deleted)
    }
}
