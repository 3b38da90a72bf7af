use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// AuthError
///
/// Outcome of a failed registration or login. The first group of variants describe
/// something the user can fix and carry the message shown back to them; the rest are
/// infrastructure faults.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No email was given")]
    MissingEmail,
    #[error("No username was given")]
    MissingUsername,
    #[error("No password was given")]
    MissingPassword,
    #[error("A user with the given username is already registered")]
    UserExists,
    #[error("A user with the given email is already registered")]
    EmailExists,
    #[error("Password or username is incorrect")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("account store error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    /// Whether the message is meant for the end user.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::MissingEmail
                | Self::MissingUsername
                | Self::MissingPassword
                | Self::UserExists
                | Self::EmailExists
                | Self::InvalidCredentials
        )
    }
}

/// AuthProvider
///
/// The identity collaborator: owns credentials, so handlers never see a password hash.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates the account and stores the hashed password.
    async fn register(&self, user: NewUser, password: &str) -> Result<User, AuthError>;
    /// Verifies a username/password pair.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;
    /// Resolves the user behind a session; `None` once the account is gone.
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError>;
}

pub type AccountsState = Arc<dyn AuthProvider>;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
        }
    }
}

/// PostgresAuthProvider
///
/// Accounts in the `users` table with bcrypt password hashes. Hashing runs on the
/// blocking pool so it does not stall the request executor.
pub struct PostgresAuthProvider {
    pool: PgPool,
    cost: u32,
}

impl PostgresAuthProvider {
    pub fn new(pool: PgPool, cost: u32) -> Self {
        Self { pool, cost }
    }
}

#[async_trait]
impl AuthProvider for PostgresAuthProvider {
    async fn register(&self, user: NewUser, password: &str) -> Result<User, AuthError> {
        if user.email.trim().is_empty() {
            return Err(AuthError::MissingEmail);
        }
        if user.username.trim().is_empty() {
            return Err(AuthError::MissingUsername);
        }
        if password.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let password = password.to_string();
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email.trim())
        .bind(user.username.trim())
        .bind(hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(created) => {
                tracing::info!(user_id = %created.id, username = %created.username, "registered user");
                Ok(created)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                if db.constraint() == Some("users_email_key") {
                    Err(AuthError::EmailExists)
                } else {
                    Err(AuthError::UserExists)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = row.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;

        if matches {
            Ok(row.into())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, username FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_are_distinguished_from_faults() {
        assert!(AuthError::MissingEmail.is_user_facing());
        assert_eq!(AuthError::MissingEmail.to_string(), "No email was given");
        assert!(AuthError::UserExists.is_user_facing());
        assert!(AuthError::InvalidCredentials.is_user_facing());
        assert!(!AuthError::Database(sqlx::Error::RowNotFound).is_user_facing());
    }
}
