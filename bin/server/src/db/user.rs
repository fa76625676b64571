//! User repository.

use crate::db::{storage_error, violated_constraint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use storefront_domain::{DomainError, NewUser, User, UserStore};

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    full_name: String,
    email: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DomainError> {
        let role = self
            .role
            .parse()
            .map_err(|_| DomainError::storage(format!("invalid role '{}' in storage", self.role)))?;
        Ok(User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            full_name: self.full_name,
            email: self.email,
            role,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

/// Postgres-backed [`UserStore`].
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        rows.into_iter().map(UserRow::try_into_user).collect()
    }

    async fn get(&self, id: i64) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(UserRow::try_into_user).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(UserRow::try_into_user).transpose()
    }

    async fn insert(&self, new: NewUser) -> Result<User, DomainError> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("users_username_key") => DomainError::Duplicate {
                entity: "Username",
                value: new.username.clone(),
            },
            Some("users_email_key") => DomainError::Duplicate {
                entity: "Email",
                value: new.email.clone(),
            },
            _ => storage_error(e),
        })?;
        row.try_into_user()
    }

    async fn delete(&self, id: i64) -> Result<(), DomainError> {
        let deleted: Option<(i64,)> =
            sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        deleted.map(|_| ()).ok_or(DomainError::NotFound {
            entity: "User",
            key: id.to_string(),
        })
    }
}
