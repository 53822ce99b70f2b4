use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileChanges, User, UserRow};
use crate::error::{AppError, AppResult};

/// Persistence seam for identity records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `email` must already be case-folded.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Fails with `DuplicateEmail` when the email is taken.
    async fn create(&self, user: NewUser) -> AppResult<User>;
    async fn update_profile(&self, id: Uuid, changes: ProfileChanges)
        -> anyhow::Result<Option<User>>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()>;
    /// Returns false when no such user exists.
    #[allow(dead_code)] // deactivation is an admin operation with no route
    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, phone, country, \
     state, city, denomination, organization, role, is_active, is_email_verified, \
     last_login, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, phone, country,
                               state, city, denomination, organization)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.country)
        .bind(&user.state)
        .bind(&user.city)
        .bind(&user.denomination)
        .bind(&user.organization)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(row) => Ok(User::try_from(row)?),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateEmail)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET first_name   = COALESCE($2, first_name),
                   last_name    = COALESCE($3, last_name),
                   country      = COALESCE($4, country),
                   phone        = CASE WHEN $5 THEN $6 ELSE phone END,
                   state        = CASE WHEN $7 THEN $8 ELSE state END,
                   city         = CASE WHEN $9 THEN $10 ELSE city END,
                   denomination = CASE WHEN $11 THEN $12 ELSE denomination END,
                   organization = CASE WHEN $13 THEN $14 ELSE organization END,
                   updated_at   = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.country)
        .bind(changes.phone.is_some())
        .bind(changes.phone.flatten())
        .bind(changes.state.is_some())
        .bind(changes.state.flatten())
        .bind(changes.city.is_some())
        .bind(changes.city.flatten())
        .bind(changes.denomination.is_some())
        .bind(changes.denomination.flatten())
        .bind(changes.organization.is_some())
        .bind(changes.organization.flatten())
        .fetch_optional(&self.db)
        .await
        .context("update user profile")?;
        row.map(User::try_from).transpose()
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await
            .context("update last_login")?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.db)
            .await
            .context("update is_active")?;
        Ok(res.rows_affected() > 0)
    }
}
