use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, ProfileChanges, Role, User};
use crate::error::{AppError, AppResult};

/// In-process store used by tests in place of Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            country: user.country,
            state: user.state,
            city: user.city,
            denomination: user.denomination,
            organization: user.organization,
            role: Role::Member,
            is_active: true,
            is_email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            apply(changes, user);
            user.updated_at = OffsetDateTime::now_utc();
            user.clone()
        }))
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<bool> {
        Ok(match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        })
    }
}

fn apply(changes: ProfileChanges, user: &mut User) {
    if let Some(v) = changes.first_name {
        user.first_name = v;
    }
    if let Some(v) = changes.last_name {
        user.last_name = v;
    }
    if let Some(v) = changes.country {
        user.country = v;
    }
    if let Some(v) = changes.phone {
        user.phone = v;
    }
    if let Some(v) = changes.state {
        user.state = v;
    }
    if let Some(v) = changes.city {
        user.city = v;
    }
    if let Some(v) = changes.denomination {
        user.denomination = v;
    }
    if let Some(v) = changes.organization {
        user.organization = v;
    }
}
