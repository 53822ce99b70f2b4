use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Membership role. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Leader,
    Pastor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Leader => "leader",
            Role::Pastor => "pastor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "leader" => Ok(Role::Leader),
            "pastor" => Ok(Role::Pastor),
            "admin" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// Raw `users` row as selected from Postgres.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub denomination: Option<String>,
    pub organization: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Member identity record.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub denomination: Option<String>,
    pub organization: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: r.role.parse()?,
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            password_hash: r.password_hash,
            phone: r.phone,
            country: r.country,
            state: r.state,
            city: r.city,
            denomination: r.denomination,
            organization: r.organization,
            is_active: r.is_active,
            is_email_verified: r.is_email_verified,
            last_login: r.last_login,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated registration data with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub denomination: Option<String>,
    pub organization: Option<String>,
}

/// Profile fields a member may change. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub country: Option<String>,
    pub state: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub denomination: Option<Option<String>>,
    pub organization: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.country.is_none()
            && self.state.is_none()
            && self.city.is_none()
            && self.denomination.is_none()
            && self.organization.is_none()
    }

}
