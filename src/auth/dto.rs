use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub country: String,
    pub phone: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub denomination: Option<String>,
    pub organization: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `PUT /auth/profile`.
///
/// Optional fields are tri-state: absent keeps the value, `null` clears it.
/// `email` and `password` are accepted only so their presence, even as
/// `null`, can be rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub denomination: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub organization: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<serde_json::Value>,
}

/// Any key that appears in the body becomes `Some`, including `null`.
fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    pub denomination: Option<String>,
    pub organization: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_email_verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            country: u.country.clone(),
            state: u.state.clone(),
            city: u.city.clone(),
            denomination: u.denomination.clone(),
            organization: u.organization.clone(),
            role: u.role,
            is_active: u.is_active,
            is_email_verified: u.is_email_verified,
            last_login: u.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::sample_user;

    #[test]
    fn public_user_omits_password_and_uses_camel_case() {
        let user = sample_user("test@example.com");
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["isEmailVerified"], false);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["role"], "member");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json["lastLogin"].is_null());
    }

    #[test]
    fn register_request_reads_camel_case_fields() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"firstName":"A","lastName":"B","email":"a@b.com","password":"secret1","country":"Kenya"}"#,
        )
        .unwrap();
        assert_eq!(req.first_name, "A");
        assert_eq!(req.last_name, "B");
        assert!(req.phone.is_none());
    }

    #[test]
    fn profile_update_distinguishes_absent_from_null() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"city":null,"phone":"0700","email":null}"#).unwrap();
        assert_eq!(req.city, Some(None));
        assert_eq!(req.phone, Some(Some("0700".into())));
        assert!(req.state.is_none());
        assert_eq!(req.email, Some(serde_json::Value::Null));
        assert!(req.password.is_none());
    }
}
