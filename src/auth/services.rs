use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
    repo::UserStore,
    repo_types::{NewUser, ProfileChanges, User},
    validation::{
        normalize_email, optional, required, validate_country, validate_email, validate_password,
    },
};
use crate::error::{AppError, AppResult};

/// A user together with a freshly issued session token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> AppResult<Session> {
    let first_name = required("First name", &req.first_name)?;
    let last_name = required("Last name", &req.last_name)?;
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password)?;
    let country = validate_country(&req.country)?.to_string();

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password_blocking(req.password).await?;

    let user = users
        .create(NewUser {
            first_name,
            last_name,
            email,
            password_hash,
            phone: optional(req.phone),
            country,
            state: optional(req.state),
            city: optional(req.city),
            denomination: optional(req.denomination),
            organization: optional(req.organization),
        })
        .await?;

    let token = keys.issue(&user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Session { user, token })
}

pub async fn authenticate(
    users: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: String,
) -> AppResult<Session> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::ValidationFailed(
            "Please provide email and password".into(),
        ));
    }

    let Some(mut user) = users.find_by_email(&email).await? else {
        verify_dummy_blocking(password).await?;
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AppError::AccountInactive);
    }

    let now = OffsetDateTime::now_utc();
    users.record_login(user.id, now).await?;
    user.last_login = Some(now);

    let token = keys.issue(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session { user, token })
}

/// Resolve a bearer token to a live, active user.
pub async fn verify_token(users: &dyn UserStore, keys: &JwtKeys, token: &str) -> AppResult<User> {
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::InvalidOrExpiredToken
    })?;

    match users.find_by_id(claims.sub).await? {
        Some(user) if user.is_active => Ok(user),
        _ => {
            warn!(user_id = %claims.sub, "token subject missing or inactive");
            Err(AppError::InvalidOrInactiveUser)
        }
    }
}

pub async fn update_profile(
    users: &dyn UserStore,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    if req.email.is_some() || req.password.is_some() {
        return Err(AppError::ValidationFailed(
            "Email and password cannot be changed through profile update".into(),
        ));
    }

    let changes = ProfileChanges {
        first_name: req
            .first_name
            .map(|v| required("First name", &v))
            .transpose()?,
        last_name: req
            .last_name
            .map(|v| required("Last name", &v))
            .transpose()?,
        country: req
            .country
            .map(|v| validate_country(&v).map(str::to_string))
            .transpose()?,
        phone: req.phone.map(optional),
        state: req.state.map(optional),
        city: req.city.map(optional),
        denomination: req.denomination.map(optional),
        organization: req.organization.map(optional),
    };
    if changes.is_empty() {
        return Err(AppError::ValidationFailed("No profile fields to update".into()));
    }

    let user = users
        .update_profile(user_id, changes)
        .await?
        .ok_or(AppError::InvalidOrInactiveUser)?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{memory_repo::MemoryUserStore, test_support::test_keys};

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "A".into(),
            last_name: "B".into(),
            email: email.into(),
            password: "secret1".into(),
            country: "Kenya".into(),
            phone: None,
            state: None,
            city: Some("  ".into()),
            denomination: Some("Pentecostal".into()),
            organization: None,
        }
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();

        let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
        assert!(!stored.password_hash.contains("secret1"));
        assert!(crate::auth::password::verify_password("secret1", &stored.password_hash).unwrap());
        assert!(stored.is_active);
        assert!(!stored.is_email_verified);
        assert_eq!(stored.city, None);
        assert_eq!(stored.denomination.as_deref(), Some("Pentecostal"));
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_regardless_of_case() {
        let store = MemoryUserStore::default();
        let keys = test_keys();
        register(&store, &keys, registration("A@x.com")).await.unwrap();
        let err = register(&store, &keys, registration("a@X.COM")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let store = MemoryUserStore::default();
        let keys = test_keys();

        let mut short = registration("a@b.com");
        short.password = "12345".into();
        assert!(matches!(
            register(&store, &keys, short).await,
            Err(AppError::ValidationFailed(_))
        ));

        let mut bad_country = registration("a@b.com");
        bad_country.country = "Narnia".into();
        assert!(matches!(
            register(&store, &keys, bad_country).await,
            Err(AppError::ValidationFailed(_))
        ));

        assert!(matches!(
            register(&store, &keys, registration("not-an-email")).await,
            Err(AppError::ValidationFailed(_))
        ));

        let mut no_name = registration("a@b.com");
        no_name.first_name = " ".into();
        assert!(matches!(
            register(&store, &keys, no_name).await,
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_then_verify_yields_same_user() {
        let store = MemoryUserStore::default();
        let keys = test_keys();
        register(&store, &keys, registration("a@b.com")).await.unwrap();

        let session = authenticate(&store, &keys, " A@B.com", "secret1".into()).await.unwrap();
        let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
        let verified = verify_token(&store, &keys, &session.token).await.unwrap();

        assert_eq!(verified.id, by_email.id);
        assert!(by_email.last_login.is_some());
        assert!(session.user.last_login.is_some());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let store = MemoryUserStore::default();
        let keys = test_keys();
        register(&store, &keys, registration("a@b.com")).await.unwrap();

        let unknown = authenticate(&store, &keys, "nobody@b.com", "secret1".into())
            .await
            .unwrap_err();
        let wrong = authenticate(&store, &keys, "a@b.com", "secret2".into())
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());

        let stored = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert!(stored.last_login.is_none());
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in() {
        let store = MemoryUserStore::default();
        let keys = test_keys();
        let session = register(&store, &keys, registration("a@b.com")).await.unwrap();
        store.set_active(session.user.id, false).await.unwrap();

        let err = authenticate(&store, &keys, "a@b.com", "secret1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountInactive));
    }

    #[tokio::test]
    async fn deactivation_invalidates_outstanding_tokens() {
        let store = MemoryUserStore::default();
        let keys = test_keys();
        let session = register(&store, &keys, registration("a@b.com")).await.unwrap();
        assert!(verify_token(&store, &keys, &session.token).await.is_ok());

        store.set_active(session.user.id, false).await.unwrap();
        let err = verify_token(&store, &keys, &session.token).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOrInactiveUser));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_or_expired() {
        let store = MemoryUserStore::default();
        let err = verify_token(&store, &test_keys(), "not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn profile_update_rejects_email_and_password() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();

        let with_email = UpdateProfileRequest {
            email: Some(serde_json::json!("new@b.com")),
            ..Default::default()
        };
        assert!(matches!(
            update_profile(&store, session.user.id, with_email).await,
            Err(AppError::ValidationFailed(_))
        ));

        let with_password = UpdateProfileRequest {
            password: Some(serde_json::json!("hunter22")),
            city: Some(Some("Accra".into())),
            ..Default::default()
        };
        assert!(matches!(
            update_profile(&store, session.user.id, with_password).await,
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn profile_update_rejects_null_email_or_password() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();

        for req in [
            UpdateProfileRequest {
                email: Some(serde_json::Value::Null),
                city: Some(Some("Accra".into())),
                ..Default::default()
            },
            UpdateProfileRequest {
                password: Some(serde_json::Value::Null),
                city: Some(Some("Accra".into())),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                update_profile(&store, session.user.id, req).await,
                Err(AppError::ValidationFailed(_))
            ));
        }
        let stored = store.find_by_id(session.user.id).await.unwrap().unwrap();
        assert_eq!(stored.city, None);
    }

    #[tokio::test]
    async fn profile_update_clears_optional_fields() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();
        assert_eq!(session.user.denomination.as_deref(), Some("Pentecostal"));

        let set = UpdateProfileRequest {
            phone: Some(Some(" +254700000000 ".into())),
            ..Default::default()
        };
        let updated = update_profile(&store, session.user.id, set).await.unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+254700000000"));

        let clear = UpdateProfileRequest {
            phone: Some(None),
            denomination: Some(Some("   ".into())),
            ..Default::default()
        };
        let cleared = update_profile(&store, session.user.id, clear).await.unwrap();
        assert_eq!(cleared.phone, None);
        assert_eq!(cleared.denomination, None);
        assert_eq!(cleared.first_name, "A");
    }

    #[tokio::test]
    async fn profile_update_keeps_password_hash() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();
        let before = store.find_by_id(session.user.id).await.unwrap().unwrap();

        let updated = update_profile(
            &store,
            session.user.id,
            UpdateProfileRequest {
                city: Some(Some("Kampala".into())),
                country: Some("uganda".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.city.as_deref(), Some("Kampala"));
        assert_eq!(updated.country, "Uganda");
        assert_eq!(updated.password_hash, before.password_hash);
        assert_eq!(updated.email, before.email);
    }

    #[tokio::test]
    async fn profile_update_validates_country_and_emptiness() {
        let store = MemoryUserStore::default();
        let session = register(&store, &test_keys(), registration("a@b.com")).await.unwrap();

        let bad = UpdateProfileRequest {
            country: Some("Gondor".into()),
            ..Default::default()
        };
        assert!(update_profile(&store, session.user.id, bad).await.is_err());
        assert!(update_profile(&store, session.user.id, UpdateProfileRequest::default())
            .await
            .is_err());
    }
}
