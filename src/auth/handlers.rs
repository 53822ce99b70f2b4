use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, ProfileResponse, PublicUser,
            RegisterRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let session = services::register(state.users.as_ref(), &keys, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            token: session.token,
            user: PublicUser::from(&session.user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let session =
        services::authenticate(state.users.as_ref(), &keys, &payload.email, payload.password)
            .await?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token: session.token,
        user: PublicUser::from(&session.user),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: None,
        user: PublicUser::from(&user),
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<ProfileResponse>> {
    let Json(payload) = payload?;
    let updated = services::update_profile(state.users.as_ref(), user.id, payload).await?;
    Ok(Json(ProfileResponse {
        message: Some("Profile updated successfully".into()),
        user: PublicUser::from(&updated),
    }))
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(AuthUser(user): AuthUser) -> Json<MessageResponse> {
    info!(user_id = %user.id, "user logged out");
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}
