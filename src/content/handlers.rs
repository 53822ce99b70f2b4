use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{ContactRequest, ListResponse, NewsItem, NewsletterRequest, Program};
use crate::{
    auth::{
        dto::MessageResponse,
        extractors::AuthUser,
        validation::{normalize_email, optional, required, validate_email},
    },
    error::AppResult,
    state::AppState,
};

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/programs", get(list_programs))
        .route("/news", get(list_news))
}

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/contact", post(contact))
        .route("/newsletter", post(subscribe))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_programs(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<ListResponse<Program>> {
    Json(ListResponse::of(&state.content.programs))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_news(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<ListResponse<NewsItem>> {
    Json(ListResponse::of(&state.content.news))
}

/// Submissions are logged, not stored.
#[instrument(skip_all)]
pub async fn contact(
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    let name = required("Name", &payload.name)?;
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    let message = required("Message", &payload.message)?;
    let subject = optional(payload.subject);
    let phone = optional(payload.phone);

    info!(
        name = %name,
        email = %email,
        phone = phone.as_deref().unwrap_or("-"),
        subject = subject.as_deref().unwrap_or("-"),
        message_len = message.len(),
        "contact form submission"
    );

    Ok(Json(MessageResponse {
        success: true,
        message: "Thank you for contacting us. We will get back to you soon.".into(),
    }))
}

#[instrument(skip_all)]
pub async fn subscribe(
    payload: Result<Json<NewsletterRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    validate_email(&email)?;

    info!(email = %email, "newsletter subscription");

    Ok(Json(MessageResponse {
        success: true,
        message: "Successfully subscribed to the newsletter".into(),
    }))
}
