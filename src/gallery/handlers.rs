use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use super::services::GalleryItem;
use crate::{error::AppResult, state::AppState};

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub success: bool,
    pub count: usize,
    pub items: Vec<GalleryItem>,
}

pub fn gallery_routes() -> Router<AppState> {
    Router::new().route("/gallery", get(list_gallery))
}

#[instrument(skip(state))]
pub async fn list_gallery(State(state): State<AppState>) -> AppResult<Json<GalleryResponse>> {
    let items = state.gallery.list().await?;
    Ok(Json(GalleryResponse {
        success: true,
        count: items.len(),
        items: items.as_ref().clone(),
    }))
}
