use crate::state::AppState;
use axum::Router;

pub mod cache;
pub mod catalog;
pub mod cloudinary;
pub mod handlers;
pub mod s3;
pub mod services;

pub use services::GalleryService;

pub fn router() -> Router<AppState> {
    handlers::gallery_routes()
}
