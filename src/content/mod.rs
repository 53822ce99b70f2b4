//! Static site content and visitor form capture.

use anyhow::Context;
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;

use dto::{NewsItem, Program};

/// Program and news listings, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Content {
    pub programs: Vec<Program>,
    pub news: Vec<NewsItem>,
}

impl Content {
    pub fn load() -> anyhow::Result<Self> {
        let programs = serde_json::from_str(include_str!("../../data/programs.json"))
            .context("parse data/programs.json")?;
        let news = serde_json::from_str(include_str!("../../data/news.json"))
            .context("parse data/news.json")?;
        Ok(Self { programs, news })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::listing_routes())
        .merge(handlers::form_routes())
}
