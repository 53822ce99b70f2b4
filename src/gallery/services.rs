use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    cache::TtlCache,
    catalog::{
        classify, extension_of, title_from_id, CatalogError, MediaCatalog, MediaKind,
        MediaResource, SearchScope,
    },
};
use crate::error::{AppError, AppResult};

pub const GALLERY_KEY: &str = "gallery_images";

fn thumbnail_key(asset_id: &str) -> String {
    format!("thumb:{asset_id}")
}

/// One entry of the public gallery listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<u64>,
    pub created_at: Option<String>,
    pub folder: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CacheValue {
    Items(Arc<Vec<GalleryItem>>),
    Url(String),
}

enum Source {
    Catalog(Arc<dyn MediaCatalog>),
    Unconfigured(Vec<String>),
}

/// Gallery listing served through a TTL cache in front of the media catalog.
pub struct GalleryService {
    source: Source,
    cache: TtlCache<CacheValue>,
}

impl GalleryService {
    pub fn new(catalog: Arc<dyn MediaCatalog>, cache: TtlCache<CacheValue>) -> Self {
        Self {
            source: Source::Catalog(catalog),
            cache,
        }
    }

    /// A gallery whose every listing fails, naming the settings to fill in.
    pub fn unconfigured(missing: Vec<String>, cache: TtlCache<CacheValue>) -> Self {
        Self {
            source: Source::Unconfigured(missing),
            cache,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &TtlCache<CacheValue> {
        &self.cache
    }

    pub async fn list(&self) -> AppResult<Arc<Vec<GalleryItem>>> {
        if let Some(CacheValue::Items(items)) = self.cache.get(GALLERY_KEY) {
            debug!(count = items.len(), "gallery cache hit");
            return Ok(items);
        }

        let catalog = match &self.source {
            Source::Catalog(catalog) => catalog,
            Source::Unconfigured(missing) => {
                return Err(AppError::SourceUnavailable(format!(
                    "Media catalog is not configured. Set {} on the server.",
                    missing.join(", ")
                )));
            }
        };

        let resources = match catalog.search(SearchScope::Folder).await {
            Ok(resources) => resources,
            Err(CatalogError::FolderNotFound(folder)) => {
                warn!(folder = %folder, "gallery folder missing; retrying with a broad search");
                catalog
                    .search(SearchScope::Everything)
                    .await
                    .map_err(source_unavailable)?
            }
            Err(e) => return Err(source_unavailable(e)),
        };

        let items: Vec<GalleryItem> = resources
            .into_iter()
            .map(|r| self.describe(catalog.as_ref(), r))
            .collect();
        let items = Arc::new(items);
        self.cache.set(GALLERY_KEY, CacheValue::Items(Arc::clone(&items)));
        info!(
            count = items.len(),
            cache_entries = self.cache.len(),
            "gallery refreshed from catalog"
        );
        Ok(items)
    }

    fn describe(&self, catalog: &dyn MediaCatalog, r: MediaResource) -> GalleryItem {
        let kind = classify(&r);
        let thumbnail_url = match kind {
            MediaKind::Document => None,
            MediaKind::Image | MediaKind::Video => self.thumbnail(catalog, &r, kind),
        };
        GalleryItem {
            title: r.title.clone().unwrap_or_else(|| title_from_id(&r.id)),
            format: extension_of(&r),
            thumbnail_url,
            kind,
            id: r.id,
            url: r.url,
            width: r.width,
            height: r.height,
            bytes: r.bytes,
            created_at: r.created_at,
            folder: r.folder,
        }
    }

    fn thumbnail(
        &self,
        catalog: &dyn MediaCatalog,
        r: &MediaResource,
        kind: MediaKind,
    ) -> Option<String> {
        let key = thumbnail_key(&r.id);
        if let Some(CacheValue::Url(url)) = self.cache.get(&key) {
            return Some(url);
        }
        let url = catalog.thumbnail_url(r, kind)?;
        self.cache.set(key, CacheValue::Url(url.clone()));
        Some(url)
    }
}

fn source_unavailable(e: CatalogError) -> AppError {
    AppError::SourceUnavailable(format!("Failed to fetch gallery from the media catalog: {e}"))
}
