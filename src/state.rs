use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::{AppConfig, MediaConfig};
use crate::content::Content;
use crate::gallery::{
    cache::TtlCache, catalog::MediaCatalog, cloudinary::CloudinaryCatalog, s3::S3Catalog,
    GalleryService,
};

/// Presigned S3 URLs must stay valid for as long as the listing is cached.
const PRESIGN_MARGIN_SECS: u64 = 60 * 60;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub gallery: Arc<GalleryService>,
    pub content: Arc<Content>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let gallery = Arc::new(build_gallery(&config).await?);
        let content = Arc::new(Content::load()?);

        Ok(Self::from_parts(config, users, gallery, content))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        gallery: Arc<GalleryService>,
        content: Arc<Content>,
    ) -> Self {
        Self {
            config,
            users,
            gallery,
            content,
        }
    }
}

async fn build_gallery(config: &AppConfig) -> anyhow::Result<GalleryService> {
    let ttl = config.gallery_cache.ttl_secs;
    let cache = TtlCache::new(Duration::from_secs(ttl), config.gallery_cache.max_entries);

    let catalog: Arc<dyn MediaCatalog> = match &config.media {
        MediaConfig::Cloudinary(c) => {
            info!(cloud = %c.cloud_name, folder = %c.folder, "gallery backed by cloudinary");
            Arc::new(CloudinaryCatalog::new(c)?)
        }
        MediaConfig::S3(c) => {
            info!(bucket = %c.bucket, prefix = %c.prefix, "gallery backed by s3");
            let url_ttl = Duration::from_secs(ttl + PRESIGN_MARGIN_SECS);
            Arc::new(S3Catalog::new(c, url_ttl).await?)
        }
        MediaConfig::Unconfigured { missing } => {
            warn!(missing = ?missing, "media catalog not configured; gallery requests will fail");
            return Ok(GalleryService::unconfigured(missing.clone(), cache));
        }
    };
    Ok(GalleryService::new(catalog, cache))
}

#[cfg(test)]
impl AppState {
    /// State backed by an in-memory user store and the given catalog.
    pub fn fake(catalog: Arc<dyn MediaCatalog>) -> Self {
        use crate::auth::{memory_repo::MemoryUserStore, test_support::test_jwt_config};
        use crate::config::CacheConfig;

        let config = Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            jwt: test_jwt_config(),
            media: MediaConfig::Unconfigured { missing: vec![] },
            gallery_cache: CacheConfig {
                ttl_secs: 3600,
                max_entries: 100,
            },
            cors_origins: vec![],
            host: "127.0.0.1".into(),
            port: 0,
        });
        let gallery = GalleryService::new(catalog, TtlCache::new(Duration::from_secs(3600), 100));

        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(gallery),
            Arc::new(Content::load().expect("fixtures parse")),
        )
    }
}
