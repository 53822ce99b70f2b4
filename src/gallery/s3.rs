use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::DateTimeFormat,
    types::Object,
    Client,
};
use tracing::debug;

use super::catalog::{
    is_visual_extension, CatalogError, MediaCatalog, MediaKind, MediaResource, SearchScope,
};
use crate::config::S3Config;

/// S3-compatible bucket (AWS, MinIO) used as a gallery source.
#[derive(Clone)]
pub struct S3Catalog {
    client: Client,
    bucket: String,
    prefix: String,
    url_ttl: Duration,
}

impl S3Catalog {
    /// `url_ttl` must outlive the gallery cache TTL so cached URLs stay valid.
    pub async fn new(cfg: &S3Config, url_ttl: Duration) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            prefix: format!("{}/", cfg.prefix.trim_matches('/')),
            url_ttl,
        })
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<Object>, CatalogError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| {
                    CatalogError::Unavailable(format!(
                        "s3 list_objects_v2 on {}: {}",
                        self.bucket,
                        DisplayErrorContext(&e)
                    ))
                })?;

            objects.extend(page.contents().iter().cloned());
            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(next)) => token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(objects)
    }

    async fn presign_get(&self, key: &str) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(self.url_ttl)?)
            .await
            .context("s3 presign_get")?;
        Ok(presigned.uri().to_string())
    }

    async fn describe(&self, obj: &Object) -> Result<MediaResource, CatalogError> {
        let key = obj.key().unwrap_or_default().to_string();
        let url = self
            .presign_get(&key)
            .await
            .map_err(|e| CatalogError::Unavailable(format!("{e:#}")))?;
        let folder = key.rsplit_once('/').map(|(dir, _)| dir.to_string());
        Ok(MediaResource {
            resource_type: String::new(),
            format: None,
            url,
            title: None,
            width: None,
            height: None,
            bytes: obj.size().and_then(|s| u64::try_from(s).ok()),
            created_at: obj
                .last_modified()
                .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok()),
            folder,
            id: key,
        })
    }
}

#[async_trait]
impl MediaCatalog for S3Catalog {
    async fn search(&self, scope: SearchScope) -> Result<Vec<MediaResource>, CatalogError> {
        let objects = match scope {
            SearchScope::Folder => {
                folder_objects(&self.prefix, self.list_keys(Some(&self.prefix)).await?)?
            }
            SearchScope::Everything => visual_objects(self.list_keys(None).await?),
        };
        debug!(?scope, count = objects.len(), "s3 listing");

        let mut resources = Vec::with_capacity(objects.len());
        for obj in &objects {
            resources.push(self.describe(obj).await?);
        }
        Ok(resources)
    }

    fn thumbnail_url(&self, resource: &MediaResource, kind: MediaKind) -> Option<String> {
        // No server-side transforms: images preview as themselves.
        match kind {
            MediaKind::Image => Some(resource.url.clone()),
            MediaKind::Video | MediaKind::Document => None,
        }
    }
}

/// Drops directory placeholder keys.
fn files_only(objects: Vec<Object>) -> Vec<Object> {
    objects
        .into_iter()
        .filter(|o| o.key().is_some_and(|k| !k.is_empty() && !k.ends_with('/')))
        .collect()
}

/// A prefix with no files behaves like a missing folder.
fn folder_objects(prefix: &str, objects: Vec<Object>) -> Result<Vec<Object>, CatalogError> {
    let files = files_only(objects);
    if files.is_empty() {
        return Err(CatalogError::FolderNotFound(prefix.to_string()));
    }
    Ok(files)
}

/// Bucket-wide listings keep images and videos only.
fn visual_objects(objects: Vec<Object>) -> Vec<Object> {
    files_only(objects)
        .into_iter()
        .filter(|o| {
            o.key()
                .and_then(|k| k.rsplit_once('.'))
                .is_some_and(|(_, ext)| is_visual_extension(ext))
        })
        .collect()
}
