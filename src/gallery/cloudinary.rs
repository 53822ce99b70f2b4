//! Cloudinary Admin Search API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::catalog::{CatalogError, MediaCatalog, MediaKind, MediaResource, SearchScope};
use crate::config::CloudinaryConfig;

const API_BASE_URL: &str = "https://api.cloudinary.com";
const DELIVERY_BASE_URL: &str = "https://res.cloudinary.com";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Search API page size cap.
const MAX_RESULTS: u32 = 500;

const THUMBNAIL_TRANSFORM: &str = "c_fill,w_400,h_300,q_auto";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<SearchResource>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    public_id: String,
    resource_type: String,
    format: Option<String>,
    secure_url: String,
    width: Option<u32>,
    height: Option<u32>,
    bytes: Option<u64>,
    created_at: Option<String>,
    folder: Option<String>,
    #[serde(default)]
    context: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<SearchResource> for MediaResource {
    fn from(r: SearchResource) -> Self {
        let title = r
            .context
            .as_ref()
            .and_then(|c| c.get("caption").or_else(|| c.get("alt")))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self {
            id: r.public_id,
            resource_type: r.resource_type,
            format: r.format,
            url: r.secure_url,
            title,
            width: r.width,
            height: r.height,
            bytes: r.bytes,
            created_at: r.created_at,
            folder: r.folder,
        }
    }
}

#[derive(Clone)]
pub struct CloudinaryCatalog {
    client: Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

impl CloudinaryCatalog {
    pub fn new(cfg: &CloudinaryConfig) -> anyhow::Result<Self> {
        Self::with_api_base(cfg, API_BASE_URL)
    }

    pub fn with_api_base(cfg: &CloudinaryConfig, api_base: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            cloud_name: cfg.cloud_name.clone(),
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            folder: cfg.folder.clone(),
        })
    }

    fn expression(&self, scope: SearchScope) -> String {
        match scope {
            SearchScope::Folder => format!("folder:\"{}\"", self.folder),
            SearchScope::Everything => "resource_type:image OR resource_type:video".to_string(),
        }
    }

    fn delivery_url(&self, resource_type: &str, transform: &str, public_id: &str) -> String {
        format!(
            "{}/{}/{}/upload/{}/{}",
            DELIVERY_BASE_URL, self.cloud_name, resource_type, transform, public_id
        )
    }
}

#[async_trait]
impl MediaCatalog for CloudinaryCatalog {
    async fn search(&self, scope: SearchScope) -> Result<Vec<MediaResource>, CatalogError> {
        let url = format!("{}/v1_1/{}/resources/search", self.api_base, self.cloud_name);
        let body = json!({
            "expression": self.expression(scope),
            "max_results": MAX_RESULTS,
            "sort_by": [{ "created_at": "desc" }],
            "with_field": ["context"],
        });
        debug!(?scope, "cloudinary search");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(format!("could not reach Cloudinary: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            warn!(%status, message = %message, "cloudinary search failed");
            return Err(classify_failure(status, message, scope, &self.folder));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            CatalogError::Unavailable(format!("unexpected Cloudinary response: {e}"))
        })?;
        Ok(parsed.resources.into_iter().map(MediaResource::from).collect())
    }

    fn thumbnail_url(&self, resource: &MediaResource, kind: MediaKind) -> Option<String> {
        match kind {
            MediaKind::Image => Some(self.delivery_url(
                "image",
                &format!("{THUMBNAIL_TRANSFORM},f_auto"),
                &resource.id,
            )),
            MediaKind::Video => Some(self.delivery_url(
                "video",
                &format!("so_0,{THUMBNAIL_TRANSFORM}"),
                &format!("{}.jpg", resource.id),
            )),
            MediaKind::Document => None,
        }
    }
}

fn classify_failure(
    status: StatusCode,
    message: String,
    scope: SearchScope,
    folder: &str,
) -> CatalogError {
    let lower = message.to_ascii_lowercase();
    let missing = status == StatusCode::NOT_FOUND || lower.contains("not found");
    if scope == SearchScope::Folder && missing {
        CatalogError::FolderNotFound(folder.to_string())
    } else {
        CatalogError::Unavailable(format!("Cloudinary returned {status}: {message}"))
    }
}
