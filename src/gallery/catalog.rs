use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// How widely a catalog search should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the configured gallery folder.
    Folder,
    /// Every image and video the account holds.
    Everything,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("folder {0:?} does not exist in the media catalog")]
    FolderNotFound(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Provider-neutral description of one stored asset.
#[derive(Debug, Clone, Default)]
pub struct MediaResource {
    pub id: String,
    pub resource_type: String,
    pub format: Option<String>,
    pub url: String,
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Option<u64>,
    pub created_at: Option<String>,
    pub folder: Option<String>,
}

#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn search(&self, scope: SearchScope) -> Result<Vec<MediaResource>, CatalogError>;

    /// Derived preview URL. Never called for documents.
    fn thumbnail_url(&self, resource: &MediaResource, kind: MediaKind) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "rtf", "odt", "csv",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "avi", "mkv", "m4v", "ogv"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "heic", "avif", "tif", "tiff",
];

/// Lowercase extension from the explicit format, else from the id.
pub fn extension_of(resource: &MediaResource) -> Option<String> {
    resource
        .format
        .as_deref()
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .or_else(|| {
            let name = resource.id.rsplit('/').next()?;
            let (_, ext) = name.rsplit_once('.')?;
            Some(ext.to_string())
        })
        .map(|e| e.to_ascii_lowercase())
}

pub fn classify(resource: &MediaResource) -> MediaKind {
    let ext = extension_of(resource);
    let ext = ext.as_deref().unwrap_or_default();

    if resource.resource_type == "raw" || DOCUMENT_EXTENSIONS.contains(&ext) {
        return MediaKind::Document;
    }
    match resource.resource_type.as_str() {
        "video" => MediaKind::Video,
        "image" => MediaKind::Image,
        _ if VIDEO_EXTENSIONS.contains(&ext) => MediaKind::Video,
        _ if IMAGE_EXTENSIONS.contains(&ext) => MediaKind::Image,
        _ => MediaKind::Document,
    }
}

pub fn is_visual_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// "events/youth_camp-2024.jpg" -> "youth camp 2024"
pub fn title_from_id(id: &str) -> String {
    let name = id.rsplit('/').next().unwrap_or(id);
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    stem.replace(['_', '-'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, resource_type: &str, format: Option<&str>) -> MediaResource {
        MediaResource {
            id: id.into(),
            resource_type: resource_type.into(),
            format: format.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn classifies_by_resource_type() {
        assert_eq!(classify(&resource("a", "image", Some("jpg"))), MediaKind::Image);
        assert_eq!(classify(&resource("a", "video", Some("mp4"))), MediaKind::Video);
        assert_eq!(classify(&resource("a", "raw", None)), MediaKind::Document);
    }

    #[test]
    fn document_extension_wins_over_image_type() {
        // PDFs are stored as images by some providers.
        assert_eq!(classify(&resource("brochure", "image", Some("pdf"))), MediaKind::Document);
        assert_eq!(classify(&resource("gallery/report.DOCX", "", None)), MediaKind::Document);
    }

    #[test]
    fn falls_back_to_extension_when_type_unknown() {
        assert_eq!(classify(&resource("gallery/sermon.MP4", "", None)), MediaKind::Video);
        assert_eq!(classify(&resource("gallery/choir.jpeg", "", None)), MediaKind::Image);
        assert_eq!(classify(&resource("gallery/notes", "", None)), MediaKind::Document);
    }

    #[test]
    fn titles_are_derived_from_the_last_path_segment() {
        assert_eq!(title_from_id("events/youth_camp-2024.jpg"), "youth camp 2024");
        assert_eq!(title_from_id("plain"), "plain");
    }

    #[test]
    fn visual_extensions() {
        assert!(is_visual_extension("PNG"));
        assert!(is_visual_extension("webm"));
        assert!(!is_visual_extension("pdf"));
    }
}
