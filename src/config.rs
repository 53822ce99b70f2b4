use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub prefix: String,
}

/// Which remote catalog backs the gallery, if any.
#[derive(Debug, Clone, Deserialize)]
pub enum MediaConfig {
    Cloudinary(CloudinaryConfig),
    S3(S3Config),
    Unconfigured { missing: Vec<String> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub gallery_cache: CacheConfig,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "imf-africa".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "imf-africa-members".into()),
            ttl_days: parse_var("JWT_TTL_DAYS").unwrap_or(7),
        };
        anyhow::ensure!(!jwt.secret.trim().is_empty(), "JWT_SECRET must not be empty");

        let gallery_cache = CacheConfig {
            ttl_secs: parse_var("GALLERY_CACHE_TTL_SECS").unwrap_or(60 * 60),
            max_entries: parse_var("GALLERY_CACHE_MAX_ENTRIES").unwrap_or(100),
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt,
            media: media_from_env()?,
            gallery_cache,
            cors_origins,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("APP_PORT").unwrap_or(8080),
        })
    }
}

fn media_from_env() -> anyhow::Result<MediaConfig> {
    let provider = std::env::var("MEDIA_PROVIDER").unwrap_or_else(|_| "cloudinary".into());
    match provider.to_ascii_lowercase().as_str() {
        "cloudinary" => {
            let vars = ["CLOUDINARY_CLOUD_NAME", "CLOUDINARY_API_KEY", "CLOUDINARY_API_SECRET"];
            let missing = missing_vars(&vars);
            if !missing.is_empty() {
                return Ok(MediaConfig::Unconfigured { missing });
            }
            Ok(MediaConfig::Cloudinary(CloudinaryConfig {
                cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME")?,
                api_key: std::env::var("CLOUDINARY_API_KEY")?,
                api_secret: std::env::var("CLOUDINARY_API_SECRET")?,
                folder: std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "imf-africa".into()),
            }))
        }
        "s3" => {
            let vars = ["S3_ENDPOINT", "S3_BUCKET", "S3_ACCESS_KEY", "S3_SECRET_KEY"];
            let missing = missing_vars(&vars);
            if !missing.is_empty() {
                return Ok(MediaConfig::Unconfigured { missing });
            }
            Ok(MediaConfig::S3(S3Config {
                endpoint: std::env::var("S3_ENDPOINT")?,
                bucket: std::env::var("S3_BUCKET")?,
                access_key: std::env::var("S3_ACCESS_KEY")?,
                secret_key: std::env::var("S3_SECRET_KEY")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                prefix: std::env::var("S3_PREFIX").unwrap_or_else(|_| "gallery".into()),
            }))
        }
        other => anyhow::bail!("unknown MEDIA_PROVIDER {other:?} (expected cloudinary or s3)"),
    }
}

fn missing_vars(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            std::env::var(name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|name| name.to_string())
        .collect()
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
