//! Configuration module
//!
//! Everything is read from the environment (optionally seeded from a `.env` file).
//! `UploadSettings` groups the site flags and limits the upload pipeline consults.

use std::env;

use uuid::Uuid;

use crate::models::Role;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SIZE_KB: u64 = 4096;
const MAX_ATTACHMENT_SIZE_KB: u64 = 4096;
const PRESIGN_EXPIRY_SECS: u64 = 300;
const URL_FETCH_TIMEOUT_SECS: u64 = 60;
const MAX_REQUEST_BODY_MB: usize = 100;
const DEFAULT_AUTHORIZED_EXTENSIONS: &str = "jpg,jpeg,png,gif,webp";

/// Site flags and limits that drive upload acceptance and download rules.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub authorized_extensions: Vec<String>,
    pub authorized_extensions_for_staff: Vec<String>,
    pub max_image_size_kb: u64,
    pub max_attachment_size_kb: u64,
    pub allow_uploaded_avatars: bool,
    pub external_avatars_override: bool,
    pub allow_staff_to_upload_any_file_in_pm: bool,
    pub prevent_anonymous_downloads: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            authorized_extensions: parse_list(DEFAULT_AUTHORIZED_EXTENSIONS),
            authorized_extensions_for_staff: Vec::new(),
            max_image_size_kb: MAX_IMAGE_SIZE_KB,
            max_attachment_size_kb: MAX_ATTACHMENT_SIZE_KB,
            allow_uploaded_avatars: true,
            external_avatars_override: false,
            allow_staff_to_upload_any_file_in_pm: false,
            prevent_anonymous_downloads: false,
        }
    }
}

/// Static bearer token mapped to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiToken {
    pub token: String,
    pub user_id: Uuid,
    pub role: Role,
}

impl ApiToken {
    /// Parse one `token:user_id:role` entry.
    pub fn parse(entry: &str) -> Result<Self, anyhow::Error> {
        let mut parts = entry.trim().splitn(3, ':');
        let (Some(token), Some(user_id), Some(role)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow::anyhow!(
                "API_TOKENS entries must look like token:user_id:role"
            ));
        };
        if token.is_empty() {
            return Err(anyhow::anyhow!("API_TOKENS entry has an empty token"));
        }
        Ok(Self {
            token: token.to_string(),
            user_id: user_id
                .parse()
                .map_err(|_| anyhow::anyhow!("API_TOKENS user id must be a UUID: {}", user_id))?,
            role: role.parse()?,
        })
    }
}

/// Upload service configuration
#[derive(Clone, Debug)]
pub struct DepotConfig {
    pub server_port: u16,
    pub environment: String,
    pub log_format: String,
    pub site_name: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_private: bool,
    pub s3_presign_expiry_secs: u64,
    // Remote fetches
    pub url_upload_allowlist: Option<Vec<String>>,
    pub url_fetch_timeout_secs: u64,
    pub max_request_body_mb: usize,
    pub api_tokens: Vec<ApiToken>,
    pub uploads: UploadSettings,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<DepotConfig>);

impl Config {
    fn inner(&self) -> &DepotConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = DepotConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().log_format
    }

    pub fn site_name(&self) -> &str {
        &self.inner().site_name
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_private(&self) -> bool {
        self.inner().s3_private
    }

    pub fn s3_presign_expiry_secs(&self) -> u64 {
        self.inner().s3_presign_expiry_secs
    }

    pub fn url_upload_allowlist(&self) -> Option<&[String]> {
        self.inner().url_upload_allowlist.as_deref()
    }

    pub fn url_fetch_timeout_secs(&self) -> u64 {
        self.inner().url_fetch_timeout_secs
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.inner().max_request_body_mb * 1024 * 1024
    }

    pub fn api_tokens(&self) -> &[ApiToken] {
        &self.inner().api_tokens
    }

    pub fn uploads(&self) -> &UploadSettings {
        &self.inner().uploads
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Split a comma-separated setting, trimming and lowercasing each entry. Leading dots
/// are dropped so `.png` and `png` mean the same thing.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.trim().to_lowercase())
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl DepotConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let api_tokens = env::var("API_TOKENS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.split(',')
                    .filter(|entry| !entry.trim().is_empty())
                    .map(ApiToken::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let uploads = UploadSettings {
            authorized_extensions: parse_list(
                &env::var("AUTHORIZED_EXTENSIONS")
                    .unwrap_or_else(|_| DEFAULT_AUTHORIZED_EXTENSIONS.to_string()),
            ),
            authorized_extensions_for_staff: parse_list(
                &env::var("AUTHORIZED_EXTENSIONS_FOR_STAFF").unwrap_or_default(),
            ),
            max_image_size_kb: env::var("MAX_IMAGE_SIZE_KB")
                .unwrap_or_else(|_| MAX_IMAGE_SIZE_KB.to_string())
                .parse()
                .unwrap_or(MAX_IMAGE_SIZE_KB),
            max_attachment_size_kb: env::var("MAX_ATTACHMENT_SIZE_KB")
                .unwrap_or_else(|_| MAX_ATTACHMENT_SIZE_KB.to_string())
                .parse()
                .unwrap_or(MAX_ATTACHMENT_SIZE_KB),
            allow_uploaded_avatars: env_bool("ALLOW_UPLOADED_AVATARS", true),
            external_avatars_override: env_bool("EXTERNAL_AVATARS_OVERRIDE", false),
            allow_staff_to_upload_any_file_in_pm: env_bool(
                "ALLOW_STAFF_TO_UPLOAD_ANY_FILE_IN_PM",
                false,
            ),
            prevent_anonymous_downloads: env_bool("PREVENT_ANONYMOUS_DOWNLOADS", false),
        };

        let config = DepotConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            site_name: env::var("SITE_NAME").unwrap_or_else(|_| "default".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok().filter(|s| !s.is_empty()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok()
                .filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            s3_private: env_bool("S3_PRIVATE", false),
            s3_presign_expiry_secs: env::var("S3_PRESIGN_EXPIRY_SECS")
                .unwrap_or_else(|_| PRESIGN_EXPIRY_SECS.to_string())
                .parse()
                .unwrap_or(PRESIGN_EXPIRY_SECS),
            url_upload_allowlist: env::var("URL_UPLOAD_ALLOWLIST")
                .ok()
                .map(|s| parse_list(&s))
                .filter(|list| !list.is_empty()),
            url_fetch_timeout_secs: env::var("URL_FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| URL_FETCH_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(URL_FETCH_TIMEOUT_SECS),
            max_request_body_mb: env::var("MAX_REQUEST_BODY_MB")
                .unwrap_or_else(|_| MAX_REQUEST_BODY_MB.to_string())
                .parse()
                .unwrap_or(MAX_REQUEST_BODY_MB),
            api_tokens,
            uploads,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        } else if is_production_name(&self.environment) {
            return Err(anyhow::anyhow!("DATABASE_URL must be set in production"));
        }

        if self.site_name.is_empty() || self.site_name.contains('/') {
            return Err(anyhow::anyhow!(
                "SITE_NAME must be a non-empty single path segment"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
                if self.s3_presign_expiry_secs == 0 || self.s3_presign_expiry_secs > 604_800 {
                    return Err(anyhow::anyhow!(
                        "S3_PRESIGN_EXPIRY_SECS must be between 1 and 604800"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
