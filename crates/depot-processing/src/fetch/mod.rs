//! Remote file fetching for URL uploads.

mod ssrf;

pub use ssrf::validate_remote_url;

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Url;

use crate::error::UploadError;
use crate::filename::sanitize_filename;

const DEFAULT_FILENAME: &str = "download";
const MAX_REDIRECTS: usize = 5;

/// Body and naming information of a fetched remote file.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub filename: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Downloads the bytes behind an upload URL.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, UploadError>;
}

/// `reqwest` backed fetcher. One attempt per call, bounded by the client timeout.
///
/// Redirects are followed by hand so every hop passes the same URL checks as the
/// original target.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    allowlist: Option<Vec<String>>,
    allow_private_ips: bool,
    max_bytes: Option<u64>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            allowlist: None,
            allow_private_ips: false,
            max_bytes: None,
        })
    }

    pub fn with_allowlist(mut self, allowlist: Option<Vec<String>>) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Permit loopback and private targets. Only meant for local development and tests.
    pub fn allow_private_ips(mut self, allow: bool) -> Self {
        self.allow_private_ips = allow;
        self
    }

    /// Abort downloads whose body grows beyond `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedFile, UploadError> {
        let failed = |reason: String| UploadError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let mut target = Url::parse(url).map_err(|e| failed(format!("Invalid URL: {}", e)))?;

        let start = std::time::Instant::now();
        let mut redirects = 0;
        let mut response = loop {
            validate_remote_url(&target, self.allow_private_ips, self.allowlist.as_deref())
                .await
                .map_err(|reason| {
                    tracing::warn!(
                        url = %url,
                        hop_url = %target,
                        reason = %reason,
                        "Remote URL rejected"
                    );
                    failed(reason)
                })?;

            let response = self.client.get(target.clone()).send().await.map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Remote fetch failed");
                failed(format!("Failed to download file: {}", e))
            })?;

            if !response.status().is_redirection() {
                break response;
            }

            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(failed(format!("Too many redirects (limit {})", MAX_REDIRECTS)));
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| failed("Redirect without a Location header".to_string()))?;
            target = target
                .join(location)
                .map_err(|e| failed(format!("Invalid redirect location: {}", e)))?;
            tracing::debug!(url = %url, hop_url = %target, hop = redirects, "Following redirect");
        };

        if !response.status().is_success() {
            return Err(failed(format!(
                "Remote server returned status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| failed(format!("Failed to read response body: {}", e)))?
        {
            body.extend_from_slice(&chunk);
            if let Some(max) = self.max_bytes {
                if body.len() as u64 > max {
                    return Err(failed(format!("Remote file exceeds {} bytes", max)));
                }
            }
        }

        let filename = filename_from_url(&target);
        tracing::info!(
            url = %url,
            filename = %filename,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote file fetched"
        );

        Ok(FetchedFile {
            filename,
            data: body.freeze(),
            content_type,
        })
    }
}

/// Last non-empty path segment of the URL, sanitized.
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let decoded = percent_encoding::percent_decode_str(segment).decode_utf8_lossy();
            sanitize_filename(&decoded)
        })
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
