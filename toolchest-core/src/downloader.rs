//! Streaming HTTP download with progress reporting and URL validation.

use anyhow::{Context, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

// ============================================================================
// URL Validation
// ============================================================================

/// Domains archive distributions may be fetched from.
const ALLOWED_DOMAINS: &[&str] = &["gradle.org"];

/// Validates that a URL is safe for downloading.
///
/// The scheme must be HTTPS and the host must be one of the allowed
/// domains or a subdomain of one.
fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL must have a host: {}", url_str))?;

    let is_allowed = ALLOWED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        anyhow::bail!(
            "Download domain not allowed: {}. Allowed: {:?}",
            host,
            ALLOWED_DOMAINS
        );
    }

    Ok(())
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress snapshot during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes received so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (from Content-Length), if declared.
    pub total_bytes: Option<u64>,
    /// Completed fraction (0.0 to 1.0), or `None` when the server
    /// declared no Content-Length.
    pub fraction: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let fraction = total_bytes.map(|total| {
            if total > 0 {
                bytes_downloaded as f32 / total as f32
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            fraction,
        }
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Downloads a file from a URL, streaming the body to `dest`.
///
/// Reports [`DownloadProgress`] through `progress_cb` as chunks arrive;
/// without a Content-Length header the fraction degrades to `None`. When
/// `expected_sha256` is given the streamed bytes are hashed and a
/// mismatch deletes the file and fails the download.
///
/// Returns the total number of bytes written.
pub async fn download_file<F>(
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
    progress_cb: F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    info!("Downloading {} to {}", url, dest.display());

    validate_url(url)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "Download failed with status {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        );
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;
    let mut hasher = Sha256::new();

    progress_cb(DownloadProgress::new(0, total_bytes));

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;

        hasher.update(&chunk);

        file.write_all(&chunk)
            .await
            .with_context(|| "Failed to write chunk to file")?;

        bytes_downloaded += chunk.len() as u64;
        progress_cb(DownloadProgress::new(bytes_downloaded, total_bytes));
    }

    file.flush().await.context("Failed to flush file")?;

    if let Some(expected) = expected_sha256 {
        let actual_hash = hasher.finalize();
        let actual_hex = format_sha256_hex(&actual_hash);

        if actual_hex != expected.to_lowercase() {
            let _ = tokio::fs::remove_file(dest).await;
            anyhow::bail!(
                "SHA256 checksum mismatch!\nExpected: {}\nActual: {}",
                expected,
                actual_hex
            );
        }
        debug!("SHA256 verified: {}", actual_hex);
    }

    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}

/// Formats a SHA256 hash as lowercase hex without pulling in the hex crate.
fn format_sha256_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
