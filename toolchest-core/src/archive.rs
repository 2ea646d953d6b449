//! Archive-based install path for Gradle.
//!
//! Gradle is not carried by winget's repository, so it is installed by
//! downloading the official `-bin` zip and unpacking it under the
//! configured root. Existence of the versioned install directory is its
//! sole installed-detection mechanism; the package manager probe is
//! never consulted for it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::downloader::{download_file, DownloadProgress};
use crate::extractor::extract_archive;
use crate::types::{
    ArchiveFormat, GradleDistribution, InstallError, InstallPhase, InstallStatus, ProgressEvent,
};

// ============================================================================
// Fetcher Trait
// ============================================================================

/// HTTP collaborator that fetches an archive to a local file.
///
/// A trait seam so tests can assert that no fetch happens when the
/// install directory already exists, and can serve fixed payloads.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetches `url` into `dest`, reporting progress, returning the
    /// number of bytes written.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        progress_cb: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64>;
}

/// Real fetcher backed by the streaming HTTP downloader.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        progress_cb: &(dyn Fn(DownloadProgress) + Send + Sync),
    ) -> Result<u64> {
        download_file(url, dest, expected_sha256, progress_cb).await
    }
}

// ============================================================================
// Gradle Installer
// ============================================================================

/// Installer for one Gradle binary distribution.
pub struct GradleInstaller<F: ArchiveFetcher = HttpFetcher> {
    dist: GradleDistribution,
    fetcher: F,
    expected_sha256: Option<String>,
}

impl GradleInstaller<HttpFetcher> {
    /// Creates an installer for `version` with the real HTTP fetcher and
    /// the default install root.
    pub fn for_version(version: &str) -> Self {
        Self::new(GradleDistribution::for_version(version), HttpFetcher)
    }
}

impl<F: ArchiveFetcher> GradleInstaller<F> {
    /// Creates an installer from an explicit distribution and fetcher.
    pub fn new(dist: GradleDistribution, fetcher: F) -> Self {
        Self {
            dist,
            fetcher,
            expected_sha256: None,
        }
    }

    /// Verifies the downloaded archive against a SHA-256 checksum.
    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into());
        self
    }

    /// The distribution this installer targets.
    pub fn distribution(&self) -> &GradleDistribution {
        &self.dist
    }

    /// Filesystem existence of the install directory is the installed
    /// check for the archive tool.
    pub fn is_installed(&self) -> bool {
        self.dist.install_dir.exists()
    }

    /// Where the archive is staged during an install.
    pub fn archive_path(&self) -> PathBuf {
        self.dist
            .extract_root()
            .join(format!(".gradle-{}.archive", self.dist.version))
    }

    /// Installs the distribution.
    ///
    /// Returns `AlreadyInstalled` without any network access when the
    /// install directory exists. Otherwise downloads the archive to a
    /// temporary file, extracts it into the parent of the install
    /// directory, and deletes the temporary file. Any failure along the
    /// way classifies as `Failed`; a partially-extracted directory is
    /// left behind for the next run to overwrite (known limitation, no
    /// rollback).
    pub async fn install<E>(&self, on_event: E) -> InstallStatus
    where
        E: Fn(ProgressEvent) + Send + Sync,
    {
        if self.is_installed() {
            info!(
                "Gradle {} already present at {}",
                self.dist.version,
                self.dist.install_dir.display()
            );
            return InstallStatus::AlreadyInstalled;
        }

        match self.run_install(&on_event).await {
            Ok(()) => {
                info!("Gradle {} installed", self.dist.version);
                InstallStatus::Succeeded
            }
            Err(e) => {
                warn!("Gradle {} install failed: {:#}", self.dist.version, e);
                InstallStatus::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }

    async fn run_install<E>(&self, on_event: &E) -> Result<()>
    where
        E: Fn(ProgressEvent) + Send + Sync,
    {
        let format = ArchiveFormat::from_url(&self.dist.download_url).with_context(|| {
            format!("Unknown archive format for {}", self.dist.download_url)
        })?;

        let archive_path = self.archive_path();

        self.fetcher
            .fetch(
                &self.dist.download_url,
                &archive_path,
                self.expected_sha256.as_deref(),
                &|p: DownloadProgress| {
                    on_event(match p.fraction {
                        Some(f) => ProgressEvent::with_fraction(InstallPhase::Downloading, f),
                        None => ProgressEvent::phase(InstallPhase::Downloading),
                    })
                },
            )
            .await
            .map_err(|e| InstallError::DownloadFailed(format!("{:#}", e)))?;

        on_event(ProgressEvent::phase(InstallPhase::Extracting));

        // The zip carries a gradle-<version>/ top-level entry, so the
        // extraction target is the parent of the install dir.
        extract_archive(&archive_path, &self.dist.extract_root(), format)
            .map_err(|e| InstallError::ExtractionFailed(format!("{:#}", e)))?;

        on_event(ProgressEvent::with_fraction(InstallPhase::Extracting, 1.0));

        tokio::fs::remove_file(&archive_path)
            .await
            .with_context(|| format!("Failed to remove archive {}", archive_path.display()))?;

        Ok(())
    }
}
