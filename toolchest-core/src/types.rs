//! Core types for the install workflow.
//!
//! This module defines the foundational types shared across the crate:
//! the tool catalog entry, per-run install status, progress events,
//! environment variable specs, and the Gradle distribution descriptor.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Tool Catalog Entry
// ============================================================================

/// A single entry in the tool catalog: a display name plus the winget
/// package identifier used to probe and install it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Human-readable display name ("Visual Studio Code").
    pub display_name: String,
    /// The package manager's identifier ("Microsoft.VisualStudioCode").
    pub package_id: String,
    /// Install with exact-id matching (`--id=<id> -e`). Used for packages
    /// whose identifier is ambiguous under winget's default matching.
    #[serde(default)]
    pub exact: bool,
}

impl ToolEntry {
    /// Creates a catalog entry with default (non-exact) matching.
    pub fn new(display_name: impl Into<String>, package_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            package_id: package_id.into(),
            exact: false,
        }
    }

    /// Marks this entry for exact-id install matching.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }
}

impl fmt::Display for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.package_id)
    }
}

// ============================================================================
// Install Status
// ============================================================================

/// Per-run installation status of a tool.
///
/// One value is meaningful per tool per run; nothing is persisted across
/// runs. Installed-state is recomputed from winget's own registry (or
/// filesystem existence for the archive-based tool) on every run, so the
/// workflow is idempotent by construction rather than by tracked state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    /// No probe has run yet.
    NotChecked,
    /// The probe reported the tool as already present.
    AlreadyInstalled,
    /// An install is in flight.
    Installing,
    /// The install completed with exit code 0.
    Succeeded,
    /// The install failed. A single failed attempt is terminal for the run.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
}

impl InstallStatus {
    /// Returns true once the status can no longer change this run.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotChecked | Self::Installing)
    }

    /// Returns true if the tool is present after this run.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::AlreadyInstalled | Self::Succeeded)
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotChecked => write!(f, "not checked"),
            Self::AlreadyInstalled => write!(f, "already installed"),
            Self::Installing => write!(f, "installing"),
            Self::Succeeded => write!(f, "installed"),
            Self::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

// ============================================================================
// Progress Events
// ============================================================================

/// Phase of an install operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Querying the package manager for current state.
    Probing,
    /// The package manager install process is running.
    Installing,
    /// Downloading an archive distribution.
    Downloading,
    /// Extracting a downloaded archive.
    Extracting,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probing => write!(f, "probing"),
            Self::Installing => write!(f, "installing"),
            Self::Downloading => write!(f, "downloading"),
            Self::Extracting => write!(f, "extracting"),
        }
    }
}

/// A progress milestone emitted during an install.
///
/// Events are emitted only at real milestones: probe completion, download
/// bytes received against Content-Length, extraction completion. The
/// fraction is `None` whenever no honest value exists (winget exposes no
/// machine-readable progress, and a download without Content-Length has
/// no computable fraction). No intermediate values are fabricated.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Current phase.
    pub phase: InstallPhase,
    /// Completed fraction of this phase (0.0 to 1.0), if known.
    pub fraction: Option<f32>,
}

impl ProgressEvent {
    /// Creates a progress event for a phase with no known fraction.
    pub fn phase(phase: InstallPhase) -> Self {
        Self {
            phase,
            fraction: None,
        }
    }

    /// Creates a progress event with a known fraction, clamped to 0..=1.
    pub fn with_fraction(phase: InstallPhase, fraction: f32) -> Self {
        Self {
            phase,
            fraction: Some(fraction.clamp(0.0, 1.0)),
        }
    }
}

// ============================================================================
// Environment Variable Specs
// ============================================================================

/// Declares one system environment variable and where its value may live
/// on disk.
///
/// Candidates are tried in declared order; a pattern containing `*` is
/// expanded against the live filesystem and its first match wins, a
/// literal path is accepted iff it exists. Order encodes priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarSpec {
    /// Variable name ("JAVA_HOME").
    pub name: String,
    /// Candidate path patterns, highest priority first.
    pub candidates: Vec<String>,
    /// If set, also append the value's `bin` subdirectory to the system
    /// PATH when that subdirectory exists.
    pub extend_path_bin: bool,
}

impl EnvVarSpec {
    /// Creates a spec without PATH extension.
    pub fn new(name: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            name: name.into(),
            candidates,
            extend_path_bin: false,
        }
    }

    /// Marks this variable as a binary root whose `bin` subdirectory is
    /// appended to PATH.
    pub fn extend_path_bin(mut self) -> Self {
        self.extend_path_bin = true;
        self
    }
}

/// Result of configuring one environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarOutcome {
    /// The path the variable was resolved to, if any candidate matched.
    pub resolved: Option<PathBuf>,
    /// Whether persistence succeeded.
    pub success: bool,
}

// ============================================================================
// Archive Formats
// ============================================================================

/// Archive format for downloaded distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip)
    Zip,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

// ============================================================================
// Gradle Distribution
// ============================================================================

/// Default root directory Gradle distributions are unpacked under.
pub const DEFAULT_GRADLE_ROOT: &str = "C:/Gradle";

/// Describes one Gradle binary distribution, derived deterministically
/// from a version string.
///
/// Gradle is not available through winget's repository, so it is the one
/// tool installed by downloading and unpacking an archive. Existence of
/// `install_dir` is its sole installed-detection mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleDistribution {
    /// Version string ("8.5").
    pub version: String,
    /// URL of the `-bin` zip for this version.
    pub download_url: String,
    /// Directory the distribution unpacks to (`<root>/gradle-<version>`).
    pub install_dir: PathBuf,
}

impl GradleDistribution {
    /// Derives the distribution for a version under [`DEFAULT_GRADLE_ROOT`].
    pub fn for_version(version: &str) -> Self {
        Self::with_install_root(version, PathBuf::from(DEFAULT_GRADLE_ROOT))
    }

    /// Derives the distribution for a version under a custom root.
    pub fn with_install_root(version: &str, root: PathBuf) -> Self {
        Self {
            version: version.to_string(),
            download_url: format!(
                "https://services.gradle.org/distributions/gradle-{}-bin.zip",
                version
            ),
            install_dir: root.join(format!("gradle-{}", version)),
        }
    }

    /// The archive's extraction target: the parent of the install dir.
    /// The zip itself contains a `gradle-<version>/` top-level entry.
    pub fn extract_root(&self) -> PathBuf {
        self.install_dir
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.install_dir.clone())
    }
}

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Failure classes for install operations.
///
/// Every variant is handled locally and converted into an
/// [`InstallStatus`] or a per-variable success flag; none terminate the
/// process or abort a batch, and nothing is retried.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The package manager's list query could not be completed. Treated
    /// as "not installed" by the probe.
    #[error("package manager query failed: {0}")]
    ProbeInconclusive(String),
    /// The install process exited with a non-zero code.
    #[error("install process exited with code {code}")]
    InstallProcessFailed {
        /// Raw process exit code, or -1 if the process was killed.
        code: i32,
    },
    /// The archive download failed.
    #[error("download failed: {0}")]
    DownloadFailed(String),
    /// The archive could not be extracted.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    /// The environment persistence call failed.
    #[error("environment persistence failed: {0}")]
    PersistenceFailed(String),
}
