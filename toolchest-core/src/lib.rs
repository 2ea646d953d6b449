//! Toolchest Core Library
//!
//! This crate provides the install-orchestration workflow for Toolchest,
//! a winget-driven developer tools bootstrapper. It includes:
//!
//! - The built-in tool and environment variable catalogs
//! - An installed-state probe against winget's list query
//! - The check-then-install workflow per tool
//! - An archive-based install path for Gradle (download + extract)
//! - System environment variable configuration via setx
//! - Batch orchestration with per-tool tasks and a one-way event channel
//!
//! Presentation layers (the `toolchest` CLI) subscribe to events and
//! never touch installer internals.

pub mod archive;
pub mod catalog;
pub mod downloader;
pub mod env;
pub mod extractor;
pub mod installer;
pub mod orchestrator;
pub mod package_manager;
pub mod probe;
pub mod types;

// Re-exports for convenience
pub use archive::{ArchiveFetcher, GradleInstaller, HttpFetcher};
pub use catalog::{default_catalog, default_env_specs, GRADLE_VERSION};
pub use downloader::{download_file, DownloadProgress};
pub use env::{configure, resolve_candidates, EnvPersistence, Setx};
pub use orchestrator::{
    event_channel, EventReceiver, EventSender, Orchestrator, ToolEvent, GRADLE_DISPLAY_NAME,
};
pub use package_manager::{PackageManager, Winget};
pub use types::{
    ArchiveFormat, EnvVarOutcome, EnvVarSpec, GradleDistribution, InstallError, InstallPhase,
    InstallStatus, ProgressEvent, ToolEntry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
