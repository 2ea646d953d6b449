//! System environment variable configuration.
//!
//! After the tools are installed, a handful of variables (JAVA_HOME,
//! ANDROID_HOME, ...) are located by probing a prioritized list of
//! candidate paths against the live filesystem and persisted machine-wide
//! through `setx`. Persistence goes through the [`EnvPersistence`] trait
//! so tests can record calls instead of touching the registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::types::{EnvVarOutcome, EnvVarSpec, GradleDistribution, InstallError};

/// Variable name used for the Gradle home step.
const GRADLE_HOME_VAR: &str = "GRADLE_HOME";

// ============================================================================
// Persistence Trait
// ============================================================================

/// OS collaborator that persists system-scoped environment variables.
pub trait EnvPersistence: Send + Sync {
    /// Persists `name=value` machine-wide.
    fn set_system_var(&self, name: &str, value: &str) -> Result<()>;

    /// Appends `dir` to the machine-wide PATH.
    fn append_system_path(&self, dir: &Path) -> Result<()>;
}

/// Real persistence through the Windows `setx` command with the `/M`
/// (machine scope) flag. Requires an elevated shell.
#[derive(Debug, Clone, Default)]
pub struct Setx;

impl EnvPersistence for Setx {
    fn set_system_var(&self, name: &str, value: &str) -> Result<()> {
        let output = std::process::Command::new("setx")
            .args([name, value, "/M"])
            .output()
            .with_context(|| format!("Failed to run setx for {}", name))?;

        if !output.status.success() {
            anyhow::bail!(
                "setx {} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn append_system_path(&self, dir: &Path) -> Result<()> {
        let appended = format!("%PATH%;{}", dir.display());
        let output = std::process::Command::new("setx")
            .args(["PATH", &appended, "/M"])
            .output()
            .context("Failed to run setx for PATH")?;

        if !output.status.success() {
            anyhow::bail!(
                "setx PATH exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

// ============================================================================
// Candidate Resolution
// ============================================================================

/// Resolves an ordered candidate list against the live filesystem.
///
/// A pattern containing `*` is glob-expanded and its first match wins; a
/// literal path is accepted iff it exists. The first candidate in
/// declared order to resolve wins, so order encodes priority.
pub fn resolve_candidates(candidates: &[String]) -> Option<PathBuf> {
    for pattern in candidates {
        if pattern.contains('*') {
            let matches = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    warn!(pattern, "Skipping malformed candidate pattern: {}", e);
                    continue;
                }
            };
            if let Some(path) = matches.filter_map(|m| m.ok()).next() {
                debug!(pattern, resolved = %path.display(), "Wildcard candidate matched");
                return Some(path);
            }
        } else if Path::new(pattern).exists() {
            debug!(pattern, "Literal candidate exists");
            return Some(PathBuf::from(pattern));
        }
    }
    None
}

// ============================================================================
// Configuration
// ============================================================================

/// Resolves and persists every spec, then the always-last Gradle step.
///
/// Per variable: the first resolving candidate is persisted machine-wide,
/// and for binary-root variables the value's `bin` subdirectory is also
/// appended to PATH when it exists. A spec with no resolving candidate
/// records `{resolved: None, success: false}`; a persistence failure
/// records `success: false`. Neither aborts the remaining specs.
///
/// The final step checks the Gradle install directory for the configured
/// version: when present it is persisted as GRADLE_HOME and its `bin`
/// appended to PATH; when absent no GRADLE_HOME entry is recorded.
pub fn configure(
    specs: &[EnvVarSpec],
    gradle: &GradleDistribution,
    persistence: &dyn EnvPersistence,
) -> BTreeMap<String, EnvVarOutcome> {
    let mut results = BTreeMap::new();

    for spec in specs {
        let outcome = match resolve_candidates(&spec.candidates) {
            Some(path) => {
                let success = persist_var(persistence, &spec.name, &path, spec.extend_path_bin);
                EnvVarOutcome {
                    resolved: Some(path),
                    success,
                }
            }
            None => {
                info!(var = %spec.name, "No candidate path resolved");
                EnvVarOutcome {
                    resolved: None,
                    success: false,
                }
            }
        };
        results.insert(spec.name.clone(), outcome);
    }

    if gradle.install_dir.exists() {
        let success = persist_var(persistence, GRADLE_HOME_VAR, &gradle.install_dir, true);
        results.insert(
            GRADLE_HOME_VAR.to_string(),
            EnvVarOutcome {
                resolved: Some(gradle.install_dir.clone()),
                success,
            },
        );
    }

    results
}

/// Persists one variable; returns whether the set call succeeded.
///
/// The PATH append is best-effort: its failure is logged but does not
/// flip the variable's own success flag, matching the persistence
/// contract where each external call's outcome is observed in isolation.
fn persist_var(
    persistence: &dyn EnvPersistence,
    name: &str,
    value: &Path,
    extend_path_bin: bool,
) -> bool {
    if let Err(e) = persistence.set_system_var(name, &value.to_string_lossy()) {
        let err = InstallError::PersistenceFailed(format!("{:#}", e));
        warn!(var = name, "{}", err);
        return false;
    }
    info!(var = name, value = %value.display(), "Environment variable persisted");

    if extend_path_bin {
        let bin = value.join("bin");
        if bin.exists() {
            if let Err(e) = persistence.append_system_path(&bin) {
                warn!(var = name, "PATH append failed: {:#}", e);
            }
        }
    }

    true
}
