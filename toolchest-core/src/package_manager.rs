//! Package manager collaborator trait and the winget implementation.
//!
//! The rest of the crate talks to the package manager exclusively through
//! the [`PackageManager`] trait so tests can substitute a fake that
//! counts invocations. The real implementation shells out to `winget`.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::types::ToolEntry;

// ============================================================================
// Trait
// ============================================================================

/// External package manager collaborator.
///
/// Both operations capture combined stdout+stderr as text; the exit code
/// is the sole success signal for installs.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Runs the list query scoped to `package_id` and returns the
    /// captured combined output.
    ///
    /// A non-zero exit from the query itself is not an error: the query
    /// output (possibly empty) is still returned and the caller decides
    /// what absence of a match means. Only failure to run the query at
    /// all is an `Err`.
    async fn query_list(&self, package_id: &str) -> Result<String>;

    /// Spawns the install operation for `entry` with interactive prompts
    /// suppressed, waits for it, and returns the process exit code.
    ///
    /// Returns `Err` only when the process could not be spawned or waited
    /// on; a non-zero exit code is a normal return value that the caller
    /// classifies.
    async fn install(&self, entry: &ToolEntry) -> Result<i32>;
}

// ============================================================================
// Winget Implementation
// ============================================================================

/// The Windows Package Manager, invoked as an external `winget` process.
#[derive(Debug, Clone, Default)]
pub struct Winget;

/// Flags that suppress winget's interactive confirmation prompts.
const ACCEPT_FLAGS: [&str; 2] = ["--accept-source-agreements", "--accept-package-agreements"];

#[async_trait]
impl PackageManager for Winget {
    async fn query_list(&self, package_id: &str) -> Result<String> {
        debug!(package_id, "Running winget list query");

        let output = Command::new("winget")
            .arg("list")
            .arg(package_id)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run winget list for {}", package_id))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }

    async fn install(&self, entry: &ToolEntry) -> Result<i32> {
        let mut cmd = Command::new("winget");
        cmd.arg("install");
        if entry.exact {
            cmd.arg(format!("--id={}", entry.package_id)).arg("-e");
        } else {
            cmd.arg(&entry.package_id);
        }
        cmd.args(ACCEPT_FLAGS);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(package_id = %entry.package_id, exact = entry.exact, "Spawning winget install");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn winget install for {}", entry.package_id))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain both streams concurrently so the child never blocks on a
        // full pipe. Lines are logged for diagnosis only; winget exposes
        // no machine-readable progress in them.
        let drain_stdout = async {
            if let Some(out) = stdout {
                let mut lines = BufReader::new(out).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(package_id = %entry.package_id, "winget: {}", line.trim_end());
                }
            }
        };
        let drain_stderr = async {
            if let Some(err) = stderr {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(package_id = %entry.package_id, "winget: {}", line.trim_end());
                }
            }
        };
        tokio::join!(drain_stdout, drain_stderr);

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait on winget install for {}", entry.package_id))?;

        Ok(status.code().unwrap_or(-1))
    }
}
