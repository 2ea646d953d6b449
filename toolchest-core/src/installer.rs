//! Check-then-install workflow for one winget-managed tool.

use tracing::{info, warn};

use crate::package_manager::PackageManager;
use crate::probe;
use crate::types::{InstallError, InstallPhase, InstallStatus, ProgressEvent, ToolEntry};

/// Installs `entry` through the package manager, probing first.
///
/// If the probe reports the package as present the install operation is
/// never invoked and the result is `AlreadyInstalled`; this probe is the
/// workflow's only idempotency guard. Otherwise the install runs to
/// completion and exit code 0 classifies as `Succeeded`, anything else as
/// `Failed`. A failed attempt is terminal for this run; nothing retries.
///
/// Progress events are emitted at real milestones only: probe start and
/// install start. winget reports no machine-readable completion fraction,
/// so none is invented.
pub async fn install<F>(pm: &dyn PackageManager, entry: &ToolEntry, on_event: F) -> InstallStatus
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    on_event(ProgressEvent::phase(InstallPhase::Probing));

    if probe::is_installed(pm, &entry.package_id).await {
        info!(package_id = %entry.package_id, "Already installed, skipping");
        return InstallStatus::AlreadyInstalled;
    }

    info!(package_id = %entry.package_id, "Installing {}", entry.display_name);
    on_event(ProgressEvent::phase(InstallPhase::Installing));

    match pm.install(entry).await {
        Ok(0) => {
            info!(package_id = %entry.package_id, "Install succeeded");
            InstallStatus::Succeeded
        }
        Ok(code) => {
            let err = InstallError::InstallProcessFailed { code };
            warn!(package_id = %entry.package_id, "{}", err);
            InstallStatus::Failed {
                error: err.to_string(),
            }
        }
        Err(e) => {
            warn!(package_id = %entry.package_id, "Install could not run: {:#}", e);
            InstallStatus::Failed {
                error: format!("{:#}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake package manager that counts invocations.
    struct FakePm {
        installed: bool,
        install_exit_code: i32,
        spawn_fails: bool,
        list_calls: AtomicUsize,
        install_calls: AtomicUsize,
    }

    impl FakePm {
        fn new(installed: bool, install_exit_code: i32) -> Self {
            Self {
                installed,
                install_exit_code,
                spawn_fails: false,
                list_calls: AtomicUsize::new(0),
                install_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PackageManager for FakePm {
        async fn query_list(&self, package_id: &str) -> Result<String> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.installed {
                Ok(format!("SomeTool   {}   1.0.0", package_id))
            } else {
                Ok("No installed package found matching input criteria.".to_string())
            }
        }

        async fn install(&self, _entry: &ToolEntry) -> Result<i32> {
            self.install_calls.fetch_add(1, Ordering::SeqCst);
            if self.spawn_fails {
                bail!("winget executable not found");
            }
            Ok(self.install_exit_code)
        }
    }

    fn entry() -> ToolEntry {
        ToolEntry::new("Git", "Git.Git")
    }

    #[tokio::test]
    async fn test_already_installed_skips_install_invocation() {
        let pm = FakePm::new(true, 0);
        let status = install(&pm, &entry(), |_| {}).await;

        assert_eq!(status, InstallStatus::AlreadyInstalled);
        assert_eq!(pm.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(pm.install_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_installed_exit_zero_succeeds() {
        let pm = FakePm::new(false, 0);
        let status = install(&pm, &entry(), |_| {}).await;

        assert_eq!(status, InstallStatus::Succeeded);
        assert_eq!(pm.install_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let pm = FakePm::new(false, 1603);
        let status = install(&pm, &entry(), |_| {}).await;

        match status {
            InstallStatus::Failed { error } => assert!(error.contains("1603")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure_classifies_as_failed() {
        let mut pm = FakePm::new(false, 0);
        pm.spawn_fails = true;
        let status = install(&pm, &entry(), |_| {}).await;

        assert!(matches!(status, InstallStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_progress_events_at_real_milestones_only() {
        let pm = FakePm::new(false, 0);
        let events = Mutex::new(Vec::new());
        install(&pm, &entry(), |e| events.lock().unwrap().push(e)).await;

        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                ProgressEvent::phase(InstallPhase::Probing),
                ProgressEvent::phase(InstallPhase::Installing),
            ]
        );
        // No fabricated fractions for winget installs.
        assert!(events.iter().all(|e| e.fraction.is_none()));
    }

    #[tokio::test]
    async fn test_already_installed_emits_probe_only() {
        let pm = FakePm::new(true, 0);
        let events = Mutex::new(Vec::new());
        install(&pm, &entry(), |e| events.lock().unwrap().push(e)).await;

        let events = events.into_inner().unwrap();
        assert_eq!(events, vec![ProgressEvent::phase(InstallPhase::Probing)]);
    }
}
