//! Batch orchestration over the tool catalog.
//!
//! The orchestrator owns the catalog (passed in at construction, not a
//! global) and a handle to the package manager. Each tool's
//! check-then-install sequence runs on its own tokio task with an
//! explicit `JoinHandle`; status and progress flow one way over an
//! unbounded channel to whatever presentation layer is listening. No
//! task ever aborts the batch: a failed tool is reported and the rest
//! continue.
//!
//! There is deliberately no ordering guarantee between tools and no
//! global concurrency limit; probes and installs for different tools may
//! invoke winget concurrently, which winget is assumed to tolerate. At
//! catalog scale (a dozen or so tools) the unbounded process count is an
//! accepted limitation.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::archive::{ArchiveFetcher, GradleInstaller};
use crate::env::{self, EnvPersistence};
use crate::installer;
use crate::package_manager::PackageManager;
use crate::probe;
use crate::types::{
    EnvVarOutcome, EnvVarSpec, GradleDistribution, InstallStatus, ProgressEvent, ToolEntry,
};

/// Display name used for the archive-installed tool's events.
pub const GRADLE_DISPLAY_NAME: &str = "Gradle";

// ============================================================================
// Events
// ============================================================================

/// Events sent from install tasks to the presentation layer.
#[derive(Debug, Clone)]
pub enum ToolEvent {
    /// A progress milestone for one tool.
    Progress {
        /// Catalog display name of the tool.
        display_name: String,
        /// The milestone.
        event: ProgressEvent,
    },
    /// A tool reached a settled status.
    Status {
        /// Catalog display name of the tool.
        display_name: String,
        /// The settled status.
        status: InstallStatus,
    },
}

/// Sender half of the tool event channel.
pub type EventSender = mpsc::UnboundedSender<ToolEvent>;

/// Receiver half of the tool event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ToolEvent>;

/// Creates the one-way event channel between install tasks and a
/// presentation layer.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives probe and install across the whole catalog.
pub struct Orchestrator {
    catalog: Vec<ToolEntry>,
    pm: Arc<dyn PackageManager>,
}

impl Orchestrator {
    /// Creates an orchestrator over an explicit catalog.
    pub fn new(catalog: Vec<ToolEntry>, pm: Arc<dyn PackageManager>) -> Self {
        Self { catalog, pm }
    }

    /// The catalog this orchestrator iterates.
    pub fn catalog(&self) -> &[ToolEntry] {
        &self.catalog
    }

    /// Probes every catalog entry without installing anything.
    ///
    /// Returns, per tool, whether the package manager currently reports
    /// it installed.
    pub async fn probe_all(&self) -> Vec<(ToolEntry, bool)> {
        let probes = self.catalog.iter().map(|entry| {
            let pm = Arc::clone(&self.pm);
            async move {
                let installed = probe::is_installed(pm.as_ref(), &entry.package_id).await;
                (entry.clone(), installed)
            }
        });
        join_all(probes).await
    }

    /// Spawns the check-then-install sequence for one tool on its own
    /// task.
    ///
    /// Progress milestones and the final settled status are sent through
    /// `events`; the handle resolves to the same settled status.
    pub fn spawn_install(&self, entry: ToolEntry, events: EventSender) -> JoinHandle<InstallStatus> {
        let pm = Arc::clone(&self.pm);
        tokio::spawn(async move {
            let display_name = entry.display_name.clone();
            let progress_events = events.clone();
            let progress_name = display_name.clone();

            let status = installer::install(pm.as_ref(), &entry, move |event| {
                // A closed receiver means the presentation layer went
                // away; the install itself carries on.
                let _ = progress_events.send(ToolEvent::Progress {
                    display_name: progress_name.clone(),
                    event,
                });
            })
            .await;

            let _ = events.send(ToolEvent::Status {
                display_name,
                status: status.clone(),
            });
            status
        })
    }

    /// Installs every catalog entry, each on its own task, and waits for
    /// all of them.
    ///
    /// Results come back in catalog order regardless of completion order.
    /// A failed tool never aborts the batch.
    pub async fn install_all(&self, events: EventSender) -> Vec<(ToolEntry, InstallStatus)> {
        info!("Installing {} catalog tools", self.catalog.len());

        let handles: Vec<_> = self
            .catalog
            .iter()
            .map(|entry| (entry.clone(), self.spawn_install(entry.clone(), events.clone())))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (entry, handle) in handles {
            let status = match handle.await {
                Ok(status) => status,
                Err(e) => InstallStatus::Failed {
                    error: format!("install task panicked: {}", e),
                },
            };
            results.push((entry, status));
        }
        results
    }

    /// Runs the archive-based Gradle install, forwarding its progress
    /// under [`GRADLE_DISPLAY_NAME`].
    pub async fn install_gradle<F: ArchiveFetcher>(
        &self,
        installer: &GradleInstaller<F>,
        events: EventSender,
    ) -> InstallStatus {
        let progress_events = events.clone();
        let status = installer
            .install(move |event| {
                let _ = progress_events.send(ToolEvent::Progress {
                    display_name: GRADLE_DISPLAY_NAME.to_string(),
                    event,
                });
            })
            .await;

        let _ = events.send(ToolEvent::Status {
            display_name: GRADLE_DISPLAY_NAME.to_string(),
            status: status.clone(),
        });
        status
    }

    /// Configures system environment variables after installation.
    pub fn configure_env(
        &self,
        specs: &[EnvVarSpec],
        gradle: &GradleDistribution,
        persistence: &dyn EnvPersistence,
    ) -> std::collections::BTreeMap<String, EnvVarOutcome> {
        env::configure(specs, gradle, persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake winget whose registry is an in-memory set: installs succeed
    /// and mark the package installed for later probes.
    #[derive(Default)]
    struct InMemoryPm {
        installed: Mutex<HashSet<String>>,
        install_calls: AtomicUsize,
        fail_ids: Vec<&'static str>,
    }

    #[async_trait]
    impl PackageManager for InMemoryPm {
        async fn query_list(&self, package_id: &str) -> Result<String> {
            let installed = self.installed.lock().unwrap();
            if installed.contains(&package_id.to_lowercase()) {
                Ok(format!("Tool   {}   1.0", package_id))
            } else {
                Ok(String::new())
            }
        }

        async fn install(&self, entry: &ToolEntry) -> Result<i32> {
            self.install_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.contains(&entry.package_id.as_str()) {
                return Ok(1);
            }
            self.installed
                .lock()
                .unwrap()
                .insert(entry.package_id.to_lowercase());
            Ok(0)
        }
    }

    fn catalog() -> Vec<ToolEntry> {
        vec![
            ToolEntry::new("Git", "Git.Git"),
            ToolEntry::new("CMake", "Kitware.CMake"),
            ToolEntry::new("NodeJS", "OpenJS.NodeJS"),
        ]
    }

    #[tokio::test]
    async fn test_install_all_reports_catalog_order() {
        let pm = Arc::new(InMemoryPm::default());
        let orchestrator = Orchestrator::new(catalog(), pm);

        let (tx, _rx) = event_channel();
        let results = orchestrator.install_all(tx).await;

        let names: Vec<_> = results.iter().map(|(e, _)| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Git", "CMake", "NodeJS"]);
        assert!(results.iter().all(|(_, s)| *s == InstallStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let pm = Arc::new(InMemoryPm::default());
        let orchestrator = Orchestrator::new(catalog(), Arc::clone(&pm) as Arc<dyn PackageManager>);

        let (tx, _rx) = event_channel();
        let first = orchestrator.install_all(tx).await;
        assert!(first.iter().all(|(_, s)| *s == InstallStatus::Succeeded));
        assert_eq!(pm.install_calls.load(Ordering::SeqCst), 3);

        // No external state changed between runs: everything reports
        // AlreadyInstalled and the install operation never runs again.
        let (tx, _rx) = event_channel();
        let second = orchestrator.install_all(tx).await;
        assert!(second
            .iter()
            .all(|(_, s)| *s == InstallStatus::AlreadyInstalled));
        assert_eq!(pm.install_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_one_failure_never_aborts_the_batch() {
        let pm = Arc::new(InMemoryPm {
            fail_ids: vec!["Kitware.CMake"],
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(catalog(), pm);

        let (tx, _rx) = event_channel();
        let results = orchestrator.install_all(tx).await;

        assert_eq!(results[0].1, InstallStatus::Succeeded);
        assert!(matches!(results[1].1, InstallStatus::Failed { .. }));
        assert_eq!(results[2].1, InstallStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_events_carry_settled_status_per_tool() {
        let pm = Arc::new(InMemoryPm::default());
        let orchestrator = Orchestrator::new(catalog(), pm);

        let (tx, mut rx) = event_channel();
        orchestrator.install_all(tx).await;

        let mut settled = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ToolEvent::Status { display_name, status } = event {
                settled.push((display_name, status));
            }
        }

        assert_eq!(settled.len(), 3);
        assert!(settled.iter().all(|(_, s)| s.is_settled()));
    }

    #[tokio::test]
    async fn test_probe_all_reflects_live_state() {
        let pm = Arc::new(InMemoryPm::default());
        pm.installed.lock().unwrap().insert("git.git".to_string());
        let orchestrator = Orchestrator::new(catalog(), pm);

        let probes = orchestrator.probe_all().await;
        let installed: Vec<_> = probes
            .iter()
            .filter(|(_, installed)| *installed)
            .map(|(e, _)| e.package_id.as_str())
            .collect();
        assert_eq!(installed, vec!["Git.Git"]);
    }

    #[tokio::test]
    async fn test_spawn_install_handle_resolves_to_status() {
        let pm = Arc::new(InMemoryPm::default());
        let orchestrator = Orchestrator::new(Vec::new(), pm);

        let (tx, _rx) = event_channel();
        let handle = orchestrator.spawn_install(ToolEntry::new("Git", "Git.Git"), tx);
        assert_eq!(handle.await.unwrap(), InstallStatus::Succeeded);
    }
}
