//! Toolchest CLI
//!
//! Thin presentation layer over `toolchest-core`: renders per-tool status
//! and progress lines; owns no install logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use toolchest_core::{
    default_catalog, default_env_specs, event_channel, EventReceiver, GradleDistribution,
    GradleInstaller, HttpFetcher, InstallStatus, Orchestrator, Setx, ToolEntry, ToolEvent, Winget,
    GRADLE_VERSION,
};

#[derive(Parser, Debug)]
#[clap(
    name = "toolchest",
    version,
    about = "Install a developer toolbelt through winget, plus Gradle and environment variables"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, default_value = "info", help = "Log level filter")]
    log_level: String,

    #[clap(
        long,
        global = true,
        value_name = "FILE",
        help = "JSON file with a custom tool catalog (array of {display_name, package_id, exact})"
    )]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Probe every catalog tool and show whether it is installed
    List,

    /// Install catalog tools (all of them by default), then Gradle and
    /// environment variables
    Install {
        /// Only install tools whose display name or package id matches
        #[clap(value_name = "TOOL")]
        tools: Vec<String>,

        /// Skip the archive-based Gradle install
        #[clap(long)]
        skip_gradle: bool,

        /// Skip environment variable configuration
        #[clap(long)]
        skip_env: bool,

        /// Root directory Gradle unpacks under
        #[clap(long, value_name = "DIR")]
        gradle_root: Option<PathBuf>,
    },

    /// Configure system environment variables only
    Env {
        /// Root directory Gradle was unpacked under
        #[clap(long, value_name = "DIR")]
        gradle_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("toolchest_core={}", cli.log_level).parse()?)
                .add_directive(format!("toolchest_cli={}", cli.log_level).parse()?),
        )
        .init();

    tracing::info!("Toolchest v{}", toolchest_core::VERSION);

    let catalog = load_catalog(cli.catalog.as_deref())?;

    match cli.command {
        Commands::List => list(catalog).await,
        Commands::Install {
            tools,
            skip_gradle,
            skip_env,
            gradle_root,
        } => install(catalog, tools, skip_gradle, skip_env, gradle_root).await,
        Commands::Env { gradle_root } => {
            configure_env(gradle_distribution(gradle_root));
            Ok(())
        }
    }
}

/// Loads the catalog from a JSON file, falling back to the built-in set.
fn load_catalog(path: Option<&Path>) -> Result<Vec<ToolEntry>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            let catalog: Vec<ToolEntry> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
            if catalog.is_empty() {
                bail!("Catalog {} contains no tools", path.display());
            }
            Ok(catalog)
        }
        None => Ok(default_catalog()),
    }
}

fn gradle_distribution(root: Option<PathBuf>) -> GradleDistribution {
    match root {
        Some(root) => GradleDistribution::with_install_root(GRADLE_VERSION, root),
        None => GradleDistribution::for_version(GRADLE_VERSION),
    }
}

async fn list(catalog: Vec<ToolEntry>) -> Result<()> {
    let orchestrator = Orchestrator::new(catalog, Arc::new(Winget));

    for (entry, installed) in orchestrator.probe_all().await {
        let marker = if installed { "installed" } else { "not installed" };
        println!("{:<24} {:<40} {}", entry.display_name, entry.package_id, marker);
    }

    let gradle = GradleInstaller::for_version(GRADLE_VERSION);
    let marker = if gradle.is_installed() {
        "installed"
    } else {
        "not installed"
    };
    println!(
        "{:<24} {:<40} {}",
        "Gradle",
        gradle.distribution().install_dir.display(),
        marker
    );

    Ok(())
}

async fn install(
    catalog: Vec<ToolEntry>,
    tools: Vec<String>,
    skip_gradle: bool,
    skip_env: bool,
    gradle_root: Option<PathBuf>,
) -> Result<()> {
    let catalog = select_tools(catalog, &tools)?;
    let orchestrator = Orchestrator::new(catalog, Arc::new(Winget));

    let (tx, rx) = event_channel();
    let printer = tokio::spawn(render_events(rx));

    let results = orchestrator.install_all(tx.clone()).await;

    let gradle = gradle_distribution(gradle_root);
    let gradle_status = if skip_gradle || !tools.is_empty() {
        None
    } else {
        let installer = GradleInstaller::new(gradle.clone(), HttpFetcher);
        Some(orchestrator.install_gradle(&installer, tx.clone()).await)
    };

    drop(tx);
    printer.await?;

    if !skip_env && tools.is_empty() {
        configure_env(gradle);
    }

    let failed = results
        .iter()
        .filter(|(_, s)| matches!(s, InstallStatus::Failed { .. }))
        .count()
        + usize::from(matches!(gradle_status, Some(InstallStatus::Failed { .. })));

    if failed > 0 {
        bail!("{} tool(s) failed to install", failed);
    }
    Ok(())
}

/// Narrows the catalog to the requested tools, matching display name or
/// package id case-insensitively. An empty request keeps everything.
fn select_tools(catalog: Vec<ToolEntry>, requested: &[String]) -> Result<Vec<ToolEntry>> {
    if requested.is_empty() {
        return Ok(catalog);
    }

    let mut selected = Vec::new();
    for name in requested {
        let lower = name.to_lowercase();
        match catalog.iter().find(|t| {
            t.display_name.to_lowercase() == lower || t.package_id.to_lowercase() == lower
        }) {
            Some(entry) => selected.push(entry.clone()),
            None => bail!("Unknown tool: {}", name),
        }
    }
    Ok(selected)
}

async fn render_events(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        match event {
            ToolEvent::Progress {
                display_name,
                event,
            } => match event.fraction {
                Some(fraction) => {
                    println!("{:<24} {} {:.0}%", display_name, event.phase, fraction * 100.0)
                }
                None => println!("{:<24} {}...", display_name, event.phase),
            },
            ToolEvent::Status {
                display_name,
                status,
            } => println!("{:<24} => {}", display_name, status),
        }
    }
}

fn configure_env(gradle: GradleDistribution) {
    let results = toolchest_core::configure(&default_env_specs(), &gradle, &Setx);
    for (name, outcome) in results {
        match (&outcome.resolved, outcome.success) {
            (Some(path), true) => println!("{:<16} = {}", name, path.display()),
            (Some(path), false) => {
                println!("{:<16} = {} (persistence failed)", name, path.display())
            }
            (None, _) => println!("{:<16} not found", name),
        }
    }
}
