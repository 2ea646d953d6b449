//! Built-in tool and environment variable catalogs.
//!
//! The catalog is a plain value: callers pass it into the
//! [`Orchestrator`](crate::orchestrator::Orchestrator) at construction,
//! so a custom tool list is just a different `Vec<ToolEntry>`. The
//! functions here build the stock set.

use crate::types::{EnvVarSpec, ToolEntry};

/// Gradle version installed through the archive path.
pub const GRADLE_VERSION: &str = "8.5";

// ============================================================================
// Tool Catalog
// ============================================================================

/// Returns the built-in catalog of winget-managed tools.
pub fn default_catalog() -> Vec<ToolEntry> {
    vec![
        ToolEntry::new("neofetch", "neofetch"),
        ToolEntry::new("Google Chrome", "Google.Chrome"),
        ToolEntry::new("Visual Studio Code", "Microsoft.VisualStudioCode"),
        ToolEntry::new("Git", "Git.Git"),
        ToolEntry::new("Visual Studio 2022", "Microsoft.VisualStudio.2022.Community"),
        ToolEntry::new("Android Studio", "Google.AndroidStudio"),
        ToolEntry::new("Python 3", "Python.Python.3"),
        ToolEntry::new("NodeJS", "OpenJS.NodeJS"),
        ToolEntry::new("Ruby", "RubyInstallerTeam.Ruby"),
        ToolEntry::new("CMake", "Kitware.CMake"),
        ToolEntry::new("Temurin JDK 17", "EclipseAdoptium.Temurin.17.JDK"),
        ToolEntry::new("WinRAR", "RARLab.WinRAR"),
        ToolEntry::new("Go Lang", "GoLang.Go"),
        // winget matches "TorProject.TorBrowser" against more than one
        // package without exact-id mode.
        ToolEntry::new("Tor Browser", "TorProject.TorBrowser").exact(),
    ]
}

// ============================================================================
// Environment Variable Specs
// ============================================================================

/// Returns the built-in environment variable specs.
///
/// Candidate order encodes priority: the first pattern that resolves
/// against the live filesystem wins. JAVA_HOME and GOROOT are binary
/// roots whose `bin` subdirectory is also appended to the system PATH.
pub fn default_env_specs() -> Vec<EnvVarSpec> {
    let home = dirs::home_dir().unwrap_or_default();
    let home = home.to_string_lossy();

    vec![
        EnvVarSpec::new(
            "JAVA_HOME",
            vec![
                "C:/Program Files/Eclipse Adoptium/jdk-17*".to_string(),
                "C:/Program Files/Java/jdk-17*".to_string(),
                "C:/Program Files/OpenJDK/jdk-17*".to_string(),
            ],
        )
        .extend_path_bin(),
        EnvVarSpec::new(
            "ANDROID_HOME",
            vec![
                format!("{}/AppData/Local/Android/Sdk", home),
                "C:/Users/*/AppData/Local/Android/Sdk".to_string(),
            ],
        ),
        EnvVarSpec::new(
            "ANDROID_SDK_ROOT",
            vec![
                format!("{}/AppData/Local/Android/Sdk", home),
                "C:/Users/*/AppData/Local/Android/Sdk".to_string(),
            ],
        ),
        EnvVarSpec::new(
            "GOPATH",
            vec![format!("{}/go", home), "C:/Users/*/go".to_string()],
        ),
        EnvVarSpec::new(
            "GOROOT",
            vec!["C:/Program Files/Go".to_string(), "C:/Go".to_string()],
        )
        .extend_path_bin(),
    ]
}
