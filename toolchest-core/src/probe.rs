//! Installed-state probe against the package manager's list query.

use tracing::warn;

use crate::package_manager::PackageManager;
use crate::types::InstallError;

/// Returns true iff `package_id` appears (case-insensitively) as a
/// substring of the list query's captured output.
///
/// A query that cannot be run at all is inconclusive and reported as
/// "not installed"; absence of output means the same.
///
/// Known imprecision: substring matching yields a false positive when the
/// package id is a substring of an unrelated installed package's id
/// (e.g. probing `Foo.Bar` while `Foo.Barbaz` is installed). Downstream
/// behavior depends on this laxity, so the matching is deliberately not
/// any stricter.
pub async fn is_installed(pm: &dyn PackageManager, package_id: &str) -> bool {
    let output = match pm.query_list(package_id).await {
        Ok(output) => output,
        Err(e) => {
            let err = InstallError::ProbeInconclusive(e.to_string());
            warn!(package_id, "{}; treating as not installed", err);
            return false;
        }
    };

    output.to_lowercase().contains(&package_id.to_lowercase())
}
