use std::path::{Path, PathBuf};

use anyhow::Result;
use dslpack_core::{HostOptions, Package};

/// Progress observer: `(units_total, package, message)`. Purely informational.
pub type Progress<'a> = dyn FnMut(u64, &Package, &str) + 'a;

/// Where and how a single package should be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub options: HostOptions,
    pub cache_dir: PathBuf,
    pub packages_dir: PathBuf,
}

/// Repository access used by the workshop: tag lookup, content fetch and
/// dependency discovery. Implementations own transport, retries and timeouts.
pub trait PackageSource {
    /// Returns the newest release tag of `address`.
    fn latest_release(&self, address: &str, options: &HostOptions) -> Result<String>;

    /// Materializes `package` locally and returns the package directory.
    fn fetch(
        &self,
        package: &Package,
        request: &FetchRequest,
        progress: &mut Progress<'_>,
    ) -> Result<PathBuf>;

    /// Lists the packages `package` itself requires, in declaration order.
    fn dependencies(&self, package: &Package, materialized: &Path) -> Result<Vec<Package>>;
}
