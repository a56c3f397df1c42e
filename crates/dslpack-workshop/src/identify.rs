use dslpack_core::{Package, PackageCoordinate, WorkshopConfig, WorkshopError};
use tracing::debug;

use crate::source::PackageSource;

/// Turns a coordinate into a pinned [`Package`].
///
/// Unpinned coordinates are resolved against the repository's latest release
/// tag; this is the only remote call made while identifying a package.
pub fn identify_package(
    spec: &str,
    alias: Option<&str>,
    source: &dyn PackageSource,
    config: &WorkshopConfig,
) -> Result<Package, WorkshopError> {
    let coordinate = PackageCoordinate::parse(spec)?;
    if coordinate.is_pinned() {
        return Package::new(spec, coordinate, alias);
    }

    let options = config.host_options(coordinate.host());
    let release = source
        .latest_release(&coordinate.address, &options)
        .map_err(|err| WorkshopError::ReleaseLookup {
            address: coordinate.address.clone(),
            source: err.into(),
        })?;
    let release = release.trim();
    if release.is_empty() {
        return Err(WorkshopError::ReleaseLookup {
            address: coordinate.address,
            source: "repository reported an empty release tag".into(),
        });
    }

    debug!(spec, release, "resolved latest release");
    let pinned = format!("{}@{}", spec.trim(), release);
    let coordinate = PackageCoordinate::parse(&pinned)?;
    Package::new(&pinned, coordinate, alias)
}
