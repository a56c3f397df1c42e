use std::path::PathBuf;

use dslpack_core::{Package, WorkshopConfig, WorkshopError};
use tracing::debug;

use crate::layout::WorkshopLayout;
use crate::source::{FetchRequest, PackageSource, Progress};

pub struct FetchGateway<'a> {
    layout: &'a WorkshopLayout,
    config: &'a WorkshopConfig,
}

impl<'a> FetchGateway<'a> {
    pub fn new(layout: &'a WorkshopLayout, config: &'a WorkshopConfig) -> Self {
        Self { layout, config }
    }

    pub fn request_for(&self, package: &Package) -> FetchRequest {
        FetchRequest {
            options: self.config.host_options(package.host()),
            cache_dir: self.layout.cache_dir(),
            packages_dir: self.layout.packages_dir(),
        }
    }

    /// Returns the local directory holding `package`. Replaced packages are
    /// served from their local path without touching the source.
    pub fn fetch(
        &self,
        source: &dyn PackageSource,
        package: &Package,
        progress: &mut Progress<'_>,
    ) -> Result<PathBuf, WorkshopError> {
        if let (true, Some(local_path)) = (package.replaced, &package.local_path) {
            progress(1, package, "using local replacement");
            return Ok(local_path.clone());
        }

        self.layout.ensure_base_dirs()?;
        let request = self.request_for(package);
        debug!(package = %package, cache = %request.cache_dir.display(), "fetching package");
        source
            .fetch(package, &request, progress)
            .map_err(|err| WorkshopError::FetchFailure {
                package: package.unique_id().to_string(),
                source: err.into(),
            })
    }
}
