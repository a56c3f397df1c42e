use dslpack_core::{Package, WorkshopError};
use tracing::debug;

use crate::gateway::FetchGateway;
use crate::source::{PackageSource, Progress};
use crate::store::Workshop;

/// Upper bound on packages appended by a single closure walk.
pub const MAX_CLOSURE_PACKAGES: usize = 1024;

impl Workshop {
    /// Appends `root` and its transitive dependencies, depth-first in
    /// declaration order. Packages whose unique id is already indexed are
    /// skipped, which also terminates dependency cycles.
    ///
    /// A package is only appended after its fetch succeeded. Returns the
    /// unique ids appended, in discovery order.
    pub(crate) fn add(
        &mut self,
        source: &dyn PackageSource,
        root: Package,
        progress: &mut Progress<'_>,
        indirect: bool,
    ) -> Result<Vec<String>, WorkshopError> {
        let root_id = root.unique_id().to_string();
        let mut pending = vec![(root, indirect)];
        let mut added = Vec::new();

        while let Some((mut package, indirect)) = pending.pop() {
            if self.index.contains_unique(package.unique_id()) {
                continue;
            }
            if added.len() >= MAX_CLOSURE_PACKAGES {
                return Err(WorkshopError::ClosureTooLarge {
                    root: root_id,
                    limit: MAX_CLOSURE_PACKAGES,
                });
            }

            self.check_alias(&package)?;
            package.replaced = false;
            package.local_path = None;
            self.apply_replace(&mut package)?;

            let materialized = FetchGateway::new(&self.layout, &self.config).fetch(
                source,
                &package,
                progress,
            )?;

            package.indirect = indirect;
            let position = self.push(package);
            let package = &self.require[position];
            added.push(package.unique_id().to_string());

            let declared = source
                .dependencies(package, &materialized)
                .map_err(|err| WorkshopError::DependencyListing {
                    package: package.unique_id().to_string(),
                    source: err.into(),
                })?;
            debug!(
                package = %package,
                indirect,
                dependencies = declared.len(),
                "added package"
            );

            for dependency in declared.into_iter().rev() {
                if !self.index.contains_unique(dependency.unique_id()) {
                    pending.push((dependency, true));
                }
            }
        }

        Ok(added)
    }
}
