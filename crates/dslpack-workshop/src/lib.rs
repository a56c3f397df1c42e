mod closure;
mod gateway;
mod identify;
mod layout;
mod lock;
mod source;
mod store;

pub use closure::MAX_CLOSURE_PACKAGES;
pub use gateway::FetchGateway;
pub use identify::identify_package;
pub use layout::{default_workshop_root, WorkshopLayout, ROOT_ENV_VAR};
pub use lock::{lock_path_for, WorkshopLock, LOCK_SUFFIX};
pub use source::{FetchRequest, PackageSource, Progress};
pub use store::{GetOutcome, GetStatus, Workshop};

pub use dslpack_core::{Package, PackageCoordinate, WorkshopConfig, WorkshopError};

#[cfg(test)]
mod tests;
