mod config;
mod document;
mod error;
mod package;

pub use config::{HostOptions, Protocol, WorkshopConfig, CONFIG_FILE_NAME};
pub use document::{ManifestDocument, PackageRecord};
pub use error::{BoxError, WorkshopError};
pub use package::{Package, PackageCoordinate, APP_MARKER_FILE, MANIFEST_FILE_NAME};
