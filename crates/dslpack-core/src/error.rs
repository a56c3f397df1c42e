use std::io;
use std::path::PathBuf;

/// Opaque error produced by an external collaborator (fetcher, tag lookup).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum WorkshopError {
    #[error("malformed package spec '{spec}': {reason}")]
    MalformedSpec { spec: String, reason: String },

    #[error("\"{existing}\" and \"{incoming}\" share the alias \"{alias}\", choose a different alias")]
    AliasCollision {
        alias: String,
        existing: String,
        incoming: String,
    },

    #[error("replace target for '{package}' does not exist: {}", .path.display())]
    ReplaceTargetMissing {
        package: String,
        path: PathBuf,
        source: io::Error,
    },

    #[error("replace target for '{package}' is not an application root (missing {marker}): {}", .path.display())]
    ReplaceTargetInvalid {
        package: String,
        path: PathBuf,
        marker: &'static str,
    },

    #[error(
        "{} is locked, another process may be running; if the lock is stale remove {} or run `dslpack unlock`",
        .manifest.display(),
        .lock.display()
    )]
    LockHeld { manifest: PathBuf, lock: PathBuf },

    #[error("failed fetching '{package}'")]
    FetchFailure { package: String, source: BoxError },

    #[error("failed resolving latest release of '{address}'")]
    ReleaseLookup { address: String, source: BoxError },

    #[error("failed listing dependencies of '{package}'")]
    DependencyListing { package: String, source: BoxError },

    #[error("dependency closure of '{root}' exceeds {limit} packages")]
    ClosureTooLarge { root: String, limit: usize },

    #[error("failed {action} {}", .path.display())]
    PersistFailure {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("invalid manifest {}", .path.display())]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration {}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl WorkshopError {
    pub fn malformed(spec: &str, reason: impl Into<String>) -> Self {
        Self::MalformedSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub fn persist(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PersistFailure {
            action,
            path: path.into(),
            source,
        }
    }
}
