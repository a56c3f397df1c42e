use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dslpack_core::WorkshopError;
use tracing::{info, warn};

pub const LOCK_SUFFIX: &str = ".lock";

pub fn lock_path_for(manifest: &Path) -> PathBuf {
    let mut raw = manifest.as_os_str().to_owned();
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

/// Advisory lock marker next to a manifest. Released on drop.
#[derive(Debug)]
pub struct WorkshopLock {
    manifest: PathBuf,
    path: PathBuf,
    released: bool,
}

impl WorkshopLock {
    /// Claims the marker, failing immediately if another holder exists.
    pub fn acquire(manifest: &Path) -> Result<Self, WorkshopError> {
        let path = lock_path_for(manifest);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(WorkshopError::LockHeld {
                    manifest: manifest.to_path_buf(),
                    lock: path,
                });
            }
            Err(err) => return Err(WorkshopError::persist("creating lock", &path, err)),
        };

        // Holder pid, only used in the force-unlock log line.
        if let Err(err) = writeln!(file, "{}", std::process::id()) {
            warn!(lock = %path.display(), error = %err, "failed recording lock holder");
        }

        Ok(Self {
            manifest: manifest.to_path_buf(),
            path,
            released: false,
        })
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<(), WorkshopError> {
        self.released = true;
        remove_marker(&self.path)
    }

    pub fn is_locked(manifest: &Path) -> bool {
        lock_path_for(manifest).exists()
    }

    /// Removes a stale marker left behind by a crashed holder. Returns whether
    /// a marker was present.
    pub fn force_unlock(manifest: &Path) -> Result<bool, WorkshopError> {
        let path = lock_path_for(manifest);
        let holder = match fs::read_to_string(&path) {
            Ok(raw) => raw.trim().to_string(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(WorkshopError::persist("reading lock", &path, err)),
        };

        remove_marker(&path)?;
        info!(
            manifest = %manifest.display(),
            lock = %path.display(),
            holder = %holder,
            "forcibly removed workshop lock"
        );
        Ok(true)
    }
}

impl Drop for WorkshopLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = remove_marker(&self.path) {
            warn!(lock = %self.path.display(), error = %err, "failed releasing workshop lock");
        }
    }
}

fn remove_marker(path: &Path) -> Result<(), WorkshopError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(WorkshopError::persist("removing lock", path, err)),
    }
}
