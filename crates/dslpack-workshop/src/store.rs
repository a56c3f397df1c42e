use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dslpack_core::{
    ManifestDocument, Package, WorkshopConfig, WorkshopError, APP_MARKER_FILE, MANIFEST_FILE_NAME,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::identify::identify_package;
use crate::layout::WorkshopLayout;
use crate::lock::WorkshopLock;
use crate::source::{PackageSource, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetStatus {
    AlreadyPresent,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOutcome {
    pub package: Package,
    pub status: GetStatus,
    /// Unique ids appended by this operation, in discovery order.
    pub added: Vec<String>,
}

/// Positions in `Workshop::require`, keyed by alias and by unique id.
#[derive(Debug, Clone, Default)]
pub(crate) struct PackageIndex {
    aliases: HashMap<String, usize>,
    unique_ids: HashMap<String, usize>,
}

impl PackageIndex {
    fn clear(&mut self) {
        self.aliases.clear();
        self.unique_ids.clear();
    }

    pub(crate) fn insert(&mut self, package: &Package, position: usize) {
        self.aliases.insert(package.alias().to_string(), position);
        self.unique_ids
            .insert(package.unique_id().to_string(), position);
    }

    pub(crate) fn contains_unique(&self, unique_id: &str) -> bool {
        self.unique_ids.contains_key(unique_id)
    }

    fn alias(&self, alias: &str) -> Option<usize> {
        self.aliases.get(alias).copied()
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.aliases
            .get(name)
            .or_else(|| self.unique_ids.get(name))
            .copied()
    }
}

/// The project's dependency record: ordered requirements, local overrides and
/// a lookup index derived from the requirements.
#[derive(Debug, Clone)]
pub struct Workshop {
    file: PathBuf,
    pub(crate) layout: WorkshopLayout,
    pub(crate) config: WorkshopConfig,
    pub(crate) require: Vec<Package>,
    replace: BTreeMap<String, String>,
    pub(crate) index: PackageIndex,
}

impl Workshop {
    /// Opens the manifest under `root`, loading host options from the layout's
    /// config file.
    pub fn open(root: &Path, layout: WorkshopLayout) -> Result<Self, WorkshopError> {
        let config = WorkshopConfig::load(&layout.config_path())?;
        Self::open_with_config(root, layout, config)
    }

    pub fn open_with_config(
        root: &Path,
        layout: WorkshopLayout,
        config: WorkshopConfig,
    ) -> Result<Self, WorkshopError> {
        Self::load(
            root.join(MANIFEST_FILE_NAME),
            layout,
            config,
            &BTreeMap::new(),
        )
    }

    /// Reads `file` and builds the index. `pending_replace` holds directives
    /// set in memory that the file does not know about yet.
    fn load(
        file: PathBuf,
        layout: WorkshopLayout,
        config: WorkshopConfig,
        pending_replace: &BTreeMap<String, String>,
    ) -> Result<Self, WorkshopError> {
        let document = match fs::read(&file) {
            Ok(raw) => ManifestDocument::from_json_slice(&raw).map_err(|source| {
                WorkshopError::ManifestParse {
                    path: file.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => ManifestDocument::default(),
            Err(err) => return Err(WorkshopError::persist("reading manifest", &file, err)),
        };

        let mut workshop = Self {
            file,
            layout,
            config,
            require: Vec::new(),
            replace: document.replace,
            index: PackageIndex::default(),
        };
        let mut seen = HashSet::new();
        for record in &document.require {
            let package = Package::from_record(record)?;
            if !seen.insert(package.unique_id().to_string()) {
                warn!(
                    manifest = %workshop.file.display(),
                    package = %package,
                    "ignoring duplicate manifest entry"
                );
                continue;
            }
            workshop.require.push(package);
        }
        for (logical, local) in pending_replace {
            workshop
                .replace
                .entry(logical.clone())
                .or_insert_with(|| local.clone());
        }
        workshop.set_mapping()?;
        Ok(workshop)
    }

    /// Replaces the in-memory state with the file's current contents, keeping
    /// replace directives that were only set in memory.
    fn reload(&mut self) -> Result<(), WorkshopError> {
        let current = Self::load(
            self.file.clone(),
            self.layout.clone(),
            self.config.clone(),
            &self.replace,
        )?;
        debug!(
            manifest = %self.file.display(),
            packages = current.require.len(),
            "reloaded manifest under lock"
        );
        *self = current;
        Ok(())
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn layout(&self) -> &WorkshopLayout {
        &self.layout
    }

    pub fn config(&self) -> &WorkshopConfig {
        &self.config
    }

    pub fn packages(&self) -> &[Package] {
        &self.require
    }

    pub fn direct(&self) -> impl Iterator<Item = &Package> {
        self.require.iter().filter(|package| !package.indirect)
    }

    pub fn replace(&self) -> &BTreeMap<String, String> {
        &self.replace
    }

    /// Adds a replace directive. Takes effect on the next `set_mapping` or
    /// for packages added afterwards.
    pub fn set_replace(&mut self, logical_path: impl Into<String>, local: impl Into<String>) {
        self.replace.insert(logical_path.into(), local.into());
    }

    /// Looks a package up by alias or unique id.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.index.lookup(name).map(|position| &self.require[position])
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.lookup(name).is_some()
    }

    /// Rebuilds the index from `require`, validating alias uniqueness and
    /// resolving replace directives.
    pub fn set_mapping(&mut self) -> Result<(), WorkshopError> {
        self.index.clear();
        for position in 0..self.require.len() {
            self.check_alias(&self.require[position])?;

            let mut package = self.require[position].clone();
            self.apply_replace(&mut package)?;
            self.index.insert(&package, position);
            self.require[position] = package;
        }
        Ok(())
    }

    /// Fetches `spec` and everything it needs, then records the result.
    ///
    /// Runs under the manifest lock and starts from the file's contents as of
    /// lock acquisition, so entries saved by another process since `open` are
    /// kept. On any failure the in-memory manifest is restored and the file on
    /// disk is left as it was.
    pub fn get(
        &mut self,
        source: &dyn PackageSource,
        spec: &str,
        alias: Option<&str>,
        progress: &mut Progress<'_>,
    ) -> Result<GetOutcome, WorkshopError> {
        let lock = WorkshopLock::acquire(&self.file)?;
        let outcome = self.get_locked(source, spec, alias, progress);
        let released = lock.release();
        let outcome = outcome?;
        released?;
        Ok(outcome)
    }

    fn get_locked(
        &mut self,
        source: &dyn PackageSource,
        spec: &str,
        alias: Option<&str>,
        progress: &mut Progress<'_>,
    ) -> Result<GetOutcome, WorkshopError> {
        self.reload()?;
        let package = identify_package(spec, alias, source, &self.config)?;
        if let Some(existing) = self.package(package.unique_id()) {
            debug!(package = %package, "package already required");
            return Ok(GetOutcome {
                package: existing.clone(),
                status: GetStatus::AlreadyPresent,
                added: Vec::new(),
            });
        }

        let checkpoint = self.require.len();
        let result = self
            .add(source, package.clone(), progress, false)
            .and_then(|added| self.save().map(|()| added));
        match result {
            Ok(added) => Ok(GetOutcome {
                package: self.package(package.unique_id()).cloned().unwrap_or(package),
                status: GetStatus::Added,
                added,
            }),
            Err(err) => {
                self.rollback(checkpoint);
                Err(err)
            }
        }
    }

    /// Writes the manifest through a sibling temp file renamed into place.
    pub fn save(&self) -> Result<(), WorkshopError> {
        let rendered = self.document().to_json_pretty().map_err(|err| {
            WorkshopError::persist("serializing manifest", &self.file, io::Error::other(err))
        })?;

        let temp = self.temp_path();
        let written = write_synced(&temp, rendered.as_bytes())
            .and_then(|()| fs::rename(&temp, &self.file));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp);
            return Err(WorkshopError::persist("writing manifest", &self.file, err));
        }

        info!(
            manifest = %self.file.display(),
            packages = self.require.len(),
            "saved workshop manifest"
        );
        Ok(())
    }

    /// The serializable form: direct requirements first, then indirect ones,
    /// each group in discovery order.
    pub fn document(&self) -> ManifestDocument {
        let (direct, indirect): (Vec<&Package>, Vec<&Package>) =
            self.require.iter().partition(|package| !package.indirect);
        ManifestDocument {
            require: direct
                .into_iter()
                .chain(indirect)
                .map(Package::to_record)
                .collect(),
            replace: self.replace.clone(),
        }
    }

    pub fn to_value(&self) -> Value {
        let aliases = self
            .require
            .iter()
            .map(|package| (package.alias().to_string(), json!(package.unique_id())))
            .collect::<serde_json::Map<_, _>>();
        json!({
            "file": self.file.display().to_string(),
            "require": self.document().require,
            "replace": self.replace,
            "mapping": aliases,
        })
    }

    pub(crate) fn check_alias(&self, package: &Package) -> Result<(), WorkshopError> {
        let Some(position) = self.index.alias(package.alias()) else {
            return Ok(());
        };
        let existing = &self.require[position];
        if existing.unique_id() == package.unique_id() {
            return Ok(());
        }
        Err(WorkshopError::AliasCollision {
            alias: package.alias().to_string(),
            existing: existing.spec().to_string(),
            incoming: package.spec().to_string(),
        })
    }

    /// Marks `package` as replaced when a directive matches its logical path.
    pub(crate) fn apply_replace(&self, package: &mut Package) -> Result<(), WorkshopError> {
        let logical = package.logical_path();
        let Some(configured) = self.replace.get(&logical) else {
            return Ok(());
        };

        let local_path = self.resolve_replace_target(&logical, configured)?;
        debug!(package = %package, local = %local_path.display(), "applied replace directive");
        package.replaced = true;
        package.local_path = Some(local_path);
        Ok(())
    }

    fn resolve_replace_target(
        &self,
        logical: &str,
        configured: &str,
    ) -> Result<PathBuf, WorkshopError> {
        let configured = Path::new(configured);
        let joined = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(configured)
        };

        let inspect_failed = |source: io::Error| {
            if source.kind() == io::ErrorKind::NotFound {
                WorkshopError::ReplaceTargetMissing {
                    package: logical.to_string(),
                    path: joined.clone(),
                    source,
                }
            } else {
                WorkshopError::persist("inspecting replace target", &joined, source)
            }
        };
        let metadata = fs::metadata(&joined).map_err(inspect_failed)?;
        if !metadata.is_dir() || !joined.join(APP_MARKER_FILE).is_file() {
            return Err(WorkshopError::ReplaceTargetInvalid {
                package: logical.to_string(),
                path: joined.clone(),
                marker: APP_MARKER_FILE,
            });
        }

        fs::canonicalize(&joined).map_err(inspect_failed)
    }

    pub(crate) fn push(&mut self, package: Package) -> usize {
        let position = self.require.len();
        self.index.insert(&package, position);
        self.require.push(package);
        position
    }

    fn rollback(&mut self, checkpoint: usize) {
        if self.require.len() == checkpoint {
            return;
        }
        debug!(
            discarded = self.require.len() - checkpoint,
            "rolling back partially resolved packages"
        );
        self.require.truncate(checkpoint);
        self.index.clear();
        for (position, package) in self.require.iter().enumerate() {
            self.index.insert(package, position);
        }
    }

    fn temp_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut raw = self.file.as_os_str().to_owned();
        raw.push(format!(".tmp-{}-{nanos}", std::process::id()));
        PathBuf::from(raw)
    }
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}
