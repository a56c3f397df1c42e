use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use dslpack_core::{
    HostOptions, ManifestDocument, PackageRecord, APP_MARKER_FILE, MANIFEST_FILE_NAME,
};
use tempfile::TempDir;

use super::*;

#[derive(Default)]
struct FakeSource {
    releases: HashMap<String, String>,
    dependencies: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    unlistable: HashSet<String>,
    chain_length: Option<usize>,
    fetched: RefCell<Vec<String>>,
}

impl FakeSource {
    fn with_release(mut self, address: &str, tag: &str) -> Self {
        self.releases.insert(address.to_string(), tag.to_string());
        self
    }

    fn with_dependencies(mut self, unique_id: &str, dependencies: &[&str]) -> Self {
        self.dependencies.insert(
            unique_id.to_string(),
            dependencies.iter().map(|spec| spec.to_string()).collect(),
        );
        self
    }

    fn failing_on(mut self, unique_id: &str) -> Self {
        self.failing.insert(unique_id.to_string());
        self
    }

    fn unlistable(mut self, unique_id: &str) -> Self {
        self.unlistable.insert(unique_id.to_string());
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl PackageSource for FakeSource {
    fn latest_release(&self, address: &str, _options: &HostOptions) -> Result<String> {
        self.releases
            .get(address)
            .cloned()
            .ok_or_else(|| anyhow!("no releases published for {address}"))
    }

    fn fetch(
        &self,
        package: &Package,
        request: &FetchRequest,
        progress: &mut Progress<'_>,
    ) -> Result<PathBuf> {
        if self.failing.contains(package.unique_id()) {
            bail!("network unreachable");
        }
        self.fetched
            .borrow_mut()
            .push(package.unique_id().to_string());
        progress(1, package, "fetched");
        Ok(request
            .packages_dir
            .join(package.unique_id().replace(['/', '@'], "_")))
    }

    fn dependencies(&self, package: &Package, _materialized: &Path) -> Result<Vec<Package>> {
        if self.unlistable.contains(package.unique_id()) {
            bail!("package manifest is unreadable");
        }

        let mut specs = self
            .dependencies
            .get(package.unique_id())
            .cloned()
            .unwrap_or_default();
        if let Some(length) = self.chain_length {
            if package.address() == "host/org/chain" {
                let next = package.subpath().parse::<usize>()? + 1;
                if next < length {
                    specs.push(format!("host/org/chain/{next}@v1"));
                }
            }
        }

        specs
            .iter()
            .map(|spec| -> Result<Package> {
                let coordinate = PackageCoordinate::parse(spec)?;
                Ok(Package::new(spec, coordinate, None)?)
            })
            .collect()
    }
}

struct Fixture {
    _dir: TempDir,
    project: PathBuf,
    layout: WorkshopLayout,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let project = dir.path().join("project");
        fs::create_dir_all(&project).expect("must create project dir");
        let layout = WorkshopLayout::new(dir.path().join("state"));
        Self {
            _dir: dir,
            project,
            layout,
        }
    }

    fn open(&self) -> Workshop {
        Workshop::open(&self.project, self.layout.clone()).expect("workshop must open")
    }

    fn manifest_path(&self) -> PathBuf {
        self.project.join(MANIFEST_FILE_NAME)
    }

    fn write_manifest(&self, document: &ManifestDocument) {
        fs::write(
            self.manifest_path(),
            document.to_json_pretty().expect("document must render"),
        )
        .expect("must write manifest");
    }

    fn read_document(&self) -> ManifestDocument {
        let raw = fs::read(self.manifest_path()).expect("must read manifest");
        ManifestDocument::from_json_slice(&raw).expect("manifest must parse")
    }

    fn app_dir(&self, name: &str, with_marker: bool) -> PathBuf {
        let dir = self.project.parent().expect("parent").join(name);
        fs::create_dir_all(&dir).expect("must create app dir");
        if with_marker {
            fs::write(dir.join(APP_MARKER_FILE), "{}").expect("must write marker");
        }
        dir
    }
}

fn record(spec: &str, alias: &str, indirect: bool) -> PackageRecord {
    let coordinate = PackageCoordinate::parse(spec).expect("record spec must parse");
    PackageRecord {
        spec: spec.to_string(),
        alias: alias.to_string(),
        address: coordinate.address,
        subpath: coordinate.subpath,
        version: coordinate.version.expect("record spec must be pinned"),
        indirect,
    }
}

fn get(
    workshop: &mut Workshop,
    source: &FakeSource,
    spec: &str,
) -> Result<GetOutcome, WorkshopError> {
    workshop.get(source, spec, None, &mut |_, _, _| {})
}

fn unique_ids(workshop: &Workshop) -> Vec<&str> {
    workshop.packages().iter().map(Package::unique_id).collect()
}

#[test]
fn open_without_manifest_starts_empty() {
    let fixture = Fixture::new();
    let workshop = fixture.open();

    assert!(workshop.packages().is_empty());
    assert!(workshop.replace().is_empty());
    assert_eq!(workshop.file(), fixture.manifest_path());
    assert!(!fixture.manifest_path().exists());
}

#[test]
fn get_records_direct_package_and_saves() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();

    let mut messages = Vec::new();
    let outcome = workshop
        .get(&source, "github.com/acme/crm@v1.0.0", Some("crm"), &mut |total, package, message| {
            messages.push(format!("{total}:{}:{message}", package.alias()));
        })
        .expect("get must succeed");

    assert_eq!(outcome.status, GetStatus::Added);
    assert_eq!(outcome.added, vec!["github.com/acme/crm@v1.0.0"]);
    assert_eq!(messages, vec!["1:crm:fetched"]);
    assert!(workshop.has("crm"));
    assert!(workshop.has("github.com/acme/crm@v1.0.0"));

    let document = fixture.read_document();
    assert_eq!(
        document.require,
        vec![record("github.com/acme/crm@v1.0.0", "crm", false)]
    );
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn get_resolves_unpinned_spec_to_latest_release() {
    let fixture = Fixture::new();
    let source = FakeSource::default().with_release("github.com/acme/crm", "v2.3.0");
    let mut workshop = fixture.open();

    let outcome = get(&mut workshop, &source, "github.com/acme/crm").expect("get must succeed");

    assert_eq!(outcome.package.version(), "v2.3.0");
    assert_eq!(outcome.package.spec(), "github.com/acme/crm@v2.3.0");
    assert_eq!(outcome.package.alias(), "@acme/crm");
    assert_eq!(source.fetched(), vec!["github.com/acme/crm@v2.3.0"]);
}

#[test]
fn get_reports_release_lookup_failure() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();

    let err = get(&mut workshop, &source, "github.com/acme/unreleased").expect_err("must fail");
    assert!(matches!(err, WorkshopError::ReleaseLookup { .. }));
    assert!(workshop.packages().is_empty());
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn get_rejects_malformed_specs() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();

    for spec in ["onlyonesegment", "two/segments"] {
        let err = get(&mut workshop, &source, spec).expect_err("malformed spec must fail");
        assert!(matches!(err, WorkshopError::MalformedSpec { .. }));
    }
    assert!(source.fetched().is_empty());
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn closure_deduplicates_shared_dependency() {
    let fixture = Fixture::new();
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1.0.0", &["host/org/b@v1.0.0"])
        .with_dependencies("host/org/c@v1.0.0", &["host/org/b@v1.0.0"]);
    let mut workshop = fixture.open();

    get(&mut workshop, &source, "host/org/a@v1.0.0").expect("get a");
    let outcome = get(&mut workshop, &source, "host/org/c@v1.0.0").expect("get c");

    assert_eq!(outcome.added, vec!["host/org/c@v1.0.0"]);
    assert_eq!(
        unique_ids(&workshop),
        vec!["host/org/a@v1.0.0", "host/org/b@v1.0.0", "host/org/c@v1.0.0"]
    );
    let flags = workshop
        .packages()
        .iter()
        .map(|package| package.indirect)
        .collect::<Vec<_>>();
    assert_eq!(flags, vec![false, true, false]);
    assert_eq!(
        source.fetched(),
        vec!["host/org/a@v1.0.0", "host/org/b@v1.0.0", "host/org/c@v1.0.0"]
    );
}

#[test]
fn closure_walks_depth_first_in_declaration_order() {
    let fixture = Fixture::new();
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1", "host/org/c@v1"])
        .with_dependencies("host/org/b@v1", &["host/org/d@v1"]);
    let mut workshop = fixture.open();

    let outcome = get(&mut workshop, &source, "host/org/a@v1").expect("get a");

    assert_eq!(
        outcome.added,
        vec!["host/org/a@v1", "host/org/b@v1", "host/org/d@v1", "host/org/c@v1"]
    );
}

#[test]
fn closure_terminates_on_cycles() {
    let fixture = Fixture::new();
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1"])
        .with_dependencies("host/org/b@v1", &["host/org/a@v1"]);
    let mut workshop = fixture.open();

    get(&mut workshop, &source, "host/org/a@v1").expect("cycle must not error");

    assert_eq!(unique_ids(&workshop), vec!["host/org/a@v1", "host/org/b@v1"]);
    assert_eq!(source.fetched().len(), 2);
}

#[test]
fn closure_rejects_oversized_graphs() {
    let fixture = Fixture::new();
    let source = FakeSource {
        chain_length: Some(MAX_CLOSURE_PACKAGES + 10),
        ..FakeSource::default()
    };
    let mut workshop = fixture.open();

    let err = get(&mut workshop, &source, "host/org/chain/0@v1").expect_err("must hit the cap");

    assert!(matches!(
        err,
        WorkshopError::ClosureTooLarge { limit, .. } if limit == MAX_CLOSURE_PACKAGES
    ));
    assert!(workshop.packages().is_empty());
    assert!(!fixture.manifest_path().exists());
}

#[test]
fn get_known_package_is_a_no_op() {
    let fixture = Fixture::new();
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1"]);
    let mut workshop = fixture.open();

    get(&mut workshop, &source, "host/org/a@v1").expect("first get");
    let before = fs::read(fixture.manifest_path()).expect("manifest written");

    for spec in ["host/org/a@v1", "host/org/b@v1"] {
        let outcome = get(&mut workshop, &source, spec).expect("repeat get");
        assert_eq!(outcome.status, GetStatus::AlreadyPresent);
        assert!(outcome.added.is_empty());
    }

    assert_eq!(workshop.packages().len(), 2);
    assert_eq!(source.fetched().len(), 2);
    assert_eq!(fs::read(fixture.manifest_path()).expect("manifest"), before);
}

#[test]
fn fetch_failure_leaves_manifest_untouched() {
    let fixture = Fixture::new();
    fixture.write_manifest(&ManifestDocument {
        require: vec![record("host/org/x@v1", "x", false)],
        ..ManifestDocument::default()
    });
    let before = fs::read(fixture.manifest_path()).expect("manifest");

    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1"])
        .failing_on("host/org/b@v1");
    let mut workshop = fixture.open();

    let err = get(&mut workshop, &source, "host/org/a@v1").expect_err("fetch must fail");

    assert!(matches!(err, WorkshopError::FetchFailure { ref package, .. } if package == "host/org/b@v1"));
    assert_eq!(unique_ids(&workshop), vec!["host/org/x@v1"]);
    assert!(!workshop.has("host/org/a@v1"));
    assert!(!workshop.has("@org/a"));
    assert_eq!(fs::read(fixture.manifest_path()).expect("manifest"), before);
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn dependency_listing_failure_rolls_back() {
    let fixture = Fixture::new();
    let source = FakeSource::default().unlistable("host/org/a@v1");
    let mut workshop = fixture.open();

    let err = get(&mut workshop, &source, "host/org/a@v1").expect_err("listing must fail");

    assert!(matches!(err, WorkshopError::DependencyListing { .. }));
    assert!(workshop.packages().is_empty());
    assert!(!fixture.manifest_path().exists());
}

#[test]
fn held_lock_blocks_get_without_mutation() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();
    let held = WorkshopLock::acquire(&fixture.manifest_path()).expect("must take lock");

    let err = get(&mut workshop, &source, "host/org/a@v1").expect_err("lock must block");

    match err {
        WorkshopError::LockHeld { manifest, lock } => {
            assert_eq!(manifest, fixture.manifest_path());
            assert_eq!(lock, lock_path_for(&fixture.manifest_path()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(workshop.packages().is_empty());
    assert!(source.fetched().is_empty());
    assert!(!fixture.manifest_path().exists());
    assert!(WorkshopLock::is_locked(&fixture.manifest_path()));

    held.release().expect("must release");
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn lock_message_names_manifest_and_marker() {
    let fixture = Fixture::new();
    let _held = WorkshopLock::acquire(&fixture.manifest_path()).expect("must take lock");

    let err = WorkshopLock::acquire(&fixture.manifest_path()).expect_err("second acquire fails");
    let message = err.to_string();
    assert!(message.contains(&fixture.manifest_path().display().to_string()));
    assert!(message.contains(&format!("{}{LOCK_SUFFIX}", fixture.manifest_path().display())));
}

#[test]
fn lock_guard_releases_on_drop() {
    let fixture = Fixture::new();
    {
        let _guard = WorkshopLock::acquire(&fixture.manifest_path()).expect("must take lock");
        assert!(WorkshopLock::is_locked(&fixture.manifest_path()));
    }
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
}

#[test]
fn force_unlock_clears_stale_marker() {
    let fixture = Fixture::new();
    fs::write(lock_path_for(&fixture.manifest_path()), "4242\n").expect("must seed marker");

    assert!(WorkshopLock::force_unlock(&fixture.manifest_path()).expect("must unlock"));
    assert!(!WorkshopLock::is_locked(&fixture.manifest_path()));
    assert!(!WorkshopLock::force_unlock(&fixture.manifest_path()).expect("second unlock"));
}

#[test]
fn save_emits_direct_packages_before_indirect() {
    let fixture = Fixture::new();
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1"])
        .with_dependencies("host/org/c@v1", &["host/org/d@v1"]);
    let mut workshop = fixture.open();

    get(&mut workshop, &source, "host/org/a@v1").expect("get a");
    get(&mut workshop, &source, "host/org/c@v1").expect("get c");

    assert_eq!(
        unique_ids(&workshop),
        vec!["host/org/a@v1", "host/org/b@v1", "host/org/c@v1", "host/org/d@v1"]
    );
    let saved = fixture
        .read_document()
        .require
        .into_iter()
        .map(|record| (record.address, record.indirect))
        .collect::<Vec<_>>();
    assert_eq!(
        saved,
        vec![
            ("host/org/a".to_string(), false),
            ("host/org/c".to_string(), false),
            ("host/org/b".to_string(), true),
            ("host/org/d".to_string(), true),
        ]
    );
}

#[test]
fn save_of_opened_manifest_round_trips() {
    let fixture = Fixture::new();
    let app = fixture.app_dir("local-crm", true);
    let document = ManifestDocument {
        require: vec![
            record("github.com/acme/crm@v1.0.0", "crm", false),
            record("github.com/acme/wms/cloud@e86eab4c8490", "cloud", false),
            record("github.com/acme/base@v0.3.0", "@acme/base", true),
        ],
        replace: [("github.com/acme/crm".to_string(), app.display().to_string())]
            .into_iter()
            .collect(),
    };
    fixture.write_manifest(&document);
    let before = fs::read(fixture.manifest_path()).expect("manifest");

    let workshop = fixture.open();
    workshop.save().expect("save must succeed");

    assert_eq!(fixture.read_document(), document);
    assert_eq!(fs::read(fixture.manifest_path()).expect("manifest"), before);
}

#[test]
fn open_rejects_alias_collision() {
    let fixture = Fixture::new();
    fixture.write_manifest(&ManifestDocument {
        require: vec![
            record("host/org/a@v1", "shared", false),
            record("host/org/b@v1", "shared", false),
        ],
        ..ManifestDocument::default()
    });

    let err = Workshop::open(&fixture.project, fixture.layout.clone())
        .expect_err("alias collision must fail");
    match err {
        WorkshopError::AliasCollision {
            alias,
            existing,
            incoming,
        } => {
            assert_eq!(alias, "shared");
            assert_eq!(existing, "host/org/a@v1");
            assert_eq!(incoming, "host/org/b@v1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn open_ignores_duplicate_entries_of_same_package() {
    let fixture = Fixture::new();
    fixture.write_manifest(&ManifestDocument {
        require: vec![
            record("host/org/a@v1", "a", false),
            record("host/org/a@v1", "a", true),
        ],
        ..ManifestDocument::default()
    });

    let workshop = fixture.open();
    assert_eq!(unique_ids(&workshop), vec!["host/org/a@v1"]);
    assert!(!workshop.packages()[0].indirect);
}

#[test]
fn open_rejects_invalid_json() {
    let fixture = Fixture::new();
    fs::write(fixture.manifest_path(), "{ not json").expect("must write manifest");

    let err = Workshop::open(&fixture.project, fixture.layout.clone()).expect_err("must fail");
    assert!(matches!(err, WorkshopError::ManifestParse { .. }));
}

#[test]
fn open_rejects_manifest_that_is_not_an_object() {
    let fixture = Fixture::new();
    fs::write(fixture.manifest_path(), "[]").expect("must write manifest");

    let err = Workshop::open(&fixture.project, fixture.layout.clone()).expect_err("must fail");
    assert!(matches!(err, WorkshopError::ManifestParse { .. }));
    assert_eq!(
        fs::read_to_string(fixture.manifest_path()).expect("manifest"),
        "[]"
    );
}

#[test]
fn get_keeps_entries_saved_by_another_handle() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut first = fixture.open();
    let mut second = fixture.open();

    get(&mut first, &source, "host/org/a@v1").expect("first get");
    let outcome = get(&mut second, &source, "host/org/b@v1").expect("second get");

    assert_eq!(outcome.added, vec!["host/org/b@v1"]);
    assert_eq!(unique_ids(&second), vec!["host/org/a@v1", "host/org/b@v1"]);
    let saved = fixture
        .read_document()
        .require
        .into_iter()
        .map(|record| record.address)
        .collect::<Vec<_>>();
    assert_eq!(saved, vec!["host/org/a", "host/org/b"]);
}

#[test]
fn get_sees_package_added_by_another_handle() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut first = fixture.open();
    let mut second = fixture.open();

    get(&mut first, &source, "host/org/a@v1").expect("first get");
    let outcome = get(&mut second, &source, "host/org/a@v1").expect("second get");

    assert_eq!(outcome.status, GetStatus::AlreadyPresent);
    assert_eq!(source.fetched(), vec!["host/org/a@v1"]);
}

#[test]
fn get_rejects_alias_already_claimed() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();

    workshop
        .get(&source, "host/org/crm@v1", Some("crm"), &mut |_, _, _| {})
        .expect("first get");
    let err = workshop
        .get(&source, "host/org/crm@v2", Some("crm"), &mut |_, _, _| {})
        .expect_err("alias collision must fail");

    assert!(matches!(err, WorkshopError::AliasCollision { .. }));
    assert_eq!(unique_ids(&workshop), vec!["host/org/crm@v1"]);
    assert_eq!(source.fetched(), vec!["host/org/crm@v1"]);
}

#[test]
fn replace_resolves_relative_and_absolute_targets() {
    let fixture = Fixture::new();
    let relative_app = fixture.app_dir("relative-app", true);
    let absolute_app = fixture.app_dir("absolute-app", true);
    fixture.write_manifest(&ManifestDocument {
        require: vec![
            record("host/org/a@v1", "a", false),
            record("host/org/mono/b@v1", "b", false),
            record("host/org/c@v1", "c", false),
        ],
        replace: [
            ("host/org/a".to_string(), "../relative-app".to_string()),
            (
                "host/org/mono/b".to_string(),
                absolute_app.display().to_string(),
            ),
        ]
        .into_iter()
        .collect(),
    });

    let workshop = fixture.open();

    let a = workshop.package("a").expect("a indexed");
    assert!(a.replaced);
    let a_path = a.local_path.as_deref().expect("a local path");
    assert!(a_path.is_absolute());
    assert_eq!(a_path, fs::canonicalize(&relative_app).expect("canonical"));

    let b = workshop.package("b").expect("b indexed");
    assert!(b.replaced);
    assert_eq!(
        b.local_path.as_deref(),
        Some(fs::canonicalize(&absolute_app).expect("canonical").as_path())
    );

    let c = workshop.package("c").expect("c indexed");
    assert!(!c.replaced);
    assert!(c.local_path.is_none());
}

#[test]
fn replace_reports_missing_directory() {
    let fixture = Fixture::new();
    fixture.write_manifest(&ManifestDocument {
        require: vec![record("host/org/a@v1", "a", false)],
        replace: [("host/org/a".to_string(), "../nowhere".to_string())]
            .into_iter()
            .collect(),
    });

    let err = Workshop::open(&fixture.project, fixture.layout.clone()).expect_err("must fail");
    assert!(matches!(err, WorkshopError::ReplaceTargetMissing { .. }));
}

#[cfg(unix)]
#[test]
fn replace_reports_unreadable_target_as_persist_failure() {
    let fixture = Fixture::new();
    let blocker = fixture.project.parent().expect("parent").join("plain-file");
    fs::write(&blocker, "not a directory").expect("must write file");
    fixture.write_manifest(&ManifestDocument {
        require: vec![record("host/org/a@v1", "a", false)],
        replace: [("host/org/a".to_string(), "../plain-file/app".to_string())]
            .into_iter()
            .collect(),
    });

    let err = Workshop::open(&fixture.project, fixture.layout.clone()).expect_err("must fail");
    assert!(
        matches!(err, WorkshopError::PersistFailure { action, .. } if action == "inspecting replace target"),
        "unexpected error: {err}"
    );
}

#[test]
fn replace_reports_directory_without_marker() {
    let fixture = Fixture::new();
    fixture.app_dir("not-an-app", false);
    fixture.write_manifest(&ManifestDocument {
        require: vec![record("host/org/a@v1", "a", false)],
        replace: [("host/org/a".to_string(), "../not-an-app".to_string())]
            .into_iter()
            .collect(),
    });

    let err = Workshop::open(&fixture.project, fixture.layout.clone()).expect_err("must fail");
    assert!(matches!(
        err,
        WorkshopError::ReplaceTargetInvalid { marker, .. } if marker == APP_MARKER_FILE
    ));
}

#[test]
fn replaced_package_is_not_fetched_from_source() {
    let fixture = Fixture::new();
    let app = fixture.app_dir("local-b", true);
    let source = FakeSource::default()
        .with_dependencies("host/org/a@v1", &["host/org/b@v1"]);
    let mut workshop = fixture.open();
    workshop.set_replace("host/org/b", app.display().to_string());

    let mut local_messages = 0;
    workshop
        .get(&source, "host/org/a@v1", None, &mut |_, _, message| {
            if message == "using local replacement" {
                local_messages += 1;
            }
        })
        .expect("get must succeed");

    assert_eq!(source.fetched(), vec!["host/org/a@v1"]);
    assert_eq!(local_messages, 1);
    let b = workshop.package("host/org/b@v1").expect("b recorded");
    assert!(b.replaced && b.indirect);
    assert_eq!(fixture.read_document().replace.len(), 1);
}

#[test]
fn to_value_describes_manifest() {
    let fixture = Fixture::new();
    let source = FakeSource::default();
    let mut workshop = fixture.open();
    get(&mut workshop, &source, "host/org/a@v1").expect("get a");

    let value = workshop.to_value();
    assert_eq!(value["require"][0]["alias"], "@org/a");
    assert_eq!(value["mapping"]["@org/a"], "host/org/a@v1");
    assert!(value["file"]
        .as_str()
        .expect("file is a string")
        .ends_with(MANIFEST_FILE_NAME));
}

#[test]
fn layout_paths_hang_off_root() {
    let layout = WorkshopLayout::new("/tmp/dslpack-root");
    assert_eq!(layout.cache_dir(), PathBuf::from("/tmp/dslpack-root/cache"));
    assert_eq!(
        layout.packages_dir(),
        PathBuf::from("/tmp/dslpack-root/packages")
    );
    assert_eq!(
        layout.config_path(),
        PathBuf::from("/tmp/dslpack-root/config.toml")
    );
}
