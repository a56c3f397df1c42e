use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dslpack_core::{HostOptions, ManifestDocument, Package, Protocol, MANIFEST_FILE_NAME};
use dslpack_workshop::{FetchRequest, PackageSource, Progress};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::git_ops::{git_output, run_git_clone, run_git_command};
use crate::releases::{parse_ls_remote_tags, select_latest_release};

const FETCH_STEPS: u64 = 3;

/// [`PackageSource`] backed by the system `git` binary.
///
/// Repositories are mirrored once per address under the cache directory and
/// each pinned version is checked out into its own directory under the
/// packages directory, so repeated fetches of the same version are free.
#[derive(Debug, Clone, Default)]
pub struct GitPackageSource;

impl GitPackageSource {
    pub fn new() -> Self {
        Self
    }
}

impl PackageSource for GitPackageSource {
    fn latest_release(&self, address: &str, options: &HostOptions) -> Result<String> {
        let url = repository_url(address, options)?;
        let output = git_output(
            None,
            &credential_config(options),
            &["ls-remote", "--tags", "--refs", &url],
            address,
        )?;
        let tags = parse_ls_remote_tags(&output);
        debug!(address, tags = tags.len(), "listed release tags");
        select_latest_release(&tags)
            .ok_or_else(|| anyhow!("'{address}' has no semantic version release tags"))
    }

    fn fetch(
        &self,
        package: &Package,
        request: &FetchRequest,
        progress: &mut Progress<'_>,
    ) -> Result<PathBuf> {
        let checkout = checkout_dir(&request.packages_dir, package);
        if !checkout.is_dir() {
            let url = repository_url(package.address(), &request.options)?;
            let mirror = request.cache_dir.join(mirror_dir_name(package.address()));

            progress(FETCH_STEPS, package, "syncing mirror");
            sync_mirror(
                &url,
                &mirror,
                &credential_config(&request.options),
                package.address(),
            )?;

            progress(FETCH_STEPS, package, "checking out");
            checkout_version(&mirror, &checkout, package)?;
        }
        progress(FETCH_STEPS, package, "ready");

        if package.subpath().is_empty() {
            return Ok(checkout);
        }
        let nested = checkout.join(package.subpath());
        if !nested.is_dir() {
            anyhow::bail!(
                "'{}' has no directory '{}' at {}",
                package.address(),
                package.subpath(),
                package.version()
            );
        }
        Ok(nested)
    }

    fn dependencies(&self, package: &Package, materialized: &Path) -> Result<Vec<Package>> {
        let path = materialized.join(MANIFEST_FILE_NAME);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading {}", path.display()));
            }
        };
        let document = ManifestDocument::from_json_slice(&raw).with_context(|| {
            format!("'{}' ships an invalid {}", package, MANIFEST_FILE_NAME)
        })?;

        document
            .require
            .iter()
            .filter(|record| !record.indirect)
            .map(|record| {
                Package::from_record(record).with_context(|| {
                    format!("'{}' declares an invalid dependency '{}'", package, record.spec)
                })
            })
            .collect()
    }
}

/// Builds the clone URL for `address` (`<host>/<org>/<repo>`). The URL never
/// carries a token; see [`credential_config`].
pub fn repository_url(address: &str, options: &HostOptions) -> Result<String> {
    let (host, path) = address
        .split_once('/')
        .ok_or_else(|| anyhow!("invalid repository address '{address}'"))?;

    if let Some(base_url) = options.base_url.as_deref() {
        return Ok(format!("{}/{}", base_url.trim_end_matches('/'), path));
    }

    match options.protocol {
        Protocol::Https => {
            let credentials = match (options.user.as_deref(), options.token.as_deref()) {
                (Some(user), None) => format!("{user}@"),
                _ => String::new(),
            };
            Ok(format!("https://{credentials}{host}/{path}.git"))
        }
        Protocol::Ssh => Ok(format!(
            "{}@{host}:{path}.git",
            options.user.as_deref().unwrap_or("git")
        )),
        Protocol::File => Err(anyhow!(
            "host '{host}' uses the file protocol but has no base_url configured"
        )),
    }
}

/// Per-invocation git config carrying the host token as an HTTP
/// `Authorization` header, so it is never written to a mirror's config.
pub fn credential_config(options: &HostOptions) -> Vec<String> {
    let Some(token) = options.token.as_deref() else {
        return Vec::new();
    };
    if options.protocol == Protocol::Ssh {
        return Vec::new();
    }
    let user = options.user.as_deref().unwrap_or("oauth2");
    let encoded = STANDARD.encode(format!("{user}:{token}"));
    vec![format!("http.extraHeader=Authorization: Basic {encoded}")]
}

pub(crate) fn mirror_dir_name(address: &str) -> String {
    let digest = hex::encode(Sha256::digest(address.as_bytes()));
    let repo = address.rsplit('/').next().unwrap_or(address);
    format!("{repo}-{}", &digest[..16])
}

fn checkout_dir(packages_dir: &Path, package: &Package) -> PathBuf {
    packages_dir.join(format!("{}@{}", package.address(), package.version()))
}

fn sync_mirror(url: &str, mirror: &Path, credentials: &[String], address: &str) -> Result<()> {
    if mirror.join("HEAD").is_file() {
        run_git_command(mirror, &[], &["remote", "set-url", "origin", url], address)?;
        return run_git_command(mirror, credentials, &["remote", "update", "--prune"], address);
    }

    if let Some(parent) = mirror.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let staging = sibling_staging_path(mirror);
    run_git_clone(url, &staging, credentials, &["--mirror"], address)?;
    fs::rename(&staging, mirror).with_context(|| {
        format!(
            "failed moving mirror {} into place at {}",
            staging.display(),
            mirror.display()
        )
    })
}

fn checkout_version(mirror: &Path, checkout: &Path, package: &Package) -> Result<()> {
    if let Some(parent) = checkout.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let staging = sibling_staging_path(checkout);
    let location = mirror.display().to_string();
    let result = run_git_clone(
        &location,
        &staging,
        &[],
        &["--no-checkout"],
        package.address(),
    )
    .and_then(|()| resolve_commit(&staging, package))
    .and_then(|commit| {
        run_git_command(
            &staging,
            &[],
            &["checkout", "--quiet", "--detach", &commit],
            package.address(),
        )
    })
    .and_then(|()| {
        fs::remove_dir_all(staging.join(".git")).with_context(|| {
            format!("failed removing git metadata from {}", staging.display())
        })
    })
    .and_then(|()| {
        fs::rename(&staging, checkout).with_context(|| {
            format!(
                "failed moving checkout {} into place at {}",
                staging.display(),
                checkout.display()
            )
        })
    });

    if result.is_err() && staging.exists() {
        let _ = fs::remove_dir_all(&staging);
    }
    result
}

/// Resolves the package version to a commit id, treating it strictly as a
/// revision and never as a command-line option.
fn resolve_commit(repo: &Path, package: &Package) -> Result<String> {
    let revision = format!("{}^{{commit}}", package.version());
    let output = git_output(
        Some(repo),
        &[],
        &["rev-parse", "--verify", "--quiet", "--end-of-options", &revision],
        package.address(),
    )
    .with_context(|| {
        format!(
            "'{}' has no release or commit '{}'",
            package.address(),
            package.version()
        )
    })?;
    let commit = output.trim();
    if commit.is_empty() || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!(
            "'{}' resolved '{}' to an unexpected revision '{commit}'",
            package.address(),
            package.version()
        );
    }
    Ok(commit.to_string())
}

fn sibling_staging_path(target: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut raw = target.as_os_str().to_owned();
    raw.push(format!(".staging-{}-{nanos}", std::process::id()));
    PathBuf::from(raw)
}
