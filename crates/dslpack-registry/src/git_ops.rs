use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Builds a `git` invocation. `config` entries are passed as `-c` overrides
/// for this invocation only and never reach a repository's config file.
pub(crate) fn base_git_command(config: &[String]) -> Command {
    let mut command = Command::new("git");
    command
        .env("GIT_TERMINAL_PROMPT", "0")
        .arg("-c")
        .arg("core.autocrlf=false")
        .arg("-c")
        .arg("core.eol=lf");
    if cfg!(windows) {
        command.arg("-c").arg("core.longpaths=true");
    }
    for entry in config {
        command.arg("-c").arg(entry);
    }
    command
}

pub(crate) fn run_git_clone(
    location: &str,
    destination: &Path,
    config: &[String],
    extra_args: &[&str],
    address: &str,
) -> Result<()> {
    let output = base_git_command(config)
        .arg("clone")
        .arg("--quiet")
        .args(extra_args)
        .arg("--")
        .arg(location)
        .arg(destination)
        .output()
        .with_context(|| format!("fetch-failed: '{address}' failed launching git clone"))?;
    if !output.status.success() {
        anyhow::bail!(
            "fetch-failed: '{}' git clone failed: {}",
            address,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

pub(crate) fn run_git_command(
    repo_root: &Path,
    config: &[String],
    args: &[&str],
    address: &str,
) -> Result<()> {
    git_output(Some(repo_root), config, args, address).map(|_| ())
}

pub(crate) fn git_output(
    repo_root: Option<&Path>,
    config: &[String],
    args: &[&str],
    address: &str,
) -> Result<String> {
    let mut command = base_git_command(config);
    command.args(args);
    if let Some(repo_root) = repo_root {
        command.current_dir(repo_root);
    }

    let output = command.output().with_context(|| {
        format!(
            "fetch-failed: '{}' failed launching git {}",
            address,
            args.first().copied().unwrap_or_default()
        )
    })?;
    if !output.status.success() {
        anyhow::bail!(
            "fetch-failed: '{}' git {} failed: {}",
            address,
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("fetch-failed: '{address}' git produced non-UTF-8 output"))
}
