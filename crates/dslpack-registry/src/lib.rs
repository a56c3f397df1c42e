mod git_ops;
mod git_source;
mod releases;

pub use git_source::{credential_config, repository_url, GitPackageSource};
pub use releases::{parse_ls_remote_tags, select_latest_release};
