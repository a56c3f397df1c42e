use semver::Version;

/// Extracts tag names from `git ls-remote --tags --refs` output.
pub fn parse_ls_remote_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .filter_map(|(_, reference)| reference.trim().strip_prefix("refs/tags/"))
        .map(|tag| tag.trim_end_matches("^{}").to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Picks the highest semver tag. Pre-releases are only considered when no
/// stable release exists. Tags may carry a leading `v`.
pub fn select_latest_release(tags: &[String]) -> Option<String> {
    let versioned = tags
        .iter()
        .filter_map(|tag| parse_release_tag(tag).map(|version| (version, tag)))
        .collect::<Vec<_>>();

    let stable = versioned
        .iter()
        .filter(|(version, _)| version.pre.is_empty())
        .max_by(|(left, _), (right, _)| left.cmp(right));
    stable
        .or_else(|| versioned.iter().max_by(|(left, _), (right, _)| left.cmp(right)))
        .map(|(_, tag)| (*tag).clone())
}

fn parse_release_tag(tag: &str) -> Option<Version> {
    let trimmed = tag
        .strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag);
    Version::parse(trimmed).ok()
}
