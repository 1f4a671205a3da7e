use semver::Version;

/// Parse a release tag as a strict semantic version.
///
/// A single leading `v` is accepted ("v1.2.3"); partial versions such as "1.2"
/// are rejected, since a tag that is not a full version never becomes a release.
pub fn parse_version(tag: &str) -> Option<Version> {
    let trimmed = tag.trim();
    let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(stripped).ok()
}

/// Canonical string form of a tag ("v1.2.3" -> "1.2.3"), or None when invalid
pub fn canonical_version(tag: &str) -> Option<String> {
    parse_version(tag).map(|v| v.to_string())
}

/// Sort pairs by version, highest first
pub fn sort_descending<T>(entries: &mut [(Version, T)]) {
    entries.sort_by(|(a, _), (b, _)| b.cmp(a));
}
