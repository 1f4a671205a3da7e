//! Views derived from a release snapshot

use semver::Version;
use serde::Serialize;
use thiserror::Error;

use crate::release::semver::{canonical_version, parse_version};
use crate::release::types::{ReleaseRecord, ReleaseSnapshot};

/// Reserved version name resolving to the highest release
pub const LATEST_ALIAS: &str = "latest";

/// Text used for releases published without release notes
pub const MISSING_CHANGELOG_NOTICE: &str =
    "Changelogs appear to be missing for this release. Please check the release page for details.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

/// Validate a caller-supplied version before any snapshot is read
pub fn parse_current(current: &str) -> Result<Version, QueryError> {
    parse_version(current).ok_or_else(|| QueryError::InvalidVersion(current.to_string()))
}

/// The release with the highest semantic version
pub fn latest(snapshot: &ReleaseSnapshot) -> Option<&ReleaseRecord> {
    snapshot
        .versions()
        .filter_map(|v| parse_version(v).map(|parsed| (parsed, v)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .and_then(|(_, v)| snapshot.get(v))
}

/// Exact lookup; `latest` is an alias for [`latest`], and a leading `v` is ignored
pub fn by_version<'a>(snapshot: &'a ReleaseSnapshot, version: &str) -> Option<&'a ReleaseRecord> {
    if version.eq_ignore_ascii_case(LATEST_ALIAS) {
        return latest(snapshot);
    }

    snapshot
        .get(version)
        .or_else(|| canonical_version(version).and_then(|v| snapshot.get(&v)))
}

pub fn count(snapshot: &ReleaseSnapshot) -> usize {
    snapshot.len()
}

/// Release notes for every version newer than the caller's
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Changelog {
    pub current_version: String,
    /// Included versions, highest first
    pub versions: Vec<String>,
    pub changelog: String,
}

/// Assemble release notes for all versions strictly greater than `current`
///
/// Walks the snapshot from the highest version down and stops at the first
/// version not greater than `current`.
pub fn changelog_since(snapshot: &ReleaseSnapshot, current: &Version) -> Changelog {
    let mut versions = Vec::new();
    let mut sections = Vec::new();

    for record in snapshot.sorted_descending() {
        let Some(version) = parse_version(&record.version) else {
            continue;
        };
        if version <= *current {
            break;
        }

        let notes = record.changelog.trim();
        sections.push(if notes.is_empty() {
            format!("## {}\n\n{}", record.version, MISSING_CHANGELOG_NOTICE)
        } else {
            notes.to_string()
        });
        versions.push(record.version.clone());
    }

    Changelog {
        current_version: current.to_string(),
        versions,
        changelog: sections.join("\n\n"),
    }
}

/// Support status of a client's installed version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Installed version is the latest release
    Latest,
    /// A newer release exists
    Outdated,
    /// Installed version is newer than any release (pre-release or development build)
    Newer,
    /// Installed version was never released
    NotFound,
    /// No releases are known
    NoReleases,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCompareResult {
    pub current_version: String,
    pub latest_version: Option<String>,
    pub status: VersionStatus,
}

/// Compare an installed version against the snapshot
pub fn status(snapshot: &ReleaseSnapshot, current: &Version) -> VersionCompareResult {
    let current_version = current.to_string();

    let Some(latest) = latest(snapshot) else {
        return VersionCompareResult {
            current_version,
            latest_version: None,
            status: VersionStatus::NoReleases,
        };
    };

    let latest_parsed = parse_version(&latest.version);
    let status = match latest_parsed.as_ref() {
        Some(latest) if current > latest => VersionStatus::Newer,
        _ if snapshot.get(&current_version).is_none() => VersionStatus::NotFound,
        Some(latest) if current == latest => VersionStatus::Latest,
        _ => VersionStatus::Outdated,
    };

    VersionCompareResult {
        current_version,
        latest_version: Some(latest.version.clone()),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snapshot(entries: &[(&str, &str)]) -> ReleaseSnapshot {
        entries
            .iter()
            .map(|(version, changelog)| ReleaseRecord {
                version: version.to_string(),
                released_at: None,
                minimum_runtime_version: String::new(),
                download_url: format!("https://dl.example.com/{version}"),
                size_bytes: 1,
                is_prerelease: version.contains('-'),
                upstream_id: 1,
                changelog: changelog.to_string(),
            })
            .collect()
    }

    fn versions(entries: &[&str]) -> ReleaseSnapshot {
        snapshot(&entries.iter().map(|v| (*v, "")).collect::<Vec<_>>())
    }

    #[rstest]
    #[case(&["0.5.0", "0.5.1", "0.6.0"], Some("0.6.0"))]
    #[case(&["0.9.0", "0.10.0", "0.2.0"], Some("0.10.0"))]
    #[case(&["1.0.0-rc.1", "0.9.9"], Some("1.0.0-rc.1"))]
    #[case(&["1.0.0", "1.0.0-rc.1"], Some("1.0.0"))]
    #[case(&[], None)]
    fn latest_returns_highest_semver(#[case] entries: &[&str], #[case] expected: Option<&str>) {
        let snapshot = versions(entries);
        assert_eq!(latest(&snapshot).map(|r| r.version.as_str()), expected);
    }

    #[rstest]
    #[case("0.5.1", Some("0.5.1"))]
    #[case("v0.5.1", Some("0.5.1"))]
    #[case("latest", Some("0.6.0"))]
    #[case("LATEST", Some("0.6.0"))]
    #[case("0.7.0", None)]
    #[case("garbage", None)]
    fn by_version_resolves_exact_and_alias(#[case] query: &str, #[case] expected: Option<&str>) {
        let snapshot = versions(&["0.5.0", "0.5.1", "0.6.0"]);
        assert_eq!(
            by_version(&snapshot, query).map(|r| r.version.as_str()),
            expected
        );
    }

    #[test]
    fn changelog_since_collects_newer_versions_highest_first() {
        let snapshot = snapshot(&[
            ("0.5.0", "## 0.5.0\n- first"),
            ("0.5.1", "## 0.5.1\n- second"),
            ("0.5.2", "## 0.5.2\n- third"),
            ("0.6.0", "## 0.6.0\n- fourth"),
        ]);

        let result = changelog_since(&snapshot, &parse_current("0.5.0").unwrap());

        assert_eq!(result.versions, vec!["0.6.0", "0.5.2", "0.5.1"]);
        assert_eq!(
            result.changelog,
            "## 0.6.0\n- fourth\n\n## 0.5.2\n- third\n\n## 0.5.1\n- second"
        );
        assert!(!result.changelog.contains("first"));
    }

    #[test]
    fn changelog_since_substitutes_placeholder_for_missing_notes() {
        let snapshot = snapshot(&[("1.0.0", ""), ("1.1.0", "   "), ("1.2.0", "- shiny")]);

        let result = changelog_since(&snapshot, &parse_current("1.0.0").unwrap());

        assert_eq!(
            result.changelog,
            format!("- shiny\n\n## 1.1.0\n\n{}", MISSING_CHANGELOG_NOTICE)
        );
    }

    #[test]
    fn changelog_since_latest_version_is_empty() {
        let snapshot = versions(&["1.0.0", "1.1.0"]);

        let result = changelog_since(&snapshot, &parse_current("1.1.0").unwrap());

        assert!(result.versions.is_empty());
        assert!(result.changelog.is_empty());
    }

    #[test]
    fn changelog_since_accepts_unreleased_current_version() {
        let snapshot = versions(&["1.0.0", "1.2.0"]);

        let result = changelog_since(&snapshot, &parse_current("v1.1.5").unwrap());

        assert_eq!(result.current_version, "1.1.5");
        assert_eq!(result.versions, vec!["1.2.0"]);
    }

    #[rstest]
    #[case("not-a-version")]
    #[case("1.2")]
    #[case("")]
    fn parse_current_rejects_invalid_versions(#[case] input: &str) {
        assert_eq!(
            parse_current(input),
            Err(QueryError::InvalidVersion(input.to_string()))
        );
    }

    #[test]
    fn count_returns_snapshot_size() {
        assert_eq!(count(&versions(&["1.0.0", "1.0.1", "2.0.0"])), 3);
        assert_eq!(count(&ReleaseSnapshot::new()), 0);
    }

    #[rstest]
    #[case("0.6.0", VersionStatus::Latest)]
    #[case("0.5.0", VersionStatus::Outdated)]
    #[case("0.7.0", VersionStatus::Newer)]
    #[case("0.5.5", VersionStatus::NotFound)]
    fn status_classifies_installed_version(#[case] current: &str, #[case] expected: VersionStatus) {
        let snapshot = versions(&["0.5.0", "0.5.1", "0.6.0"]);

        let result = status(&snapshot, &parse_current(current).unwrap());

        assert_eq!(result.current_version, current);
        assert_eq!(result.latest_version.as_deref(), Some("0.6.0"));
        assert_eq!(result.status, expected);
    }

    #[test]
    fn status_reports_no_releases_for_empty_snapshot() {
        let result = status(&ReleaseSnapshot::new(), &parse_current("1.0.0").unwrap());

        assert_eq!(
            result,
            VersionCompareResult {
                current_version: "1.0.0".to_string(),
                latest_version: None,
                status: VersionStatus::NoReleases,
            }
        );
    }
}
