//! GitHub REST API release source

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{FETCH_TIMEOUT_MS, RELEASES_PER_PAGE, UpstreamConfig};
use crate::release::error::{ClassifiedError, ErrorCode};
use crate::release::semver::parse_version;
use crate::release::source::{RawRelease, ReleaseSource};

/// Default base URL for GitHub API
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Releases at or above this version keep their manifest at the repository root
const ROOT_MANIFEST_SINCE: Version = Version::new(0, 5, 0);

const ROOT_MANIFEST_PATH: &str = "package.json";
const LEGACY_MANIFEST_PATH: &str = "app/package.json";

/// Response from the GitHub contents API
#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
}

/// Error body returned by GitHub on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Release source backed by the GitHub Releases and Contents APIs
pub struct GitHubReleaseSource {
    client: reqwest::Client,
    base_url: String,
    repository: String,
    runtime_dependency: String,
}

impl GitHubReleaseSource {
    /// Creates a new source for `owner/repo` against a custom base URL
    pub fn new(base_url: &str, repository: &str, runtime_dependency: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("release-gateway/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            runtime_dependency: runtime_dependency.to_string(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(
            &config.api_url,
            &config.repository,
            &config.runtime_dependency,
        )
    }

    fn get(&self, url: &str, auth_token: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");

        if auth_token.is_empty() {
            request
        } else {
            request.bearer_auth(auth_token)
        }
    }

    async fn send(&self, url: &str, auth_token: &str) -> Result<String, ClassifiedError> {
        let response = self
            .get(url, auth_token)
            .send()
            .await
            .map_err(|e| ClassifiedError::from_transport(&e, url))?;

        let status = response.status();

        if !status.is_success() {
            if let Some(retry_after) = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
            {
                warn!("GitHub API asked to retry after {}s: {}", retry_after, url);
            }

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("Unexpected status: {}", status));

            let error = ClassifiedError::classify(message, Some(status.as_u16()), url);
            warn!("GitHub API returned status {}: {}", status, error);
            return Err(error);
        }

        response
            .text()
            .await
            .map_err(|e| ClassifiedError::from_transport(&e, url))
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHubReleaseSource {
    async fn fetch_releases(&self, auth_token: &str) -> Result<Vec<RawRelease>, ClassifiedError> {
        let url = format!(
            "{}/repos/{}/releases?per_page={}",
            self.base_url, self.repository, RELEASES_PER_PAGE
        );

        let body = self.send(&url, auth_token).await?;

        serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse GitHub releases response: {}", e);
            ClassifiedError::classify(
                format!("invalid release list json: {}", e),
                None,
                url.as_str(),
            )
        })
    }

    async fn fetch_minimum_runtime_version(
        &self,
        auth_token: &str,
        tag: &str,
    ) -> Result<String, ClassifiedError> {
        let url = format!(
            "{}/repos/{}/contents/{}?ref={}",
            self.base_url,
            self.repository,
            manifest_path(tag),
            tag.replace('+', "%2B")
        );

        let body = self.send(&url, auth_token).await?;
        let version = extract_runtime_version(&body, &self.runtime_dependency);

        if version.is_empty() {
            debug!(
                "No {} dependency resolved for {}",
                self.runtime_dependency, tag
            );
        }

        Ok(version)
    }
}

/// Manifest location for a release; older releases nest it under `app/`
pub fn manifest_path(tag: &str) -> &'static str {
    match parse_version(tag) {
        Some(version) if version < ROOT_MANIFEST_SINCE => LEGACY_MANIFEST_PATH,
        _ => ROOT_MANIFEST_PATH,
    }
}

/// Pull the dependency constraint out of a contents API response.
/// Any decode or lookup failure yields an empty string.
fn extract_runtime_version(body: &str, dependency: &str) -> String {
    let Ok(response) = serde_json::from_str::<ContentResponse>(body) else {
        return String::new();
    };

    let encoded: String = response
        .content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let Some(manifest) = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
    else {
        return String::new();
    };

    ["dependencies", "devDependencies"]
        .iter()
        .find_map(|section| manifest.get(section)?.get(dependency)?.as_str())
        .map(strip_constraint)
        .unwrap_or_default()
}

/// Strip leading `^` / `>=` markers and whitespace from a dependency constraint
fn strip_constraint(constraint: &str) -> String {
    let mut rest = constraint.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix('^') {
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix(">=") {
            rest = stripped.trim_start();
        } else {
            break;
        }
    }
    rest.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    const REPO: &str = "acme/billing";

    fn contents_body(manifest: &str) -> String {
        let encoded = STANDARD.encode(manifest);
        // GitHub wraps base64 content at 60 characters
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::json!({ "content": wrapped, "encoding": "base64" }).to_string()
    }

    #[tokio::test]
    async fn fetch_releases_parses_release_list_with_auth_header() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {
                        "id": 101,
                        "tag_name": "v0.6.0",
                        "published_at": "2024-05-01T10:00:00Z",
                        "prerelease": false,
                        "body": "- new invoices view",
                        "assets": [
                            {"name": "Billing-Setup.exe", "browser_download_url": "https://dl/0.6.0.exe", "size": 1024}
                        ]
                    },
                    {"id": 100, "tag_name": "v0.5.0", "published_at": null, "assets": []}
                ]"#,
            )
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let releases = source.fetch_releases("secret-token").await.unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag_name, "v0.6.0");
        assert_eq!(releases[0].assets[0].size, 1024);
        assert_eq!(releases[0].body.as_deref(), Some("- new invoices view"));
        assert_eq!(releases[1].published_at, None);
        assert!(releases[1].assets.is_empty());
    }

    #[rstest]
    #[case(401, r#"{"message": "Bad credentials"}"#, ErrorCode::AuthError)]
    #[case(403, r#"{"message": "API rate limit exceeded"}"#, ErrorCode::RateLimitError)]
    #[case(429, r#"{"message": "Too Many Requests"}"#, ErrorCode::RateLimitError)]
    #[case(404, r#"{"message": "Not Found"}"#, ErrorCode::NotFoundError)]
    #[case(502, "<html>bad gateway</html>", ErrorCode::UnknownError)]
    #[tokio::test]
    async fn fetch_releases_classifies_http_failures(
        #[case] status: usize,
        #[case] body: &str,
        #[case] expected: ErrorCode,
    ) {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/releases")
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("retry-after", "60")
            .with_body(body)
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let error = source.fetch_releases("token").await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(error.code, expected);
        assert_eq!(error.status, Some(status as u16));
        assert!(error.url.ends_with("/repos/acme/billing/releases?per_page=100"));
    }

    #[tokio::test]
    async fn fetch_releases_rejects_non_array_payload_as_validation_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/releases")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Moved Permanently"}"#)
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let error = source.fetch_releases("token").await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(error.code, ErrorCode::ValidationError);
        assert_eq!(error.status, None);
    }

    #[tokio::test]
    async fn fetch_releases_classifies_connection_failure_as_network_error() {
        let source = GitHubReleaseSource::new("http://127.0.0.1:1", REPO, "electron");

        let error = source.fetch_releases("token").await.unwrap_err();

        assert_eq!(error.code, ErrorCode::NetworkError);
    }

    #[tokio::test]
    async fn fetch_minimum_runtime_version_reads_root_manifest_for_new_releases() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/contents/package.json")
            .match_query(Matcher::UrlEncoded("ref".into(), "v0.6.0".into()))
            .with_status(200)
            .with_body(contents_body(
                r#"{"name": "billing", "devDependencies": {"electron": "^28.2.1"}}"#,
            ))
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let version = source
            .fetch_minimum_runtime_version("token", "v0.6.0")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(version, "28.2.1");
    }

    #[tokio::test]
    async fn fetch_minimum_runtime_version_reads_legacy_manifest_for_old_releases() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/contents/app/package.json")
            .match_query(Matcher::UrlEncoded("ref".into(), "v0.4.2".into()))
            .with_status(200)
            .with_body(contents_body(
                r#"{"dependencies": {"electron": ">= 9.0.0"}}"#,
            ))
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let version = source
            .fetch_minimum_runtime_version("token", "v0.4.2")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(version, "9.0.0");
    }

    #[tokio::test]
    async fn fetch_minimum_runtime_version_returns_not_found_error_for_missing_manifest() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/acme/billing/contents/package.json")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let source = GitHubReleaseSource::new(&server.url(), REPO, "electron");
        let error = source
            .fetch_minimum_runtime_version("token", "1.0.0")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(error.code, ErrorCode::NotFoundError);
    }

    #[rstest]
    #[case("0.4.9", LEGACY_MANIFEST_PATH)]
    #[case("v0.4.9", LEGACY_MANIFEST_PATH)]
    #[case("0.5.0-beta.1", LEGACY_MANIFEST_PATH)]
    #[case("0.5.0", ROOT_MANIFEST_PATH)]
    #[case("v1.2.0", ROOT_MANIFEST_PATH)]
    fn manifest_path_branches_on_threshold(#[case] tag: &str, #[case] expected: &str) {
        assert_eq!(manifest_path(tag), expected);
    }

    #[rstest]
    #[case(r#"{"dependencies": {"electron": "^ 30.0.1 "}}"#, "30.0.1")]
    #[case(r#"{"dependencies": {"electron": "27.0.0"}}"#, "27.0.0")]
    #[case(r#"{"dependencies": {"react": "18.0.0"}}"#, "")]
    #[case(r#"{"dependencies": {"electron": 28}}"#, "")]
    #[case("not json at all", "")]
    fn extract_runtime_version_is_best_effort(#[case] manifest: &str, #[case] expected: &str) {
        assert_eq!(
            extract_runtime_version(&contents_body(manifest), "electron"),
            expected
        );
    }

    #[test]
    fn extract_runtime_version_returns_empty_for_invalid_base64() {
        let body = r#"{"content": "!!!not base64!!!"}"#;
        assert_eq!(extract_runtime_version(body, "electron"), "");
    }

    #[test]
    fn extract_runtime_version_returns_empty_when_content_field_missing() {
        assert_eq!(extract_runtime_version(r#"{"sha": "abc"}"#, "electron"), "");
    }
}
