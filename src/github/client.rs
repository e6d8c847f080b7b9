//! GitHub API client wrapper using octocrab
//!
//! [`RemoteRepoClient`] is the seam between the upload pipeline and the
//! host: create a repository, look up a file's blob sha, and create or
//! update a file. [`GitHubClient`] implements it over octocrab.

use async_trait::async_trait;
use octocrab::Octocrab;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::config::DEFAULT_API_BASE;
use crate::error::{RepoError, Result, UploadError, Zip2RepoError};
use crate::github::error_handler::{classify_create_error, describe_github_error, is_not_found};

/// Allowed repository names
static REPO_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+$").expect("Invalid regex pattern for repository names")
});

/// Base used only to percent-encode route segments
static ROUTE_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://api.github.com/").expect("Invalid route base URL"));

/// Parameters for the repository to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Repository name (letters, numbers, hyphens, dots, underscores)
    pub name: String,
    /// Short description
    pub description: String,
    /// Create as private
    pub is_private: bool,
    /// Let GitHub create an initial README commit
    pub init_with_readme: bool,
}

impl RepoSpec {
    /// Public repository without README and description
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_private: false,
            init_with_readme: false,
        }
    }

    /// Check the name against GitHub's allowed characters
    pub fn validate(&self) -> Result<()> {
        if !REPO_NAME_PATTERN.is_match(&self.name) {
            return Err(Zip2RepoError::InvalidInput(format!(
                "Invalid repository name '{}'.\n\n  → Only letters, numbers, hyphens, dots, and underscores are allowed.",
                self.name
            )));
        }
        Ok(())
    }
}

/// The created repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    /// Owner login
    pub owner: String,
    /// Repository name as created
    pub name: String,
    /// Canonical web URL
    pub html_url: String,
}

impl RepoHandle {
    /// Get the full repository name (owner/name)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// An existing remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileRef {
    pub path: String,
    /// Blob sha guarding updates
    pub blob_sha: String,
}

/// Outcome of a create-or-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub path: String,
    /// New blob sha
    pub blob_sha: Option<String>,
    /// Commit created for this write
    pub commit_sha: Option<String>,
}

/// Host operations the upload pipeline depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteRepoClient: Send + Sync {
    /// Create a repository for the authenticated user
    async fn create_repository(&self, spec: &RepoSpec) -> std::result::Result<RepoHandle, RepoError>;

    /// Look up a file; `Ok(None)` means it does not exist yet
    async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> std::result::Result<Option<RemoteFileRef>, UploadError>;

    /// Create a file, or update the blob `existing_sha` when given
    async fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content_base64: &str,
        message: &str,
        existing_sha: Option<String>,
    ) -> std::result::Result<UploadResult, UploadError>;

    /// Login of the token's owner
    async fn authenticated_user(&self) -> Result<String>;
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Deserialize)]
struct CreatedRepository {
    name: String,
    html_url: String,
    owner: RepoOwner,
}

#[derive(Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Deserialize)]
struct AuthenticatedUser {
    login: String,
}

#[derive(Deserialize)]
struct ContentMetadata {
    path: String,
    sha: String,
}

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentResponse {
    #[serde(default)]
    content: Option<ContentMetadata>,
    #[serde(default)]
    commit: Option<CommitMetadata>,
}

#[derive(Deserialize)]
struct CommitMetadata {
    #[serde(default)]
    sha: Option<String>,
}

/// GitHub API client wrapper
///
/// The bearer token is bound at construction and never exposed again.
pub struct GitHubClient {
    /// The octocrab instance
    inner: Octocrab,
}

impl GitHubClient {
    /// Create a client for `api_base` authenticated with `token`
    pub fn new(token: &SecretString, api_base: &str) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.expose_secret().to_string());
        if api_base.trim_end_matches('/') != DEFAULT_API_BASE {
            builder = builder.base_uri(api_base)?;
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }
}

/// `/repos/{owner}/{repo}/contents/{path}` with each segment percent-encoded
fn contents_route(owner: &str, repo: &str, path: &str) -> String {
    let mut url = ROUTE_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear();
        segments.extend(["repos", owner, repo, "contents"]);
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
    }
    url.path().to_string()
}

#[async_trait]
impl RemoteRepoClient for GitHubClient {
    async fn create_repository(&self, spec: &RepoSpec) -> std::result::Result<RepoHandle, RepoError> {
        let request = CreateRepoRequest {
            name: &spec.name,
            description: &spec.description,
            private: spec.is_private,
            auto_init: spec.init_with_readme,
        };

        // GitHub API: POST /user/repos
        let created: CreatedRepository = self
            .inner
            .post("/user/repos", Some(&request))
            .await
            .map_err(|e| classify_create_error(&spec.name, e))?;

        tracing::debug!(repo = %created.name, "repository created");
        Ok(RepoHandle {
            owner: created.owner.login,
            name: created.name,
            html_url: created.html_url,
        })
    }

    async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> std::result::Result<Option<RemoteFileRef>, UploadError> {
        let route = contents_route(owner, repo, path);

        match self.inner.get::<ContentMetadata, _, _>(&route, None::<&()>).await {
            Ok(content) => Ok(Some(RemoteFileRef {
                path: content.path,
                blob_sha: content.sha,
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(UploadError::path_failed(path, describe_github_error(&e))),
        }
    }

    async fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content_base64: &str,
        message: &str,
        existing_sha: Option<String>,
    ) -> std::result::Result<UploadResult, UploadError> {
        let route = contents_route(owner, repo, path);
        let request = PutContentRequest {
            message,
            content: content_base64,
            sha: existing_sha.as_deref(),
        };

        // GitHub API: PUT /repos/{owner}/{repo}/contents/{path}
        let response: PutContentResponse = self
            .inner
            .put(&route, Some(&request))
            .await
            .map_err(|e| UploadError::path_failed(path, describe_github_error(&e)))?;

        Ok(UploadResult {
            path: path.to_string(),
            blob_sha: response.content.map(|c| c.sha),
            commit_sha: response.commit.and_then(|c| c.sha),
        })
    }

    async fn authenticated_user(&self) -> Result<String> {
        // GitHub API: GET /user
        let user: AuthenticatedUser = self.inner.get("/user", None::<&()>).await?;
        Ok(user.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&SecretString::from("gho_test"), &server.uri()).unwrap()
    }

    #[test]
    fn test_repo_name_validation() {
        assert!(RepoSpec::new("awesome-project").validate().is_ok());
        assert!(RepoSpec::new("my_repo.v2").validate().is_ok());
        assert!(RepoSpec::new("").validate().is_err());
        assert!(RepoSpec::new("has space").validate().is_err());
        assert!(RepoSpec::new("slash/name").validate().is_err());
    }

    #[test]
    fn test_contents_route_encodes_segments() {
        assert_eq!(
            contents_route("octo", "demo", "src/main.rs"),
            "/repos/octo/demo/contents/src/main.rs"
        );
        assert_eq!(
            contents_route("octo", "demo", "docs/read me#1.md"),
            "/repos/octo/demo/contents/docs/read%20me%231.md"
        );
    }

    #[tokio::test]
    async fn test_create_repository() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .and(body_json(json!({
                "name": "demo",
                "description": "A demo",
                "private": true,
                "auto_init": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "demo",
                "html_url": "https://github.com/octo/demo",
                "owner": { "login": "octo" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = RepoSpec {
            description: "A demo".into(),
            is_private: true,
            ..RepoSpec::new("demo")
        };
        let handle = client(&server).create_repository(&spec).await.unwrap();

        assert_eq!(handle.owner, "octo");
        assert_eq!(handle.full_name(), "octo/demo");
        assert_eq!(handle.html_url, "https://github.com/octo/demo");
    }

    #[tokio::test]
    async fn test_create_repository_name_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Repository creation failed.",
                "errors": [{ "resource": "Repository", "code": "custom", "field": "name", "message": "name already exists on this account" }],
                "documentation_url": "https://docs.github.com/rest/repos/repos#create-a-repository-for-the-authenticated-user"
            })))
            .mount(&server)
            .await;

        let result = client(&server).create_repository(&RepoSpec::new("taken")).await;
        assert_eq!(result, Err(RepoError::NameConflict("taken".into())));
    }

    #[tokio::test]
    async fn test_create_repository_other_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "message": "Resource not accessible by integration",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let result = client(&server).create_repository(&RepoSpec::new("demo")).await;
        assert!(matches!(result, Err(RepoError::CreateFailed(_))));
    }

    #[tokio::test]
    async fn test_get_file_hit_and_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/readme.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "file",
                "path": "readme.md",
                "sha": "abc123"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/missing.md"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let hit = client.get_file("octo", "demo", "readme.md").await.unwrap();
        assert_eq!(
            hit,
            Some(RemoteFileRef {
                path: "readme.md".into(),
                blob_sha: "abc123".into()
            })
        );

        let miss = client.get_file("octo", "demo", "missing.md").await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_get_file_server_error_names_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/demo/contents/src/lib.rs"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "Server Error",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_file("octo", "demo", "src/lib.rs")
            .await
            .unwrap_err();

        assert_eq!(err.path(), "src/lib.rs");
    }

    #[tokio::test]
    async fn test_put_file_sends_sha_only_for_updates() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/demo/contents/readme.md"))
            .and(body_json(json!({
                "message": "Update readme.md",
                "content": "aGVsbG8=",
                "sha": "abc123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": { "path": "readme.md", "sha": "def456" },
                "commit": { "sha": "c0ffee" }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/octo/demo/contents/new.md"))
            .and(body_json(json!({
                "message": "Add new.md",
                "content": "aGVsbG8="
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": { "path": "new.md", "sha": "fed789" },
                "commit": { "sha": "beef" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let updated = client
            .put_file(
                "octo",
                "demo",
                "readme.md",
                "aGVsbG8=",
                "Update readme.md",
                Some("abc123".into()),
            )
            .await
            .unwrap();
        assert_eq!(updated.blob_sha.as_deref(), Some("def456"));
        assert_eq!(updated.commit_sha.as_deref(), Some("c0ffee"));

        let created = client
            .put_file("octo", "demo", "new.md", "aGVsbG8=", "Add new.md", None)
            .await
            .unwrap();
        assert_eq!(created.blob_sha.as_deref(), Some("fed789"));
    }

    #[tokio::test]
    async fn test_put_file_failure_names_path() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "is at 1111 but expected abc123",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .put_file("octo", "demo", "a.txt", "YQ==", "Update a.txt", Some("abc123".into()))
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.path(), "a.txt");
    }

    #[tokio::test]
    async fn test_authenticated_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "octo",
                "id": 1,
                "type": "User"
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).authenticated_user().await.unwrap(), "octo");
    }
}
