//! GitHub REST client implementing [`GitHost`].
//!
//! Uses the git-data endpoints (`git/refs`, `git/blobs`, `git/trees`,
//! `git/commits`) so a multi-file change lands as a single commit without a
//! local checkout.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};

use super::{
    BranchSummary, ContentEntry, FileEncoding, GitHost, ItemType, NewPullRequest,
    PullRequestInfo, RepoId, TreeEntry,
};
use crate::credentials::CredentialStore;
use crate::error::{HostError, HostResult};

const USER_AGENT: &str = "cto-agent";
const API_VERSION: &str = "2022-11-28";
const BRANCHES_PER_PAGE: usize = 100;

pub struct GitHubClient {
    http: Client,
    api_base: String,
    credentials: Arc<CredentialStore>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> HostResult<Value> {
        let token = self.credentials.access_token().await?;
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(%method, %url, "GitHub request");

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(HostError::remote(status.as_u16(), error_message(&text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| HostError::Decode(format!("Invalid GitHub response: {}", e)))
    }
}

/// GitHub error bodies carry `message`, sometimes with `errors[].message` detail.
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    let mut message = parsed["message"].as_str().unwrap_or(body).to_string();
    if let Some(details) = parsed["errors"].as_array() {
        let detail: Vec<&str> = details.iter().filter_map(|d| d["message"].as_str()).collect();
        if !detail.is_empty() {
            message = format!("{} ({})", message, detail.join("; "));
        }
    }
    message
}

/// Encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn sha_field(value: &Value, pointer: &str, what: &str) -> HostResult<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HostError::Decode(format!("{} response has no sha", what)))
}

fn content_entry(value: &Value) -> HostResult<ContentEntry> {
    let item_type: ItemType = serde_json::from_value(value["type"].clone())
        .map_err(|e| HostError::Decode(format!("Unknown content type: {}", e)))?;
    Ok(ContentEntry {
        name: value["name"].as_str().unwrap_or_default().to_string(),
        path: value["path"].as_str().unwrap_or_default().to_string(),
        item_type,
        size: value["size"].as_u64().unwrap_or(0),
        sha: value["sha"].as_str().unwrap_or_default().to_string(),
        content: value["content"].as_str().map(str::to_string),
    })
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn get_branch_head(&self, repo: &RepoId, branch: &str) -> HostResult<String> {
        let path = format!(
            "/repos/{}/{}/git/ref/heads/{}",
            repo.owner,
            repo.name,
            encode_path(branch)
        );
        match self.request(Method::GET, &path, None).await {
            Ok(value) => sha_field(&value, "/object/sha", "ref"),
            Err(HostError::Remote { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(HostError::RefNotFound(format!("heads/{}", branch)))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_ref(&self, repo: &RepoId, branch: &str, sha: &str) -> HostResult<()> {
        let path = format!("/repos/{}/{}/git/refs", repo.owner, repo.name);
        let body = json!({ "ref": format!("refs/heads/{}", branch), "sha": sha });
        match self.request(Method::POST, &path, Some(body)).await {
            Ok(_) => Ok(()),
            Err(HostError::Remote { status, message })
                if status == StatusCode::UNPROCESSABLE_ENTITY.as_u16()
                    && message.contains("already exists") =>
            {
                Err(HostError::RefExists(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_commit_tree(&self, repo: &RepoId, commit_sha: &str) -> HostResult<String> {
        let path = format!(
            "/repos/{}/{}/git/commits/{}",
            repo.owner, repo.name, commit_sha
        );
        let value = self.request(Method::GET, &path, None).await?;
        sha_field(&value, "/tree/sha", "commit")
    }

    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: FileEncoding,
    ) -> HostResult<String> {
        let path = format!("/repos/{}/{}/git/blobs", repo.owner, repo.name);
        let body = json!({ "content": content, "encoding": encoding.as_str() });
        let value = self.request(Method::POST, &path, Some(body)).await?;
        sha_field(&value, "/sha", "blob")
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> HostResult<String> {
        let path = format!("/repos/{}/{}/git/trees", repo.owner, repo.name);
        let body = json!({ "base_tree": base_tree, "tree": entries });
        let value = self.request(Method::POST, &path, Some(body)).await?;
        sha_field(&value, "/sha", "tree")
    }

    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> HostResult<String> {
        let path = format!("/repos/{}/{}/git/commits", repo.owner, repo.name);
        let body = json!({ "message": message, "tree": tree_sha, "parents": [parent_sha] });
        let value = self.request(Method::POST, &path, Some(body)).await?;
        sha_field(&value, "/sha", "commit")
    }

    async fn update_ref(&self, repo: &RepoId, branch: &str, commit_sha: &str) -> HostResult<()> {
        let path = format!(
            "/repos/{}/{}/git/refs/heads/{}",
            repo.owner,
            repo.name,
            encode_path(branch)
        );
        let body = json!({ "sha": commit_sha, "force": false });
        self.request(Method::PATCH, &path, Some(body)).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pull: &NewPullRequest,
    ) -> HostResult<PullRequestInfo> {
        let path = format!("/repos/{}/{}/pulls", repo.owner, repo.name);
        let body = serde_json::to_value(pull)
            .map_err(|e| HostError::InvalidRequest(format!("Unserializable pull request: {}", e)))?;
        let value = self.request(Method::POST, &path, Some(body)).await?;

        let number = value["number"]
            .as_u64()
            .ok_or_else(|| HostError::Decode("Pull request response has no number".to_string()))?;
        Ok(PullRequestInfo {
            number,
            url: value["html_url"].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn request_reviewers(
        &self,
        repo: &RepoId,
        number: u64,
        reviewers: &[String],
    ) -> HostResult<()> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/requested_reviewers",
            repo.owner, repo.name, number
        );
        self.request(Method::POST, &path, Some(json!({ "reviewers": reviewers })))
            .await?;
        Ok(())
    }

    async fn get_contents(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> HostResult<Vec<ContentEntry>> {
        let mut endpoint = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.name,
            encode_path(path)
        );
        if let Some(r) = git_ref {
            endpoint.push_str(&format!("?ref={}", urlencoding::encode(r)));
        }

        let value = self.request(Method::GET, &endpoint, None).await?;
        match value {
            Value::Array(entries) => entries.iter().map(content_entry).collect(),
            single => Ok(vec![content_entry(&single)?]),
        }
    }

    async fn list_branches(&self, repo: &RepoId) -> HostResult<Vec<BranchSummary>> {
        let mut branches = Vec::new();
        let mut page = 1u32;

        loop {
            let path = format!(
                "/repos/{}/{}/branches?per_page={}&page={}",
                repo.owner, repo.name, BRANCHES_PER_PAGE, page
            );
            let value = self.request(Method::GET, &path, None).await?;
            let rows = value.as_array().cloned().unwrap_or_default();
            let count = rows.len();

            branches.extend(rows.iter().map(|b| BranchSummary {
                name: b["name"].as_str().unwrap_or_default().to_string(),
                sha: b["commit"]["sha"].as_str().unwrap_or_default().to_string(),
                protected: b["protected"].as_bool().unwrap_or(false),
            }));

            if count < BRANCHES_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(branches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryAccessor;
    use crate::testing::static_credentials;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(server.base_url(), static_credentials())
    }

    fn acme() -> RepoId {
        RepoId::new("acme", "web")
    }

    #[tokio::test]
    async fn test_missing_branch_maps_to_ref_not_found() {
        let server = MockServer::start();
        let lookup = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/web/git/ref/heads/release")
                .header("authorization", "Bearer test-token")
                .header("x-github-api-version", API_VERSION);
            then.status(404).json_body(json!({ "message": "Not Found" }));
        });

        let err = client_for(&server)
            .get_branch_head(&acme(), "release")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::RefNotFound(ref r) if r == "heads/release"));
        lookup.assert_calls(1);
    }

    #[tokio::test]
    async fn test_branch_head_reads_object_sha() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/web/git/ref/heads/main");
            then.status(200).json_body(json!({
                "ref": "refs/heads/main",
                "object": { "sha": "abc123", "type": "commit" }
            }));
        });

        let sha = client_for(&server).get_branch_head(&acme(), "main").await.unwrap();
        assert_eq!(sha, "abc123");
    }

    #[tokio::test]
    async fn test_existing_ref_maps_to_ref_exists() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/web/git/refs")
                .json_body(json!({ "ref": "refs/heads/feature/x", "sha": "abc123" }));
            then.status(422)
                .json_body(json!({ "message": "Reference already exists" }));
        });

        let err = client_for(&server)
            .create_ref(&acme(), "feature/x", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::RefExists(_)));
        create.assert_calls(1);
    }

    #[tokio::test]
    async fn test_other_unprocessable_ref_stays_remote_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/web/git/refs");
            then.status(422)
                .json_body(json!({ "message": "Reference update failed" }));
        });

        let err = client_for(&server)
            .create_ref(&acme(), "feature/x", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Remote { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_create_branch_over_existing_branch_reports_already_exists() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/web/git/ref/heads/main");
            then.status(200)
                .json_body(json!({ "object": { "sha": "abc123" } }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/web/git/refs");
            then.status(422)
                .json_body(json!({ "message": "Reference already exists" }));
        });

        let accessor = RepositoryAccessor::new(Arc::new(client_for(&server)));
        let err = accessor
            .create_branch(&acme(), "feature/x", "main")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_list_branches_follows_pages() {
        let server = MockServer::start();
        let full_page: Vec<Value> = (0..BRANCHES_PER_PAGE)
            .map(|i| json!({ "name": format!("b{}", i), "commit": { "sha": "s" }, "protected": false }))
            .collect();
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/web/branches")
                .query_param("page", "1");
            then.status(200).json_body(Value::Array(full_page.clone()));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/web/branches")
                .query_param("page", "2");
            then.status(200).json_body(json!([
                { "name": "main", "commit": { "sha": "m" }, "protected": true }
            ]));
        });

        let branches = client_for(&server).list_branches(&acme()).await.unwrap();
        assert_eq!(branches.len(), BRANCHES_PER_PAGE + 1);
        assert!(branches.last().unwrap().protected);
        first.assert_calls(1);
        second.assert_calls(1);
    }

    #[test]
    fn test_error_message_includes_details() {
        let body = r#"{"message":"Validation Failed","errors":[{"message":"A pull request already exists for acme:feature/x."}]}"#;
        assert_eq!(
            error_message(body),
            "Validation Failed (A pull request already exists for acme:feature/x.)"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("docs/My Notes.md"), "docs/My%20Notes.md");
        assert_eq!(encode_path("/src/"), "src");
        assert_eq!(encode_path(""), "");
        assert_eq!(encode_path("feature/dark-mode"), "feature/dark-mode");
    }

    #[test]
    fn test_content_entry_parses_file_and_dir() {
        let file = json!({
            "name": "lib.rs", "path": "src/lib.rs", "type": "file",
            "size": 42, "sha": "abc", "content": "Zm4gbWFpbigpIHt9\n"
        });
        let entry = content_entry(&file).unwrap();
        assert_eq!(entry.item_type, ItemType::File);
        assert_eq!(entry.size, 42);
        assert!(entry.content.is_some());

        let dir = json!({ "name": "src", "path": "src", "type": "dir", "size": 0, "sha": "def" });
        let entry = content_entry(&dir).unwrap();
        assert_eq!(entry.item_type, ItemType::Dir);
        assert!(entry.content.is_none());
    }

    #[test]
    fn test_sha_field_missing_is_decode_error() {
        let value = json!({ "object": {} });
        assert!(matches!(
            sha_field(&value, "/object/sha", "ref"),
            Err(HostError::Decode(_))
        ));
    }
}
