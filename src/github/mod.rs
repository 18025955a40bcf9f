//! Source-control host access (GitHub).
//!
//! Two layers:
//! - [`GitHost`]: one method per host API call (refs, blobs, trees, commits,
//!   pulls, contents). [`GitHubClient`] implements it over REST.
//! - [`RepositoryAccessor`]: the operations the agent tools use, composed from
//!   `GitHost` calls with the ordering rules of a git-data commit.

mod client;
mod repository;

pub use client::GitHubClient;
pub use repository::{compose_pr_body, RepositoryAccessor, REVIEW_CHECKLIST};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostResult;

/// Contents at or above this size are listed without their body.
pub const CONTENT_SIZE_LIMIT: u64 = 100_000;

/// `owner/name` of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A branch created for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    pub name: String,
    pub head_sha: String,
    pub base_branch: String,
}

/// How a file's `content` is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

impl FileEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileEncoding::Utf8 => "utf-8",
            FileEncoding::Base64 => "base64",
        }
    }
}

/// One file of a commit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub encoding: FileEncoding,
}

/// Tree entry pointing at a freshly created blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: "100644".to_string(),
            entry_type: "blob".to_string(),
            sha: sha.into(),
        }
    }
}

/// Pull request as submitted to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub draft: bool,
}

/// Pull request as requested by the agent, before the body is decorated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
    pub task_url: Option<String>,
    pub reviewers: Vec<String>,
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestInfo {
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// Raw contents-API entry. `content` is still base64 when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub item_type: ItemType,
    pub size: u64,
    pub sha: String,
    pub content: Option<String>,
}

/// Repository item handed to the agent; `content` is decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub size: u64,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSummary {
    pub name: String,
    pub sha: String,
    pub protected: bool,
}

/// Raw calls against a source-control host.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Current head sha of `branch`; `RefNotFound` if the branch does not exist.
    async fn get_branch_head(&self, repo: &RepoId, branch: &str) -> HostResult<String>;

    /// Create `refs/heads/<branch>` at `sha`; `RefExists` if the name is taken.
    async fn create_ref(&self, repo: &RepoId, branch: &str, sha: &str) -> HostResult<()>;

    /// Tree sha of a commit.
    async fn get_commit_tree(&self, repo: &RepoId, commit_sha: &str) -> HostResult<String>;

    async fn create_blob(
        &self,
        repo: &RepoId,
        content: &str,
        encoding: FileEncoding,
    ) -> HostResult<String>;

    async fn create_tree(
        &self,
        repo: &RepoId,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> HostResult<String>;

    async fn create_commit(
        &self,
        repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> HostResult<String>;

    /// Move `branch` to `commit_sha` without forcing.
    async fn update_ref(&self, repo: &RepoId, branch: &str, commit_sha: &str) -> HostResult<()>;

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pull: &NewPullRequest,
    ) -> HostResult<PullRequestInfo>;

    async fn request_reviewers(
        &self,
        repo: &RepoId,
        number: u64,
        reviewers: &[String],
    ) -> HostResult<()>;

    /// One directory level, or a single-element list for a file path.
    async fn get_contents(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> HostResult<Vec<ContentEntry>>;

    async fn list_branches(&self, repo: &RepoId) -> HostResult<Vec<BranchSummary>>;
}
