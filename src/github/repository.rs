//! Repository operations composed from raw [`GitHost`] calls.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::try_join_all;

use super::{
    BranchRef, BranchSummary, FileChange, GitHost, ItemType, NewPullRequest, PullRequestInfo,
    PullRequestRequest, RepoId, RepositoryItem, TreeEntry, CONTENT_SIZE_LIMIT,
};
use crate::error::{HostError, HostResult};

/// Appended to every pull request body.
pub const REVIEW_CHECKLIST: &str = "## Review Checklist
- [ ] Code follows the project's conventions
- [ ] Tests added or updated
- [ ] Documentation updated where needed
- [ ] No breaking changes, or they are called out above";

/// Pull request body: the agent's text, the checklist, and an optional back-link.
pub fn compose_pr_body(body: &str, task_url: Option<&str>) -> String {
    let mut composed = format!("{}\n\n---\n\n{}", body.trim_end(), REVIEW_CHECKLIST);
    if let Some(url) = task_url.filter(|u| !u.trim().is_empty()) {
        composed.push_str(&format!("\n\n**Notion Task:** {}", url));
    }
    composed
}

/// Decode base64 file content as delivered by the contents API (line-wrapped).
fn decode_content(raw: &str) -> Result<String, base64::DecodeError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Branch, commit, pull request and content operations on one host.
pub struct RepositoryAccessor {
    host: Arc<dyn GitHost>,
}

impl RepositoryAccessor {
    pub fn new(host: Arc<dyn GitHost>) -> Self {
        Self { host }
    }

    /// Create `name` pointing at the current head of `base_branch`.
    pub async fn create_branch(
        &self,
        repo: &RepoId,
        name: &str,
        base_branch: &str,
    ) -> HostResult<BranchRef> {
        let head_sha = self.host.get_branch_head(repo, base_branch).await?;
        self.host.create_ref(repo, name, &head_sha).await?;

        tracing::info!(repo = %repo, branch = %name, base = %base_branch, sha = %head_sha, "Created branch");
        Ok(BranchRef {
            name: name.to_string(),
            head_sha,
            base_branch: base_branch.to_string(),
        })
    }

    /// Commit `files` on top of `branch` as one new commit.
    ///
    /// The head is read right before the tree is built, so the commit's only
    /// parent is the branch's current head. If the final ref update is rejected
    /// the branch is unchanged; the blobs, tree and commit already created are
    /// left unreferenced on the host.
    pub async fn commit_files(
        &self,
        repo: &RepoId,
        branch: &str,
        message: &str,
        files: &[FileChange],
    ) -> HostResult<String> {
        if files.is_empty() {
            return Err(HostError::InvalidRequest("No files to commit".to_string()));
        }

        let parent_sha = self.host.get_branch_head(repo, branch).await?;
        let base_tree = self.host.get_commit_tree(repo, &parent_sha).await?;

        // Blobs are independent of each other; everything after them is sequential.
        let blob_shas = try_join_all(
            files
                .iter()
                .map(|file| self.host.create_blob(repo, &file.content, file.encoding)),
        )
        .await?;

        let entries: Vec<TreeEntry> = files
            .iter()
            .zip(blob_shas)
            .map(|(file, sha)| TreeEntry::blob(file.path.clone(), sha))
            .collect();

        let tree_sha = self.host.create_tree(repo, &base_tree, &entries).await?;
        let commit_sha = self
            .host
            .create_commit(repo, message, &tree_sha, &parent_sha)
            .await?;
        self.host.update_ref(repo, branch, &commit_sha).await?;

        tracing::info!(
            repo = %repo,
            branch = %branch,
            files = files.len(),
            commit = %commit_sha,
            "Committed files"
        );
        Ok(commit_sha)
    }

    /// Open a pull request, then request reviewers if any were given.
    ///
    /// A failed reviewer request is returned as `ReviewersNotRequested`: the
    /// pull request exists even though the operation as a whole failed.
    pub async fn open_pull_request(
        &self,
        repo: &RepoId,
        request: &PullRequestRequest,
    ) -> HostResult<PullRequestInfo> {
        let pull = NewPullRequest {
            title: request.title.clone(),
            head: request.head.clone(),
            base: request.base.clone(),
            body: compose_pr_body(&request.body, request.task_url.as_deref()),
            draft: request.draft,
        };

        let created = self.host.create_pull_request(repo, &pull).await?;
        tracing::info!(repo = %repo, number = created.number, url = %created.url, "Opened pull request");

        if !request.reviewers.is_empty() {
            if let Err(e) = self
                .host
                .request_reviewers(repo, created.number, &request.reviewers)
                .await
            {
                tracing::warn!(number = created.number, error = %e, "Reviewer request failed");
                return Err(HostError::ReviewersNotRequested {
                    number: created.number,
                    url: created.url,
                    message: e.to_string(),
                });
            }
        }

        Ok(created)
    }

    /// List a directory level (or a single file) with small file bodies inlined.
    ///
    /// Files under [`CONTENT_SIZE_LIMIT`] get a second fetch for their content.
    /// A failed content fetch is logged and the item is returned without content.
    pub async fn get_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> HostResult<Vec<RepositoryItem>> {
        let entries = self.host.get_contents(repo, path, git_ref).await?;
        let mut items = Vec::with_capacity(entries.len());

        for entry in entries {
            let content = if entry.item_type == ItemType::File && entry.size < CONTENT_SIZE_LIMIT {
                self.fetch_file_content(repo, &entry.path, git_ref).await
            } else {
                None
            };

            items.push(RepositoryItem {
                name: entry.name,
                path: entry.path,
                item_type: entry.item_type,
                size: entry.size,
                sha: entry.sha,
                content,
            });
        }

        Ok(items)
    }

    async fn fetch_file_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> Option<String> {
        let fetched = match self.host.get_contents(repo, path, git_ref).await {
            Ok(entries) => entries.into_iter().next().and_then(|e| e.content),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to fetch file content");
                return None;
            }
        };

        match decode_content(fetched.as_deref()?) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to decode file content");
                None
            }
        }
    }

    pub async fn list_branches(&self, repo: &RepoId) -> HostResult<Vec<BranchSummary>> {
        self.host.list_branches(repo).await
    }
}
