//! GitHub repository tools.
//!
//! All of these report failures as `{"success": false, "message": ...}`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{failure, optional_str, required_str, Tool};
use crate::config::DEFAULT_BASE_BRANCH;
use crate::error::HostError;
use crate::github::{FileChange, PullRequestRequest, RepoId, RepositoryAccessor};

fn repo_from_args(args: &Value) -> anyhow::Result<RepoId> {
    Ok(RepoId::new(
        required_str(args, "owner")?,
        required_str(args, "repo")?,
    ))
}

fn repo_properties() -> Value {
    json!({
        "owner": {
            "type": "string",
            "description": "Repository owner (user or organization)"
        },
        "repo": {
            "type": "string",
            "description": "Repository name"
        }
    })
}

/// Schema with the shared owner/repo properties merged in.
fn schema(mut properties: Value, required: &[&str]) -> Value {
    if let (Some(target), Value::Object(repo)) = (properties.as_object_mut(), repo_properties()) {
        for (key, value) in repo {
            target.insert(key, value);
        }
    }
    let mut required_fields = vec!["owner", "repo"];
    required_fields.extend_from_slice(required);

    json!({
        "type": "object",
        "properties": properties,
        "required": required_fields,
    })
}

pub struct CreateBranch {
    repository: Arc<RepositoryAccessor>,
}

impl CreateBranch {
    pub fn new(repository: Arc<RepositoryAccessor>) -> Self {
        Self { repository }
    }

    async fn run(&self, args: &Value) -> anyhow::Result<Value> {
        let repo = repo_from_args(args)?;
        let branch_name = required_str(args, "branchName")?;
        let base_branch = optional_str(args, "baseBranch").unwrap_or(DEFAULT_BASE_BRANCH);

        let branch = self
            .repository
            .create_branch(&repo, branch_name, base_branch)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create branch {}: {}", branch_name, e))?;

        Ok(json!({
            "success": true,
            "branchName": branch.name,
            "sha": branch.head_sha,
            "message": format!("Created branch {} from {}", branch.name, branch.base_branch),
        }))
    }
}

#[async_trait]
impl Tool for CreateBranch {
    fn name(&self) -> &str {
        "createBranch"
    }

    fn description(&self) -> &str {
        "Create a new branch from the current head of a base branch (default \"main\")."
    }

    fn parameters_schema(&self) -> Value {
        schema(
            json!({
                "branchName": {
                    "type": "string",
                    "description": "Name of the branch to create, e.g. feature/dark-mode"
                },
                "baseBranch": {
                    "type": "string",
                    "description": "Branch to start from",
                    "default": DEFAULT_BASE_BRANCH
                }
            }),
            &["branchName"],
        )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        Ok(self.run(&args).await.unwrap_or_else(failure))
    }
}

#[derive(Debug, Deserialize)]
struct CommitArgs {
    branch: String,
    message: String,
    files: Vec<FileChange>,
}

pub struct CommitCode {
    repository: Arc<RepositoryAccessor>,
}

impl CommitCode {
    pub fn new(repository: Arc<RepositoryAccessor>) -> Self {
        Self { repository }
    }

    async fn run(&self, args: Value) -> anyhow::Result<Value> {
        let repo = repo_from_args(&args)?;
        let commit: CommitArgs = serde_json::from_value(args)
            .map_err(|e| anyhow::anyhow!("Invalid commit arguments: {}", e))?;

        let commit_sha = self
            .repository
            .commit_files(&repo, &commit.branch, &commit.message, &commit.files)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to commit to {}: {}", commit.branch, e))?;

        Ok(json!({
            "success": true,
            "commitSha": commit_sha,
            "message": format!("Committed {} file(s) to {}", commit.files.len(), commit.branch),
        }))
    }
}

#[async_trait]
impl Tool for CommitCode {
    fn name(&self) -> &str {
        "commitCode"
    }

    fn description(&self) -> &str {
        "Commit one or more files to a branch as a single commit. Each file replaces the full content at its path."
    }

    fn parameters_schema(&self) -> Value {
        schema(
            json!({
                "branch": {
                    "type": "string",
                    "description": "Branch to commit to"
                },
                "message": {
                    "type": "string",
                    "description": "Commit message"
                },
                "files": {
                    "type": "array",
                    "description": "Files to write",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "content": { "type": "string" },
                            "encoding": {
                                "type": "string",
                                "enum": ["utf-8", "base64"],
                                "default": "utf-8"
                            }
                        },
                        "required": ["path", "content"]
                    }
                }
            }),
            &["branch", "message", "files"],
        )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        Ok(self.run(args).await.unwrap_or_else(failure))
    }
}

pub struct CreatePullRequest {
    repository: Arc<RepositoryAccessor>,
}

impl CreatePullRequest {
    pub fn new(repository: Arc<RepositoryAccessor>) -> Self {
        Self { repository }
    }

    fn request_from_args(args: &Value) -> anyhow::Result<PullRequestRequest> {
        let reviewers = args["reviewers"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|r| r.as_str())
                    .filter(|r| !r.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(PullRequestRequest {
            title: required_str(args, "title")?.to_string(),
            head: required_str(args, "head")?.to_string(),
            base: optional_str(args, "base")
                .unwrap_or(DEFAULT_BASE_BRANCH)
                .to_string(),
            body: args["body"].as_str().unwrap_or_default().to_string(),
            task_url: optional_str(args, "notionTaskUrl").map(str::to_string),
            reviewers,
            draft: args["draft"].as_bool().unwrap_or(false),
        })
    }
}

#[async_trait]
impl Tool for CreatePullRequest {
    fn name(&self) -> &str {
        "createPullRequest"
    }

    fn description(&self) -> &str {
        "Open a pull request. A review checklist and a link back to the Notion task are appended to the body. Reviewers are requested after the pull request is created."
    }

    fn parameters_schema(&self) -> Value {
        schema(
            json!({
                "title": { "type": "string", "description": "Pull request title" },
                "head": { "type": "string", "description": "Branch with the changes" },
                "base": {
                    "type": "string",
                    "description": "Branch to merge into",
                    "default": DEFAULT_BASE_BRANCH
                },
                "body": { "type": "string", "description": "Description of the change" },
                "notionTaskUrl": {
                    "type": "string",
                    "description": "URL of the Notion task this implements"
                },
                "reviewers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "GitHub usernames to request reviews from"
                },
                "draft": { "type": "boolean", "default": false }
            }),
            &["title", "head", "body"],
        )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let (repo, request) = match repo_from_args(&args).and_then(|repo| {
            Self::request_from_args(&args).map(|request| (repo, request))
        }) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(failure(e)),
        };

        match self.repository.open_pull_request(&repo, &request).await {
            Ok(pull) => Ok(json!({
                "success": true,
                "pullRequestUrl": pull.url,
                "pullRequestNumber": pull.number,
                "message": format!("Created pull request #{}", pull.number),
            })),
            // The PR exists; say so, but the operation still failed.
            Err(HostError::ReviewersNotRequested {
                number,
                url,
                message,
            }) => Ok(json!({
                "success": false,
                "pullRequestUrl": url,
                "pullRequestNumber": number,
                "message": format!(
                    "Pull request #{} was created at {}, but requesting reviewers failed: {}",
                    number, url, message
                ),
            })),
            Err(e) => Ok(failure(format!("Failed to create pull request: {}", e))),
        }
    }
}

pub struct GetRepositoryContent {
    repository: Arc<RepositoryAccessor>,
}

impl GetRepositoryContent {
    pub fn new(repository: Arc<RepositoryAccessor>) -> Self {
        Self { repository }
    }

    async fn run(&self, args: &Value) -> anyhow::Result<Value> {
        let repo = repo_from_args(args)?;
        let path = args["path"].as_str().unwrap_or_default().trim_matches('/');
        let git_ref = optional_str(args, "ref");

        let items = self
            .repository
            .get_content(&repo, path, git_ref)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", path, e))?;

        Ok(json!({
            "success": true,
            "message": format!("Found {} item(s) at '{}'", items.len(), path),
            "items": items,
        }))
    }
}

#[async_trait]
impl Tool for GetRepositoryContent {
    fn name(&self) -> &str {
        "getRepositoryContent"
    }

    fn description(&self) -> &str {
        "List a directory or read a file in the repository. Files of 100000 bytes or more are listed without content."
    }

    fn parameters_schema(&self) -> Value {
        schema(
            json!({
                "path": {
                    "type": "string",
                    "description": "Path inside the repository; empty for the root",
                    "default": ""
                },
                "ref": {
                    "type": "string",
                    "description": "Branch, tag or commit to read from (defaults to the repository's default branch)"
                }
            }),
            &[],
        )
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        Ok(self.run(&args).await.unwrap_or_else(failure))
    }
}

pub struct ListRepositoryBranches {
    repository: Arc<RepositoryAccessor>,
}

impl ListRepositoryBranches {
    pub fn new(repository: Arc<RepositoryAccessor>) -> Self {
        Self { repository }
    }

    async fn run(&self, args: &Value) -> anyhow::Result<Value> {
        let repo = repo_from_args(args)?;
        let branches = self
            .repository
            .list_branches(&repo)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list branches of {}: {}", repo, e))?;

        Ok(json!({
            "success": true,
            "message": format!("Found {} branch(es)", branches.len()),
            "branches": branches,
        }))
    }
}

#[async_trait]
impl Tool for ListRepositoryBranches {
    fn name(&self) -> &str {
        "listRepositoryBranches"
    }

    fn description(&self) -> &str {
        "List the repository's branches with their head commit and protection flag."
    }

    fn parameters_schema(&self) -> Value {
        schema(json!({}), &[])
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        Ok(self.run(&args).await.unwrap_or_else(failure))
    }
}
