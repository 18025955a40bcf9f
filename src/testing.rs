//! Recording fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;

use crate::credentials::{CredentialStore, StaticToken};
use crate::error::{HostError, HostResult};
use crate::github::{
    BranchSummary, ContentEntry, FileEncoding, GitHost, ItemType, NewPullRequest,
    PullRequestInfo, RepoId, TreeEntry,
};
use crate::notion::{Board, Task};

/// Credentials that always hand out `test-token`.
pub fn static_credentials() -> std::sync::Arc<CredentialStore> {
    std::sync::Arc::new(CredentialStore::new(std::sync::Arc::new(StaticToken(
        "test-token".to_string(),
    ))))
}

/// One call made against [`RecordingGitHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    GetBranchHead { branch: String },
    CreateRef { branch: String, sha: String },
    GetCommitTree { sha: String },
    CreateBlob { content: String, encoding: FileEncoding },
    CreateTree { base_tree: String, entries: Vec<TreeEntry> },
    CreateCommit { message: String, tree: String, parent: String },
    UpdateRef { branch: String, sha: String },
    CreatePull { title: String, head: String, base: String, body: String, draft: bool },
    RequestReviewers { number: u64, reviewers: Vec<String> },
    GetContents { path: String },
    ListBranches,
}

impl HostCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            HostCall::GetBranchHead { .. }
                | HostCall::GetCommitTree { .. }
                | HostCall::GetContents { .. }
                | HostCall::ListBranches
        )
    }
}

#[derive(Default)]
struct HostState {
    calls: Vec<HostCall>,
    heads: HashMap<String, String>,
    entries: Vec<(ContentEntry, String)>,
    counter: u64,
    next_pr: u64,
    fail_update_ref: bool,
    fail_create_pull: bool,
    fail_request_reviewers: bool,
    fail_contents: HashSet<String>,
}

/// In-memory git host that records every call in order.
pub struct RecordingGitHost {
    state: Mutex<HostState>,
}

impl RecordingGitHost {
    /// A host whose only branch is `main`.
    pub fn new() -> Self {
        let mut state = HostState {
            next_pr: 1,
            ..Default::default()
        };
        state.heads.insert("main".to_string(), "sha-main".to_string());
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn set_head(&self, branch: &str, sha: &str) {
        self.state
            .lock()
            .unwrap()
            .heads
            .insert(branch.to_string(), sha.to_string());
    }

    pub fn head(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().heads.get(branch).cloned()
    }

    pub fn add_file(&self, path: &str, content: &str, size: u64) {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.state.lock().unwrap().entries.push((
            ContentEntry {
                name,
                path: path.to_string(),
                item_type: ItemType::File,
                size,
                sha: format!("sha-{}", path),
                content: None,
            },
            content.to_string(),
        ));
    }

    pub fn add_dir(&self, path: &str) {
        self.state.lock().unwrap().entries.push((
            ContentEntry {
                name: path.to_string(),
                path: path.to_string(),
                item_type: ItemType::Dir,
                size: 0,
                sha: format!("sha-{}", path),
                content: None,
            },
            String::new(),
        ));
    }

    pub fn fail_update_ref(&self) {
        self.state.lock().unwrap().fail_update_ref = true;
    }

    pub fn fail_create_pull(&self) {
        self.state.lock().unwrap().fail_create_pull = true;
    }

    pub fn fail_request_reviewers(&self) {
        self.state.lock().unwrap().fail_request_reviewers = true;
    }

    pub fn fail_contents_for(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_contents
            .insert(path.to_string());
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<HostCall> {
        self.calls().into_iter().filter(HostCall::is_mutation).collect()
    }

    fn record(&self, call: HostCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn next_sha(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        format!("{}-{}", prefix, state.counter)
    }
}

#[async_trait]
impl GitHost for RecordingGitHost {
    async fn get_branch_head(&self, _repo: &RepoId, branch: &str) -> HostResult<String> {
        self.record(HostCall::GetBranchHead {
            branch: branch.to_string(),
        });
        self.head(branch)
            .ok_or_else(|| HostError::RefNotFound(format!("heads/{}", branch)))
    }

    async fn create_ref(&self, _repo: &RepoId, branch: &str, sha: &str) -> HostResult<()> {
        self.record(HostCall::CreateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        if self.head(branch).is_some() {
            return Err(HostError::RefExists("Reference already exists".to_string()));
        }
        self.set_head(branch, sha);
        Ok(())
    }

    async fn get_commit_tree(&self, _repo: &RepoId, commit_sha: &str) -> HostResult<String> {
        self.record(HostCall::GetCommitTree {
            sha: commit_sha.to_string(),
        });
        Ok(format!("tree-of-{}", commit_sha))
    }

    async fn create_blob(
        &self,
        _repo: &RepoId,
        content: &str,
        encoding: FileEncoding,
    ) -> HostResult<String> {
        self.record(HostCall::CreateBlob {
            content: content.to_string(),
            encoding,
        });
        Ok(self.next_sha("blob"))
    }

    async fn create_tree(
        &self,
        _repo: &RepoId,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> HostResult<String> {
        self.record(HostCall::CreateTree {
            base_tree: base_tree.to_string(),
            entries: entries.to_vec(),
        });
        Ok(self.next_sha("tree"))
    }

    async fn create_commit(
        &self,
        _repo: &RepoId,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> HostResult<String> {
        self.record(HostCall::CreateCommit {
            message: message.to_string(),
            tree: tree_sha.to_string(),
            parent: parent_sha.to_string(),
        });
        Ok(self.next_sha("commit"))
    }

    async fn update_ref(&self, _repo: &RepoId, branch: &str, commit_sha: &str) -> HostResult<()> {
        self.record(HostCall::UpdateRef {
            branch: branch.to_string(),
            sha: commit_sha.to_string(),
        });
        if self.state.lock().unwrap().fail_update_ref {
            return Err(HostError::remote(422, "Update is not a fast forward"));
        }
        self.set_head(branch, commit_sha);
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pull: &NewPullRequest,
    ) -> HostResult<PullRequestInfo> {
        self.record(HostCall::CreatePull {
            title: pull.title.clone(),
            head: pull.head.clone(),
            base: pull.base.clone(),
            body: pull.body.clone(),
            draft: pull.draft,
        });
        let mut state = self.state.lock().unwrap();
        if state.fail_create_pull {
            return Err(HostError::remote(422, "Validation Failed"));
        }
        let number = state.next_pr;
        state.next_pr += 1;
        Ok(PullRequestInfo {
            number,
            url: format!("https://github.com/{}/pull/{}", repo, number),
        })
    }

    async fn request_reviewers(
        &self,
        _repo: &RepoId,
        number: u64,
        reviewers: &[String],
    ) -> HostResult<()> {
        self.record(HostCall::RequestReviewers {
            number,
            reviewers: reviewers.to_vec(),
        });
        if self.state.lock().unwrap().fail_request_reviewers {
            return Err(HostError::remote(
                422,
                "Reviews may only be requested from collaborators",
            ));
        }
        Ok(())
    }

    async fn get_contents(
        &self,
        _repo: &RepoId,
        path: &str,
        _git_ref: Option<&str>,
    ) -> HostResult<Vec<ContentEntry>> {
        self.record(HostCall::GetContents {
            path: path.to_string(),
        });
        let state = self.state.lock().unwrap();
        if state.fail_contents.contains(path) {
            return Err(HostError::remote(500, "Server Error"));
        }
        if path.is_empty() {
            return Ok(state.entries.iter().map(|(e, _)| e.clone()).collect());
        }
        state
            .entries
            .iter()
            .find(|(e, _)| e.path == path)
            .map(|(e, body)| {
                let mut entry = e.clone();
                if entry.item_type == ItemType::File {
                    entry.content = Some(STANDARD.encode(body));
                }
                vec![entry]
            })
            .ok_or_else(|| HostError::remote(404, "Not Found"))
    }

    async fn list_branches(&self, _repo: &RepoId) -> HostResult<Vec<BranchSummary>> {
        self.record(HostCall::ListBranches);
        let state = self.state.lock().unwrap();
        let mut branches: Vec<BranchSummary> = state
            .heads
            .iter()
            .map(|(name, sha)| BranchSummary {
                name: name.clone(),
                sha: sha.clone(),
                protected: name == "main",
            })
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }
}

/// One call made against [`FakeBoard`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    ListOpenTasks { status_filter: Option<String> },
    GetTaskDetail { task_id: String },
    SetStatus { task_id: String, status: String },
    AddComment { task_id: String, text: String },
}

/// In-memory board holding a fixed set of tasks.
pub struct FakeBoard {
    tasks: Mutex<Vec<Task>>,
    calls: Mutex<Vec<BoardCall>>,
}

impl FakeBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<BoardCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    fn record(&self, call: BoardCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// A task as the board would return it from a listing.
pub fn sample_task(id: &str, title: &str, status: &str) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        status: status.to_string(),
        description: format!("{} for the web app", title),
        assignee: None,
        priority: Some("High".to_string()),
        created_time: None,
        last_edited_time: None,
        url: format!("https://www.notion.so/{}", id),
        properties: json!({}),
        content: None,
    }
}

#[async_trait]
impl Board for FakeBoard {
    async fn list_open_tasks(
        &self,
        _board_id: &str,
        status_filter: Option<&str>,
    ) -> HostResult<Vec<Task>> {
        self.record(BoardCall::ListOpenTasks {
            status_filter: status_filter.map(str::to_string),
        });
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| status_filter.map_or(true, |s| t.status.eq_ignore_ascii_case(s)))
            .cloned()
            .collect())
    }

    async fn get_task_detail(&self, task_id: &str) -> HostResult<Task> {
        self.record(BoardCall::GetTaskDetail {
            task_id: task_id.to_string(),
        });
        let mut task = self
            .task(task_id)
            .ok_or_else(|| HostError::remote(404, format!("Could not find page {}", task_id)))?;
        task.content = Some(format!("# {}\n{}", task.title, task.description));
        Ok(task)
    }

    async fn set_status(&self, task_id: &str, status: &str) -> HostResult<()> {
        self.record(BoardCall::SetStatus {
            task_id: task_id.to_string(),
            status: status.to_string(),
        });
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| HostError::remote(404, format!("Could not find page {}", task_id)))?;
        task.status = status.to_string();
        Ok(())
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> HostResult<()> {
        self.record(BoardCall::AddComment {
            task_id: task_id.to_string(),
            text: text.to_string(),
        });
        if self.task(task_id).is_none() {
            return Err(HostError::remote(404, format!("Could not find page {}", task_id)));
        }
        Ok(())
    }
}
