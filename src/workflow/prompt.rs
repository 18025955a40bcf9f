//! Instruction text handed to the agent.

use crate::config::Config;

/// Status column the agent picks work from.
pub const TODO_STATUS: &str = "To Do";

pub const SYSTEM_PROMPT: &str = r#"You are an autonomous CTO agent. You turn tasks from a Notion kanban board into GitHub pull requests.

## Rules
1. Use tools to do the work; do not just describe what you would do
2. Read repository files before you change them
3. Keep changes small and focused on the task
4. If a tool reports "success": false, read its message and decide whether to retry, work around it, or stop
5. Never push to the base branch directly; always work on a new branch

## Final answer
End with a short plain-text report that states how many tasks were processed
(for example "1 task processed") and the pull request number you opened (for
example "pull request #42").
Only if something failed, describe the error on its own line. When everything
worked, do not mention errors or failures at all: the report is scanned for
those words."#;

/// The per-run instruction with board and repository filled in.
pub fn instruction(config: &Config) -> String {
    let repo = &config.repository;
    format!(
        r#"Process exactly ONE task from the kanban board, then stop.

Board (Notion database id): {board}
Repository: {owner}/{name}
Base branch: {base}

Steps:
1. Call readKanbanBoard with databaseId "{board}" and statusFilter "{todo}".
   If it returns no tasks, answer "0 tasks processed" and stop.
2. Pick the first task. Call queryTaskDetails with its id to read the full description.
3. Call updateTaskStatus to move it to "In Progress".
4. Explore the repository with getRepositoryContent (owner "{owner}", repo "{name}") to find the files involved.
   analyzeCodebase and implementCodeChanges can help you plan.
5. Call createBranch with a descriptive name such as "feature/<short-task-name>" from baseBranch "{base}".
6. Call commitCode with the complete new content of every file you change.
7. Optionally check your work with runCodeTests and validateCodeQuality.
8. Call createPullRequest with head set to your branch, base "{base}", a clear title and body,
   and notionTaskUrl set to the task's url.
9. Call updateTaskStatus to move the task to "Done", then addTaskComment with the pull request link.
   If you could not finish, move it to "Blocked" and comment with the reason instead.

Do not start a second task, even if more are waiting."#,
        board = config.notion_database_id,
        owner = repo.owner,
        name = repo.repo,
        base = repo.base_branch,
        todo = TODO_STATUS,
    )
}
