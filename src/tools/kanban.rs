//! Kanban board tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{failure, optional_str, required_str, Tool};
use crate::notion::Board;

/// List tasks on the board, optionally by status.
pub struct ReadKanbanBoard {
    board: Arc<dyn Board>,
}

impl ReadKanbanBoard {
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for ReadKanbanBoard {
    fn name(&self) -> &str {
        "readKanbanBoard"
    }

    fn description(&self) -> &str {
        "Read tasks from the Notion kanban board. Use statusFilter (e.g. \"To Do\") to only return tasks in that column."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "databaseId": {
                    "type": "string",
                    "description": "Notion database id of the board"
                },
                "statusFilter": {
                    "type": "string",
                    "description": "Only return tasks with this status"
                }
            },
            "required": ["databaseId"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let database_id = required_str(&args, "databaseId")?;
        let status_filter = optional_str(&args, "statusFilter");

        let tasks = self.board.list_open_tasks(database_id, status_filter).await?;
        tracing::debug!(count = tasks.len(), filter = ?status_filter, "Read kanban board");

        Ok(json!({
            "tasks": tasks,
            "count": tasks.len(),
        }))
    }
}

/// Full detail for one task, including its page content.
pub struct QueryTaskDetails {
    board: Arc<dyn Board>,
}

impl QueryTaskDetails {
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for QueryTaskDetails {
    fn name(&self) -> &str {
        "queryTaskDetails"
    }

    fn description(&self) -> &str {
        "Get the full details of a task, including the text content of its page."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pageId": {
                    "type": "string",
                    "description": "Notion page id of the task"
                }
            },
            "required": ["pageId"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let page_id = required_str(&args, "pageId")?;
        let mut task = self.board.get_task_detail(page_id).await?;
        if task.content.is_none() {
            task.content = Some(String::new());
        }
        Ok(json!({ "task": task }))
    }
}

pub struct UpdateTaskStatus {
    board: Arc<dyn Board>,
}

impl UpdateTaskStatus {
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for UpdateTaskStatus {
    fn name(&self) -> &str {
        "updateTaskStatus"
    }

    fn description(&self) -> &str {
        "Move a task to another status column, e.g. \"In Progress\" or \"Done\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pageId": {
                    "type": "string",
                    "description": "Notion page id of the task"
                },
                "newStatus": {
                    "type": "string",
                    "description": "Status label to set"
                }
            },
            "required": ["pageId", "newStatus"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let (page_id, status) = match (required_str(&args, "pageId"), required_str(&args, "newStatus")) {
            (Ok(p), Ok(s)) => (p, s),
            (Err(e), _) | (_, Err(e)) => return Ok(failure(e)),
        };

        match self.board.set_status(page_id, status).await {
            Ok(()) => {
                tracing::info!(task_id = %page_id, status = %status, "Task status updated");
                Ok(json!({
                    "success": true,
                    "message": format!("Task status updated to {}", status),
                }))
            }
            Err(e) => {
                tracing::warn!(task_id = %page_id, error = %e, "Task status update failed");
                Ok(failure(format!("Failed to update task status: {}", e)))
            }
        }
    }
}

pub struct AddTaskComment {
    board: Arc<dyn Board>,
}

impl AddTaskComment {
    pub fn new(board: Arc<dyn Board>) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for AddTaskComment {
    fn name(&self) -> &str {
        "addTaskComment"
    }

    fn description(&self) -> &str {
        "Add a comment to a task, e.g. a link to the pull request that implements it."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pageId": {
                    "type": "string",
                    "description": "Notion page id of the task"
                },
                "comment": {
                    "type": "string",
                    "description": "Comment text"
                }
            },
            "required": ["pageId", "comment"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let (page_id, comment) = match (required_str(&args, "pageId"), required_str(&args, "comment")) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(e), _) | (_, Err(e)) => return Ok(failure(e)),
        };

        match self.board.add_comment(page_id, comment).await {
            Ok(()) => Ok(json!({
                "success": true,
                "message": "Comment added",
            })),
            Err(e) => {
                tracing::warn!(task_id = %page_id, error = %e, "Adding comment failed");
                Ok(failure(format!("Failed to add comment: {}", e)))
            }
        }
    }
}
