//! Kanban board access (Notion databases).
//!
//! The [`Board`] trait is what the agent tools talk to; [`NotionBoard`] is the
//! HTTP implementation. Property extraction lives in [`extract`] so it can be
//! exercised without a network.

mod client;
pub mod extract;

pub use client::NotionBoard;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostResult;

/// A card on the board.
///
/// Created externally; this crate only changes its status and appends comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Board-defined label, e.g. "To Do", "In Progress", "Done", "Blocked"
    pub status: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<DateTime<Utc>>,
    pub url: String,
    /// Raw board-native property map, passed through untouched.
    pub properties: Value,
    /// Flattened page body; only populated by [`Board::get_task_detail`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Read and mutate tasks on a kanban board.
#[async_trait]
pub trait Board: Send + Sync {
    /// List the board's tasks, optionally restricted to one status label.
    async fn list_open_tasks(
        &self,
        board_id: &str,
        status_filter: Option<&str>,
    ) -> HostResult<Vec<Task>>;

    /// Fetch one task including its flattened page content.
    async fn get_task_detail(&self, task_id: &str) -> HostResult<Task>;

    async fn set_status(&self, task_id: &str, status: &str) -> HostResult<()>;

    async fn add_comment(&self, task_id: &str, text: &str) -> HostResult<()>;
}
