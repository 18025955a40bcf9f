//! Notion REST client implementing [`Board`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use super::extract::{
    flatten_blocks, parent_database_id, same_id, status_property, task_from_page,
};
use super::{Board, Task};
use crate::credentials::CredentialStore;
use crate::error::{HostError, HostResult};

const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Board backed by a Notion database.
pub struct NotionBoard {
    http: Client,
    api_base: String,
    credentials: Arc<CredentialStore>,
}

impl NotionBoard {
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
        tracing::debug!(%method, %url, "Notion request");

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // Notion error bodies carry a human-readable `message`.
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(HostError::remote(status.as_u16(), message));
        }

        serde_json::from_str(&text)
            .map_err(|e| HostError::Decode(format!("Invalid Notion response: {}", e)))
    }

    /// Follow `next_cursor` until every block of the page has been read.
    async fn page_blocks(&self, page_id: &str) -> HostResult<Vec<Value>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut path = format!("/blocks/{}/children?page_size={}", page_id, PAGE_SIZE);
            if let Some(c) = &cursor {
                path.push_str(&format!("&start_cursor={}", urlencoding::encode(c)));
            }
            let response = self.request(Method::GET, &path, None).await?;
            if let Some(results) = response["results"].as_array() {
                blocks.extend(results.iter().cloned());
            }
            cursor = next_cursor(&response);
            if cursor.is_none() {
                break;
            }
        }

        Ok(blocks)
    }
}

fn next_cursor(response: &Value) -> Option<String> {
    if response["has_more"].as_bool().unwrap_or(false) {
        response["next_cursor"].as_str().map(str::to_string)
    } else {
        None
    }
}

#[async_trait]
impl Board for NotionBoard {
    async fn list_open_tasks(
        &self,
        board_id: &str,
        status_filter: Option<&str>,
    ) -> HostResult<Vec<Task>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        // Filter client-side: board schemas vary too much for a server-side query.
        loop {
            let mut body = json!({
                "filter": { "property": "object", "value": "page" },
                "page_size": PAGE_SIZE
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let response = self.request(Method::POST, "/search", Some(body)).await?;
            if let Some(results) = response["results"].as_array() {
                pages.extend(results.iter().cloned());
            }
            cursor = next_cursor(&response);
            if cursor.is_none() {
                break;
            }
        }

        let tasks: Vec<Task> = pages
            .iter()
            .filter(|page| {
                parent_database_id(page)
                    .map(|id| same_id(id, board_id))
                    .unwrap_or(false)
            })
            .map(task_from_page)
            .filter(|task| {
                status_filter
                    .map(|wanted| task.status.eq_ignore_ascii_case(wanted))
                    .unwrap_or(true)
            })
            .collect();

        tracing::info!(
            board_id = %board_id,
            status_filter = ?status_filter,
            searched = pages.len(),
            matched = tasks.len(),
            "Read kanban board"
        );
        Ok(tasks)
    }

    async fn get_task_detail(&self, task_id: &str) -> HostResult<Task> {
        let page = self
            .request(Method::GET, &format!("/pages/{}", task_id), None)
            .await?;
        let blocks = self.page_blocks(task_id).await?;

        let mut task = task_from_page(&page);
        task.content = Some(flatten_blocks(&blocks));
        Ok(task)
    }

    async fn set_status(&self, task_id: &str, status: &str) -> HostResult<()> {
        let page = self
            .request(Method::GET, &format!("/pages/{}", task_id), None)
            .await?;
        let (property, kind) = status_property(&page);

        let body = json!({
            "properties": {
                property.as_str(): { kind.as_str(): { "name": status } }
            }
        });
        self.request(Method::PATCH, &format!("/pages/{}", task_id), Some(body))
            .await?;

        tracing::info!(task_id = %task_id, status = %status, "Updated task status");
        Ok(())
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> HostResult<()> {
        let body = json!({
            "parent": { "page_id": task_id },
            "rich_text": [{ "type": "text", "text": { "content": text } }]
        });
        self.request(Method::POST, "/comments", Some(body)).await?;

        tracing::info!(task_id = %task_id, "Added task comment");
        Ok(())
    }
}
