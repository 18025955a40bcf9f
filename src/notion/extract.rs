//! Field extraction from Notion page and block JSON.
//!
//! Boards are not consistent about property names, so each field is looked up
//! through a fixed alias list, first match wins.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::Task;

pub const TITLE_ALIASES: &[&str] = &["Title", "title", "Name", "name", "Task", "task"];
pub const STATUS_ALIASES: &[&str] = &["Status", "status", "State", "state"];
pub const DESCRIPTION_ALIASES: &[&str] = &["Description", "description", "Details", "details"];
pub const ASSIGNEE_ALIASES: &[&str] = &["Assignee", "assignee", "Assigned To", "Owner"];
pub const PRIORITY_ALIASES: &[&str] = &["Priority", "priority"];

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Concatenate the plain text of a rich-text array.
pub fn plain_text(rich_text: &Value) -> String {
    rich_text
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| {
                    part["plain_text"]
                        .as_str()
                        .or_else(|| part["text"]["content"].as_str())
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Render a single property value as text, if its type carries any.
pub fn property_text(property: &Value) -> Option<String> {
    let text = match property["type"].as_str()? {
        "title" => plain_text(&property["title"]),
        "rich_text" => plain_text(&property["rich_text"]),
        "select" => property["select"]["name"].as_str()?.to_string(),
        "status" => property["status"]["name"].as_str()?.to_string(),
        "multi_select" => property["multi_select"]
            .as_array()?
            .iter()
            .filter_map(|o| o["name"].as_str())
            .collect::<Vec<_>>()
            .join(", "),
        "people" => property["people"]
            .as_array()?
            .first()?
            .get("name")?
            .as_str()?
            .to_string(),
        _ => return None,
    };
    Some(text).filter(|t| !t.trim().is_empty())
}

/// Look up the first alias that is present and non-empty.
pub fn first_alias(properties: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| properties.get(*alias).and_then(property_text))
}

fn any_title_property(properties: &Value) -> Option<String> {
    properties
        .as_object()?
        .values()
        .filter(|p| p["type"] == "title")
        .find_map(property_text)
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build a [`Task`] from a page object.
pub fn task_from_page(page: &Value) -> Task {
    let properties = &page["properties"];

    let title = first_alias(properties, TITLE_ALIASES)
        .or_else(|| any_title_property(properties))
        .unwrap_or_else(|| UNTITLED.to_string());

    Task {
        id: page["id"].as_str().unwrap_or_default().to_string(),
        title,
        status: first_alias(properties, STATUS_ALIASES)
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        description: first_alias(properties, DESCRIPTION_ALIASES).unwrap_or_default(),
        assignee: first_alias(properties, ASSIGNEE_ALIASES),
        priority: first_alias(properties, PRIORITY_ALIASES),
        created_time: timestamp(&page["created_time"]),
        last_edited_time: timestamp(&page["last_edited_time"]),
        url: page["url"].as_str().unwrap_or_default().to_string(),
        properties: properties.clone(),
        content: None,
    }
}

/// Database id the page belongs to, if it lives in a database.
pub fn parent_database_id(page: &Value) -> Option<&str> {
    page["parent"]["database_id"].as_str()
}

/// Compare Notion ids ignoring hyphens and case.
pub fn same_id(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect::<String>()
    };
    normalize(a) == normalize(b)
}

/// Name and kind (`status` or `select`) of the page's status property.
///
/// Falls back to `("Status", "status")` when the page has none.
pub fn status_property(page: &Value) -> (String, String) {
    let properties = &page["properties"];
    STATUS_ALIASES
        .iter()
        .find_map(|alias| {
            let property = properties.get(*alias)?;
            let kind = match property["type"].as_str() {
                Some("select") => "select",
                _ => "status",
            };
            Some((alias.to_string(), kind.to_string()))
        })
        .unwrap_or_else(|| ("Status".to_string(), "status".to_string()))
}

/// Flatten page blocks into a Markdown-ish text document.
pub fn flatten_blocks(blocks: &[Value]) -> String {
    let lines: Vec<String> = blocks
        .iter()
        .filter_map(|block| {
            let kind = block["type"].as_str()?;
            let text = plain_text(&block[kind]["rich_text"]);
            let line = match kind {
                "paragraph" => text,
                "heading_1" => format!("# {}", text),
                "heading_2" => format!("## {}", text),
                "heading_3" => format!("### {}", text),
                "bulleted_list_item" => format!("- {}", text),
                "numbered_list_item" => format!("1. {}", text),
                "to_do" => {
                    let mark = if block[kind]["checked"].as_bool().unwrap_or(false) {
                        "x"
                    } else {
                        " "
                    };
                    format!("- [{}] {}", mark, text)
                }
                _ => return None,
            };
            Some(line.trim_end().to_string())
        })
        .collect();

    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rich(text: &str) -> Value {
        json!([{ "type": "text", "plain_text": text, "text": { "content": text } }])
    }

    fn page(properties: Value) -> Value {
        json!({
            "id": "1f2e3d4c-0000-0000-0000-000000000001",
            "url": "https://www.notion.so/Add-dark-mode-1f2e3d4c",
            "created_time": "2026-02-01T09:00:00.000Z",
            "last_edited_time": "2026-02-02T10:30:00.000Z",
            "parent": { "type": "database_id", "database_id": "abcd-ef01" },
            "properties": properties
        })
    }

    #[test]
    fn test_title_prefers_title_over_name() {
        let page = page(json!({
            "Name": { "type": "title", "title": rich("From Name") },
            "Title": { "type": "rich_text", "rich_text": rich("From Title") }
        }));
        assert_eq!(task_from_page(&page).title, "From Title");
    }

    #[test]
    fn test_defaults_when_properties_missing() {
        let task = task_from_page(&page(json!({})));
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.status, UNKNOWN_STATUS);
        assert_eq!(task.description, "");
        assert!(task.assignee.is_none());
    }

    #[test]
    fn test_title_falls_back_to_any_title_property() {
        let page = page(json!({
            "Ticket": { "type": "title", "title": rich("Fix login") }
        }));
        assert_eq!(task_from_page(&page).title, "Fix login");
    }

    #[test]
    fn test_extracts_all_fields() {
        let page = page(json!({
            "Name": { "type": "title", "title": rich("Add dark mode") },
            "status": { "type": "status", "status": { "name": "To Do" } },
            "Description": { "type": "rich_text", "rich_text": rich("Theme toggle in settings") },
            "Assignee": { "type": "people", "people": [{ "name": "Sam" }] },
            "Priority": { "type": "select", "select": { "name": "High" } }
        }));
        let task = task_from_page(&page);
        assert_eq!(task.title, "Add dark mode");
        assert_eq!(task.status, "To Do");
        assert_eq!(task.description, "Theme toggle in settings");
        assert_eq!(task.assignee.as_deref(), Some("Sam"));
        assert_eq!(task.priority.as_deref(), Some("High"));
        assert!(task.created_time.is_some());
        assert_eq!(task.properties["Priority"]["select"]["name"], "High");
    }

    #[test]
    fn test_status_property_detects_select_kind() {
        let page = page(json!({ "State": { "type": "select", "select": null } }));
        assert_eq!(
            status_property(&page),
            ("State".to_string(), "select".to_string())
        );
        assert_eq!(
            status_property(&json!({ "properties": {} })),
            ("Status".to_string(), "status".to_string())
        );
    }

    #[test]
    fn test_same_id_ignores_hyphens() {
        assert!(same_id("ABCD-ef01", "abcdef01"));
        assert!(!same_id("abcd", "abce"));
        assert_eq!(parent_database_id(&page(json!({}))), Some("abcd-ef01"));
    }

    #[test]
    fn test_flatten_blocks() {
        let block = |kind: &str, text: &str| json!({ "type": kind, kind: { "rich_text": rich(text) } });
        let blocks = vec![
            block("heading_1", "Goal"),
            block("paragraph", "Users want a dark theme.  "),
            block("heading_2", "Steps"),
            block("bulleted_list_item", "Add toggle"),
            block("numbered_list_item", "Persist choice"),
            block("heading_3", "Notes"),
            json!({ "type": "to_do", "to_do": { "rich_text": rich("QA"), "checked": true } }),
            json!({ "type": "image", "image": {} }),
            block("paragraph", ""),
        ];
        assert_eq!(
            flatten_blocks(&blocks),
            "# Goal\nUsers want a dark theme.\n## Steps\n- Add toggle\n1. Persist choice\n### Notes\n- [x] QA"
        );
    }
}
