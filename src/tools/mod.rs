//! Tool system for the agent.
//!
//! Tools are the agent's only way to touch the outside world: the kanban board,
//! the GitHub repository, and the code intelligence backend. Each tool has a
//! camelCase name, a JSON schema for its arguments and returns a JSON value.
//!
//! ## Error policy
//!
//! The two read-only board queries (`readKanbanBoard`, `queryTaskDetails`)
//! return `Err` on failure; the agent loop turns that into an `Error: ...`
//! tool result. Every other tool catches its own failures and answers
//! `{"success": false, "message": ...}` so the agent always gets a
//! well-formed object back.

mod development;
mod github;
mod kanban;

pub use development::{AnalyzeCodebase, ImplementCodeChanges, RunCodeTests, ValidateCodeQuality};
pub use github::{
    CommitCode, CreateBranch, CreatePullRequest, GetRepositoryContent, ListRepositoryBranches,
};
pub use kanban::{AddTaskComment, QueryTaskDetails, ReadKanbanBoard, UpdateTaskStatus};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::github::RepositoryAccessor;
use crate::intelligence::CodeIntelligenceProvider;
use crate::llm::ToolDefinition;
use crate::notion::Board;

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<Value>;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry (no built-in tools).
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with every board, repository and code intelligence tool.
    pub fn with_services(
        board: Arc<dyn Board>,
        repository: Arc<RepositoryAccessor>,
        intelligence: Arc<dyn CodeIntelligenceProvider>,
    ) -> Self {
        let mut registry = Self::empty();

        // Board
        registry.register(Arc::new(ReadKanbanBoard::new(Arc::clone(&board))));
        registry.register(Arc::new(QueryTaskDetails::new(Arc::clone(&board))));
        registry.register(Arc::new(UpdateTaskStatus::new(Arc::clone(&board))));
        registry.register(Arc::new(AddTaskComment::new(board)));

        // Repository
        registry.register(Arc::new(CreateBranch::new(Arc::clone(&repository))));
        registry.register(Arc::new(CommitCode::new(Arc::clone(&repository))));
        registry.register(Arc::new(CreatePullRequest::new(Arc::clone(&repository))));
        registry.register(Arc::new(GetRepositoryContent::new(Arc::clone(&repository))));
        registry.register(Arc::new(ListRepositoryBranches::new(repository)));

        // Code intelligence
        registry.register(Arc::new(AnalyzeCodebase::new(Arc::clone(&intelligence))));
        registry.register(Arc::new(ImplementCodeChanges::new(Arc::clone(&intelligence))));
        registry.register(Arc::new(RunCodeTests::new(Arc::clone(&intelligence))));
        registry.register(Arc::new(ValidateCodeQuality::new(intelligence)));

        tracing::debug!("Tool registry ready with {} tools", registry.tools.len());
        registry
    }

    /// Add a tool, replacing any tool registered under the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List all available tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Check if a tool exists by name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool schemas in LLM-compatible format, sorted by name.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        let mut schemas: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::function(t.name(), t.description(), t.parameters_schema()))
            .collect();
        schemas.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        schemas
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args).await
    }
}

/// `{"success": false, "message": ...}`
pub(crate) fn failure(message: impl std::fmt::Display) -> Value {
    json!({
        "success": false,
        "message": message.to_string(),
    })
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    args[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", key))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryAccessor;
    use crate::intelligence::PlaceholderIntelligence;
    use crate::testing::{FakeBoard, RecordingGitHost};

    fn registry() -> ToolRegistry {
        ToolRegistry::with_services(
            Arc::new(FakeBoard::new(vec![])),
            Arc::new(RepositoryAccessor::new(Arc::new(RecordingGitHost::new()))),
            Arc::new(PlaceholderIntelligence),
        )
    }

    #[test]
    fn test_registry_exposes_all_tools() {
        let names: Vec<String> = registry().list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "addTaskComment",
                "analyzeCodebase",
                "commitCode",
                "createBranch",
                "createPullRequest",
                "getRepositoryContent",
                "implementCodeChanges",
                "listRepositoryBranches",
                "queryTaskDetails",
                "readKanbanBoard",
                "runCodeTests",
                "updateTaskStatus",
                "validateCodeQuality",
            ]
        );
    }

    #[test]
    fn test_schemas_are_objects() {
        for schema in registry().get_tool_schemas() {
            assert_eq!(schema.tool_type, "function");
            assert_eq!(
                schema.function.parameters["type"], "object",
                "{} schema",
                schema.function.name
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let err = registry().execute("deleteEverything", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: deleteEverything");
    }

    #[test]
    fn test_required_str_rejects_blank() {
        let args = json!({"owner": "  ", "repo": "widgets"});
        assert!(required_str(&args, "owner").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(required_str(&args, "repo").unwrap(), "widgets");
    }
}
