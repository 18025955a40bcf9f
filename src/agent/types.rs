//! Core types for the agent loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool call chosen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlates the call with its result in the transcript
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// What the planner wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerAction {
    /// Run these tools, in order, and report back.
    CallTools {
        content: Option<String>,
        calls: Vec<ToolInvocation>,
    },
    /// Stop with this final answer.
    Finish(String),
}

impl PlannerAction {
    /// A single tool call with no accompanying text.
    pub fn call(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        PlannerAction::CallTools {
            content: None,
            calls: vec![ToolInvocation::new(id, name, arguments)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Assistant {
        content: Option<String>,
        calls: Vec<ToolInvocation>,
    },
    ToolResult {
        call_id: String,
        name: String,
        output: String,
    },
}

/// Everything that happened in one agent run, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub system_prompt: String,
    pub instruction: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            instruction: instruction.into(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// Output of the most recent call to `tool`, if any.
    pub fn last_result_of(&self, tool: &str) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            TranscriptEntry::ToolResult { name, output, .. } if name == tool => {
                Some(output.as_str())
            }
            _ => None,
        })
    }

    /// Latest text the planner produced alongside a tool call.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            TranscriptEntry::Assistant {
                content: Some(text),
                ..
            } if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Per-call record kept in the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub succeeded: bool,
}

/// Reason why the agent loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    /// The planner returned a final answer
    Completed,
    /// The step budget ran out first
    StepBudgetExhausted,
}

/// Result of one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub final_text: String,
    /// Planner turns used
    pub steps: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    pub terminal_reason: TerminalReason,
}

impl AgentOutcome {
    pub fn calls_to(&self, tool: &str) -> usize {
        self.tool_calls.iter().filter(|c| c.name == tool).count()
    }
}

/// Errors that abort an agent run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Step budget must be at least 1")]
    ZeroStepBudget,
}
