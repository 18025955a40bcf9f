//! Agent module: a planner choosing tool calls inside a bounded loop.
//!
//! The planner is pluggable. Production runs use [`LlmPlanner`]; tests script
//! the exact call sequence with [`ScriptedPlanner`].

mod executor;
mod planner;
mod types;

pub use executor::AgentLoop;
pub use planner::{LlmPlanner, Planner, ScriptedPlanner};
pub use types::{
    AgentError, AgentOutcome, PlannerAction, TerminalReason, ToolCallRecord, ToolInvocation,
    Transcript, TranscriptEntry,
};
