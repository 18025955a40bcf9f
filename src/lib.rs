//! # CTO Agent
//!
//! Autonomous agent that turns kanban tasks into pull requests.
//!
//! ## Architecture
//!
//! ```text
//!   scheduler ──▶ CtoWorkflow ──▶ AgentLoop ◀──▶ Planner (LLM or scripted)
//!                                    │
//!                                    ▼
//!                               ToolRegistry
//!                  ┌─────────────────┼──────────────────┐
//!                  ▼                 ▼                  ▼
//!            Board (Notion)   RepositoryAccessor   CodeIntelligence
//!                                (GitHub)           (placeholder)
//! ```
//!
//! ## Run Flow
//! 1. The workflow hands the agent a fixed instruction (board, repository, base branch)
//! 2. The planner picks tools; the loop runs them one at a time within a step budget
//! 3. The agent's final answer is scraped for task and pull request counts
//! 4. A report is logged and a [`workflow::WorkflowResult`] returned
//!
//! ## Modules
//! - `config`: environment configuration
//! - `credentials`: access tokens, cached with a single in-flight refresh
//! - `notion` / `github`: board and repository hosts
//! - `intelligence`: analysis/planning/test/quality backend
//! - `llm`: OpenRouter chat-completion client
//! - `agent`: planners and the agent loop
//! - `tools`: the tools the agent can call
//! - `workflow`: orchestration, metrics, report, schedule

pub mod agent;
pub mod config;
pub mod credentials;
pub mod error;
pub mod github;
pub mod intelligence;
pub mod llm;
pub mod notion;
pub mod tools;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use workflow::{CtoWorkflow, WorkflowResult};
