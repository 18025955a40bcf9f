//! The CTO workflow: one agent pass over the board, then a report.
//!
//! ```text
//!  Idle ──▶ Discovering ──▶ AgentRunning ──▶ Reporting ──▶ Idle
//! ```
//!
//! The agent is told to take exactly one "To Do" task. That limit lives in
//! the instruction text only; nothing here can stop the agent from doing more.
//! Metrics are scraped from the agent's final answer (see [`metrics`]) and
//! are approximate.

pub mod metrics;
pub mod prompt;
pub mod report;
mod schedule;

pub use schedule::run_on_schedule;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentLoop, LlmPlanner, TerminalReason};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::github::{GitHost, GitHubClient, RepositoryAccessor};
use crate::intelligence::PlaceholderIntelligence;
use crate::llm::{LlmClient, OpenRouterClient};
use crate::notion::{Board, NotionBoard};
use crate::tools::ToolRegistry;

use metrics::ProcessingSummary;

/// What one run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResult {
    /// Parsed from the agent's text; not authoritative
    pub tasks_processed: usize,
    pub completed_tasks: Vec<String>,
    pub errors: Vec<String>,
    pub summary: String,
    pub notifications_sent: usize,
    pub report_generated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Discovering,
    AgentRunning,
    Reporting,
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::Discovering => "discovering",
            WorkflowPhase::AgentRunning => "agent-running",
            WorkflowPhase::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

pub struct CtoWorkflow {
    config: Config,
    agent: AgentLoop,
    phase: Mutex<WorkflowPhase>,
}

impl CtoWorkflow {
    pub fn new(config: Config, agent: AgentLoop) -> Self {
        Self {
            config,
            agent,
            phase: Mutex::new(WorkflowPhase::Idle),
        }
    }

    /// Wire the Notion board, GitHub, OpenRouter and the placeholder
    /// intelligence backend from configuration.
    pub fn from_config(config: Config) -> Self {
        let notion_credentials = Arc::new(CredentialStore::from_config(&config.notion_token));
        let github_credentials = Arc::new(CredentialStore::from_config(&config.github_token));

        let board: Arc<dyn Board> = Arc::new(NotionBoard::new(
            config.notion_api_base.clone(),
            notion_credentials,
        ));
        let host: Arc<dyn GitHost> = Arc::new(GitHubClient::new(
            config.github_api_base.clone(),
            github_credentials,
        ));
        let tools = Arc::new(ToolRegistry::with_services(
            board,
            Arc::new(RepositoryAccessor::new(host)),
            Arc::new(PlaceholderIntelligence),
        ));

        let llm: Arc<dyn LlmClient> = Arc::new(OpenRouterClient::new(config.api_key.clone()));
        let planner = Arc::new(LlmPlanner::new(llm, config.default_model.clone()));
        let agent = AgentLoop::new(planner, tools, config.max_steps);

        Self::new(config, agent)
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
            .lock()
            .map(|p| *p)
            .unwrap_or(WorkflowPhase::Idle)
    }

    fn enter(&self, phase: WorkflowPhase) {
        if let Ok(mut current) = self.phase.lock() {
            let previous = *current;
            tracing::info!(from = %previous, to = %phase, "Workflow phase");
            *current = phase;
        }
    }

    /// One full pass. Never returns an error: failures end up in `errors`.
    pub async fn run(&self) -> WorkflowResult {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("workflow", run_id = %run_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> WorkflowResult {
        self.enter(WorkflowPhase::Discovering);
        let instruction = prompt::instruction(&self.config);

        self.enter(WorkflowPhase::AgentRunning);
        let processed = match self.agent.run(prompt::SYSTEM_PROMPT, &instruction).await {
            Ok(outcome) => {
                tracing::info!(
                    steps = outcome.steps,
                    tool_calls = outcome.tool_calls.len(),
                    failed_calls = outcome.tool_calls.iter().filter(|c| !c.succeeded).count(),
                    "Agent run complete"
                );
                let mut processed = metrics::extract(&outcome.final_text);
                if outcome.terminal_reason == TerminalReason::StepBudgetExhausted {
                    processed.errors.push(format!(
                        "Agent stopped after reaching the step budget ({} steps)",
                        outcome.steps
                    ));
                }
                processed
            }
            Err(e) => {
                tracing::error!(error = %e, "Agent run failed");
                ProcessingSummary {
                    errors: vec![format!("Agent run failed: {}", e)],
                    summary: "Workflow failed before any task was processed".to_string(),
                    ..Default::default()
                }
            }
        };

        self.enter(WorkflowPhase::Reporting);
        let report = report::notify(&processed);

        self.enter(WorkflowPhase::Idle);
        WorkflowResult {
            tasks_processed: processed.tasks_processed,
            completed_tasks: processed.completed_tasks,
            errors: processed.errors,
            summary: processed.summary,
            notifications_sent: report.notifications_sent,
            report_generated: report.report_generated,
        }
    }
}
