//! The agent loop: ask the planner, run its tools, feed results back.

use std::sync::Arc;

use serde_json::Value;

use super::planner::Planner;
use super::types::{
    AgentError, AgentOutcome, PlannerAction, TerminalReason, ToolCallRecord, ToolInvocation,
    Transcript, TranscriptEntry,
};
use crate::tools::ToolRegistry;

/// Runs a planner against a tool registry within a step budget.
///
/// # Algorithm
/// 1. Ask the planner for the next action, given the transcript so far
/// 2. If it requests tool calls: run them one at a time, append the results
/// 3. Repeat until the planner finishes or `max_steps` planner turns are used
///
/// A tool error never aborts the run; the planner sees `Error: ...` as the
/// result. A planner error does abort it.
pub struct AgentLoop {
    planner: Arc<dyn Planner>,
    tools: Arc<ToolRegistry>,
    max_steps: usize,
}

impl AgentLoop {
    pub fn new(planner: Arc<dyn Planner>, tools: Arc<ToolRegistry>, max_steps: usize) -> Self {
        Self {
            planner,
            tools,
            max_steps,
        }
    }

    pub async fn run(
        &self,
        system_prompt: &str,
        instruction: &str,
    ) -> Result<AgentOutcome, AgentError> {
        if self.max_steps == 0 {
            return Err(AgentError::ZeroStepBudget);
        }

        let schemas = self.tools.get_tool_schemas();
        let mut transcript = Transcript::new(system_prompt, instruction);
        let mut records = Vec::new();

        for step in 0..self.max_steps {
            tracing::debug!("Agent step {}", step + 1);

            let action = self
                .planner
                .next_action(&transcript, &schemas)
                .await
                .map_err(|e| AgentError::Planner(e.to_string()))?;

            let (content, calls) = match action {
                PlannerAction::Finish(text) => {
                    tracing::info!(steps = step + 1, tool_calls = records.len(), "Agent finished");
                    return Ok(AgentOutcome {
                        final_text: text,
                        steps: step + 1,
                        tool_calls: records,
                        terminal_reason: TerminalReason::Completed,
                    });
                }
                PlannerAction::CallTools { content, calls } => (content, calls),
            };

            transcript.push(TranscriptEntry::Assistant {
                content,
                calls: calls.clone(),
            });

            for call in &calls {
                let (output, succeeded) = self.execute_tool_call(call).await;
                records.push(ToolCallRecord {
                    name: call.name.clone(),
                    succeeded,
                });
                transcript.push(TranscriptEntry::ToolResult {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    output,
                });
            }
        }

        tracing::warn!(max_steps = self.max_steps, "Agent step budget exhausted");
        let final_text = transcript
            .last_assistant_text()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Max steps ({}) reached", self.max_steps));

        Ok(AgentOutcome {
            final_text,
            steps: self.max_steps,
            tool_calls: records,
            terminal_reason: TerminalReason::StepBudgetExhausted,
        })
    }

    /// Run one tool; returns the text handed back to the planner and whether it succeeded.
    async fn execute_tool_call(&self, call: &ToolInvocation) -> (String, bool) {
        tracing::debug!(tool = %call.name, args = %call.arguments, "Calling tool");

        match self.tools.execute(&call.name, call.arguments.clone()).await {
            Ok(value) => {
                let succeeded = value.get("success").and_then(Value::as_bool) != Some(false);
                if !succeeded {
                    tracing::warn!(tool = %call.name, result = %value["message"], "Tool reported failure");
                }
                let output = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (output, succeeded)
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                (format!("Error: {}", e), false)
            }
        }
    }
}
