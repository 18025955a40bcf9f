//! Planners decide the agent's next action from the transcript so far.
//!
//! [`LlmPlanner`] asks a chat model with tool calling. [`ScriptedPlanner`]
//! replays a fixed list of steps and is what the tests drive the workflow with.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{PlannerAction, ToolInvocation, Transcript, TranscriptEntry};
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role, ToolCall, ToolDefinition};

/// Chooses the next action for the agent loop.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_action(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> anyhow::Result<PlannerAction>;
}

/// Planner backed by a chat-completion model.
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    model: String,
    options: ChatOptions,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            options: ChatOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Rebuild the chat history from the transcript.
    fn messages(transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::new(Role::System, transcript.system_prompt.clone()),
            ChatMessage::new(Role::User, transcript.instruction.clone()),
        ];

        for entry in transcript.entries() {
            match entry {
                TranscriptEntry::Assistant { content, calls } => {
                    let tool_calls = calls
                        .iter()
                        .map(|call| {
                            ToolCall::function(&call.id, &call.name, call.arguments.to_string())
                        })
                        .collect();
                    messages.push(ChatMessage::assistant_tool_calls(content.clone(), tool_calls));
                }
                TranscriptEntry::ToolResult {
                    call_id, output, ..
                } => messages.push(ChatMessage::tool_result(call_id.clone(), output.clone())),
            }
        }

        messages
    }

    fn parse_arguments(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return json!({});
        }
        serde_json::from_str(raw).unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn next_action(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> anyhow::Result<PlannerAction> {
        let messages = Self::messages(transcript);
        let response = self
            .llm
            .chat_completion(&self.model, &messages, Some(tools), &self.options)
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM usage"
            );
        }

        match response.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => Ok(PlannerAction::CallTools {
                content: response.content,
                calls: tool_calls
                    .into_iter()
                    .map(|call| ToolInvocation {
                        arguments: Self::parse_arguments(&call.function.arguments),
                        id: call.id,
                        name: call.function.name,
                    })
                    .collect(),
            }),
            _ => Ok(PlannerAction::Finish(
                response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "LLM returned empty response".to_string()),
            )),
        }
    }
}

type Step = Box<dyn FnOnce(&Transcript) -> anyhow::Result<PlannerAction> + Send>;

/// Planner that replays a fixed sequence of steps.
///
/// Each step sees the transcript so it can branch on earlier tool results.
/// Once the steps run out the planner finishes.
#[derive(Default)]
pub struct ScriptedPlanner {
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step computed from the transcript.
    pub fn then<F>(self, step: F) -> Self
    where
        F: FnOnce(&Transcript) -> anyhow::Result<PlannerAction> + Send + 'static,
    {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(Box::new(step));
        }
        self
    }

    /// Add a single fixed tool call.
    pub fn then_call(self, name: &str, arguments: Value) -> Self {
        let id = format!("call_{}", self.len() + 1);
        let name = name.to_string();
        self.then(move |_| Ok(PlannerAction::call(id, name, arguments)))
    }

    pub fn then_finish(self, text: &str) -> Self {
        let text = text.to_string();
        self.then(move |_| Ok(PlannerAction::Finish(text)))
    }

    pub fn then_fail(self, message: &str) -> Self {
        let message = message.to_string();
        self.then(move |_| Err(anyhow::anyhow!(message)))
    }

    pub fn len(&self) -> usize {
        self.steps.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn next_action(
        &self,
        transcript: &Transcript,
        _tools: &[ToolDefinition],
    ) -> anyhow::Result<PlannerAction> {
        let step = self
            .steps
            .lock()
            .map_err(|_| anyhow::anyhow!("Scripted planner lock poisoned"))?
            .pop_front();

        match step {
            Some(step) => step(transcript),
            None => Ok(PlannerAction::Finish("Script finished".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatResponse;

    /// Returns one canned response and remembers what it was sent.
    struct CannedLlm {
        response: ChatResponse,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
            _tools: Option<&[ToolDefinition]>,
            _options: &ChatOptions,
        ) -> anyhow::Result<ChatResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.response.clone())
        }
    }

    fn canned(content: Option<&str>, tool_calls: Option<Vec<ToolCall>>) -> Arc<CannedLlm> {
        Arc::new(CannedLlm {
            response: ChatResponse {
                content: content.map(str::to_string),
                tool_calls,
                finish_reason: None,
                usage: None,
            },
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_llm_tool_calls_become_invocations() {
        let llm = canned(
            None,
            Some(vec![
                ToolCall::function("call_a", "readKanbanBoard", r#"{"databaseId":"db"}"#),
                ToolCall::function("call_b", "listRepositoryBranches", ""),
            ]),
        );
        let planner = LlmPlanner::new(llm, "test-model");

        let action = planner
            .next_action(&Transcript::new("system", "go"), &[])
            .await
            .unwrap();

        match action {
            PlannerAction::CallTools { calls, .. } => {
                assert_eq!(calls[0].arguments, json!({"databaseId": "db"}));
                assert_eq!(calls[1].arguments, json!({}));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_llm_transcript_is_replayed_in_order() {
        let llm = canned(Some("All done"), None);
        let planner = LlmPlanner::new(llm.clone(), "test-model");

        let mut transcript = Transcript::new("system", "go");
        transcript.push(TranscriptEntry::Assistant {
            content: None,
            calls: vec![ToolInvocation::new("call_1", "readKanbanBoard", json!({}))],
        });
        transcript.push(TranscriptEntry::ToolResult {
            call_id: "call_1".to_string(),
            name: "readKanbanBoard".to_string(),
            output: "{\"tasks\":[]}".to_string(),
        });

        let action = planner.next_action(&transcript, &[]).await.unwrap();
        assert_eq!(action, PlannerAction::Finish("All done".to_string()));

        let sent = &llm.seen.lock().unwrap()[0];
        let roles: Vec<Role> = sent.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(sent[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_empty_llm_response_finishes() {
        let planner = LlmPlanner::new(canned(Some("  "), Some(vec![])), "test-model");
        let action = planner
            .next_action(&Transcript::new("s", "i"), &[])
            .await
            .unwrap();
        assert_eq!(
            action,
            PlannerAction::Finish("LLM returned empty response".to_string())
        );
    }

    #[tokio::test]
    async fn test_scripted_planner_replays_then_finishes() {
        let planner = ScriptedPlanner::new()
            .then_call("readKanbanBoard", json!({"databaseId": "db"}))
            .then_finish("done");
        let transcript = Transcript::new("s", "i");

        assert_eq!(
            planner.next_action(&transcript, &[]).await.unwrap(),
            PlannerAction::call("call_1", "readKanbanBoard", json!({"databaseId": "db"}))
        );
        assert_eq!(
            planner.next_action(&transcript, &[]).await.unwrap(),
            PlannerAction::Finish("done".to_string())
        );
        assert_eq!(
            planner.next_action(&transcript, &[]).await.unwrap(),
            PlannerAction::Finish("Script finished".to_string())
        );
    }
}
