//! The step engine — generate text with tools.
//!
//! Each step sends the transcript to the provider, executes every tool call
//! the response asks for, appends the results, and reports the step to the
//! observer. The run ends on the first response without tool calls or once
//! `max_steps` steps have been reported.

use async_trait::async_trait;
use opsclaw_core::message::{Message, MessageToolCall};
use opsclaw_core::provider::{Provider, ProviderRequest};
use opsclaw_core::step::{StepEvent, StepToolResult};
use opsclaw_core::tool::{ToolCall, ToolOutcome, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hard ceiling on steps per run.
pub const DEFAULT_MAX_STEPS: u32 = opsclaw_config::MAX_STEPS_CAP;

/// Receives every completed step, in order.
///
/// The runner awaits each call before starting the next step, so a slow
/// observer holds the run back.
#[async_trait]
pub trait StepObserver: Send {
    async fn on_step_finish(&mut self, event: &StepEvent);
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Text of the final step
    pub text: String,

    /// Number of steps reported
    pub steps: u32,
}

pub struct StepRunner {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_steps: u32,
}

impl StepRunner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Clamped to `1..=DEFAULT_MAX_STEPS`.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.clamp(1, DEFAULT_MAX_STEPS);
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run `prompt` to completion.
    ///
    /// Provider errors end the run and propagate unchanged. Tool failures
    /// never do: they are fed back to the model as tool results.
    pub async fn run(
        &self,
        prompt: &str,
        observer: &mut dyn StepObserver,
    ) -> opsclaw_core::Result<Generation> {
        info!(
            provider = self.provider.name(),
            model = %self.model,
            max_steps = self.max_steps,
            "Starting run"
        );

        let definitions = self.tools.definitions();
        let mut messages = vec![Message::user(prompt)];
        let mut index = 0;

        loop {
            index += 1;
            debug!(step = index, messages = messages.len(), "Requesting step");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };
            let response = self.provider.complete(request).await?;

            let usage = response.usage.unwrap_or_default();
            let text = response.message.content.clone();
            let requested = response.message.tool_calls.clone();
            messages.push(response.message);

            let mut tool_calls = Vec::with_capacity(requested.len());
            let mut tool_results = Vec::with_capacity(requested.len());
            for raw in &requested {
                let (call, outcome) = self.execute(raw).await;
                debug!(
                    step = index,
                    tool = %call.name,
                    success = outcome.is_success(),
                    "Tool call finished"
                );
                messages.push(Message::tool_result(&call.id, outcome.to_model_text()));
                tool_results.push(StepToolResult {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    outcome,
                });
                tool_calls.push(call);
            }

            let finished = tool_calls.is_empty();
            let event = StepEvent {
                index,
                text: text.clone(),
                tool_calls,
                tool_results,
                usage,
            };
            observer.on_step_finish(&event).await;

            if finished {
                info!(steps = index, "Run finished");
                return Ok(Generation { text, steps: index });
            }
            if index >= self.max_steps {
                warn!(steps = index, "Step limit reached, ending run");
                return Ok(Generation { text, steps: index });
            }
        }
    }

    /// Decode the raw argument string and run the call through the registry.
    async fn execute(&self, raw: &MessageToolCall) -> (ToolCall, ToolOutcome) {
        let source = if raw.arguments.trim().is_empty() {
            "{}"
        } else {
            raw.arguments.as_str()
        };
        match serde_json::from_str(source) {
            Ok(arguments) => {
                let call = ToolCall {
                    id: raw.id.clone(),
                    name: raw.name.clone(),
                    arguments,
                };
                let outcome = self.tools.execute(&call).await;
                (call, outcome)
            }
            Err(e) => {
                warn!(tool = %raw.name, error = %e, "Tool arguments are not valid JSON");
                let call = ToolCall {
                    id: raw.id.clone(),
                    name: raw.name.clone(),
                    arguments: serde_json::Value::String(raw.arguments.clone()),
                };
                (call, ToolOutcome::Invalid(format!("arguments are not valid JSON: {e}")))
            }
        }
    }
}
