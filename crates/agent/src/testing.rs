//! Shared test doubles for the step engine and driver.

use crate::step_runner::StepObserver;
use async_trait::async_trait;
use opsclaw_core::error::{ProviderError, ToolError};
use opsclaw_core::message::{Message, MessageToolCall};
use opsclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use opsclaw_core::step::StepEvent;
use opsclaw_core::tool::{Tool, ToolResult, parse_arguments};
use serde::Deserialize;
use std::sync::Mutex;

/// Returns scripted responses in order and records every request.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    error: Option<ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            error: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let mut responses = self.responses.lock().unwrap();
        assert!(!responses.is_empty(), "ScriptedProvider exhausted");
        Ok(responses.remove(0))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(text: &str, calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut response = make_text_response(text);
    response.message.tool_calls = calls;
    response
}

/// Call ids are `call_<name>`.
pub fn make_tool_call(name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: arguments.into(),
    }
}

pub fn with_prompt_tokens(mut response: ProviderResponse, prompt_tokens: u32) -> ProviderResponse {
    response.usage = Some(Usage {
        prompt_tokens,
        completion_tokens: 5,
        total_tokens: prompt_tokens + 5,
    });
    response
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: Vec<StepEvent>,
}

#[async_trait]
impl StepObserver for RecordingObserver {
    async fn on_step_finish(&mut self, event: &StepEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Deserialize)]
struct EchoArgs {
    text: String,
}

/// Echoes `text`; has no formatter of its own.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: EchoArgs = parse_arguments(arguments)?;
        Ok(ToolResult::text(args.text))
    }
}
