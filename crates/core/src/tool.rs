//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act: run shell commands,
//! speak, fetch from the web service, draw charts, analyze images, save
//! logs, and wait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// What a tool reports after running.
///
/// `success = false` is a failure the tool itself detected and described
/// (bad input shape, HTTP error status, command not approved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool considers the operation successful
    pub success: bool,

    /// Human/model readable output
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful plain-text result.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// A tool-reported failure.
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            data: None,
        }
    }

    /// A result carrying structured data alongside its text.
    pub fn structured(success: bool, output: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success,
            output: output.into(),
            data: Some(data),
        }
    }
}

/// The outcome of one tool call, as seen by the step engine and formatters.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The tool ran and reported a result (which may itself be a failure).
    Reported(ToolResult),
    /// The arguments did not match the tool's parameter schema.
    Invalid(String),
    /// The tool raised an error instead of reporting a result.
    Raised(String),
}

impl ToolOutcome {
    /// Text fed back to the model as the tool result content.
    pub fn to_model_text(&self) -> String {
        match self {
            Self::Reported(result) => match &result.data {
                Some(data) => data.to_string(),
                None => result.output.clone(),
            },
            Self::Invalid(message) => format!("Invalid arguments: {message}"),
            Self::Raised(message) => format!("Error: {message}"),
        }
    }

    /// JSON rendering of the result value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Reported(result) => result
                .data
                .clone()
                .unwrap_or_else(|| serde_json::Value::String(result.output.clone())),
            Self::Invalid(message) => serde_json::json!({
                "error": "invalid_arguments",
                "message": message,
            }),
            Self::Raised(message) => serde_json::Value::String(format!("Error: {message}")),
        }
    }

    /// Whether the call ended in a successful reported result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Reported(result) if result.success)
    }
}

/// Renders one tool call and its outcome for the console.
///
/// Formatters are pure: they return the text and the driver prints it.
pub trait ResultFormatter: Send + Sync {
    fn format(&self, call: &ToolCall, outcome: &ToolOutcome) -> String;
}

/// The core Tool trait.
///
/// Each tool implements this trait, is registered in the ToolRegistry, and
/// is made available to the step engine.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "save_log").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Console formatter for this tool's results, if it has its own.
    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        None
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Decode tool arguments into a typed struct, mapping decode errors to
/// `ToolError::InvalidArguments`.
pub fn parse_arguments<T: DeserializeOwned>(
    arguments: serde_json::Value,
) -> std::result::Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A registry of available tools.
///
/// The step engine uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, sorted by name (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool call. Never fails: every error becomes an outcome.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.tools.get(&call.name) else {
            return ToolOutcome::Raised(ToolError::NotFound(call.name.clone()).to_string());
        };
        match tool.execute(call.arguments.clone()).await {
            Ok(result) => ToolOutcome::Reported(result),
            Err(ToolError::InvalidArguments(message)) => ToolOutcome::Invalid(message),
            Err(e) => ToolOutcome::Raised(e.to_string()),
        }
    }

    /// Registered formatters keyed by tool name.
    pub fn formatters(&self) -> HashMap<String, Arc<dyn ResultFormatter>> {
        self.tools
            .iter()
            .filter_map(|(name, tool)| tool.formatter().map(|f| (name.clone(), f)))
            .collect()
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
