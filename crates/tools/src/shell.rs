//! Shell tool — execute system commands behind the approval gate.

use crate::approval::{ApprovalPolicy, Approver};
use async_trait::async_trait;
use opsclaw_core::display::{render_box, truncate};
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolResult, parse_arguments};
use serde::Deserialize;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const NOT_APPROVED: &str = "Command not approved";

#[derive(Debug, Deserialize)]
struct ShellArgs {
    command: String,
}

/// Execute shell commands once the approval policy allows them.
pub struct ShellTool {
    policy: ApprovalPolicy,
    approver: Arc<dyn Approver>,
}

impl ShellTool {
    pub fn new(policy: ApprovalPolicy, approver: Arc<dyn Approver>) -> Self {
        Self { policy, approver }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a bash command on the host and return its standard output. \
         Commands may require operator approval before they run."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to run"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: ShellArgs = parse_arguments(arguments)?;
        let command = args.command.as_str();

        if !self.policy.resolve(command, self.approver.as_ref()).await {
            info!(command = %command, "Command not approved");
            return Ok(ToolResult::failure(NOT_APPROVED));
        }

        debug!(command = %command, "Executing shell command");

        let mut process = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        };
        let output = process
            .output()
            .await
            .map_err(|e| ToolError::failed("shell", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            let text = if stderr.trim().is_empty() {
                stdout.into_owned()
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            };
            Ok(ToolResult::text(text.trim_end()))
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            Ok(ToolResult::failure(
                format!("[exit code: {code}]\n{stdout}\n{stderr}").trim_end(),
            ))
        }
    }

    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        Some(Arc::new(ShellFormatter))
    }
}

/// Shows the command, then its (truncated) output.
pub struct ShellFormatter;

impl ResultFormatter for ShellFormatter {
    fn format(&self, call: &ToolCall, outcome: &ToolOutcome) -> String {
        let command = call.arguments["command"].as_str().unwrap_or_default();
        let output = serde_json::to_string_pretty(&outcome.to_json()).unwrap_or_default();
        format!(
            "{}\n{}",
            render_box("Command", command, None),
            render_box("Tool result (shell)", &truncate(&output, 500), None)
        )
    }
}
