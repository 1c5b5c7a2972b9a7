//! Wait tool — pause the agent for a bounded time.

use async_trait::async_trait;
use opsclaw_core::display::render_box;
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolResult, parse_arguments};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest wait the tool will honor, in seconds.
pub const MAX_WAIT_SECS: f64 = 300.0;

#[derive(Debug, Deserialize)]
struct WaitArgs {
    duration: f64,
}

pub struct WaitTool;

#[async_trait]
impl Tool for WaitTool {
    fn name(&self) -> &str {
        "wait"
    }

    fn description(&self) -> &str {
        "Pauses execution for the specified duration in seconds. Use this when you need to wait \
         before performing the next action."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "duration": {
                    "type": "number",
                    "exclusiveMinimum": 0,
                    "description": "The duration to wait in seconds. Maximum allowed value is 300 seconds (5 minutes)."
                }
            },
            "required": ["duration"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: WaitArgs = parse_arguments(arguments)?;
        if !(args.duration.is_finite() && args.duration > 0.0) {
            return Err(ToolError::InvalidArguments(format!(
                "duration must be a positive number of seconds, got {}",
                args.duration
            )));
        }

        let limited = args.duration.min(MAX_WAIT_SECS);
        debug!(requested = args.duration, waiting = limited, "Waiting");
        tokio::time::sleep(Duration::from_secs_f64(limited)).await;

        let message = if args.duration > limited {
            format!("Waited for {limited} seconds (limited from {} seconds)", args.duration)
        } else {
            format!("Waited for {limited} seconds")
        };

        Ok(ToolResult::structured(
            true,
            message.clone(),
            serde_json::json!({
                "success": true,
                "duration": limited,
                "message": message,
            }),
        ))
    }

    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        Some(Arc::new(WaitFormatter))
    }
}

pub struct WaitFormatter;

impl ResultFormatter for WaitFormatter {
    fn format(&self, call: &ToolCall, _outcome: &ToolOutcome) -> String {
        let duration = match call.arguments["duration"].as_f64() {
            Some(d) => d.to_string(),
            None => call.arguments["duration"].to_string(),
        };
        render_box("Waited", &format!("{duration} seconds"), None)
    }
}
