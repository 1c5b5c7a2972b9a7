//! `opsclaw oncall` — work through a runbook as the oncall engineer.

use chrono::{DateTime, SecondsFormat, Utc};
use opsclaw_config::AppConfig;
use std::path::Path;
use tracing::info;

pub const DEFAULT_REQUEST: &str =
    "You are the oncall engineer. You need to check over the health of the system and fix any issues.";

/// The prompt handed to the agent for an oncall run.
pub fn build_oncall_prompt(request: &str, runbook: &str, now: DateTime<Utc>) -> String {
    format!(
        "\n# Oncall Request\n{request}\n\n# Runbook\n{runbook}\n\n# Current time\n{}\n\
         Use the tools available to handle this oncall request according to the runbook. \n\
         First understand what needs to be checked, then methodically work through the steps.\n",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

pub async fn run(
    config: &AppConfig,
    assume_yes: bool,
    runbook: &Path,
    request: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(runbook)
        .map_err(|e| format!("Failed to read runbook {}: {e}", runbook.display()))?;
    info!(runbook = %runbook.display(), bytes = content.len(), "Loaded runbook");

    let request = request.unwrap_or_else(|| DEFAULT_REQUEST.to_string());
    let prompt = build_oncall_prompt(&request, &content, Utc::now());
    super::run_agent(config, assume_yes, &prompt).await
}
