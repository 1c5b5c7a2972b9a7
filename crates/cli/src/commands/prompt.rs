//! `opsclaw prompt` — run the agent with a literal instruction.

use opsclaw_config::AppConfig;

pub async fn run(
    config: &AppConfig,
    assume_yes: bool,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if text.trim().is_empty() {
        return Err("The prompt must not be empty".into());
    }
    super::run_agent(config, assume_yes, text).await
}
