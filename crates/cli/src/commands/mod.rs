pub mod analyze;
pub mod doctor;
pub mod oncall;
pub mod prompt;
pub mod upload;

use opsclaw_agent::{Driver, RateLimitPolicy, StepRunner};
use opsclaw_config::AppConfig;
use opsclaw_core::display::print_box;
use opsclaw_core::provider::VisionModel;
use opsclaw_tools::{ApprovalPolicy, StdinApprover};
use std::sync::Arc;

/// Wire provider, tools and rate limiter into a driver.
///
/// Fails before any network activity when the provider key is missing.
pub fn build_driver(config: &AppConfig, assume_yes: bool) -> Result<Driver, Box<dyn std::error::Error>> {
    let provider = opsclaw_providers::provider_from_config(config)?;
    let vision = opsclaw_providers::vision_from_config(config)?
        .map(|v| Arc::new(v) as Arc<dyn VisionModel>);

    let policy = if assume_yes {
        ApprovalPolicy::Always
    } else {
        ApprovalPolicy::from_config(&config.shell)
    };
    let tools = opsclaw_tools::default_registry(config, policy, Arc::new(StdinApprover::new()), vision);

    let runner = StepRunner::new(Arc::new(provider), &config.model, Arc::new(tools))
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_max_steps(config.max_steps);

    Ok(Driver::new(runner, RateLimitPolicy::from_config(&config.rate_limit)))
}

/// Run `prompt` and print the final text plus the token summary.
pub async fn run_agent(
    config: &AppConfig,
    assume_yes: bool,
    prompt: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = build_driver(config, assume_yes)?;
    let outcome = driver.run(prompt).await?;

    print_box("Result", &outcome.text, Some("green"));
    println!(
        "Total tokens: {} across {} step(s)",
        outcome.total_tokens, outcome.steps
    );
    Ok(())
}
