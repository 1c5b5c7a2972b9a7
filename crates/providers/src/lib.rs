//! Hosted model backends for opsclaw.
//!
//! [`AnthropicProvider`] drives the agent loop; [`GeminiVision`] answers
//! questions about chart images.

pub mod anthropic;
pub mod gemini;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiVision;

use opsclaw_config::AppConfig;
use opsclaw_core::error::ProviderError;

/// Build the agent provider from configuration.
pub fn provider_from_config(config: &AppConfig) -> Result<AnthropicProvider, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured("set ANTHROPIC_API_KEY or api_key in config.toml".into())
    })?;
    Ok(AnthropicProvider::new(api_key)?.with_base_url(&config.api_url))
}

/// Build the vision backend, if a key is configured.
pub fn vision_from_config(config: &AppConfig) -> Result<Option<GeminiVision>, ProviderError> {
    let Some(api_key) = config.vision.api_key.clone() else {
        return Ok(None);
    };
    Ok(Some(
        GeminiVision::new(api_key, &config.vision.model)?.with_base_url(&config.vision.api_url),
    ))
}
