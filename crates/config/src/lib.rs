//! Configuration loading, validation, and management for opsclaw.
//!
//! Loads configuration from `~/.opsclaw/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.opsclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for the agent loop
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Hard cap on agent steps per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub web_service: WebServiceConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub vision: VisionConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub chart: ChartConfig,
}

fn default_api_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-3-7-sonnet-20250219".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
/// Most steps a run may take; `max_steps` may lower it, never raise it.
pub const MAX_STEPS_CAP: u32 = 20;

fn default_max_steps() -> u32 {
    MAX_STEPS_CAP
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_steps", &self.max_steps)
            .field("rate_limit", &self.rate_limit)
            .field("shell", &self.shell)
            .field("web_service", &self.web_service)
            .field("speech", &self.speech)
            .field("vision", &self.vision)
            .field("knowledge_base", &self.knowledge_base)
            .field("logs", &self.logs)
            .field("chart", &self.chart)
            .finish()
    }
}

/// Token budget enforced across the rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Prompt tokens allowed per window
    #[serde(default = "default_tokens_per_minute")]
    pub tokens_per_minute: u64,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Fraction of the budget at which cooldown kicks in
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_tokens_per_minute() -> u64 {
    80_000
}
fn default_window_ms() -> u64 {
    60_000
}
fn default_threshold() -> f64 {
    0.8
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_minute: default_tokens_per_minute(),
            window_ms: default_window_ms(),
            threshold: default_threshold(),
        }
    }
}

/// How shell commands get approved before they run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Ask the operator on the terminal
    #[default]
    Ask,
    /// Run everything
    Always,
    /// Run nothing
    Never,
    /// Run only commands whose first word is in `allowed_commands`
    Allowlist,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub approval: ApprovalMode,

    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebServiceConfig {
    #[serde(default = "default_web_service_url")]
    pub base_url: String,
}

fn default_web_service_url() -> String {
    "https://hackathon-322-web.onrender.com".into()
}

impl Default for WebServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_web_service_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechBackend {
    /// Local OS text-to-speech command
    #[default]
    Local,
    /// ElevenLabs synthesis API, played back locally
    Elevenlabs,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub backend: SpeechBackend,

    /// Local text-to-speech command
    #[serde(default = "default_speech_command")]
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_speech_api_url")]
    pub api_url: String,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_speech_model")]
    pub model_id: String,

    /// Where synthesized audio is written before playback
    #[serde(default = "default_speech_output")]
    pub output_path: String,

    /// Audio player command
    #[serde(default = "default_player")]
    pub player: String,
}

fn default_speech_command() -> String {
    "say".into()
}
fn default_speech_api_url() -> String {
    "https://api.elevenlabs.io".into()
}
fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".into()
}
fn default_speech_model() -> String {
    "eleven_multilingual_v2".into()
}
fn default_speech_output() -> String {
    "speech.mp3".into()
}
fn default_player() -> String {
    "afplay".into()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::default(),
            command: default_speech_command(),
            api_key: None,
            api_url: default_speech_api_url(),
            voice_id: default_voice_id(),
            model_id: default_speech_model(),
            output_path: default_speech_output(),
            player: default_player(),
        }
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("backend", &self.backend)
            .field("command", &self.command)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("output_path", &self.output_path)
            .field("player", &self.player)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_vision_api_url")]
    pub api_url: String,

    #[serde(default = "default_vision_model")]
    pub model: String,
}

fn default_vision_api_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_vision_model() -> String {
    "gemini-2.0-flash".into()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_vision_api_url(),
            model: default_vision_model(),
        }
    }
}

impl std::fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Upload saved logs after writing them
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_kb_url")]
    pub url: String,
}

fn default_kb_url() -> String {
    "https://api.elevenlabs.io/v1/convai/knowledge-base".into()
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            url: default_kb_url(),
        }
    }
}

impl std::fmt::Debug for KnowledgeBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .field("url", &self.url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory for saved logs (working directory when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,
}

fn default_log_prefix() -> String {
    "notes".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: default_log_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_path")]
    pub default_path: String,

    #[serde(default = "default_chart_width")]
    pub width: u32,

    #[serde(default = "default_chart_height")]
    pub height: u32,
}

fn default_chart_path() -> String {
    "chart.png".into()
}
fn default_chart_width() -> u32 {
    800
}
fn default_chart_height() -> u32 {
    500
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_path: default_chart_path(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or the default location when `None`,
    /// then apply environment variable overrides.
    ///
    /// Environment variables:
    /// - `OPSCLAW_API_KEY` / `ANTHROPIC_API_KEY` — LLM provider key
    /// - `OPSCLAW_MODEL` — model override
    /// - `GEMINI_API_KEY` — vision analysis key
    /// - `ELEVEN_LABS_API_KEY` — knowledge base and remote speech key
    /// - `OPSCLAW_WEB_SERVICE_URL` — web service base URL
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Fill unset keys and overrides from an environment lookup.
    ///
    /// Keys already present in the file win over the environment; the model
    /// and web service URL overrides always apply.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("OPSCLAW_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY"));
        }
        if let Some(model) = lookup("OPSCLAW_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("OPSCLAW_WEB_SERVICE_URL") {
            self.web_service.base_url = url;
        }
        if self.vision.api_key.is_none() {
            self.vision.api_key = lookup("GEMINI_API_KEY");
        }
        let eleven_labs = lookup("ELEVEN_LABS_API_KEY");
        if self.knowledge_base.api_key.is_none() {
            self.knowledge_base.api_key = eleven_labs.clone();
        }
        if self.speech.api_key.is_none() {
            self.speech.api_key = eleven_labs;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".opsclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_steps == 0 || self.max_steps > MAX_STEPS_CAP {
            return Err(ConfigError::ValidationError(format!(
                "max_steps must be between 1 and {MAX_STEPS_CAP}"
            )));
        }

        let limit = &self.rate_limit;
        if limit.tokens_per_minute == 0 || limit.window_ms == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.tokens_per_minute and rate_limit.window_ms must be > 0".into(),
            ));
        }
        if !(limit.threshold > 0.0 && limit.threshold <= 1.0) {
            return Err(ConfigError::ValidationError(
                "rate_limit.threshold must be in (0, 1]".into(),
            ));
        }

        if self.shell.approval == ApprovalMode::Allowlist && self.shell.allowed_commands.is_empty() {
            tracing::warn!("shell.approval = \"allowlist\" with no allowed_commands denies every command");
        }

        Ok(())
    }

    /// Whether the LLM provider key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_steps: default_max_steps(),
            rate_limit: RateLimitConfig::default(),
            shell: ShellConfig::default(),
            web_service: WebServiceConfig::default(),
            speech: SpeechConfig::default(),
            vision: VisionConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            logs: LogConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_steps, 20);
        assert_eq!(config.rate_limit.tokens_per_minute, 80_000);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert!((config.rate_limit.threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.shell.approval, ApprovalMode::Ask);
        assert_eq!(config.logs.prefix, "notes");
        assert_eq!(config.chart.default_path, "chart.png");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.web_service.base_url, config.web_service.base_url);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "claude-sonnet-4-20250514"

[shell]
approval = "allowlist"
allowed_commands = ["curl", "kubectl"]

[rate_limit]
tokens_per_minute = 40000
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.shell.approval, ApprovalMode::Allowlist);
        assert_eq!(config.shell.allowed_commands, vec!["curl", "kubectl"]);
        assert_eq!(config.rate_limit.tokens_per_minute, 40_000);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.speech.backend, SpeechBackend::Local);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn zero_steps_rejected() {
        let config = AppConfig {
            max_steps: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn steps_above_cap_rejected() {
        let config = AppConfig {
            max_steps: 500,
            ..AppConfig::default()
        };
        let Err(ConfigError::ValidationError(message)) = config.validate() else {
            panic!("max_steps = 500 should not validate");
        };
        assert!(message.contains("between 1 and 20"), "{message}");

        let at_cap = AppConfig {
            max_steps: MAX_STEPS_CAP,
            ..AppConfig::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model, "claude-3-7-sonnet-20250219");
    }

    #[test]
    fn unparseable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_steps = \"many\"").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_fills_keys() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("GEMINI_API_KEY", "gm"),
            ("ELEVEN_LABS_API_KEY", "xi"),
            ("OPSCLAW_WEB_SERVICE_URL", "http://localhost:9000"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(config.vision.api_key.as_deref(), Some("gm"));
        assert_eq!(config.knowledge_base.api_key.as_deref(), Some("xi"));
        assert_eq!(config.speech.api_key.as_deref(), Some("xi"));
        assert_eq!(config.web_service.base_url, "http://localhost:9000");
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(env(&[("OPSCLAW_API_KEY", "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn opsclaw_key_preferred_over_anthropic() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPSCLAW_API_KEY", "a"), ("ANTHROPIC_API_KEY", "b")]));
        assert_eq!(config.api_key.as_deref(), Some("a"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        config.vision.api_key = Some("gm-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("gm-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
