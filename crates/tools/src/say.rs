//! Say tool — speak text aloud.
//!
//! Two backends: the local OS text-to-speech command, or the ElevenLabs
//! synthesis API with local playback of the returned audio.

use async_trait::async_trait;
use opsclaw_config::{SpeechBackend, SpeechConfig};
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolResult, parse_arguments};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SayArgs {
    text: String,
}

/// Where speech is produced.
pub enum Speaker {
    /// Run `command <text>`
    Local { command: String },
    /// Synthesize remotely, save, then play with `player`
    ElevenLabs {
        client: reqwest::Client,
        api_url: String,
        api_key: Option<String>,
        voice_id: String,
        model_id: String,
        output_path: PathBuf,
        player: String,
    },
}

impl Speaker {
    pub fn from_config(config: &SpeechConfig) -> Self {
        match config.backend {
            SpeechBackend::Local => Self::Local {
                command: config.command.clone(),
            },
            SpeechBackend::Elevenlabs => Self::ElevenLabs {
                client: reqwest::Client::new(),
                api_url: config.api_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone(),
                voice_id: config.voice_id.clone(),
                model_id: config.model_id.clone(),
                output_path: PathBuf::from(&config.output_path),
                player: config.player.clone(),
            },
        }
    }

    /// Speak `text`, returning a reason on failure.
    async fn speak(&self, text: &str) -> Result<(), String> {
        match self {
            Self::Local { command } => run_quietly(command, text).await,
            Self::ElevenLabs {
                client,
                api_url,
                api_key,
                voice_id,
                model_id,
                output_path,
                player,
            } => {
                let api_key = api_key
                    .as_deref()
                    .ok_or_else(|| "ELEVEN_LABS_API_KEY is not set".to_string())?;
                let url = format!("{api_url}/v1/text-to-speech/{voice_id}");
                debug!(url = %url, "Requesting speech synthesis");

                let response = client
                    .post(&url)
                    .header("xi-api-key", api_key)
                    .header("Accept", "audio/mpeg")
                    .json(&serde_json::json!({ "text": text, "model_id": model_id }))
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(format!("HTTP {} - {body}", status.as_u16()));
                }

                let audio = response.bytes().await.map_err(|e| e.to_string())?;
                tokio::fs::write(output_path, &audio)
                    .await
                    .map_err(|e| format!("failed to write {}: {e}", output_path.display()))?;

                run_quietly(player, &output_path.to_string_lossy()).await
            }
        }
    }
}

/// Run `program arg`, mapping a spawn failure or stderr/non-zero exit to an error.
async fn run_quietly(program: &str, arg: &str) -> Result<(), String> {
    let output = Command::new(program)
        .arg(arg)
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return Err(stderr.trim().to_string());
    }
    if !output.status.success() {
        return Err(format!("{program} exited with {}", output.status));
    }
    Ok(())
}

pub struct SayTool {
    speaker: Speaker,
}

impl SayTool {
    pub fn new(speaker: Speaker) -> Self {
        Self { speaker }
    }
}

#[async_trait]
impl Tool for SayTool {
    fn name(&self) -> &str {
        "say"
    }

    fn description(&self) -> &str {
        "Speaks the provided text out loud to the operator"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to be spoken"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: SayArgs = parse_arguments(arguments)?;
        match self.speaker.speak(&args.text).await {
            Ok(()) => Ok(ToolResult::text(format!("Successfully spoke: \"{}\"", args.text))),
            Err(reason) => {
                warn!(reason = %reason, "Speech failed");
                Ok(ToolResult::failure(format!("Error: {reason}")))
            }
        }
    }

    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        Some(Arc::new(SayFormatter))
    }
}

pub struct SayFormatter;

impl ResultFormatter for SayFormatter {
    fn format(&self, call: &ToolCall, _outcome: &ToolOutcome) -> String {
        format!("Spoke: \"{}\"", call.arguments["text"].as_str().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(command: &str) -> SayTool {
        SayTool::new(Speaker::Local {
            command: command.into(),
        })
    }

    #[tokio::test]
    async fn local_backend_success() {
        let result = local("true")
            .execute(serde_json::json!({"text": "all systems nominal"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Successfully spoke: \"all systems nominal\"");
    }

    #[tokio::test]
    async fn text_is_passed_as_single_argument() {
        // `test STRING` exits 0 only for exactly one non-empty argument
        let result = local("test")
            .execute(serde_json::json!({"text": "quote \" and $HOME"}))
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn failing_command_reports_error() {
        let result = local("false")
            .execute(serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Error: "));
    }

    #[tokio::test]
    async fn missing_command_reports_error() {
        let result = local("definitely-not-a-speech-command")
            .execute(serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("definitely-not-a-speech-command"));
    }

    #[tokio::test]
    async fn elevenlabs_writes_audio_then_plays() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/text-to-speech/voice-1")
            .match_header("xi-api-key", "xi-test")
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body([1u8, 2, 3, 4])
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("speech.mp3");
        let tool = SayTool::new(Speaker::ElevenLabs {
            client: reqwest::Client::new(),
            api_url: server.url(),
            api_key: Some("xi-test".into()),
            voice_id: "voice-1".into(),
            model_id: "eleven_multilingual_v2".into(),
            output_path: output_path.clone(),
            player: "true".into(),
        });

        let result = tool.execute(serde_json::json!({"text": "hello"})).await.unwrap();
        mock.assert_async().await;
        assert!(result.success, "{}", result.output);
        assert_eq!(std::fs::read(&output_path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn elevenlabs_without_key_fails_softly() {
        let tool = SayTool::new(Speaker::from_config(&SpeechConfig {
            backend: SpeechBackend::Elevenlabs,
            ..SpeechConfig::default()
        }));
        let result = tool.execute(serde_json::json!({"text": "hello"})).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("ELEVEN_LABS_API_KEY"));
    }

    #[test]
    fn formatter_quotes_spoken_text() {
        let call = ToolCall {
            id: "call_say".into(),
            name: "say".into(),
            arguments: serde_json::json!({"text": "done"}),
        };
        assert_eq!(
            SayFormatter.format(&call, &ToolOutcome::Reported(ToolResult::text("ok"))),
            "Spoke: \"done\""
        );
    }
}
