//! Save-log tool — persist a markdown log with a timestamped filename.
//!
//! Files are named `<prefix>_<YYYY-MM-DD>_<HH-MM-SS>.md` (UTC). When a
//! knowledge-base uploader is configured the file is uploaded afterwards;
//! the upload outcome is reported alongside, never instead of, the save.

use crate::knowledge_base::KnowledgeBaseUploader;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opsclaw_core::display::render_box;
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolResult, parse_arguments};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct SaveLogArgs {
    content: String,
    #[serde(default)]
    prefix: Option<String>,
}

pub struct SaveLogTool {
    dir: Option<PathBuf>,
    default_prefix: String,
    uploader: Option<Arc<KnowledgeBaseUploader>>,
}

impl SaveLogTool {
    pub fn new(dir: Option<PathBuf>, default_prefix: impl Into<String>) -> Self {
        Self {
            dir,
            default_prefix: default_prefix.into(),
            uploader: None,
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<KnowledgeBaseUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }
}

/// `<prefix>_<YYYY-MM-DD>_<HH-MM-SS>.md`
pub fn log_filename(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{prefix}_{}.md", at.format("%Y-%m-%d_%H-%M-%S"))
}

#[async_trait]
impl Tool for SaveLogTool {
    fn name(&self) -> &str {
        "save_log"
    }

    fn description(&self) -> &str {
        "Saves content to a log file with a timestamp in the filename. This should only be used \
         to save a final log after all tasks have been completed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The content to save to the log file. This should be markdown."
                },
                "prefix": {
                    "type": "string",
                    "description": format!(
                        "Optional prefix for the log filename (default: \"{}\")",
                        self.default_prefix
                    )
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: SaveLogArgs = parse_arguments(arguments)?;
        let prefix = args.prefix.unwrap_or_else(|| self.default_prefix.clone());
        let name = log_filename(&prefix, Utc::now());
        let path = match &self.dir {
            Some(dir) => dir.join(&name),
            None => PathBuf::from(&name),
        };
        let filename = path.display().to_string();

        if let Err(e) = tokio::fs::write(&path, &args.content).await {
            warn!(path = %filename, error = %e, "Failed to save log");
            return Ok(ToolResult::structured(
                false,
                format!("Failed to save log file: {e}"),
                serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "message": "Failed to save log file",
                }),
            ));
        }
        info!(path = %filename, bytes = args.content.len(), "Saved log");

        let message = format!("Log successfully saved to {filename}");
        let mut data = serde_json::json!({
            "success": true,
            "filename": filename,
            "message": message,
        });

        if let Some(uploader) = &self.uploader {
            data["upload"] = match uploader.upload(&path, &name).await {
                Ok(receipt) => serde_json::json!(receipt),
                Err(e) => {
                    warn!(error = %e, "Knowledge base upload failed");
                    serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                        "message": "Failed to upload log to knowledge base",
                    })
                }
            };
        }

        Ok(ToolResult::structured(true, message, data))
    }

    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        Some(Arc::new(SaveLogFormatter))
    }
}

pub struct SaveLogFormatter;

impl ResultFormatter for SaveLogFormatter {
    fn format(&self, _call: &ToolCall, outcome: &ToolOutcome) -> String {
        let data = outcome.to_json();
        if outcome.is_success() {
            let filename = data["filename"].as_str().unwrap_or_default();
            return render_box("Save Log Result", filename, None);
        }

        let (message, error) = match outcome {
            ToolOutcome::Reported(_) => (
                data["message"].as_str().unwrap_or_default().to_string(),
                data["error"].as_str().unwrap_or_default().to_string(),
            ),
            other => (other.to_model_text(), String::new()),
        };
        render_box(
            "Save Log Error",
            &format!("Failed to save log: {message}\n{error}"),
            None,
        )
    }
}
