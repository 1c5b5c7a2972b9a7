//! Knowledge-base uploader.
//!
//! Pushes a text file to the ElevenLabs conversational-AI knowledge base as a
//! multipart form: `name`, an empty `url`, and `file` as `text/plain`.

use opsclaw_config::KnowledgeBaseConfig;
use opsclaw_core::error::ToolError;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const TOOL_NAME: &str = "knowledge_base";

/// A successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub success: bool,
    pub id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

pub struct KnowledgeBaseUploader {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl KnowledgeBaseUploader {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build an uploader when the knowledge base is enabled and has a key.
    pub fn from_config(config: &KnowledgeBaseConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = config.api_key.clone()?;
        Some(Self::new(config.url.clone(), api_key))
    }

    /// Upload the file at `path` under `name`.
    pub async fn upload(&self, path: &Path, name: &str) -> Result<UploadReceipt, ToolError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ToolError::failed(TOOL_NAME, format!("failed to read {}: {e}", path.display())))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let file = Part::bytes(content)
            .file_name(file_name)
            .mime_str("text/plain")
            .map_err(|e| ToolError::failed(TOOL_NAME, e))?;
        let form = Form::new()
            .text("name", name.to_string())
            .text("url", "")
            .part("file", file);

        debug!(url = %self.url, name, "Uploading to knowledge base");

        let response = self
            .client
            .post(&self.url)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ToolError::failed(TOOL_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::failed(
                TOOL_NAME,
                format!(
                    "Failed to upload to knowledge base: {} {} - {body}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                ),
            ));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ToolError::failed(TOOL_NAME, format!("unexpected response: {e}")))?;

        info!(id = %parsed.id, name, "Uploaded to knowledge base");
        Ok(UploadReceipt {
            success: true,
            message: format!(
                "Log successfully uploaded to knowledge base with ID: {}",
                parsed.id
            ),
            id: parsed.id,
        })
    }
}
