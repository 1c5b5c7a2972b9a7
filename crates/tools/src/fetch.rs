//! Web service fetch tool — GET requests against the configured service.
//!
//! The service exposes `/`, `/api/ping` and `/api/search?query=<string>`.
//! Successful responses are returned as `{durationMs, data}` when the body
//! parses as JSON and `{durationMs, text}` otherwise.

use async_trait::async_trait;
use opsclaw_core::error::ToolError;
use opsclaw_core::tool::{Tool, ToolResult, parse_arguments};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct FetchArgs {
    path: String,
    #[serde(default, rename = "queryParams")]
    query_params: Option<BTreeMap<String, String>>,
}

pub struct FetchWebServiceTool {
    client: reqwest::Client,
    base_url: String,
    description: String,
}

impl FetchWebServiceTool {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        let base_url = base_url.as_ref().trim_end_matches('/').to_string();
        let description = format!(
            "Fetches data from the web service at {base_url}/. The homepage is at / and there \
             are two apis: /api/ping and /api/search?query=<string>"
        );
        Self {
            client: reqwest::Client::new(),
            base_url,
            description,
        }
    }
}

#[async_trait]
impl Tool for FetchWebServiceTool {
    fn name(&self) -> &str {
        "fetch_web_service"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to fetch from (e.g., \"/api/ping\")"
                },
                "queryParams": {
                    "type": "object",
                    "description": "Optional query parameters as key-value pairs",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: FetchArgs = parse_arguments(arguments)?;
        let url = format!("{}{}", self.base_url, args.path);
        let query = args.query_params.unwrap_or_default();

        debug!(url = %url, ?query, "Fetching from web service");
        let started = Instant::now();

        let response = match self.client.get(&url).query(&query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Web service request failed");
                return Ok(ToolResult::failure(format!("Error: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolResult::failure(format!(
                "Error: HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ToolResult::failure(format!("Error: {e}"))),
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let data = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(parsed) => serde_json::json!({ "durationMs": duration_ms, "data": parsed }),
            Err(_) => serde_json::json!({ "durationMs": duration_ms, "text": body }),
        };

        Ok(ToolResult::structured(
            true,
            format!("HTTP {} in {duration_ms}ms", status.as_u16()),
            data,
        ))
    }
}
