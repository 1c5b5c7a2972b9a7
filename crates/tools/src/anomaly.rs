//! Graph anomaly check — ask a vision model what looks wrong in a chart.

use async_trait::async_trait;
use opsclaw_core::display::{render_box, truncate};
use opsclaw_core::error::ToolError;
use opsclaw_core::provider::VisionModel;
use opsclaw_core::tool::{ResultFormatter, Tool, ToolCall, ToolOutcome, ToolResult, parse_arguments};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const TOOL_NAME: &str = "check_graph_for_anomalies";

pub const ANOMALY_INSTRUCTION: &str = "Please analyze this graph for any anomalous patterns or unusual behavior. The image is a graph showing data over time. Please identify and describe any:
- Unexpected spikes or drops
- Unusual trends
- Outliers
- Pattern breaks
- Any other anomalies that stand out

Please be specific about where in the graph you see these anomalies and what makes them notable.";

/// Mime type from the file extension; unknown extensions are sent as JPEG.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Read `path` and run the anomaly instruction against it.
pub async fn analyze_graph(vision: &dyn VisionModel, path: &Path) -> Result<String, ToolError> {
    let image = tokio::fs::read(path)
        .await
        .map_err(|e| ToolError::failed(TOOL_NAME, format!("failed to read {}: {e}", path.display())))?;
    info!(path = %path.display(), backend = vision.name(), "Analyzing graph");
    vision
        .analyze_image(ANOMALY_INSTRUCTION, &image, mime_type_for(path))
        .await
        .map_err(|e| ToolError::failed(TOOL_NAME, e))
}

#[derive(Debug, Deserialize)]
struct AnomalyArgs {
    #[serde(rename = "imagePath")]
    image_path: String,
}

pub struct CheckGraphForAnomaliesTool {
    vision: Option<Arc<dyn VisionModel>>,
}

impl CheckGraphForAnomaliesTool {
    pub fn new(vision: Option<Arc<dyn VisionModel>>) -> Self {
        Self { vision }
    }
}

#[async_trait]
impl Tool for CheckGraphForAnomaliesTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Analyzes a graph image to identify anomalies, unusual patterns, or outliers. Use in \
         combination with the chart tool to generate charts and analyze them for anomalies."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "imagePath": {
                    "type": "string",
                    "description": "The file path to the graph image that should be analyzed for anomalies"
                }
            },
            "required": ["imagePath"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: AnomalyArgs = parse_arguments(arguments)?;
        let vision = self.vision.as_ref().ok_or_else(|| ToolError::NotConfigured {
            tool_name: TOOL_NAME.into(),
            reason: "GEMINI_API_KEY is not set".into(),
        })?;
        let analysis = analyze_graph(vision.as_ref(), Path::new(&args.image_path)).await?;
        Ok(ToolResult::text(analysis))
    }

    fn formatter(&self) -> Option<Arc<dyn ResultFormatter>> {
        Some(Arc::new(AnomalyFormatter))
    }
}

pub struct AnomalyFormatter;

impl ResultFormatter for AnomalyFormatter {
    fn format(&self, call: &ToolCall, outcome: &ToolOutcome) -> String {
        let image_path = call.arguments["imagePath"].as_str().unwrap_or_default();
        render_box(
            "Graph Analysis Result",
            &format!(
                "Analysis of {image_path}\n\n{}",
                truncate(&outcome.to_model_text(), 500)
            ),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsclaw_core::error::ProviderError;
    use std::sync::Mutex;

    /// Captures what it was sent and answers with a canned analysis.
    struct CannedVision {
        answer: Result<String, ProviderError>,
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    impl CannedVision {
        fn new(answer: Result<String, ProviderError>) -> Self {
            Self {
                answer,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VisionModel for CannedVision {
        fn name(&self) -> &str {
            "canned"
        }

        async fn analyze_image(
            &self,
            instruction: &str,
            image: &[u8],
            mime_type: &str,
        ) -> Result<String, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((instruction.to_string(), image.len(), mime_type.to_string()));
            self.answer.clone()
        }
    }

    fn image_file(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        (dir, path)
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for(Path::new("chart.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("chart.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_type_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn sends_fixed_instruction_with_image() {
        let (_dir, path) = image_file("chart.png");
        let vision = Arc::new(CannedVision::new(Ok("Spike at t=3".into())));
        let tool = CheckGraphForAnomaliesTool::new(Some(vision.clone() as Arc<dyn VisionModel>));

        let result = tool
            .execute(serde_json::json!({"imagePath": path.to_string_lossy()}))
            .await
            .unwrap();

        assert_eq!(result, ToolResult::text("Spike at t=3"));
        let seen = vision.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ANOMALY_INSTRUCTION);
        assert_eq!(seen[0].1, 4);
        assert_eq!(seen[0].2, "image/png");
    }

    #[tokio::test]
    async fn missing_key_raises() {
        let tool = CheckGraphForAnomaliesTool::new(None);
        let err = tool
            .execute(serde_json::json!({"imagePath": "chart.png"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn vision_failure_raises() {
        let (_dir, path) = image_file("chart.png");
        let vision = Arc::new(CannedVision::new(Err(ProviderError::Network("reset".into()))));
        let tool = CheckGraphForAnomaliesTool::new(Some(vision as Arc<dyn VisionModel>));
        let err = tool
            .execute(serde_json::json!({"imagePath": path.to_string_lossy()}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reset"));
    }

    #[tokio::test]
    async fn unreadable_image_raises() {
        let vision = Arc::new(CannedVision::new(Ok("unused".into())));
        let tool = CheckGraphForAnomaliesTool::new(Some(vision.clone() as Arc<dyn VisionModel>));
        let err = tool
            .execute(serde_json::json!({"imagePath": "/nonexistent/chart.png"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(vision.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn formatter_truncates_long_analysis() {
        let call = ToolCall {
            id: "call_check_graph_for_anomalies".into(),
            name: TOOL_NAME.into(),
            arguments: serde_json::json!({"imagePath": "chart.png"}),
        };
        let long = "z".repeat(600);
        let rendered = AnomalyFormatter.format(&call, &ToolOutcome::Reported(ToolResult::text(long)));
        assert!(rendered.contains(" Graph Analysis Result "));
        assert!(rendered.contains("Analysis of chart.png\n\n"));
        assert!(rendered.contains(&format!("{}...(truncated)", "z".repeat(500))));
        assert!(!rendered.contains(&"z".repeat(501)));
    }
}
