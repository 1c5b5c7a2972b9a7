//! Built-in tool implementations for opsclaw.
//!
//! Tools give the oncall agent the ability to act: run shell commands behind
//! an approval gate, speak, query the web service, draw charts, ask a vision
//! model about them, save a log, and wait.

pub mod anomaly;
pub mod approval;
pub mod chart;
pub mod fetch;
pub mod knowledge_base;
pub mod save_log;
pub mod say;
pub mod shell;
pub mod wait;

pub use approval::{ApprovalPolicy, Approver, StdinApprover};
pub use knowledge_base::KnowledgeBaseUploader;

use opsclaw_config::AppConfig;
use opsclaw_core::provider::VisionModel;
use opsclaw_core::tool::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Create the registry with every built-in tool wired from configuration.
///
/// `vision` is `None` when no vision key is configured; the anomaly tool is
/// still registered and reports the missing key when called.
pub fn default_registry(
    config: &AppConfig,
    policy: ApprovalPolicy,
    approver: Arc<dyn Approver>,
    vision: Option<Arc<dyn VisionModel>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(shell::ShellTool::new(policy, approver)));
    registry.register(Arc::new(say::SayTool::new(say::Speaker::from_config(&config.speech))));
    registry.register(Arc::new(fetch::FetchWebServiceTool::new(&config.web_service.base_url)));
    registry.register(Arc::new(chart::ChartTool::new(
        config.chart.default_path.clone(),
        config.chart.width,
        config.chart.height,
    )));
    registry.register(Arc::new(anomaly::CheckGraphForAnomaliesTool::new(vision)));

    let mut save_log = save_log::SaveLogTool::new(
        config.logs.dir.as_ref().map(PathBuf::from),
        config.logs.prefix.clone(),
    );
    if let Some(uploader) = KnowledgeBaseUploader::from_config(&config.knowledge_base) {
        save_log = save_log.with_uploader(Arc::new(uploader));
    }
    registry.register(Arc::new(save_log));

    registry.register(Arc::new(wait::WaitTool));
    registry
}
