//! Tool-result formatting dispatch.
//!
//! Tools that render their own results register a [`ResultFormatter`] under
//! their name. Everything else goes through [`JsonFallbackFormatter`].

use opsclaw_core::display::{render_box, truncate};
use opsclaw_core::tool::{ResultFormatter, ToolCall, ToolOutcome, ToolRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Characters of JSON shown by the fallback formatter.
pub const FALLBACK_LIMIT: usize = 500;

/// Box titled `Tool result (<name>)` holding the pretty-printed JSON result.
pub struct JsonFallbackFormatter;

impl ResultFormatter for JsonFallbackFormatter {
    fn format(&self, call: &ToolCall, outcome: &ToolOutcome) -> String {
        let json = serde_json::to_string_pretty(&outcome.to_json())
            .unwrap_or_else(|_| outcome.to_model_text());
        render_box(
            &format!("Tool result ({})", call.name),
            &truncate(&json, FALLBACK_LIMIT),
            None,
        )
    }
}

pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn ResultFormatter>>,
    fallback: Arc<dyn ResultFormatter>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self {
            formatters: HashMap::new(),
            fallback: Arc::new(JsonFallbackFormatter),
        }
    }
}

impl FormatterRegistry {
    /// Collect the formatters the registered tools expose.
    pub fn from_tools(tools: &ToolRegistry) -> Self {
        Self {
            formatters: tools.formatters(),
            ..Self::default()
        }
    }

    /// Replaces any formatter already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, formatter: Arc<dyn ResultFormatter>) {
        self.formatters.insert(name.into(), formatter);
    }

    pub fn has_formatter(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    pub fn get(&self, name: &str) -> &dyn ResultFormatter {
        self.formatters
            .get(name)
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    pub fn format(&self, call: &ToolCall, outcome: &ToolOutcome) -> String {
        self.get(&call.name).format(call, outcome)
    }
}
