//! Approval gate for shell commands.
//!
//! The policy decides up front; only [`ApprovalPolicy::Ask`] consults the
//! injected [`Approver`], so the shell tool never touches the terminal itself.

use async_trait::async_trait;
use opsclaw_config::{ApprovalMode, ShellConfig};
use opsclaw_core::display::print_box;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Asks someone whether a command may run.
#[async_trait]
pub trait Approver: Send + Sync {
    async fn approve(&self, command: &str) -> bool;
}

/// Shows the command on the terminal and waits for the operator to type
/// `approved`. Anything else, including EOF, is a refusal.
///
/// One buffered reader serves every prompt, so answers typed or pasted
/// ahead of time are kept for the approvals that follow.
pub struct StdinApprover {
    input: Mutex<Box<dyn AsyncBufRead + Unpin + Send>>,
}

pub const APPROVAL_PROMPT: &str = "Type \"approved\" to execute this command: ";

impl StdinApprover {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    /// Read answers from `input` instead of stdin.
    pub fn from_reader(input: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
        }
    }
}

impl Default for StdinApprover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Approver for StdinApprover {
    async fn approve(&self, command: &str) -> bool {
        let mut input = self.input.lock().await;
        print_box("Requesting to run command", command, Some("yellow"));
        print!("{APPROVAL_PROMPT}");
        if let Err(e) = std::io::stdout().flush() {
            warn!(error = %e, "Failed to flush approval prompt");
        }

        let mut line = String::new();
        match input.read_line(&mut line).await {
            Ok(_) => is_approval(&line),
            Err(e) => {
                warn!(error = %e, "Failed to read approval from stdin");
                false
            }
        }
    }
}

/// The one answer that approves a command.
pub fn is_approval(input: &str) -> bool {
    input.trim() == "approved"
}

/// Which commands may run without asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Run everything
    Always,
    /// Run nothing
    Never,
    /// Run commands whose first word is listed; deny the rest without asking
    Allowlist(Vec<String>),
    /// Consult the approver for every command
    Ask,
}

impl ApprovalPolicy {
    pub fn from_config(config: &ShellConfig) -> Self {
        match config.approval {
            ApprovalMode::Always => Self::Always,
            ApprovalMode::Never => Self::Never,
            ApprovalMode::Allowlist => Self::Allowlist(config.allowed_commands.clone()),
            ApprovalMode::Ask => Self::Ask,
        }
    }

    /// Decide whether `command` may run.
    pub async fn resolve(&self, command: &str, approver: &dyn Approver) -> bool {
        let decision = match self {
            Self::Always => true,
            Self::Never => false,
            Self::Allowlist(allowed) => is_command_allowed(allowed, command),
            Self::Ask => approver.approve(command).await,
        };
        debug!(policy = ?self, approved = decision, "Resolved command approval");
        decision
    }
}

/// Whether the base command (first word) of `command` is in `allowed`.
pub fn is_command_allowed(allowed: &[String], command: &str) -> bool {
    let base_cmd = command.split_whitespace().next().unwrap_or("");
    !base_cmd.is_empty() && allowed.iter().any(|a| a == base_cmd)
}
