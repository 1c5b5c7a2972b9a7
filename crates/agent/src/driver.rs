//! The driver: console progress and rate limiting around a [`StepRunner`].
//!
//! For every step it, in order: counts the step, adds the step's prompt
//! tokens to the run total and the rolling window, prints a progress block,
//! prints each tool call's result through its formatter, sleeps if the
//! projected rate is too high, and rolls the window over once it has expired.

use crate::formatters::FormatterRegistry;
use crate::rate_limit::{RateLimitPolicy, TokenWindow};
use crate::step_runner::{StepObserver, StepRunner};
use async_trait::async_trait;
use opsclaw_core::display::render_box;
use opsclaw_core::step::StepEvent;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Where console blocks go. Stdout by default.
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Final text of the run
    pub text: String,

    /// Prompt tokens consumed across every step of the run
    pub total_tokens: u64,

    /// Steps the run took
    pub steps: u32,
}

pub struct Driver {
    runner: StepRunner,
    formatters: FormatterRegistry,
    policy: RateLimitPolicy,
    window: TokenWindow,
    output: OutputSink,
}

impl Driver {
    /// The formatter registry is built from the runner's tools.
    pub fn new(runner: StepRunner, policy: RateLimitPolicy) -> Self {
        let formatters = FormatterRegistry::from_tools(runner.tools());
        Self {
            runner,
            formatters,
            policy,
            window: TokenWindow::default(),
            output: Arc::new(|text: &str| println!("{text}")),
        }
    }

    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    pub fn with_formatters(mut self, formatters: FormatterRegistry) -> Self {
        self.formatters = formatters;
        self
    }

    /// The rolling window; it persists across runs.
    pub fn window(&self) -> &TokenWindow {
        &self.window
    }

    /// Run `prompt` through the step engine.
    ///
    /// Errors from the provider propagate; nothing is retried.
    pub async fn run(&mut self, prompt: &str) -> opsclaw_core::Result<RunOutcome> {
        let mut progress = Progress {
            policy: &self.policy,
            window: &mut self.window,
            formatters: &self.formatters,
            output: &self.output,
            steps: 0,
            total_tokens: 0,
        };

        let generation = self.runner.run(prompt, &mut progress).await?;
        info!(
            steps = progress.steps,
            total_tokens = progress.total_tokens,
            "Agent run complete"
        );

        Ok(RunOutcome {
            text: generation.text,
            total_tokens: progress.total_tokens,
            steps: progress.steps,
        })
    }
}

/// Per-run observer borrowing the driver's state.
struct Progress<'a> {
    policy: &'a RateLimitPolicy,
    window: &'a mut TokenWindow,
    formatters: &'a FormatterRegistry,
    output: &'a OutputSink,
    steps: u32,
    total_tokens: u64,
}

#[async_trait]
impl<'a> StepObserver for Progress<'a> {
    async fn on_step_finish(&mut self, event: &StepEvent) {
        self.steps += 1;

        let step_tokens = event.prompt_tokens();
        let now = Instant::now();
        self.total_tokens += step_tokens;
        self.window.record(step_tokens, now, self.policy.window);

        let elapsed = self.window.elapsed(now);
        let projected = self.policy.projected_tpm(self.window.tokens(), elapsed);
        debug!(
            step = self.steps,
            window_tokens = self.window.tokens(),
            elapsed_ms = elapsed.as_millis() as u64,
            projected_tpm = projected,
            "Token usage"
        );

        (self.output)(&render_box(
            &format!("Agent (step={})", self.steps),
            &progress_text(&event.text, step_tokens, self.total_tokens),
            None,
        ));

        for call in &event.tool_calls {
            // The engine may not have paired every call with a result
            let Some(result) = event.result_for(&call.id) else {
                continue;
            };
            (self.output)(&self.formatters.format(call, &result.outcome));
        }

        let cooldown = self.policy.cooldown(self.window.tokens(), elapsed);
        if !cooldown.is_zero() {
            info!(
                projected_tpm = projected.round() as u64,
                cooldown_ms = cooldown.as_millis() as u64,
                "Approaching token rate limit, cooling down"
            );
            (self.output)(&render_box(
                "Rate limit",
                &format!(
                    "Projected {:.0} tokens/min, waiting {:.1}s",
                    projected,
                    cooldown.as_secs_f64()
                ),
                Some("yellow"),
            ));
            tokio::time::sleep(cooldown).await;
        }

        if self.window.reset_if_expired(Instant::now(), self.policy.window) {
            debug!("Token window reset");
        }
    }
}

fn progress_text(text: &str, step_tokens: u64, total_tokens: u64) -> String {
    let usage = format!("Tokens: {step_tokens} (step), {total_tokens} (total)");
    if text.trim().is_empty() {
        usage
    } else {
        format!("{text}\n\n{usage}")
    }
}
