//! The opsclaw agent.
//!
//! [`StepRunner`] drives the model through up to `max_steps` rounds of tool
//! use and reports every round to a [`StepObserver`]. [`Driver`] is the
//! observer the CLI uses: it tallies token usage, cools down when the
//! projected rate nears the budget, and prints each tool result through the
//! [`FormatterRegistry`].

pub mod driver;
pub mod formatters;
pub mod rate_limit;
pub mod step_runner;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{Driver, OutputSink, RunOutcome};
pub use formatters::{FormatterRegistry, JsonFallbackFormatter};
pub use rate_limit::{RateLimitPolicy, TokenWindow};
pub use step_runner::{DEFAULT_MAX_STEPS, Generation, StepObserver, StepRunner};
