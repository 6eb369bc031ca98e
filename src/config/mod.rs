//! Configuration management for the launchpad service.
//!
//! Settings are layered:
//! - built-in defaults
//! - the JSON file at `~/.launchpad/config`
//! - environment variable overrides
//!
//! followed by validation of the settings each command needs.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use types::{Config, LlmProvider, PipelineSettings};

pub use constants::DEFAULT_BUDGET;
pub use validation::validate_server;
