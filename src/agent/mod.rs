//! The generic agent: one configurable request/response unit that validates
//! its input, prompts the model and parses the reply.
//!
//! Concrete agents are [`AgentSpec`] values (see `crate::agents`), not types.

pub mod outcome;
pub mod runner;
pub mod spec;

pub use outcome::{AgentResult, Failure};
pub use runner::Agent;
pub use spec::{AgentSpec, FailurePolicy, RetryPolicy};

#[cfg(test)]
mod tests;
