//! Session-level dispatcher over many transition rule sets.
//!
//! The [`TransitionAgent`] sits between the module that delivers learner
//! state and the strategy executor:
//!
//! 1. Each attribute update is routed to the rule sets whose expressions
//!    watch that key (optionally in parallel with the `parallel` feature).
//! 2. [`TransitionAgent::evaluate`] asks every rule set whether it should
//!    transition, filters the fired ones through a [`TransitionSelection`],
//!    and returns one [`Activation`] per survivor carrying its next batch.
//!
//! The agent performs no I/O and never persists anything.

mod config;
mod runner;
mod selection;

pub use config::{AgentConfig, SelectionPolicy};
pub use runner::{Activation, TransitionAgent};
pub use selection::{AllFired, Candidate, HighestPriority, TransitionSelection};
