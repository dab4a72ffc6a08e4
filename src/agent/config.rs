//! Agent configuration.
//!
//! [`AgentConfig`] controls how fired transitions are filtered and whether
//! updates are fanned out across threads.

use crate::error::TransitionError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Built-in filters applied to the transitions that fired in one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionPolicy {
    /// Keep every fired transition.
    All,

    /// Keep only the fired transitions with the lowest priority number.
    #[default]
    HighestPriority,
}

/// Configuration for [`TransitionAgent`](super::TransitionAgent).
///
/// # Examples
///
/// ```
/// use trigger_core::agent::{AgentConfig, SelectionPolicy};
///
/// let config = AgentConfig::default().with_selection(SelectionPolicy::All);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgentConfig {
    /// Filter applied to fired transitions before their batches are taken.
    pub selection: SelectionPolicy,

    /// Whether to update rule sets in parallel using rayon.
    ///
    /// Requires the `parallel` feature.
    pub parallel: bool,
}

impl AgentConfig {
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), TransitionError> {
        if self.parallel && !cfg!(feature = "parallel") {
            return Err(TransitionError::InvalidConfig(
                "parallel updates require the `parallel` feature".into(),
            ));
        }
        Ok(())
    }
}
