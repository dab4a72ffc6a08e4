//! Filters over the transitions fired in one evaluation.

use super::config::SelectionPolicy;

/// A rule set whose expression fired during the current evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// Position of the rule set in the agent.
    pub index: usize,
    pub name: &'a str,
    pub priority: u32,
}

/// Decides which fired transitions actually get to request activities.
///
/// Fired transitions that are filtered out still count as consumed; their
/// activity batches are not advanced.
///
/// # Examples
///
/// ```
/// use trigger_core::agent::{Candidate, TransitionSelection};
///
/// // Only let the first fired transition through.
/// struct FirstOnly;
///
/// impl TransitionSelection for FirstOnly {
///     fn name(&self) -> &str { "FirstOnly" }
///     fn filter(&self, fired: &mut Vec<Candidate<'_>>) {
///         fired.truncate(1);
///     }
/// }
/// ```
pub trait TransitionSelection: Send + Sync {
    /// Returns the name of this selection.
    fn name(&self) -> &str;

    /// Removes the candidates that should not produce activities.
    ///
    /// `fired` arrives in rule-set insertion order.
    fn filter(&self, fired: &mut Vec<Candidate<'_>>);
}

/// Keeps every fired transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFired;

impl TransitionSelection for AllFired {
    fn name(&self) -> &str {
        "AllFired"
    }

    fn filter(&self, _fired: &mut Vec<Candidate<'_>>) {}
}

/// Keeps the fired transitions sharing the lowest priority number.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestPriority;

impl TransitionSelection for HighestPriority {
    fn name(&self) -> &str {
        "HighestPriority"
    }

    fn filter(&self, fired: &mut Vec<Candidate<'_>>) {
        if let Some(best) = fired.iter().map(|c| c.priority).min() {
            fired.retain(|c| c.priority == best);
        }
    }
}

impl SelectionPolicy {
    /// The selection implementing this policy.
    pub fn selector(self) -> Box<dyn TransitionSelection> {
        match self {
            SelectionPolicy::All => Box::new(AllFired),
            SelectionPolicy::HighestPriority => Box::new(HighestPriority),
        }
    }
}
