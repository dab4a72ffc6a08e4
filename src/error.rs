//! Construction-time errors.
//!
//! Every variant describes an authoring mistake. Runtime evaluation
//! (`update`, `is_true`, `next_activity_set`) never fails.

use thiserror::Error;

/// Errors raised while building rules, expressions, rule sets or agents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Both sides of a goal are wildcards, so the rule matches nothing specific.
    #[error("goal must constrain at least one of previous/current")]
    UnconstrainedGoal,

    /// A rule was given an empty or blank name.
    #[error("rule name must not be empty")]
    EmptyRuleName,

    /// A logical expression was built from zero rules.
    #[error("logical expression needs at least one rule")]
    EmptyExpression,

    /// A rule set was given an empty or blank name.
    #[error("transition rule set name must not be empty")]
    EmptyRuleSetName,

    /// A rule set has no activity batches to hand out.
    #[error("transition rule set '{name}' has no activity batches")]
    NoActivityBatches { name: String },

    /// Agent configuration failed validation.
    #[error("invalid agent config: {0}")]
    InvalidConfig(String),
}
