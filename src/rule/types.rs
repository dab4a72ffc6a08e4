//! Keys, values, goals and per-rule runtime state.

use crate::error::TransitionError;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies a monitored quantity.
///
/// Learner-state attributes are keyed by name, performance assessments
/// by the id of the task or concept node they describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeKey {
    /// A named learner-state attribute, e.g. `"Engagement"`.
    Learner(String),
    /// A task or concept performance node.
    Node(u32),
}

impl AttributeKey {
    /// Shorthand for [`AttributeKey::Learner`].
    pub fn learner(name: impl Into<String>) -> Self {
        AttributeKey::Learner(name.into())
    }

    /// Returns the node id for performance-node keys.
    pub fn node_id(&self) -> Option<u32> {
        match self {
            AttributeKey::Node(id) => Some(*id),
            AttributeKey::Learner(_) => None,
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKey::Learner(name) => f.write_str(name),
            AttributeKey::Node(id) => write!(f, "node#{id}"),
        }
    }
}

/// An enumerated value an attribute can hold (e.g. `"Low"`, `"AboveExpectation"`).
///
/// Only equality is meaningful; there is no ordering or arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AttributeValue(String);

impl AttributeValue {
    pub fn new(token: impl Into<String>) -> Self {
        AttributeValue(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttributeValue {
    fn from(token: &str) -> Self {
        AttributeValue::new(token)
    }
}

impl From<String> for AttributeValue {
    fn from(token: String) -> Self {
        AttributeValue(token)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a goal: either any value, or one specific value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GoalValue {
    /// Matches any value.
    #[default]
    Any,
    /// Matches exactly this value.
    Exactly(AttributeValue),
}

impl GoalValue {
    pub fn exactly(value: impl Into<AttributeValue>) -> Self {
        GoalValue::Exactly(value.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, GoalValue::Any)
    }

    /// The constrained value, if any.
    pub fn value(&self) -> Option<&AttributeValue> {
        match self {
            GoalValue::Any => None,
            GoalValue::Exactly(v) => Some(v),
        }
    }
}

impl From<Option<AttributeValue>> for GoalValue {
    fn from(value: Option<AttributeValue>) -> Self {
        value.map_or(GoalValue::Any, GoalValue::Exactly)
    }
}

impl fmt::Display for GoalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalValue::Any => f.write_str("*"),
            GoalValue::Exactly(v) => write!(f, "{v}"),
        }
    }
}

/// The authored `(previous, current)` pair a rule matches against.
///
/// At least one side must be constrained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalSpec {
    previous: GoalValue,
    current: GoalValue,
}

impl GoalSpec {
    /// Creates a goal, rejecting the fully wildcarded `(Any, Any)` pair.
    pub fn new(previous: GoalValue, current: GoalValue) -> Result<Self, TransitionError> {
        if previous.is_wildcard() && current.is_wildcard() {
            return Err(TransitionError::UnconstrainedGoal);
        }
        Ok(Self { previous, current })
    }

    /// Goal matching "the attribute now holds `value`", whatever it was before.
    pub fn entering(value: impl Into<AttributeValue>) -> Self {
        Self {
            previous: GoalValue::Any,
            current: GoalValue::exactly(value),
        }
    }

    /// Goal matching "the attribute just left `value`", whatever it became.
    pub fn leaving(value: impl Into<AttributeValue>) -> Self {
        Self {
            previous: GoalValue::exactly(value),
            current: GoalValue::Any,
        }
    }

    /// Goal matching the exact transition `from -> to`.
    pub fn between(from: impl Into<AttributeValue>, to: impl Into<AttributeValue>) -> Self {
        Self {
            previous: GoalValue::exactly(from),
            current: GoalValue::exactly(to),
        }
    }

    pub fn previous(&self) -> &GoalValue {
        &self.previous
    }

    pub fn current(&self) -> &GoalValue {
        &self.current
    }
}

impl fmt::Display for GoalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.previous, self.current)
    }
}

/// Behavioral variant of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RuleKind {
    /// Matches a value transition `(previous, current)`.
    #[default]
    Transition,

    /// Matches "currently in state X" and fires once per entry into it.
    ///
    /// Only differs from [`RuleKind::Transition`] when the goal's previous
    /// side is a wildcard.
    StateLevel,
}

/// Mutable per-rule bookkeeping.
///
/// Legal transitions of the flags:
///
/// - `satisfied` is set only by an evaluating `update`, and cleared by an
///   evaluating `update`, by consumption (`is_satisfied_and_reset`,
///   expression settling) or by `reset`.
/// - `still_notionally_satisfied` is set when a satisfied rule receives
///   another update or is consumed, and cleared when a genuine change is
///   evaluated, on every state-level evaluation, or by `reset`.
/// - `has_activated` (state-level rules only) is set on the first satisfied
///   evaluation and cleared on the first unsatisfied one. `reset` keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleState {
    pub satisfied: bool,
    pub still_notionally_satisfied: bool,
    pub last_observed_current: Option<AttributeValue>,
    pub has_activated: bool,
}
