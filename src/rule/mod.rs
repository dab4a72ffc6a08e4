//! Single-attribute transition rules.
//!
//! A [`Rule`] watches one [`AttributeKey`] and compares each update's
//! `(previous, current)` values against an authored [`GoalSpec`]. Either
//! side of the goal may be a wildcard ([`GoalValue::Any`]), but not both.
//!
//! Two behaviors share the one struct, selected by [`RuleKind`]:
//!
//! - **Transition**: satisfied when a genuine change (a different value,
//!   or the same value re-stamped) matches the goal.
//! - **StateLevel**: for goals that only constrain the current value,
//!   satisfied whenever the attribute holds that value, but only once per
//!   entry into it unless the rule has siblings in its expression.

mod transition;
mod types;

pub use transition::Rule;
pub use types::{AttributeKey, AttributeValue, GoalSpec, GoalValue, RuleKind, RuleState};
