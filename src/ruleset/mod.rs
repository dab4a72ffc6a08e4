//! Authored transitions.
//!
//! A [`TransitionRuleSet`] binds one
//! [`LogicalExpression`](crate::expression::LogicalExpression) to an ordered
//! list of activity batches. Each activation hands out the next batch;
//! once the authored batches run out, the last one repeats.

mod rule_set;

pub use rule_set::TransitionRuleSet;
