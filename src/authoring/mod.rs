//! Authored transition definitions.
//!
//! [`RuleDef`] and [`RuleSetDef`] are the plain data an external
//! configuration loader produces (with the `serde` feature they can be
//! deserialized directly). Building them validates every construction
//! rule and yields runtime [`Rule`](crate::rule::Rule)s and
//! [`TransitionRuleSet`](crate::ruleset::TransitionRuleSet)s.

mod defs;

pub use defs::{load_agent, RuleDef, RuleSetDef};
