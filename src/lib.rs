//! Trigger evaluation for adaptive tutoring.
//!
//! Watches a stream of timestamped attribute updates describing a learner's
//! (or scenario's) state, decides when authored conditions have transitioned
//! into their target configuration, and hands back ordered batches of
//! remediation activities:
//!
//! - **Rules**: one attribute, one authored `(previous, current)` goal with
//!   wildcards; transition or current-state-only variants.
//! - **Expressions**: AND over rules, indexed by attribute key, firing once
//!   per genuine transition rather than on every steady-state update.
//! - **Rule sets**: a named expression bound to escalating activity batches.
//! - **Agent**: per-session dispatcher routing updates to rule sets and
//!   selecting which fired transitions produce activities.
//! - **Authoring**: plain-data definitions validated into runtime objects.
//!
//! # Architecture
//!
//! Everything here is synchronous and I/O-free. Delivering learner state
//! into the agent and executing the returned activities are the job of the
//! surrounding modules. Activities are opaque: any `Clone` type works.
//!
//! # Example
//!
//! ```
//! use trigger_core::agent::{AgentConfig, TransitionAgent};
//! use trigger_core::authoring::{RuleDef, RuleSetDef};
//! use trigger_core::rule::{AttributeKey, AttributeValue};
//!
//! let engagement = AttributeKey::learner("Engagement");
//! let def = RuleSetDef {
//!     name: "Re-engage".to_string(),
//!     priority: 0,
//!     rules: vec![RuleDef::new("engagement low", engagement.clone()).current("Low")],
//!     batches: vec![vec!["prompt"], vec!["prompt", "video"]],
//! };
//!
//! let mut agent = TransitionAgent::new(AgentConfig::default()).unwrap();
//! agent.add(def.build().unwrap());
//!
//! agent.observe(&engagement, None, AttributeValue::new("High"), 1_000);
//! assert!(agent.evaluate().is_empty());
//!
//! agent.observe(&engagement, None, AttributeValue::new("Low"), 2_000);
//! let fired = agent.evaluate();
//! assert_eq!(fired[0].activities, vec!["prompt"]);
//! ```

pub mod agent;
pub mod authoring;
pub mod error;
pub mod expression;
pub mod rule;
pub mod ruleset;

pub use error::TransitionError;
