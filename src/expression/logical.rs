//! AND-combination of transition rules.

use crate::error::TransitionError;
use crate::rule::{AttributeKey, AttributeValue, Rule, RuleKind};
use log::trace;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// An AND over one or more [`Rule`]s, indexed by attribute key.
///
/// # Evaluation
///
/// With a single rule, [`is_true`](Self::is_true) simply consumes that
/// rule's activation. With several rules, the expression is true when every
/// rule is at least notionally satisfied and at least one of them is freshly
/// satisfied, so an expression whose conditions stay true does not re-fire
/// on every round.
///
/// # Examples
///
/// ```
/// use trigger_core::expression::LogicalExpression;
/// use trigger_core::rule::{AttributeKey, AttributeValue, GoalSpec, Rule};
///
/// let rule = Rule::transition(
///     AttributeKey::learner("Engagement"),
///     GoalSpec::entering("Low"),
///     "engagement low",
/// )
/// .unwrap();
/// let mut expr = LogicalExpression::new(vec![rule]).unwrap();
///
/// let key = AttributeKey::learner("Engagement");
/// expr.update(&key, None, None, 0, &AttributeValue::new("Low"), 100);
/// assert!(expr.is_true());
/// assert!(!expr.is_true());
/// ```
#[derive(Debug, Clone)]
pub struct LogicalExpression {
    rules: Vec<Rule>,
    index: HashMap<AttributeKey, Vec<usize>>,
}

impl LogicalExpression {
    /// Builds the expression and its key index.
    ///
    /// Fails with [`TransitionError::EmptyExpression`] when `rules` is empty.
    pub fn new(mut rules: Vec<Rule>) -> Result<Self, TransitionError> {
        if rules.is_empty() {
            return Err(TransitionError::EmptyExpression);
        }

        let has_siblings = rules.len() > 1;
        let mut index: HashMap<AttributeKey, Vec<usize>> = HashMap::new();
        for (i, rule) in rules.iter_mut().enumerate() {
            if rule.kind() == RuleKind::StateLevel {
                rule.set_has_sibling_rules(has_siblings);
            }
            index.entry(rule.key().clone()).or_default().push(i);
        }

        Ok(Self { rules, index })
    }

    /// Forwards an update to every rule on `key` whose label equals `label`.
    pub fn update(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        let Some(indices) = self.index.get(key) else {
            return;
        };
        for &i in indices {
            let rule = &mut self.rules[i];
            if rule.label() != label {
                continue;
            }
            trace!("routing {key} = {current} to rule '{}'", rule.name());
            rule.update(previous, previous_ts, current, current_ts);
        }
    }

    /// Evaluates the expression, consuming fresh activations.
    pub fn is_true(&mut self) -> bool {
        if let [rule] = self.rules.as_mut_slice() {
            return rule.is_satisfied_and_reset();
        }

        let mut all_hold = true;
        let mut any_fresh = false;
        for rule in &self.rules {
            let currently = rule.is_satisfied();
            if !currently && !rule.is_still_notionally_satisfied() {
                all_hold = false;
                break;
            }
            any_fresh |= currently;
        }

        self.settle();
        all_hold && any_fresh
    }

    /// Turns every fresh activation into a notional one.
    fn settle(&mut self) {
        for rule in &mut self.rules {
            let _ = rule.is_satisfied_and_reset();
        }
    }

    /// Keys of every attribute this expression watches.
    pub fn attribute_keys(&self) -> HashSet<AttributeKey> {
        self.index.keys().cloned().collect()
    }

    /// Whether any rule watches `key`.
    pub fn references(&self, key: &AttributeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Distinct performance-node ids referenced, ascending.
    pub fn node_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.index.keys().filter_map(AttributeKey::node_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Clears the satisfaction bookkeeping of every rule.
    pub fn reset(&mut self) {
        for rule in &mut self.rules {
            rule.reset();
        }
    }
}

impl fmt::Display for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "({rule})")?;
        }
        Ok(())
    }
}
