//! Named expression plus escalating activity batches.

use crate::error::TransitionError;
use crate::expression::LogicalExpression;
use crate::rule::{AttributeKey, AttributeValue};
use std::collections::HashSet;
use std::fmt;

/// An authored transition: when its [`LogicalExpression`] becomes true,
/// the next batch of activities should be executed.
///
/// Batches are handed out in order, one per activation. After the last
/// authored batch, every further activation repeats the last one.
///
/// # Type Parameters
///
/// * `A` - The remediation activity type (opaque to this crate)
///
/// # Examples
///
/// ```
/// use trigger_core::expression::LogicalExpression;
/// use trigger_core::rule::{AttributeKey, GoalSpec, Rule};
/// use trigger_core::ruleset::TransitionRuleSet;
///
/// let rule = Rule::transition(
///     AttributeKey::learner("Engagement"),
///     GoalSpec::entering("Low"),
///     "engagement low",
/// )
/// .unwrap();
/// let expr = LogicalExpression::new(vec![rule]).unwrap();
///
/// let mut set = TransitionRuleSet::new(
///     "Re-engage",
///     expr,
///     vec![vec!["hint"], vec!["hint", "video"]],
/// )
/// .unwrap();
///
/// assert_eq!(set.next_activity_set(), &["hint"]);
/// assert_eq!(set.next_activity_set(), &["hint", "video"]);
/// assert_eq!(set.next_activity_set(), &["hint", "video"]);
/// ```
#[derive(Debug, Clone)]
pub struct TransitionRuleSet<A> {
    name: String,
    priority: u32,
    expression: LogicalExpression,
    batches: Vec<Vec<A>>,
    activation_count: usize,
}

impl<A> TransitionRuleSet<A> {
    /// Creates a rule set.
    ///
    /// Fails when `name` is blank or `batches` is empty. Individual batches
    /// may be empty (an activation that requests nothing).
    pub fn new(
        name: impl Into<String>,
        expression: LogicalExpression,
        batches: Vec<Vec<A>>,
    ) -> Result<Self, TransitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TransitionError::EmptyRuleSetName);
        }
        if batches.is_empty() {
            return Err(TransitionError::NoActivityBatches { name });
        }
        Ok(Self {
            name,
            priority: 0,
            expression,
            batches,
            activation_count: 0,
        })
    }

    /// Sets the authored priority. Lower numbers are more important.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn expression(&self) -> &LogicalExpression {
        &self.expression
    }

    pub fn batches(&self) -> &[Vec<A>] {
        &self.batches
    }

    /// Number of batches handed out so far.
    pub fn activation_count(&self) -> usize {
        self.activation_count
    }

    /// Forwards an attribute update to the expression.
    pub fn update(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        self.expression
            .update(key, label, previous, previous_ts, current, current_ts);
    }

    /// Whether the expression has just become true. Consumes the activation.
    pub fn should_transition(&mut self) -> bool {
        self.expression.is_true()
    }

    /// Returns the batch for this activation and advances the counter.
    pub fn next_activity_set(&mut self) -> &[A] {
        let index = self.activation_count.min(self.batches.len() - 1);
        self.activation_count += 1;
        &self.batches[index]
    }

    /// Text explaining why this rule set's activities were requested.
    pub fn reason_for_activation(&self) -> String {
        format!("\"{}\" was satisfied", self.name)
    }

    pub fn attribute_keys(&self) -> HashSet<AttributeKey> {
        self.expression.attribute_keys()
    }

    /// Performance-node ids the expression refers to.
    pub fn node_ids(&self) -> Vec<u32> {
        self.expression.node_ids()
    }

    /// Clears rule bookkeeping. The activation count is kept.
    pub fn reset(&mut self) {
        self.expression.reset();
    }
}

impl<A> fmt::Display for TransitionRuleSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} priority={} activations={}: {}]",
            self.name, self.priority, self.activation_count, self.expression
        )
    }
}
