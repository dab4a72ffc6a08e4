//! Single-attribute transition rules.

use super::types::{AttributeKey, AttributeValue, GoalSpec, GoalValue, RuleKind, RuleState};
use crate::error::TransitionError;
use log::debug;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Watches one attribute and decides whether its latest update matches
/// an authored goal.
///
/// A rule is either a [`RuleKind::Transition`] rule, which compares the
/// `(previous, current)` pair of each update against its [`GoalSpec`], or a
/// [`RuleKind::StateLevel`] rule, which (for goals with a wildcard previous
/// side) only asks whether the attribute currently holds the goal value and
/// fires once per entry into that value.
///
/// Satisfaction is sticky: once satisfied, further updates are ignored until
/// the owner consumes the activation.
///
/// # Examples
///
/// ```
/// use trigger_core::rule::{AttributeKey, AttributeValue, GoalSpec, Rule};
///
/// let mut rule = Rule::transition(
///     AttributeKey::learner("Engagement"),
///     GoalSpec::entering("Low"),
///     "engagement dropped",
/// )
/// .unwrap();
///
/// let low = AttributeValue::new("Low");
/// rule.update(None, 0, &low, 1_000);
/// assert!(rule.is_satisfied_and_reset());
/// assert!(!rule.is_satisfied());
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    key: AttributeKey,
    label: Option<String>,
    name: String,
    goal: GoalSpec,
    kind: RuleKind,
    creation_time: u64,
    has_sibling_rules: bool,
    state: RuleState,
}

impl Rule {
    /// Creates a rule of the given kind.
    ///
    /// Fails with [`TransitionError::EmptyRuleName`] for a blank name.
    pub fn new(
        kind: RuleKind,
        key: AttributeKey,
        goal: GoalSpec,
        name: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TransitionError::EmptyRuleName);
        }
        Ok(Self {
            key,
            label: None,
            name,
            goal,
            kind,
            creation_time: now_millis(),
            has_sibling_rules: false,
            state: RuleState::default(),
        })
    }

    /// Creates a [`RuleKind::Transition`] rule.
    pub fn transition(
        key: AttributeKey,
        goal: GoalSpec,
        name: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        Self::new(RuleKind::Transition, key, goal, name)
    }

    /// Creates a [`RuleKind::StateLevel`] rule.
    pub fn state_level(
        key: AttributeKey,
        goal: GoalSpec,
        name: impl Into<String>,
    ) -> Result<Self, TransitionError> {
        Self::new(RuleKind::StateLevel, key, goal, name)
    }

    /// Scopes the rule to a course concept label.
    ///
    /// Updates are only forwarded to rules whose label equals the update's.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Overrides the creation timestamp (milliseconds since the Unix epoch).
    pub fn with_creation_time(mut self, millis: u64) -> Self {
        self.creation_time = millis;
        self
    }

    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goal(&self) -> &GoalSpec {
        &self.goal
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn state(&self) -> &RuleState {
        &self.state
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    /// Performance-node id of the watched attribute, if it is a node.
    pub fn node_id(&self) -> Option<u32> {
        self.key.node_id()
    }

    /// Whether other rules share this rule's expression.
    pub fn has_sibling_rules(&self) -> bool {
        self.has_sibling_rules
    }

    pub(crate) fn set_has_sibling_rules(&mut self, has_siblings: bool) {
        self.has_sibling_rules = has_siblings;
    }

    /// Whether an update stamped before this rule existed may count as a
    /// transition (attribute state that predates the rule).
    pub fn should_include_pre_existing_state(&self) -> bool {
        matches!(self.kind, RuleKind::StateLevel)
    }

    /// Feeds one attribute update into the rule.
    ///
    /// `previous` is `None` when the attribute had no earlier value, and
    /// `previous_ts` is 0 in that case.
    pub fn update(
        &mut self,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        match self.kind {
            RuleKind::Transition => {
                self.update_transition(previous, previous_ts, current, current_ts)
            }
            RuleKind::StateLevel => {
                self.update_state_level(previous, previous_ts, current, current_ts)
            }
        }
    }

    fn update_transition(
        &mut self,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        if self.state.satisfied {
            // The previous activation has not been consumed yet.
            self.state.still_notionally_satisfied = true;
            return;
        }
        self.state.satisfied = false;

        let changed =
            previous != Some(current) || (previous_ts != 0 && previous_ts != current_ts);

        match (self.goal.previous(), self.goal.current()) {
            (GoalValue::Any, GoalValue::Exactly(goal_current)) => {
                if self.state.last_observed_current.as_ref() != previous {
                    debug!(
                        "rule '{}' skipped update on {}: expected previous {:?}, got {:?}",
                        self.name, self.key, self.state.last_observed_current, previous
                    );
                } else if changed
                    || (self.creation_time > current_ts
                        && self.should_include_pre_existing_state())
                {
                    self.state.satisfied = current == goal_current;
                    self.state.still_notionally_satisfied = false;
                }
            }
            (GoalValue::Exactly(goal_previous), GoalValue::Any) => {
                if changed {
                    self.state.satisfied = previous == Some(goal_previous);
                    self.state.still_notionally_satisfied = false;
                }
            }
            (GoalValue::Exactly(goal_previous), GoalValue::Exactly(goal_current)) => {
                if changed {
                    self.state.satisfied =
                        current == goal_current && previous == Some(goal_previous);
                    self.state.still_notionally_satisfied = false;
                }
            }
            // Rejected by GoalSpec::new.
            (GoalValue::Any, GoalValue::Any) => {}
        }

        self.state.last_observed_current = Some(current.clone());
        self.log_if_satisfied(current);
    }

    fn update_state_level(
        &mut self,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        if self.state.satisfied {
            return;
        }
        if !self.goal.previous().is_wildcard() {
            self.update_transition(previous, previous_ts, current, current_ts);
            return;
        }

        self.state.satisfied = self.goal.current().value() == Some(current);
        self.state.still_notionally_satisfied = false;
        if self.state.satisfied {
            if self.state.has_activated && !self.has_sibling_rules {
                // Still in the same state since the last activation.
                self.state.satisfied = false;
            } else {
                self.state.has_activated = true;
            }
        } else if self.state.has_activated {
            self.state.has_activated = false;
        }

        self.state.last_observed_current = Some(current.clone());
        self.log_if_satisfied(current);
    }

    fn log_if_satisfied(&self, current: &AttributeValue) {
        if self.state.satisfied {
            debug!("rule '{}' satisfied: {} is now {}", self.name, self.key, current);
        }
    }

    /// Reads the satisfied flag without consuming it.
    pub fn is_satisfied(&self) -> bool {
        self.state.satisfied
    }

    /// Reads and consumes the satisfied flag.
    ///
    /// A consumed activation leaves the rule notionally satisfied until the
    /// next genuine change is evaluated.
    pub fn is_satisfied_and_reset(&mut self) -> bool {
        let satisfied = self.state.satisfied;
        if satisfied {
            self.state.satisfied = false;
            self.state.still_notionally_satisfied = true;
        }
        satisfied
    }

    /// True for a rule satisfied on an earlier round whose satisfaction has
    /// not been invalidated by a newer evaluation. False for a rule that has
    /// never been satisfied.
    pub fn is_still_notionally_satisfied(&self) -> bool {
        self.state.still_notionally_satisfied
    }

    /// Clears pending and notional satisfaction.
    ///
    /// The last observed value and the state-level activation marker are
    /// kept, so a state that persists across the reset does not fire again.
    pub fn reset(&mut self) {
        self.state.satisfied = false;
        self.state.still_notionally_satisfied = false;
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.key)?;
        if let Some(label) = &self.label {
            write!(f, "[{label}]")?;
        }
        write!(f, " {}", self.goal)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
