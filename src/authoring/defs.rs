//! Plain-data transition definitions.

use crate::agent::{AgentConfig, TransitionAgent};
use crate::error::TransitionError;
use crate::expression::LogicalExpression;
use crate::rule::{AttributeKey, AttributeValue, GoalSpec, Rule, RuleKind};
use crate::ruleset::TransitionRuleSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An authored rule, before validation.
///
/// `None` on either side of the goal means "any value".
///
/// # Examples
///
/// ```
/// use trigger_core::authoring::RuleDef;
/// use trigger_core::rule::AttributeKey;
///
/// let rule = RuleDef::new("engagement low", AttributeKey::learner("Engagement"))
///     .current("Low")
///     .state_level()
///     .build()
///     .unwrap();
/// assert_eq!(rule.name(), "engagement low");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleDef {
    pub name: String,
    pub key: AttributeKey,
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub previous: Option<AttributeValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub current: Option<AttributeValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: RuleKind,
}

impl RuleDef {
    /// Starts a definition with both goal sides unset.
    pub fn new(name: impl Into<String>, key: AttributeKey) -> Self {
        Self {
            name: name.into(),
            key,
            label: None,
            previous: None,
            current: None,
            kind: RuleKind::Transition,
        }
    }

    pub fn previous(mut self, value: impl Into<AttributeValue>) -> Self {
        self.previous = Some(value.into());
        self
    }

    pub fn current(mut self, value: impl Into<AttributeValue>) -> Self {
        self.current = Some(value.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn state_level(mut self) -> Self {
        self.kind = RuleKind::StateLevel;
        self
    }

    /// Validates the definition and creates the rule.
    pub fn build(&self) -> Result<Rule, TransitionError> {
        let goal = GoalSpec::new(self.previous.clone().into(), self.current.clone().into())?;
        let rule = Rule::new(self.kind, self.key.clone(), goal, self.name.as_str())?;
        Ok(match &self.label {
            Some(label) => rule.with_label(label.as_str()),
            None => rule,
        })
    }
}

/// An authored transition rule set, before validation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleSetDef<A> {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: u32,
    pub rules: Vec<RuleDef>,
    pub batches: Vec<Vec<A>>,
}

impl<A> RuleSetDef<A> {
    /// Validates every rule and creates the rule set.
    pub fn build(self) -> Result<TransitionRuleSet<A>, TransitionError> {
        let rules = self
            .rules
            .iter()
            .map(RuleDef::build)
            .collect::<Result<Vec<_>, _>>()?;
        let expression = LogicalExpression::new(rules)?;
        let set = TransitionRuleSet::new(self.name, expression, self.batches)?;
        Ok(set.with_priority(self.priority))
    }
}

/// Builds an agent holding every defined rule set, in order.
///
/// Stops at the first invalid definition.
pub fn load_agent<A: Clone + Send + Sync>(
    config: AgentConfig,
    defs: Vec<RuleSetDef<A>>,
) -> Result<TransitionAgent<A>, TransitionError> {
    let mut agent = TransitionAgent::new(config)?;
    for def in defs {
        agent.add(def.build()?);
    }
    Ok(agent)
}
