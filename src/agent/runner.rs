//! Update routing and evaluation loop.

use super::config::AgentConfig;
use super::selection::{Candidate, TransitionSelection};
use crate::error::TransitionError;
use crate::rule::{AttributeKey, AttributeValue};
use crate::ruleset::TransitionRuleSet;
use log::{debug, info, trace, warn};
use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One fired transition's request for activities.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation<A> {
    /// Name of the rule set that fired.
    pub rule_set: String,

    /// Human-readable reason to attach to the requests.
    pub reason: String,

    /// Performance nodes the rule set's expression refers to.
    pub node_ids: Vec<u32>,

    /// The activity batch to execute.
    pub activities: Vec<A>,

    /// How many times the rule set has fired, this activation included.
    pub activation_number: usize,
}

impl<A> Activation<A> {
    /// True when the batch is empty and the caller should request nothing.
    pub fn is_do_nothing(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Routes attribute updates to the rule sets that watch them and collects
/// activity batches from the ones that fire.
///
/// One agent serves one learner session. Call [`update`](Self::update) or
/// [`observe`](Self::observe) for every attribute in a state message, then
/// [`evaluate`](Self::evaluate) once.
///
/// # Examples
///
/// ```
/// use trigger_core::agent::{AgentConfig, TransitionAgent};
/// use trigger_core::expression::LogicalExpression;
/// use trigger_core::rule::{AttributeKey, AttributeValue, GoalSpec, Rule};
/// use trigger_core::ruleset::TransitionRuleSet;
///
/// let key = AttributeKey::learner("Engagement");
/// let rule = Rule::transition(key.clone(), GoalSpec::entering("Low"), "low").unwrap();
/// let set = TransitionRuleSet::new(
///     "Re-engage",
///     LogicalExpression::new(vec![rule]).unwrap(),
///     vec![vec!["prompt"]],
/// )
/// .unwrap();
///
/// let mut agent = TransitionAgent::new(AgentConfig::default()).unwrap();
/// agent.add(set);
///
/// agent.observe(&key, None, AttributeValue::new("Low"), 1_000);
/// let fired = agent.evaluate();
/// assert_eq!(fired.len(), 1);
/// assert_eq!(fired[0].activities, vec!["prompt"]);
/// ```
pub struct TransitionAgent<A> {
    config: AgentConfig,
    selector: Box<dyn TransitionSelection>,
    rule_sets: Vec<TransitionRuleSet<A>>,
    routes: HashMap<AttributeKey, Vec<usize>>,
    last_values: HashMap<(AttributeKey, Option<String>), (AttributeValue, u64)>,
}

impl<A: Clone + Send + Sync> TransitionAgent<A> {
    /// Creates an agent with no rule sets.
    pub fn new(config: AgentConfig) -> Result<Self, TransitionError> {
        config.validate()?;
        Ok(Self {
            selector: config.selection.selector(),
            config,
            rule_sets: Vec::new(),
            routes: HashMap::new(),
            last_values: HashMap::new(),
        })
    }

    /// Replaces the configured selection policy with a custom one.
    pub fn with_selector<S: TransitionSelection + 'static>(mut self, selector: S) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Registers a rule set and returns its index.
    pub fn add(&mut self, rule_set: TransitionRuleSet<A>) -> usize {
        let index = self.rule_sets.len();
        for key in rule_set.attribute_keys() {
            self.routes.entry(key).or_default().push(index);
        }
        debug!("registered transition {rule_set}");
        self.rule_sets.push(rule_set);
        index
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn rule_sets(&self) -> &[TransitionRuleSet<A>] {
        &self.rule_sets
    }

    pub fn rule_set_count(&self) -> usize {
        self.rule_sets.len()
    }

    /// Looks up a rule set by name.
    pub fn rule_set(&self, name: &str) -> Option<&TransitionRuleSet<A>> {
        self.rule_sets.iter().find(|set| set.name() == name)
    }

    /// Every attribute key some rule set watches.
    pub fn attribute_keys(&self) -> HashSet<AttributeKey> {
        self.routes.keys().cloned().collect()
    }

    /// Forwards an update with an explicit previous value.
    pub fn update(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        if self.config.parallel {
            self.update_parallel(key, label, previous, previous_ts, current, current_ts);
        } else {
            self.update_routed(key, label, previous, previous_ts, current, current_ts);
        }
    }

    /// Forwards an update, supplying the previous value from the last
    /// observation of the same key and label.
    pub fn observe(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        current: AttributeValue,
        current_ts: u64,
    ) {
        let slot = (key.clone(), label.map(str::to_string));
        let previous = self.last_values.get(&slot).cloned();
        let (previous_value, previous_ts) = match &previous {
            Some((value, ts)) => (Some(value), *ts),
            None => (None, 0),
        };
        self.update(key, label, previous_value, previous_ts, &current, current_ts);
        self.last_values.insert(slot, (current, current_ts));
    }

    fn update_routed(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        let Some(indices) = self.routes.get(key) else {
            trace!("no transition watches {key}");
            return;
        };
        for &i in indices {
            self.rule_sets[i].update(key, label, previous, previous_ts, current, current_ts);
        }
    }

    #[cfg(feature = "parallel")]
    fn update_parallel(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        self.rule_sets
            .par_iter_mut()
            .filter(|set| set.expression().references(key))
            .for_each(|set| set.update(key, label, previous, previous_ts, current, current_ts));
    }

    #[cfg(not(feature = "parallel"))]
    fn update_parallel(
        &mut self,
        key: &AttributeKey,
        label: Option<&str>,
        previous: Option<&AttributeValue>,
        previous_ts: u64,
        current: &AttributeValue,
        current_ts: u64,
    ) {
        self.update_routed(key, label, previous, previous_ts, current, current_ts);
    }

    /// Forgets remembered previous values.
    ///
    /// Call when a new lesson starts so attribute values carried into it
    /// are observed with no previous value.
    pub fn lesson_started(&mut self) {
        self.last_values.clear();
    }

    /// Clears every rule's pending and notional satisfaction so activations
    /// left over from the previous lesson cannot fire again. A state-level
    /// rule whose state persists across the restart stays quiet.
    pub fn lesson_restarted(&mut self) {
        for set in &mut self.rule_sets {
            set.reset();
        }
    }

    /// Checks every rule set once and returns the activations that survive
    /// the selection filter, in insertion order.
    pub fn evaluate(&mut self) -> Vec<Activation<A>> {
        let mut fired = Vec::new();
        for (index, set) in self.rule_sets.iter_mut().enumerate() {
            if set.should_transition() {
                info!("transition {set} has been satisfied");
                fired.push(index);
            }
        }
        if fired.is_empty() {
            return Vec::new();
        }

        let selected: Vec<usize> = {
            let mut candidates: Vec<Candidate<'_>> = fired
                .iter()
                .map(|&index| Candidate {
                    index,
                    name: self.rule_sets[index].name(),
                    priority: self.rule_sets[index].priority(),
                })
                .collect();
            debug!(
                "filtering {} fired transitions with {}",
                candidates.len(),
                self.selector.name()
            );
            self.selector.filter(&mut candidates);
            candidates.iter().map(|c| c.index).collect()
        };

        selected
            .into_iter()
            .map(|index| {
                let set = &mut self.rule_sets[index];
                let activities = set.next_activity_set().to_vec();
                if activities.is_empty() {
                    warn!("transition '{}' has no activities, requesting nothing", set.name());
                }
                Activation {
                    rule_set: set.name().to_string(),
                    reason: set.reason_for_activation(),
                    node_ids: set.node_ids(),
                    activities,
                    activation_number: set.activation_count(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SelectionPolicy;
    use crate::expression::LogicalExpression;
    use crate::rule::{GoalSpec, Rule};

    fn v(token: &str) -> AttributeValue {
        AttributeValue::new(token)
    }

    fn engagement() -> AttributeKey {
        AttributeKey::learner("Engagement")
    }

    fn set_on(
        key: AttributeKey,
        goal: &str,
        name: &str,
        batches: Vec<Vec<&'static str>>,
    ) -> TransitionRuleSet<&'static str> {
        let rule = Rule::transition(key, GoalSpec::entering(goal), format!("{name} rule")).unwrap();
        TransitionRuleSet::new(name, LogicalExpression::new(vec![rule]).unwrap(), batches).unwrap()
    }

    fn agent(policy: SelectionPolicy) -> TransitionAgent<&'static str> {
        TransitionAgent::new(AgentConfig::default().with_selection(policy)).unwrap()
    }

    #[test]
    fn test_routes_only_watched_keys() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "engagement", vec![vec!["prompt"]]));
        agent.add(set_on(
            AttributeKey::Node(1),
            "BelowExpectation",
            "task",
            vec![vec!["hint"]],
        ));

        assert_eq!(agent.attribute_keys().len(), 2);
        agent.update(&engagement(), None, None, 0, &v("Low"), 100);
        agent.update(&AttributeKey::learner("Arousal"), None, None, 0, &v("Low"), 100);

        let fired = agent.evaluate();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].rule_set, "engagement");
        assert_eq!(fired[0].reason, "\"engagement\" was satisfied");
        assert_eq!(fired[0].activation_number, 1);
        assert!(agent.evaluate().is_empty());
    }

    #[test]
    fn test_observe_supplies_previous() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "engagement", vec![vec!["prompt"]]));

        agent.observe(&engagement(), None, v("High"), 100);
        assert!(agent.evaluate().is_empty());
        // Same value, same timestamp: no change.
        agent.observe(&engagement(), None, v("High"), 100);
        assert!(agent.evaluate().is_empty());
        agent.observe(&engagement(), None, v("Low"), 200);
        assert_eq!(agent.evaluate().len(), 1);
    }

    #[test]
    fn test_observe_tracks_labels_separately() {
        let key = AttributeKey::learner("Knowledge");
        let rule = Rule::transition(key.clone(), GoalSpec::entering("Expert"), "expert")
            .unwrap()
            .with_label("Navigation");
        let set = TransitionRuleSet::new(
            "navigation mastered",
            LogicalExpression::new(vec![rule]).unwrap(),
            vec![vec!["advance"]],
        )
        .unwrap();
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set);

        agent.observe(&key, Some("First aid"), v("Novice"), 100);
        agent.observe(&key, Some("Navigation"), v("Expert"), 100);
        assert_eq!(agent.evaluate().len(), 1);
    }

    #[test]
    fn test_lesson_started_forgets_previous() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "engagement", vec![vec!["prompt"]]));

        agent.observe(&engagement(), None, v("Low"), 100);
        assert_eq!(agent.evaluate().len(), 1);

        agent.lesson_started();
        // Without a remembered previous value this looks like a fresh entry,
        // but the rule last saw Low, so the update is treated as missed.
        agent.observe(&engagement(), None, v("Low"), 100);
        assert!(agent.evaluate().is_empty());
    }

    #[test]
    fn test_lesson_restarted_drops_pending_activation() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "engagement", vec![vec!["prompt"]]));

        agent.observe(&engagement(), None, v("Low"), 100);
        agent.lesson_restarted();
        assert!(agent.evaluate().is_empty());
    }

    #[test]
    fn test_lesson_restarted_keeps_persisting_state_quiet() {
        let mut agent = agent(SelectionPolicy::All);
        let rule =
            Rule::state_level(engagement(), GoalSpec::entering("Engaged"), "engaged").unwrap();
        let expr = LogicalExpression::new(vec![rule]).unwrap();
        agent.add(TransitionRuleSet::new("engaged", expr, vec![vec!["praise"]]).unwrap());

        agent.observe(&engagement(), None, v("Engaged"), 100);
        assert_eq!(agent.evaluate().len(), 1);
        agent.observe(&engagement(), None, v("Engaged"), 200);
        assert!(agent.evaluate().is_empty());

        agent.lesson_restarted();
        agent.observe(&engagement(), None, v("Engaged"), 300);
        assert!(agent.evaluate().is_empty());

        agent.observe(&engagement(), None, v("Disengaged"), 400);
        agent.observe(&engagement(), None, v("Engaged"), 500);
        assert_eq!(agent.evaluate().len(), 1);
    }

    #[test]
    fn test_highest_priority_selection() {
        let mut agent = agent(SelectionPolicy::HighestPriority);
        agent.add(set_on(engagement(), "Low", "minor", vec![vec!["nudge"]]).with_priority(3));
        agent.add(set_on(engagement(), "Low", "major", vec![vec!["pause"]]).with_priority(1));

        agent.observe(&engagement(), None, v("Low"), 100);
        let fired = agent.evaluate();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].rule_set, "major");

        // The filtered transition was consumed without advancing its batches.
        assert_eq!(agent.rule_set("minor").map(|s| s.activation_count()), Some(0));
        assert!(agent.evaluate().is_empty());
    }

    #[test]
    fn test_all_selection_keeps_order() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "first", vec![vec!["a"]]).with_priority(3));
        agent.add(set_on(engagement(), "Low", "second", vec![vec!["b"]]).with_priority(1));

        agent.observe(&engagement(), None, v("Low"), 100);
        let names: Vec<String> = agent.evaluate().into_iter().map(|a| a.rule_set).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_escalation_across_evaluations() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(
            engagement(),
            "Low",
            "engagement",
            vec![vec!["prompt"], vec!["prompt", "video"]],
        ));

        let mut batches = Vec::new();
        for (i, value) in ["Low", "High", "Low", "High", "Low"].iter().enumerate() {
            agent.observe(&engagement(), None, v(value), 100 * (i as u64 + 1));
            for activation in agent.evaluate() {
                batches.push(activation.activities);
            }
        }
        assert_eq!(
            batches,
            vec![
                vec!["prompt"],
                vec!["prompt", "video"],
                vec!["prompt", "video"],
            ]
        );
    }

    #[test]
    fn test_empty_batch_is_do_nothing() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(engagement(), "Low", "engagement", vec![vec![]]));

        agent.observe(&engagement(), None, v("Low"), 100);
        let fired = agent.evaluate();
        assert_eq!(fired.len(), 1);
        assert!(fired[0].is_do_nothing());
    }

    #[test]
    fn test_node_ids_reported() {
        let mut agent = agent(SelectionPolicy::All);
        agent.add(set_on(
            AttributeKey::Node(12),
            "BelowExpectation",
            "task",
            vec![vec!["hint"]],
        ));

        agent.observe(&AttributeKey::Node(12), None, v("BelowExpectation"), 100);
        let fired = agent.evaluate();
        assert_eq!(fired[0].node_ids, vec![12]);
    }

    struct LastOnly;

    impl TransitionSelection for LastOnly {
        fn name(&self) -> &str {
            "LastOnly"
        }

        fn filter(&self, fired: &mut Vec<Candidate<'_>>) {
            let keep = fired.len().saturating_sub(1);
            fired.drain(..keep);
        }
    }

    #[test]
    fn test_custom_selector() {
        let mut agent = agent(SelectionPolicy::All).with_selector(LastOnly);
        agent.add(set_on(engagement(), "Low", "first", vec![vec!["a"]]));
        agent.add(set_on(engagement(), "Low", "second", vec![vec!["b"]]));

        agent.observe(&engagement(), None, v("Low"), 100);
        let fired = agent.evaluate();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].rule_set, "second");
    }

    #[test]
    fn test_rule_set_lookup() {
        let mut agent = agent(SelectionPolicy::All);
        let index = agent.add(set_on(engagement(), "Low", "engagement", vec![vec!["a"]]));
        assert_eq!(index, 0);
        assert_eq!(agent.rule_set_count(), 1);
        assert!(agent.rule_set("engagement").is_some());
        assert!(agent.rule_set("missing").is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let build = |parallel: bool| {
            let mut agent: TransitionAgent<&'static str> = TransitionAgent::new(
                AgentConfig::default()
                    .with_selection(SelectionPolicy::All)
                    .with_parallel(parallel),
            )
            .unwrap();
            for i in 0..16u32 {
                agent.add(set_on(
                    AttributeKey::Node(i % 4),
                    "BelowExpectation",
                    &format!("set {i}"),
                    vec![vec!["hint"]],
                ));
            }
            agent
        };

        let mut sequential = build(false);
        let mut parallel = build(true);
        for agent in [&mut sequential, &mut parallel] {
            agent.observe(&AttributeKey::Node(2), None, v("BelowExpectation"), 100);
        }
        assert_eq!(sequential.evaluate(), parallel.evaluate());
    }
}
