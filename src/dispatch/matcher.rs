// src/dispatch/matcher.rs

//! Agent/task affinity scoring.

use std::cmp::Ordering;
use std::time::Instant;

use tracing::trace;

use crate::agents::Agent;
use crate::task::Task;

/// Tunables for [`CapabilityMatcher`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherSettings {
    /// Added when the agent's specialization is one of the task's required
    /// capabilities.
    pub specialization_bonus: f64,
    /// Multiplied by the agent's reported load and subtracted.
    pub load_penalty: f64,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            specialization_bonus: 0.5,
            load_penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapabilityMatcher {
    settings: MatcherSettings,
}

impl CapabilityMatcher {
    pub fn new(settings: MatcherSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> MatcherSettings {
        self.settings
    }

    /// Number of required capabilities the agent has.
    pub fn overlap(task: &Task, agent: &Agent) -> usize {
        task.required_capabilities
            .iter()
            .filter(|cap| agent.capabilities.contains(*cap))
            .count()
    }

    /// An agent qualifies if it covers at least one required capability (or
    /// nothing is required) and the task is not pinned to someone else.
    pub fn qualifies(task: &Task, agent: &Agent) -> bool {
        if let Some(ref wanted) = task.requested_agent {
            if *wanted != agent.id {
                return false;
            }
        }
        task.required_capabilities.is_empty() || Self::overlap(task, agent) > 0
    }

    pub fn score(&self, task: &Task, agent: &Agent) -> f64 {
        let required = task.required_capabilities.len();
        let mut score = if required == 0 {
            1.0
        } else {
            Self::overlap(task, agent) as f64 / required.max(1) as f64
        };

        if let Some(ref spec) = agent.specialization {
            if task.required_capabilities.contains(spec) {
                score += self.settings.specialization_bonus;
            }
        }

        score -= self.settings.load_penalty * agent.load.clamp(0.0, 1.0);
        score
    }

    /// Best qualifying agent among `candidates`.
    ///
    /// Highest score wins; ties go to the agent idle the longest, then to the
    /// lowest agent id. Returns `None` when nobody qualifies.
    pub fn select_best_agent<'a>(
        &self,
        task: &Task,
        candidates: &'a [Agent],
        now: Instant,
    ) -> Option<&'a Agent> {
        let mut best: Option<(&'a Agent, f64)> = None;

        for agent in candidates.iter().filter(|a| Self::qualifies(task, a)) {
            let score = self.score(task, agent);
            trace!(task = %task.id, agent = %agent.id, score, "scored candidate agent");

            best = match best {
                None => Some((agent, score)),
                Some((current, current_score)) => {
                    if Self::rank(agent, score, current, current_score, now) == Ordering::Greater {
                        Some((agent, score))
                    } else {
                        Some((current, current_score))
                    }
                }
            };
        }

        best.map(|(agent, _)| agent)
    }

    /// `Greater` means `a` should be preferred over `b`.
    fn rank(a: &Agent, a_score: f64, b: &Agent, b_score: f64, now: Instant) -> Ordering {
        a_score
            .total_cmp(&b_score)
            .then_with(|| a.idle_for(now).cmp(&b.idle_for(now)))
            .then_with(|| b.id.cmp(&a.id))
    }
}
