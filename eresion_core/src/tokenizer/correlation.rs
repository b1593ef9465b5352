//! Cause-effect correlation and behavior-run tracking over recent actions.

use std::collections::VecDeque;

use super::{CorrelatedAction, TokenType};

/// Bounded queue of recent action tokens awaiting an outcome.
#[derive(Debug, Clone)]
pub struct PendingActions {
    actions: VecDeque<(TokenType, f64)>,
    capacity: usize,
    window_ms: f64,
}

impl PendingActions {
    pub fn new(capacity: usize, window_ms: u64) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            window_ms: window_ms as f64,
        }
    }

    /// Record an action at the given timestamp (seconds). The oldest action
    /// is dropped when the queue is full.
    pub fn push(&mut self, action: TokenType, timestamp: f64) {
        if self.actions.len() == self.capacity {
            self.actions.pop_front();
        }
        self.actions.push_back((action, timestamp));
    }

    /// Evict actions older than the window relative to `outcome_ms`, then
    /// return every remaining action with its delay.
    ///
    /// Actions stay queued after correlation; one action may explain several
    /// outcomes inside its window.
    pub fn correlate(&mut self, outcome_ms: f64) -> Vec<CorrelatedAction> {
        while let Some((_, ts)) = self.actions.front() {
            if outcome_ms - ts * 1000.0 > self.window_ms {
                self.actions.pop_front();
            } else {
                break;
            }
        }

        self.actions
            .iter()
            .filter_map(|(action_type, ts)| {
                let delay_ms = outcome_ms - ts * 1000.0;
                (0.0..=self.window_ms).contains(&delay_ms).then(|| CorrelatedAction {
                    action_type: *action_type,
                    action_timestamp: *ts,
                    delay_ms,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

/// Tracks consecutive actions since the last emitted behavior run.
#[derive(Debug, Clone)]
pub struct ActionRuns {
    recent: VecDeque<(TokenType, f64)>,
    run_length: usize,
}

/// A completed behavior run.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorRun {
    pub pattern: TokenType,
    pub actions: Vec<TokenType>,
    pub mean_intensity: f64,
}

impl ActionRuns {
    pub fn new(run_length: usize) -> Self {
        Self {
            recent: VecDeque::new(),
            run_length: run_length.max(2),
        }
    }

    /// Record an action and check whether the latest actions form a run.
    /// A detected run is consumed.
    pub fn observe(&mut self, action: TokenType, intensity: f64) -> Option<BehaviorRun> {
        self.recent.push_back((action, intensity));
        while self.recent.len() > self.run_length {
            self.recent.pop_front();
        }
        if self.recent.len() < self.run_length {
            return None;
        }

        let actions: Vec<TokenType> = self.recent.iter().map(|(t, _)| *t).collect();
        let pattern = classify_run(&actions)?;
        let mean_intensity =
            self.recent.iter().map(|(_, i)| *i).sum::<f64>() / self.recent.len() as f64;
        self.recent.clear();

        Some(BehaviorRun {
            pattern,
            actions,
            mean_intensity,
        })
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

fn classify_run(actions: &[TokenType]) -> Option<TokenType> {
    use TokenType::*;

    let all = |t: TokenType| actions.iter().all(|a| *a == t);

    if all(ActionAttack) {
        return Some(PatternAggressiveSequence);
    }
    if all(ActionDefend) {
        return Some(PatternCautiousSequence);
    }
    if all(ActionInteract) {
        return Some(PatternSocialSequence);
    }
    if all(ActionRest) {
        return Some(PatternRecoverySequence);
    }
    if actions
        .iter()
        .all(|a| matches!(a, ActionMove | ActionObserve))
    {
        return Some(PatternExplorationSequence);
    }

    let combat_only = actions
        .iter()
        .all(|a| matches!(a, ActionAttack | ActionDefend));
    let alternating = actions.windows(2).all(|w| w[0] != w[1]);
    if combat_only && alternating {
        return Some(PatternTacticalAdaptation);
    }

    None
}
