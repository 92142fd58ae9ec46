//! Whole-run projection of a queue from a fresh start.
//!
//! The preview drives the same [`Engine`] as live play through a
//! [`SilentSink`], so it can never drift from the real rules. Popups never
//! pause a preview.

use serde::Serialize;
use tracing::debug;

use crate::{
    engine::{Engine, SilentSink},
    queue::QueueEntry,
    skills::Skills,
    world::{Resources, RunState, RunStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResult {
    pub resources: Resources,
    pub years_used: u32,
    pub collapsed: bool,
    /// Action that was active in the year the run collapsed.
    pub collapse_action_id: Option<String>,
    pub victory: bool,
    pub food_spoiled: f64,
}

/// Play `queue` from the baseline resources until the run collapses, wins,
/// or runs out of orders. `skills` is copied and never modified.
pub fn simulate_queue_preview(
    queue: &[QueueEntry],
    skills: &Skills,
    repeat_last_action: bool,
) -> PreviewResult {
    let mut run = RunState::with_queue(queue.to_vec());
    run.repeat_last_action = repeat_last_action;
    run.status = RunStatus::Running;
    let mut skills = skills.clone();
    let mut engine = Engine::standard();

    let mut active_action = None;
    while run.status == RunStatus::Running {
        active_action = run.active_entry().map(|entry| entry.action_id.clone());
        engine.advance_year(&mut run, &mut skills, &mut SilentSink);
    }

    let collapsed = run.status == RunStatus::Collapsed;
    debug!(
        years = run.year,
        collapsed,
        status = ?run.status,
        "preview finished"
    );
    PreviewResult {
        resources: run.resources,
        years_used: run.year,
        collapsed,
        collapse_action_id: if collapsed { active_action } else { None },
        victory: run.status == RunStatus::Victory,
        food_spoiled: run.stats.food_spoiled,
    }
}

/// Remembers the most recent preview so unchanged inputs are not replayed.
#[derive(Debug, Default)]
pub struct PreviewCache {
    last: Option<(CacheKey, PreviewResult)>,
    computed: u64,
}

#[derive(Debug, PartialEq)]
struct CacheKey {
    queue: Vec<QueueEntry>,
    skills: Skills,
    repeat_last_action: bool,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        queue: &[QueueEntry],
        skills: &Skills,
        repeat_last_action: bool,
    ) -> &PreviewResult {
        let stale = !matches!(
            &self.last,
            Some((key, _))
                if key.repeat_last_action == repeat_last_action
                    && key.queue == queue
                    && key.skills == *skills
        );
        if stale {
            self.last = None;
        }
        let computed = &mut self.computed;
        let (_, result) = self.last.get_or_insert_with(|| {
            *computed += 1;
            let key = CacheKey {
                queue: queue.to_vec(),
                skills: skills.clone(),
                repeat_last_action,
            };
            (key, simulate_queue_preview(queue, skills, repeat_last_action))
        });
        result
    }

    /// Number of previews actually simulated.
    pub fn computed(&self) -> u64 {
        self.computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{queue::Repeat, rules};

    #[test]
    fn farming_alone_falls_to_raiders() {
        let queue = vec![QueueEntry::new(1, "farm", Repeat::Forever)];
        let result = simulate_queue_preview(&queue, &Skills::default(), false);
        assert!(result.collapsed);
        assert_eq!(result.years_used, rules::RAIDER_YEAR);
        assert_eq!(result.collapse_action_id.as_deref(), Some("farm"));
        assert!(result.food_spoiled > 0.0);
    }

    #[test]
    fn finite_queue_stops_when_exhausted() {
        let queue = vec![QueueEntry::new(1, "gather_wood", Repeat::Times(3))];
        let result = simulate_queue_preview(&queue, &Skills::default(), false);
        assert!(!result.collapsed);
        assert!(!result.victory);
        assert_eq!(result.years_used, 4);
        assert_eq!(result.collapse_action_id, None);
    }

    #[test]
    fn cache_skips_repeated_inputs() {
        let queue = vec![QueueEntry::new(1, "farm", Repeat::Forever)];
        let skills = Skills::default();
        let mut cache = PreviewCache::new();
        let first = cache.get(&queue, &skills, true).clone();
        let second = cache.get(&queue, &skills, true).clone();
        assert_eq!(first, second);
        assert_eq!(cache.computed(), 1);
        cache.get(&queue, &skills, false);
        assert_eq!(cache.computed(), 2);
    }
}
