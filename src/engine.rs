//! The per-year state transition.
//!
//! A year runs a fixed pipeline of systems over the run and the skills. Every
//! outward signal (log lines, popups, disaster sightings) goes through an
//! [`EffectSink`], so the live tick and the preview share the same rules and
//! only differ in what they do with those signals.

use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    rules::Season,
    skills::Skills,
    systems::{self, ActionSystem, BookkeepingSystem, EventSystem, PopulationSystem},
    world::{Disaster, EventKind, EventPopup, GameState, LogEntry, RunState, RunStatus, Severity},
};

pub trait EffectSink {
    fn log(&mut self, year: u32, severity: Severity, message: String);
    /// Returns `true` when the popup should pause the run.
    fn popup(&mut self, popup: EventPopup) -> bool;
    fn disaster_encountered(&mut self, disaster: Disaster);
}

/// Collects signals so [`tick`] can fold them into the next state.
#[derive(Debug, Default)]
pub struct LiveSink<'a> {
    auto_dismiss: Option<&'a BTreeSet<EventKind>>,
    logs: Vec<LogEntry>,
    popups: Vec<EventPopup>,
    disasters: Vec<Disaster>,
}

impl<'a> LiveSink<'a> {
    pub fn new(auto_dismiss: &'a BTreeSet<EventKind>) -> Self {
        Self {
            auto_dismiss: Some(auto_dismiss),
            ..Self::default()
        }
    }

    fn apply_to(self, state: &mut GameState) {
        state.run.log.extend(self.logs);
        state.event_popups.extend(self.popups);
        for disaster in self.disasters {
            if !state.encountered_disasters.contains(&disaster) {
                state.encountered_disasters.push(disaster);
            }
        }
    }
}

impl EffectSink for LiveSink<'_> {
    fn log(&mut self, year: u32, severity: Severity, message: String) {
        self.logs.push(LogEntry {
            year,
            severity,
            message,
        });
    }

    fn popup(&mut self, popup: EventPopup) -> bool {
        let dismissed = self
            .auto_dismiss
            .is_some_and(|kinds| kinds.contains(&popup.kind));
        if dismissed {
            return false;
        }
        self.popups.push(popup);
        true
    }

    fn disaster_encountered(&mut self, disaster: Disaster) {
        self.disasters.push(disaster);
    }
}

/// Discards everything. Used for speculative runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl EffectSink for SilentSink {
    fn log(&mut self, _year: u32, _severity: Severity, _message: String) {}

    fn popup(&mut self, _popup: EventPopup) -> bool {
        false
    }

    fn disaster_encountered(&mut self, _disaster: Disaster) {}
}

pub struct SystemContext {
    pub year: u32,
    pub season: Season,
}

pub struct TickWorld<'a> {
    pub run: &'a mut RunState,
    pub skills: &'a mut Skills,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink);
}

pub struct Engine {
    systems: Vec<Box<dyn System>>,
}

impl Engine {
    /// The fixed order every year runs in.
    pub fn standard() -> Self {
        Self {
            systems: vec![
                Box::new(PopulationSystem::new()),
                Box::new(ActionSystem::new()),
                Box::new(EventSystem::new()),
                Box::new(BookkeepingSystem::new()),
            ],
        }
    }

    /// Advance a running run by one year. Returns `false` and leaves
    /// everything untouched when the run is not running.
    pub fn advance_year(
        &mut self,
        run: &mut RunState,
        skills: &mut Skills,
        sink: &mut dyn EffectSink,
    ) -> bool {
        if run.status != RunStatus::Running {
            return false;
        }
        // Paused in the final year and resumed: nothing is left to play.
        if run.year >= run.max_year {
            systems::declare_victory(run, sink);
            return true;
        }
        run.year += 1;
        let ctx = SystemContext {
            year: run.year,
            season: Season::for_year(run.year),
        };
        let mut world = TickWorld { run, skills };
        for system in &mut self.systems {
            system.run(&ctx, &mut world, sink);
            trace!(year = ctx.year, system = system.name(), "system finished");
        }
        true
    }
}

/// Advance the game by one year. The input is never modified.
pub fn tick(state: &GameState) -> GameState {
    let mut next = state.clone();
    if next.run.status != RunStatus::Running {
        return next;
    }
    let mut sink = LiveSink::new(&state.auto_dismiss);
    Engine::standard().advance_year(&mut next.run, &mut next.skills, &mut sink);
    sink.apply_to(&mut next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueEntry, Repeat};

    fn running(queue: Vec<QueueEntry>) -> GameState {
        let mut run = RunState::with_queue(queue);
        run.status = RunStatus::Running;
        GameState::new(run, Skills::default())
    }

    #[test]
    fn tick_is_a_noop_unless_running() {
        let mut state = running(vec![QueueEntry::new(1, "farm", Repeat::Forever)]);
        state.run.status = RunStatus::Paused;
        assert_eq!(tick(&state), state);
    }

    #[test]
    fn tick_leaves_its_input_alone() {
        let state = running(vec![QueueEntry::new(1, "farm", Repeat::Forever)]);
        let before = state.clone();
        let next = tick(&state);
        assert_eq!(state, before);
        assert_eq!(next.run.year, 1);
    }

    #[test]
    fn silent_sink_never_pauses() {
        let mut sink = SilentSink;
        let popup = EventPopup {
            kind: EventKind::WinterStarted,
            year: 1,
            title: String::new(),
            message: String::new(),
        };
        assert!(!sink.popup(popup));
    }

    #[test]
    fn live_sink_respects_auto_dismiss() {
        let kinds: BTreeSet<_> = [EventKind::WinterEnded].into_iter().collect();
        let mut sink = LiveSink::new(&kinds);
        let popup = |kind| EventPopup {
            kind,
            year: 3,
            title: "t".into(),
            message: "m".into(),
        };
        assert!(!sink.popup(popup(EventKind::WinterEnded)));
        assert!(sink.popup(popup(EventKind::WinterStarted)));

        let mut state = GameState::default();
        sink.disaster_encountered(Disaster::Raiders);
        sink.disaster_encountered(Disaster::Raiders);
        sink.apply_to(&mut state);
        assert_eq!(state.event_popups.len(), 1);
        assert_eq!(state.encountered_disasters, vec![Disaster::Raiders]);
    }
}
