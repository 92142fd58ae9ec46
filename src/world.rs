use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    queue::{self, QueueEntry},
    rules,
    skills::Skills,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub food: f64,
    pub preserved_food: f64,
    pub population: u32,
    pub max_population: u32,
    pub wood: f64,
    pub military_strength: f64,
    pub wall_defense: f64,
    pub food_storage: f64,
    pub researched_techs: BTreeSet<String>,
    pub huts: u32,
    pub granaries: u32,
    pub walls: u32,
}

impl Resources {
    /// Starting resources of every fresh run.
    pub fn baseline() -> Self {
        Self {
            food: 100.0,
            preserved_food: 0.0,
            population: 5,
            max_population: 10,
            wood: 0.0,
            military_strength: 0.0,
            wall_defense: 0.0,
            food_storage: 100.0,
            researched_techs: BTreeSet::new(),
            huts: 0,
            granaries: 0,
            walls: 0,
        }
    }

    pub fn total_defense(&self) -> f64 {
        self.military_strength + self.wall_defense
    }

    pub fn has_tech(&self, id: &str) -> bool {
        self.researched_techs.contains(id)
    }

    pub fn clamp_non_negative(&mut self) {
        self.food = self.food.max(0.0);
        self.preserved_food = self.preserved_food.max(0.0);
        self.wood = self.wood.max(0.0);
        self.military_strength = self.military_strength.max(0.0);
        self.wall_defense = self.wall_defense.max(0.0);
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::baseline()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    Collapsed,
    Victory,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Collapsed | RunStatus::Victory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub year: u32,
    pub severity: Severity,
    pub message: String,
}

/// Scripted events that can raise a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RaiderVictory,
    WinterStarted,
    WinterEnded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPopup {
    pub kind: EventKind,
    pub year: u32,
    pub title: String,
    pub message: String,
}

/// Disasters on the fixed timeline, remembered once a run reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disaster {
    Raiders,
    LongWinter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub food_spoiled: f64,
    pub starvation_deaths: u32,
    pub actions_completed: u32,
    pub actions_skipped: u32,
}

/// One playthrough from year zero to collapse or victory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub year: u32,
    pub max_year: u32,
    pub resources: Resources,
    pub queue: Vec<QueueEntry>,
    /// Number of action repetitions consumed since the queue started.
    pub current_queue_index: u64,
    /// Years spent so far on the active action.
    pub current_action_progress: u32,
    pub status: RunStatus,
    pub log: Vec<LogEntry>,
    pub collapse_reason: Option<String>,
    pub auto_restart: bool,
    pub repeat_last_action: bool,
    #[serde(default)]
    pub stats: RunStats,
}

impl RunState {
    pub fn new() -> Self {
        Self::with_queue(Vec::new())
    }

    pub fn with_queue(queue: Vec<QueueEntry>) -> Self {
        Self {
            year: 0,
            max_year: rules::MAX_YEAR,
            resources: Resources::baseline(),
            queue,
            current_queue_index: 0,
            current_action_progress: 0,
            status: RunStatus::Idle,
            log: Vec::new(),
            collapse_reason: None,
            auto_restart: false,
            repeat_last_action: false,
            stats: RunStats::default(),
        }
    }

    /// A new idle run that keeps this run's queue and behavior flags.
    pub fn successor(&self) -> Self {
        let mut next = Self::with_queue(self.queue.clone());
        next.auto_restart = self.auto_restart;
        next.repeat_last_action = self.repeat_last_action;
        next
    }

    /// Array index of the entry that the next year works on. Falls back to
    /// the last entry once the queue is exhausted if `repeat_last_action` is set.
    pub fn active_index(&self) -> Option<usize> {
        match queue::resolve_logical_index(&self.queue, self.current_queue_index) {
            Some(position) => Some(position.array_index),
            None if self.repeat_last_action => self.queue.len().checked_sub(1),
            None => None,
        }
    }

    pub fn active_entry(&self) -> Option<&QueueEntry> {
        self.active_index().map(|index| &self.queue[index])
    }

    pub fn push_log(&mut self, severity: Severity, message: impl Into<String>) {
        self.log.push(LogEntry {
            year: self.year,
            severity,
            message: message.into(),
        });
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the engine reads and produces in a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub run: RunState,
    pub skills: Skills,
    #[serde(default)]
    pub encountered_disasters: Vec<Disaster>,
    /// Popups waiting for the controller to acknowledge them.
    #[serde(default)]
    pub event_popups: Vec<EventPopup>,
    /// Event kinds whose popups are acknowledged without pausing the run.
    #[serde(default)]
    pub auto_dismiss: BTreeSet<EventKind>,
}

impl GameState {
    pub fn new(run: RunState, skills: Skills) -> Self {
        Self {
            run,
            skills,
            ..Self::default()
        }
    }
}
