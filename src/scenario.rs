use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    queue::{self, QueueEntry, Repeat},
    session::Session,
    world::{GameState, RunState},
};

fn default_repeat() -> Repeat {
    Repeat::Times(1)
}

/// A named queue plan.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub repeat_last_action: bool,
    #[serde(default)]
    pub auto_restart: bool,
    pub queue: Vec<PlanItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanItem {
    Group { group: PlanGroup },
    Entry(PlanEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanEntry {
    pub action: String,
    #[serde(default = "default_repeat")]
    pub repeat: Repeat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanGroup {
    pub repeat: u32,
    pub entries: Vec<PlanEntry>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .build_queue()
            .with_context(|| format!("Invalid queue in {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Number entries and groups from one, in plan order.
    pub fn build_queue(&self) -> Result<Vec<QueueEntry>> {
        let mut entries = Vec::new();
        let mut next_group = 1;
        for item in &self.queue {
            match item {
                PlanItem::Entry(entry) => {
                    let id = entries.len() as u64 + 1;
                    entries.push(QueueEntry::new(id, entry.action.as_str(), entry.repeat));
                }
                PlanItem::Group { group } => {
                    for entry in &group.entries {
                        let id = entries.len() as u64 + 1;
                        entries.push(
                            QueueEntry::new(id, entry.action.as_str(), entry.repeat)
                                .in_group(next_group, group.repeat),
                        );
                    }
                    next_group += 1;
                }
            }
        }
        queue::validate_queue(&entries)?;
        Ok(entries)
    }

    pub fn build_run(&self) -> Result<RunState> {
        let mut run = RunState::with_queue(self.build_queue()?);
        run.repeat_last_action = self.repeat_last_action;
        run.auto_restart = self.auto_restart;
        Ok(run)
    }

    /// A fresh idle session holding this plan. Plans may queue actions the
    /// player has not unlocked yet.
    pub fn build_session(&self) -> Result<Session> {
        let state = GameState::new(self.build_run()?, Default::default());
        Ok(Session::from_parts(
            state,
            0,
            Session::new().unlocked_actions,
        ))
    }
}
