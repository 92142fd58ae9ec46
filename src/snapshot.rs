//! Save files for a whole session.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    queue::{self, QueueError},
    session::Session,
    skills::Skills,
    world::{Disaster, EventKind, GameState, RunState},
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot queue is invalid: {0}")]
    InvalidQueue(#[from] QueueError),
}

/// Everything that persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub skills: Skills,
    pub run: RunState,
    pub total_runs: u32,
    pub unlocked_actions: BTreeSet<String>,
    #[serde(default)]
    pub encountered_disasters: Vec<Disaster>,
    #[serde(default)]
    pub auto_dismiss: BTreeSet<EventKind>,
}

impl SaveSnapshot {
    pub fn capture(session: &Session) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            skills: session.state.skills.clone(),
            run: session.state.run.clone(),
            total_runs: session.total_runs,
            unlocked_actions: session.unlocked_actions.clone(),
            encountered_disasters: session.state.encountered_disasters.clone(),
            auto_dismiss: session.state.auto_dismiss.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        queue::validate_queue(&self.run.queue)?;
        Ok(())
    }

    /// Pending popups are not saved, so a restored session starts without any.
    pub fn into_session(self) -> Session {
        let state = GameState {
            run: self.run,
            skills: self.skills,
            encountered_disasters: self.encountered_disasters,
            event_popups: Vec::new(),
            auto_dismiss: self.auto_dismiss,
        };
        Session::from_parts(state, self.total_runs, self.unlocked_actions)
    }
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<SaveSnapshot, SnapshotError> {
    let text = fs::read_to_string(path.as_ref())?;
    let snapshot: SaveSnapshot = serde_json::from_str(&text)?;
    snapshot.validate()?;
    debug!(path = %path.as_ref().display(), "loaded snapshot");
    Ok(snapshot)
}

/// Writes the session to a single file every `every_ticks` ticks.
pub struct SnapshotWriter {
    path: PathBuf,
    every_ticks: u64,
    last_tick: u64,
}

impl SnapshotWriter {
    /// An interval of zero disables periodic writes.
    pub fn new(path: impl Into<PathBuf>, every_ticks: u64) -> Self {
        Self {
            path: path.into(),
            every_ticks,
            last_tick: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_write(&self, tick: u64) -> bool {
        self.every_ticks > 0 && tick.saturating_sub(self.last_tick) >= self.every_ticks
    }

    pub fn maybe_write(
        &mut self,
        tick: u64,
        session: &Session,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        if !self.should_write(tick) {
            return Ok(None);
        }
        let path = self.write(session)?;
        self.last_tick = tick;
        Ok(Some(path))
    }

    pub fn write(&self, session: &Session) -> Result<PathBuf, SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&SaveSnapshot::capture(session))?;
        fs::write(&self.path, json)?;
        info!(path = %self.path.display(), year = session.state.run.year, "saved session");
        Ok(self.path.clone())
    }
}
