//! Timer-driven live play.
//!
//! One year is simulated per interval. There is no interactive player, so
//! popups are acknowledged here and the run is resumed right away.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::{
    preview::PreviewCache,
    queue,
    session::{Command, Session},
    snapshot::SnapshotWriter,
    world::RunStatus,
};

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub tick_interval: Duration,
    pub max_ticks: Option<u64>,
    pub max_runs: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The run collapsed or won and auto restart is off.
    RunEnded(RunStatus),
    QueueExhausted,
    TickLimit,
    RunLimit,
    Interrupted,
}

/// Advance the session by one interval: acknowledge pending popups, or
/// simulate a year.
pub fn step(session: &Session) -> Session {
    if session.state.event_popups.is_empty() {
        return session.advance();
    }
    let mut next = session.clone();
    while let Some(popup) = next.state.event_popups.first() {
        info!(year = popup.year, kind = ?popup.kind, title = %popup.title, "{}", popup.message);
        next = next.apply(Command::DismissPopup { index: 0 });
    }
    next.apply(Command::Resume)
}

/// Why the loop should stop after this step, if it should.
pub fn stop_reason(session: &Session, ticks: u64, options: &RuntimeOptions) -> Option<StopReason> {
    let run = &session.state.run;
    if options.max_runs.is_some_and(|limit| session.total_runs >= limit) {
        return Some(StopReason::RunLimit);
    }
    if run.status.is_terminal() {
        return Some(StopReason::RunEnded(run.status));
    }
    if run.status == RunStatus::Paused && session.state.event_popups.is_empty() {
        return Some(StopReason::QueueExhausted);
    }
    if options.max_ticks.is_some_and(|limit| ticks >= limit) {
        return Some(StopReason::TickLimit);
    }
    None
}

/// Project the current run from a fresh start and log the outcome.
fn log_projection(cache: &mut PreviewCache, session: &Session) {
    let run = &session.state.run;
    let projection = cache.get(&run.queue, &session.state.skills, run.repeat_last_action);
    info!(
        run = session.total_runs + 1,
        years = projection.years_used,
        collapsed = projection.collapsed,
        victory = projection.victory,
        "projected outcome"
    );
}

/// Log the queue entry the run moved on to.
fn log_active_entry(session: &Session) {
    let run = &session.state.run;
    let Some(progress) = queue::entry_progress(&run.queue, run.current_queue_index) else {
        return;
    };
    let position = progress.position;
    info!(
        year = run.year,
        action = %run.queue[position.array_index].action_id,
        repeat = position.repeat_within_entry + 1,
        of = ?progress.entry_repeat,
        group_pass = ?progress.group_repeat.map(|total| (position.group_iteration + 1, total)),
        "working on next entry"
    );
}

pub async fn run_live(
    mut session: Session,
    options: RuntimeOptions,
    mut writer: Option<SnapshotWriter>,
) -> (Session, StopReason) {
    let mut interval = time::interval(options.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut projections = PreviewCache::new();
    log_projection(&mut projections, &session);

    let mut ticks = 0_u64;
    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupt received, stopping");
                break StopReason::Interrupted;
            }
            _ = interval.tick() => {}
        }

        let runs_before = session.total_runs;
        let active_before = session.state.run.active_index();
        session = step(&session);
        ticks += 1;

        if session.total_runs != runs_before {
            log_projection(&mut projections, &session);
        } else if session.state.run.active_index() != active_before {
            log_active_entry(&session);
        }

        if let Some(writer) = writer.as_mut() {
            if let Err(err) = writer.maybe_write(ticks, &session) {
                warn!(error = %err, "autosave failed");
            }
        }
        if let Some(reason) = stop_reason(&session, ticks, &options) {
            break reason;
        }
    };

    if let Some(writer) = writer.as_ref() {
        if let Err(err) = writer.write(&session) {
            warn!(error = %err, "final save failed");
        }
    }
    info!(ticks, ?reason, year = session.state.run.year, "live loop stopped");
    (session, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        queue::Repeat,
        world::{EventKind, EventPopup},
    };

    fn options() -> RuntimeOptions {
        RuntimeOptions {
            tick_interval: Duration::from_millis(1),
            max_ticks: None,
            max_runs: None,
        }
    }

    fn farming_session() -> Session {
        Session::new()
            .apply(Command::AddEntry {
                action_id: "farm".into(),
                repeat: Repeat::Forever,
            })
            .apply(Command::Start)
    }

    #[test]
    fn step_acknowledges_popups_before_simulating() {
        let mut session = farming_session().apply(Command::Pause);
        session.state.event_popups.push(EventPopup {
            kind: EventKind::WinterStarted,
            year: 0,
            title: "Winter".into(),
            message: "Cold".into(),
        });
        let next = step(&session);
        assert!(next.state.event_popups.is_empty());
        assert_eq!(next.state.run.status, RunStatus::Running);
        assert_eq!(next.state.run.year, 0);
        assert_eq!(step(&next).state.run.year, 1);
    }

    #[test]
    fn exhausted_queues_stop_the_loop() {
        let session = Session::new()
            .apply(Command::AddEntry {
                action_id: "farm".into(),
                repeat: Repeat::Times(1),
            })
            .apply(Command::Start);
        let session = step(&step(&session));
        assert_eq!(
            stop_reason(&session, 2, &options()),
            Some(StopReason::QueueExhausted)
        );
    }

    #[tokio::test]
    async fn live_loop_honours_the_tick_limit() {
        let options = RuntimeOptions {
            max_ticks: Some(5),
            ..options()
        };
        let (session, reason) = run_live(farming_session(), options, None).await;
        assert_eq!(reason, StopReason::TickLimit);
        assert_eq!(session.state.run.year, 5);
    }

    #[tokio::test]
    async fn live_loop_stops_when_the_run_ends() {
        let (session, reason) = run_live(farming_session(), options(), None).await;
        assert_eq!(reason, StopReason::RunEnded(RunStatus::Collapsed));
        assert_eq!(session.state.run.year, crate::rules::RAIDER_YEAR);
    }
}
