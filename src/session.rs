//! Player-facing controller.
//!
//! Every command is a total reducer: it returns a new [`Session`] and never
//! fails. Commands that make no sense for the current state return an
//! unchanged copy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    catalog::{self, Unlock},
    engine,
    queue::{self, EntryId, GroupId, GroupTag, QueueEntry, Repeat},
    skills::Skills,
    snapshot::SaveSnapshot,
    world::{EventKind, GameState, RunState, RunStatus, Severity},
};

const ABANDON_REASON: &str = "The settlement was abandoned.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset { keep_queue: bool },
    /// Force the current run to collapse.
    Abandon,
    AddEntry { action_id: String, repeat: Repeat },
    RemoveEntry(EntryId),
    MoveUp(EntryId),
    MoveDown(EntryId),
    Duplicate(EntryId),
    SetRepeat { id: EntryId, repeat: Repeat },
    /// Split one entry into two with `at` and `repeat - at` repeats.
    SplitEntry { id: EntryId, at: u32 },
    /// Fold the following entry into this one when both run the same action.
    MergeWithNext(EntryId),
    GroupRange { first: EntryId, last: EntryId, repeat: u32 },
    Ungroup(GroupId),
    SetGroupRepeat { group: GroupId, repeat: u32 },
    ToggleRepeatLastAction,
    ToggleAutoRestart,
    SetAutoDismiss { kind: EventKind, enabled: bool },
    DismissPopup { index: usize },
    LoadQueue(Vec<QueueEntry>),
    Import(Box<SaveSnapshot>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: GameState,
    pub total_runs: u32,
    pub unlocked_actions: BTreeSet<String>,
    pub next_entry_id: EntryId,
    pub next_group_id: GroupId,
}

impl Session {
    pub fn new() -> Self {
        let unlocked_actions = catalog::all()
            .iter()
            .filter(|def| def.unlock == Unlock::Always)
            .map(|def| def.id.to_string())
            .collect();
        Self {
            state: GameState::default(),
            total_runs: 0,
            unlocked_actions,
            next_entry_id: 1,
            next_group_id: 1,
        }
    }

    /// Rebuild a session from saved data. Id counters continue past the
    /// largest ids in the saved queue.
    pub fn from_parts(
        state: GameState,
        total_runs: u32,
        unlocked_actions: BTreeSet<String>,
    ) -> Self {
        let mut session = Self {
            state,
            total_runs,
            unlocked_actions,
            next_entry_id: 1,
            next_group_id: 1,
        };
        session.sync_id_counters();
        session
    }

    pub fn run(&self) -> &RunState {
        &self.state.run
    }

    pub fn skills(&self) -> &Skills {
        &self.state.skills
    }

    pub fn apply(&self, command: Command) -> Session {
        let mut next = self.clone();
        let label = format!("{command:?}");
        if next.reduce(command) {
            debug!(command = %label, "command applied");
            next
        } else {
            debug!(command = %label, "command ignored");
            self.clone()
        }
    }

    /// Run one year, record new unlocks and restart a finished run when
    /// auto restart is on.
    pub fn advance(&self) -> Session {
        let mut next = self.clone();
        next.state = engine::tick(&self.state);

        let unlocked: Vec<&'static str> =
            catalog::newly_unlockable(&next.state.run.resources, &next.unlocked_actions).collect();
        for id in unlocked {
            info!(action = id, "action unlocked");
            next.unlocked_actions.insert(id.to_string());
        }

        let finished = next.state.run.status.is_terminal() && !self.state.run.status.is_terminal();
        if finished {
            info!(
                year = next.state.run.year,
                status = ?next.state.run.status,
                reason = next.state.run.collapse_reason.as_deref().unwrap_or(""),
                "run finished"
            );
            if next.state.run.auto_restart {
                next.restart(true);
                next.start();
            }
        }
        next
    }

    fn reduce(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.start(),
            Command::Pause => self.set_status(RunStatus::Running, RunStatus::Paused),
            Command::Resume => self.set_status(RunStatus::Paused, RunStatus::Running),
            Command::Reset { keep_queue } => {
                self.restart(keep_queue);
                true
            }
            Command::Abandon => self.abandon(),
            Command::AddEntry { action_id, repeat } => self.add_entry(action_id, repeat),
            Command::RemoveEntry(id) => self.edit_queue(|s, _| s.remove_entry(id)),
            Command::MoveUp(id) => self.edit_queue(|s, _| s.move_up(id)),
            Command::MoveDown(id) => self.edit_queue(|s, _| s.move_down(id)),
            Command::Duplicate(id) => self.edit_queue(|s, _| s.duplicate(id)),
            Command::SetRepeat { id, repeat } => self.edit_queue(|s, _| s.set_repeat(id, repeat)),
            Command::SplitEntry { id, at } => {
                self.edit_queue(|s, cursor| s.split_entry(id, at, cursor))
            }
            Command::MergeWithNext(id) => {
                self.edit_queue(|s, cursor| s.merge_with_next(id, cursor))
            }
            Command::GroupRange { first, last, repeat } => {
                self.edit_queue(|s, _| s.group_range(first, last, repeat))
            }
            Command::Ungroup(group) => self.edit_queue(|s, _| s.ungroup(group)),
            Command::SetGroupRepeat { group, repeat } => {
                self.edit_queue(|s, _| s.set_group_repeat(group, repeat))
            }
            Command::ToggleRepeatLastAction => {
                self.state.run.repeat_last_action = !self.state.run.repeat_last_action;
                true
            }
            Command::ToggleAutoRestart => {
                self.state.run.auto_restart = !self.state.run.auto_restart;
                true
            }
            Command::SetAutoDismiss { kind, enabled } => {
                if enabled {
                    self.state.auto_dismiss.insert(kind)
                } else {
                    self.state.auto_dismiss.remove(&kind)
                }
            }
            Command::DismissPopup { index } => {
                if index < self.state.event_popups.len() {
                    self.state.event_popups.remove(index);
                    true
                } else {
                    false
                }
            }
            Command::LoadQueue(entries) => self.load_queue(entries),
            Command::Import(snapshot) => {
                if let Err(err) = snapshot.validate() {
                    debug!(error = %err, "rejected imported snapshot");
                    return false;
                }
                *self = (*snapshot).into_session();
                true
            }
        }
    }

    fn start(&mut self) -> bool {
        let run = &mut self.state.run;
        if run.status != RunStatus::Idle || run.queue.is_empty() {
            return false;
        }
        run.status = RunStatus::Running;
        run.push_log(Severity::Info, "A new settlement is founded.");
        info!(run = self.total_runs + 1, "run started");
        true
    }

    fn set_status(&mut self, from: RunStatus, to: RunStatus) -> bool {
        if self.state.run.status != from {
            return false;
        }
        self.state.run.status = to;
        true
    }

    fn restart(&mut self, keep_queue: bool) {
        if self.state.run.status.is_terminal() {
            self.total_runs += 1;
        }
        let mut run = self.state.run.successor();
        if !keep_queue {
            run.queue.clear();
        }
        self.state.run = run;
        self.state.event_popups.clear();
    }

    fn abandon(&mut self) -> bool {
        let run = &mut self.state.run;
        if !matches!(run.status, RunStatus::Running | RunStatus::Paused) {
            return false;
        }
        run.status = RunStatus::Collapsed;
        run.collapse_reason = Some(ABANDON_REASON.to_string());
        run.push_log(Severity::Danger, ABANDON_REASON);
        true
    }

    /// Where a started run stands in its queue. `None` for idle and finished
    /// runs, whose position is not worth keeping.
    fn cursor(&self) -> Option<Cursor> {
        let run = &self.state.run;
        if !matches!(run.status, RunStatus::Running | RunStatus::Paused) {
            return None;
        }
        let cursor = match queue::resolve_logical_index(&run.queue, run.current_queue_index) {
            Some(position) => {
                let entry = &run.queue[position.array_index];
                Cursor::At {
                    entry: entry.id,
                    group: entry.group_id(),
                    slot: position.array_index,
                    group_iteration: position.group_iteration,
                    repeat_within_entry: position.repeat_within_entry,
                }
            }
            None => Cursor::Exhausted {
                last: run.queue.last().map(|entry| entry.id),
            },
        };
        Some(cursor)
    }

    /// Apply a queue edit and move the logical index so the run keeps
    /// working on the same entry and repeat.
    fn edit_queue(&mut self, edit: impl FnOnce(&mut Self, &mut Option<Cursor>) -> bool) -> bool {
        let mut cursor = self.cursor();
        if !edit(self, &mut cursor) {
            return false;
        }
        if let Some(cursor) = cursor {
            self.relocate(cursor);
        }
        true
    }

    fn relocate(&mut self, cursor: Cursor) {
        let run = &mut self.state.run;
        let queue = &run.queue;
        let (index, keep_progress) = match cursor {
            Cursor::Exhausted { last } => {
                let index = queue::get_queue_logical_size(queue);
                let still_exhausted = index
                    .map_or(true, |index| queue::resolve_logical_index(queue, index).is_none());
                (index, still_exhausted && queue.last().map(|entry| entry.id) == last)
            }
            Cursor::At {
                entry,
                group,
                slot,
                group_iteration,
                repeat_within_entry,
            } => match queue.iter().position(|candidate| candidate.id == entry) {
                Some(array_index) => {
                    let index = queue::logical_index_of(
                        queue,
                        array_index,
                        group_iteration,
                        repeat_within_entry,
                    );
                    let unchanged = index
                        .and_then(|index| queue::resolve_logical_index(queue, index))
                        .is_some_and(|position| {
                            position.array_index == array_index
                                && position.repeat_within_entry == repeat_within_entry
                        });
                    (index, unchanged)
                }
                // The active entry was removed: carry on with what took its place.
                None => {
                    let in_group = |index: usize| {
                        group.is_some() && queue.get(index).and_then(QueueEntry::group_id) == group
                    };
                    let index = if in_group(slot) {
                        queue::logical_index_of(queue, slot, group_iteration, 0)
                    } else if let Some(start) = (0..queue.len()).find(|&i| in_group(i)) {
                        // It closed its group's pass; the next pass starts over.
                        queue::logical_index_of(queue, start, group_iteration + 1, 0)
                    } else if slot < queue.len() {
                        queue::logical_index_of(queue, slot, 0, 0)
                    } else {
                        queue::get_queue_logical_size(queue)
                    };
                    (index, false)
                }
            },
        };
        if let Some(index) = index {
            run.current_queue_index = index;
        }
        if !keep_progress {
            run.current_action_progress = 0;
        }
    }

    fn index_of(&self, id: EntryId) -> Option<usize> {
        self.state.run.queue.iter().position(|entry| entry.id == id)
    }

    fn take_entry_id(&mut self) -> EntryId {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    fn add_entry(&mut self, action_id: String, repeat: Repeat) -> bool {
        if repeat == Repeat::Times(0)
            || !self.unlocked_actions.contains(&action_id)
            || catalog::get_action_def(&action_id).is_none()
        {
            return false;
        }
        let resume_at = match self.cursor() {
            Some(Cursor::Exhausted { .. }) => queue::get_queue_logical_size(&self.state.run.queue),
            _ => None,
        };
        let id = self.take_entry_id();
        let run = &mut self.state.run;
        run.queue.push(QueueEntry::new(id, action_id, repeat));
        // A worked-through queue picks up the new orders next year.
        if let Some(index) = resume_at {
            run.current_queue_index = index;
            run.current_action_progress = 0;
        }
        true
    }

    fn remove_entry(&mut self, id: EntryId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.state.run.queue.remove(index);
        true
    }

    fn move_up(&mut self, id: EntryId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if index == 0 {
            return false;
        }
        let queue = &mut self.state.run.queue;
        let group = queue[index].group_id();
        let above = queue[index - 1].group_id();
        match (group, above) {
            (Some(group), Some(above)) if group == above => queue.swap(index, index - 1),
            // Grouped entries stay inside their group.
            (Some(_), _) => return false,
            (None, None) => queue.swap(index, index - 1),
            (None, Some(_)) => {
                let Some(range) = queue::get_group_range(queue, index - 1) else {
                    return false;
                };
                let entry = queue.remove(index);
                queue.insert(range.start_idx, entry);
            }
        }
        true
    }

    fn move_down(&mut self, id: EntryId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let queue = &mut self.state.run.queue;
        if index + 1 >= queue.len() {
            return false;
        }
        let group = queue[index].group_id();
        let below = queue[index + 1].group_id();
        match (group, below) {
            (Some(group), Some(below)) if group == below => queue.swap(index, index + 1),
            (Some(_), _) => return false,
            (None, None) => queue.swap(index, index + 1),
            (None, Some(_)) => {
                let Some(range) = queue::get_group_range(queue, index + 1) else {
                    return false;
                };
                let entry = queue.remove(index);
                // The group slid up by one after the removal.
                queue.insert(range.end_idx, entry);
            }
        }
        true
    }

    fn duplicate(&mut self, id: EntryId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut copy = self.state.run.queue[index].clone();
        copy.id = self.take_entry_id();
        self.state.run.queue.insert(index + 1, copy);
        true
    }

    fn set_repeat(&mut self, id: EntryId, repeat: Repeat) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let entry = &mut self.state.run.queue[index];
        if repeat == Repeat::Times(0) || (repeat.is_forever() && entry.group.is_some()) {
            return false;
        }
        entry.repeat = repeat;
        true
    }

    fn split_entry(&mut self, id: EntryId, at: u32, cursor: &mut Option<Cursor>) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let Repeat::Times(total) = self.state.run.queue[index].repeat else {
            return false;
        };
        if at == 0 || at >= total {
            return false;
        }
        let mut tail = self.state.run.queue[index].clone();
        tail.id = self.take_entry_id();
        tail.repeat = Repeat::Times(total - at);
        if let Some(Cursor::At {
            entry,
            repeat_within_entry,
            ..
        }) = cursor
        {
            if *entry == id && *repeat_within_entry >= at as u64 {
                *entry = tail.id;
                *repeat_within_entry -= at as u64;
            }
        }
        self.state.run.queue[index].repeat = Repeat::Times(at);
        self.state.run.queue.insert(index + 1, tail);
        true
    }

    fn merge_with_next(&mut self, id: EntryId, cursor: &mut Option<Cursor>) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let queue = &mut self.state.run.queue;
        let Some(next) = queue.get(index + 1) else {
            return false;
        };
        let current = &queue[index];
        if next.action_id != current.action_id || next.group_id() != current.group_id() {
            return false;
        }
        let merged = match (current.repeat, next.repeat) {
            (Repeat::Times(a), Repeat::Times(b)) => match a.checked_add(b) {
                Some(sum) => Repeat::Times(sum),
                None => return false,
            },
            _ => Repeat::Forever,
        };
        if let Some(Cursor::At {
            entry,
            repeat_within_entry,
            ..
        }) = cursor
        {
            if *entry == next.id {
                *entry = id;
                *repeat_within_entry = repeat_within_entry.saturating_add(current.repeat.ticks());
            }
        }
        queue[index].repeat = merged;
        queue.remove(index + 1);
        true
    }

    fn group_range(&mut self, first: EntryId, last: EntryId, repeat: u32) -> bool {
        let (Some(start), Some(end)) = (self.index_of(first), self.index_of(last)) else {
            return false;
        };
        if repeat == 0 || start > end {
            return false;
        }
        let members = &self.state.run.queue[start..=end];
        if members
            .iter()
            .any(|entry| entry.group.is_some() || entry.repeat.is_forever())
        {
            return false;
        }
        let tag = GroupTag {
            id: self.next_group_id,
            repeat,
        };
        self.next_group_id += 1;
        for entry in &mut self.state.run.queue[start..=end] {
            entry.group = Some(tag);
        }
        true
    }

    fn ungroup(&mut self, group: GroupId) -> bool {
        let mut changed = false;
        for entry in &mut self.state.run.queue {
            if entry.group_id() == Some(group) {
                entry.group = None;
                changed = true;
            }
        }
        changed
    }

    fn set_group_repeat(&mut self, group: GroupId, repeat: u32) -> bool {
        if repeat == 0 {
            return false;
        }
        let mut changed = false;
        for entry in &mut self.state.run.queue {
            if let Some(tag) = entry.group.as_mut().filter(|tag| tag.id == group) {
                tag.repeat = repeat;
                changed = true;
            }
        }
        changed
    }

    fn load_queue(&mut self, entries: Vec<QueueEntry>) -> bool {
        if let Err(err) = queue::validate_queue(&entries) {
            debug!(error = %err, "rejected queue");
            return false;
        }
        if entries
            .iter()
            .any(|entry| !self.unlocked_actions.contains(&entry.action_id))
        {
            return false;
        }
        let run = &mut self.state.run;
        run.queue = entries;
        run.current_queue_index = 0;
        run.current_action_progress = 0;
        self.sync_id_counters();
        true
    }

    fn sync_id_counters(&mut self) {
        let queue = &self.state.run.queue;
        let max_entry = queue.iter().map(|entry| entry.id).max().unwrap_or(0);
        let max_group = queue.iter().filter_map(QueueEntry::group_id).max().unwrap_or(0);
        self.next_entry_id = self.next_entry_id.max(max_entry + 1);
        self.next_group_id = self.next_group_id.max(max_group + 1);
    }
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    At {
        entry: EntryId,
        group: Option<GroupId>,
        /// Array slot the entry occupied before the edit.
        slot: usize,
        group_iteration: u64,
        repeat_within_entry: u64,
    },
    /// Every finite repeat has been worked through.
    Exhausted { last: Option<EntryId> },
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_queue(actions: &[(&str, Repeat)]) -> Session {
        actions.iter().fold(Session::new(), |session, (action, repeat)| {
            session.apply(Command::AddEntry {
                action_id: action.to_string(),
                repeat: *repeat,
            })
        })
    }

    fn ids(session: &Session) -> Vec<EntryId> {
        session.run().queue.iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn start_needs_an_idle_run_with_orders() {
        let empty = Session::new();
        assert_eq!(empty.apply(Command::Start), empty);

        let session = with_queue(&[("farm", Repeat::Forever)]).apply(Command::Start);
        assert_eq!(session.run().status, RunStatus::Running);
        assert_eq!(session.apply(Command::Resume), session);
        let paused = session.apply(Command::Pause);
        assert_eq!(paused.run().status, RunStatus::Paused);
        assert_eq!(paused.apply(Command::Resume).run().status, RunStatus::Running);
    }

    #[test]
    fn locked_actions_cannot_be_queued() {
        let session = with_queue(&[("build_wall", Repeat::Times(1)), ("farm", Repeat::Times(0))]);
        assert!(session.run().queue.is_empty());
    }

    #[test]
    fn moving_the_first_entry_up_is_a_noop() {
        let session = with_queue(&[("farm", Repeat::Times(1)), ("gather_wood", Repeat::Times(1))]);
        assert_eq!(session.apply(Command::MoveUp(1)), session);
        assert_eq!(session.apply(Command::MoveDown(2)), session);
        assert_eq!(ids(&session.apply(Command::MoveDown(1))), vec![2, 1]);
    }

    #[test]
    fn ungrouped_entries_hop_over_whole_groups() {
        let session = with_queue(&[
            ("farm", Repeat::Times(1)),
            ("gather_wood", Repeat::Times(1)),
            ("train_militia", Repeat::Times(1)),
            ("farm", Repeat::Times(2)),
        ])
        .apply(Command::GroupRange {
            first: 2,
            last: 3,
            repeat: 2,
        });

        let down = session.apply(Command::MoveDown(1));
        assert_eq!(ids(&down), vec![2, 3, 1, 4]);
        let up = session.apply(Command::MoveUp(4));
        assert_eq!(ids(&up), vec![1, 4, 2, 3]);
        assert!(queue::validate_queue(&up.run().queue).is_ok());

        // Members reorder inside the group but never leave it.
        assert_eq!(session.apply(Command::MoveUp(2)), session);
        assert_eq!(ids(&session.apply(Command::MoveDown(2))), vec![1, 3, 2, 4]);
    }

    #[test]
    fn split_and_merge_are_inverse() {
        let session = with_queue(&[("farm", Repeat::Times(5))]);
        let split = session.apply(Command::SplitEntry { id: 1, at: 2 });
        let repeats: Vec<Repeat> = split.run().queue.iter().map(|entry| entry.repeat).collect();
        assert_eq!(repeats, vec![Repeat::Times(2), Repeat::Times(3)]);
        assert_eq!(session.apply(Command::SplitEntry { id: 1, at: 5 }), session);

        let merged = split.apply(Command::MergeWithNext(1));
        assert_eq!(merged.run().queue.len(), 1);
        assert_eq!(merged.run().queue[0].repeat, Repeat::Times(5));
    }

    #[test]
    fn groups_reject_forever_members() {
        let session = with_queue(&[("farm", Repeat::Times(1)), ("gather_wood", Repeat::Forever)]);
        let attempt = session.apply(Command::GroupRange {
            first: 1,
            last: 2,
            repeat: 3,
        });
        assert_eq!(attempt, session);

        let grouped = session.apply(Command::GroupRange {
            first: 1,
            last: 1,
            repeat: 3,
        });
        assert_eq!(
            grouped.apply(Command::SetRepeat {
                id: 1,
                repeat: Repeat::Forever
            }),
            grouped
        );
        let retagged = grouped.apply(Command::SetGroupRepeat { group: 1, repeat: 4 });
        assert_eq!(retagged.run().queue[0].group.map(|tag| tag.repeat), Some(4));
        assert_eq!(retagged.apply(Command::Ungroup(1)).run().queue[0].group, None);
    }

    #[test]
    fn reset_counts_finished_runs_only() {
        let session = with_queue(&[("farm", Repeat::Forever)]).apply(Command::Start);
        let restarted = session.apply(Command::Reset { keep_queue: true });
        assert_eq!(restarted.total_runs, 0);
        assert_eq!(restarted.run().queue.len(), 1);

        let abandoned = session.apply(Command::Abandon);
        assert_eq!(abandoned.run().status, RunStatus::Collapsed);
        let fresh = abandoned.apply(Command::Reset { keep_queue: false });
        assert_eq!(fresh.total_runs, 1);
        assert_eq!(fresh.run().status, RunStatus::Idle);
        assert!(fresh.run().queue.is_empty());
    }

    #[test]
    fn advance_unlocks_actions_once_researched() {
        let mut session =
            with_queue(&[("research_agriculture", Repeat::Times(1))]).apply(Command::Start);
        assert!(!session.unlocked_actions.contains("build_granary"));
        while session.run().status == RunStatus::Running {
            session = session.advance();
        }
        assert!(session.run().resources.has_tech("research_agriculture"));
        assert!(session.unlocked_actions.contains("build_granary"));
        assert!(session.unlocked_actions.contains("research_preservation"));
    }

    #[test]
    fn auto_restart_begins_a_new_run() {
        let mut session = with_queue(&[("farm", Repeat::Forever)])
            .apply(Command::ToggleAutoRestart)
            .apply(Command::Start);
        for _ in 0..crate::rules::RAIDER_YEAR {
            session = session.advance();
        }
        assert_eq!(session.total_runs, 1);
        assert_eq!(session.run().year, 0);
        assert_eq!(session.run().status, RunStatus::Running);
        assert!(session.state.encountered_disasters.contains(&crate::world::Disaster::Raiders));
        assert!(session.run().auto_restart);
    }

    fn active_action(session: &Session) -> Option<&str> {
        session.run().active_entry().map(|entry| entry.action_id.as_str())
    }

    fn researching() -> Session {
        let mut session = with_queue(&[
            ("gather_wood", Repeat::Times(1)),
            ("research_agriculture", Repeat::Times(1)),
            ("farm", Repeat::Forever),
        ])
        .apply(Command::Start);
        for _ in 0..4 {
            session = session.advance();
        }
        session
    }

    #[test]
    fn removing_a_finished_entry_keeps_the_active_action() {
        let session = researching();
        assert_eq!(active_action(&session), Some("research_agriculture"));
        assert_eq!(session.run().current_queue_index, 1);
        assert_eq!(session.run().current_action_progress, 3);

        let mut session = session.apply(Command::RemoveEntry(1));
        assert_eq!(session.run().current_queue_index, 0);
        assert_eq!(session.run().current_action_progress, 3);
        assert_eq!(active_action(&session), Some("research_agriculture"));

        for _ in 0..10 {
            session = session.advance();
        }
        assert!(session.run().resources.has_tech("research_agriculture"));
    }

    #[test]
    fn removing_the_active_entry_starts_the_next_one_fresh() {
        let session = researching().apply(Command::RemoveEntry(2));
        assert_eq!(active_action(&session), Some("farm"));
        assert_eq!(session.run().current_queue_index, 1);
        assert_eq!(session.run().current_action_progress, 0);
    }

    #[test]
    fn moving_entries_ahead_of_the_active_one_shifts_the_index() {
        let mut session = with_queue(&[
            ("farm", Repeat::Times(2)),
            ("research_agriculture", Repeat::Times(1)),
            ("gather_wood", Repeat::Times(3)),
        ])
        .apply(Command::Start);
        for _ in 0..4 {
            session = session.advance();
        }
        assert_eq!(session.run().current_action_progress, 2);

        let moved = session.apply(Command::MoveUp(3));
        assert_eq!(ids(&moved), vec![1, 3, 2]);
        assert_eq!(moved.run().current_queue_index, 5);
        assert_eq!(moved.run().current_action_progress, 2);
        assert_eq!(active_action(&moved), Some("research_agriculture"));
    }

    #[test]
    fn splitting_the_active_entry_follows_the_current_repeat() {
        let mut session =
            with_queue(&[("farm", Repeat::Times(5)), ("gather_wood", Repeat::Times(2))])
                .apply(Command::Start);
        for _ in 0..3 {
            session = session.advance();
        }
        let split = session
            .apply(Command::SplitEntry { id: 1, at: 2 })
            .apply(Command::MoveDown(3));
        // The unfinished tail now runs after gather_wood.
        assert_eq!(ids(&split), vec![1, 2, 3]);
        assert_eq!(active_action(&split), Some("farm"));
        assert_eq!(split.run().queue[2].repeat, Repeat::Times(3));
        let position =
            queue::resolve_logical_index(&split.run().queue, split.run().current_queue_index)
                .unwrap();
        assert_eq!(position.array_index, 2);
        assert_eq!(position.repeat_within_entry, 1);
    }

    #[test]
    fn idle_runs_keep_their_position() {
        let session = with_queue(&[("farm", Repeat::Times(1)), ("gather_wood", Repeat::Times(1))]);
        let moved = session.apply(Command::MoveDown(1));
        assert_eq!(moved.run().current_queue_index, 0);
        assert_eq!(active_action(&moved), Some("gather_wood"));
    }

    #[test]
    fn new_orders_resume_a_worked_through_queue() {
        let mut session = with_queue(&[("farm", Repeat::Times(1))])
            .apply(Command::ToggleRepeatLastAction)
            .apply(Command::Start);
        for _ in 0..3 {
            session = session.advance();
        }
        assert_eq!(session.run().current_queue_index, 3);

        let session = session.apply(Command::AddEntry {
            action_id: "gather_wood".into(),
            repeat: Repeat::Times(2),
        });
        assert_eq!(session.run().current_queue_index, 1);
        assert_eq!(active_action(&session), Some("gather_wood"));
        assert!(session.advance().run().resources.wood > 0.0);
    }

    #[test]
    fn dismiss_popup_ignores_bad_indices() {
        let session = Session::new();
        assert_eq!(session.apply(Command::DismissPopup { index: 0 }), session);
    }
}
