//! The action queue and the mapping from logical index to queue slot.
//!
//! The logical index counts completed action repetitions since the queue
//! started. Entries repeat a number of times (or forever) and contiguous runs
//! of entries sharing a group id cycle as a block before the queue moves on.
//! Every caller that needs "which entry is active at index N" goes through
//! [`resolve_logical_index`].

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog;

pub type EntryId = u64;
pub type GroupId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl Repeat {
    /// Logical ticks contributed by one pass over the entry.
    pub fn ticks(self) -> u64 {
        match self {
            Repeat::Times(n) => n as u64,
            Repeat::Forever => u64::MAX,
        }
    }

    pub fn is_forever(self) -> bool {
        matches!(self, Repeat::Forever)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RepeatRepr {
    Count(u32),
    Word(String),
}

const FOREVER: &str = "forever";

impl Serialize for Repeat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Repeat::Times(n) => RepeatRepr::Count(*n),
            Repeat::Forever => RepeatRepr::Word(FOREVER.to_string()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Repeat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RepeatRepr::deserialize(deserializer)? {
            RepeatRepr::Count(n) => Ok(Repeat::Times(n)),
            RepeatRepr::Word(word) if word.eq_ignore_ascii_case(FOREVER) => Ok(Repeat::Forever),
            RepeatRepr::Word(word) => Err(serde::de::Error::custom(format!(
                "repeat must be a count or '{FOREVER}', got '{word}'"
            ))),
        }
    }
}

/// Group membership. `repeat` is copied onto every member of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupTag {
    pub id: GroupId,
    pub repeat: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub action_id: String,
    pub repeat: Repeat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupTag>,
}

impl QueueEntry {
    pub fn new(id: EntryId, action_id: impl Into<String>, repeat: Repeat) -> Self {
        Self {
            id,
            action_id: action_id.into(),
            repeat,
            group: None,
        }
    }

    pub fn in_group(mut self, id: GroupId, repeat: u32) -> Self {
        self.group = Some(GroupTag { id, repeat });
        self
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.group.map(|tag| tag.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub array_index: usize,
    /// Zero-based iteration of the enclosing group, zero when ungrouped.
    pub group_iteration: u64,
    /// Repeats of this entry already completed within the current iteration.
    pub repeat_within_entry: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRange {
    pub start_idx: usize,
    /// Inclusive.
    pub end_idx: usize,
    pub group_repeat: u32,
    /// Logical ticks in one pass over the members. Saturates for infinite members.
    pub iteration_size: u64,
}

impl GroupRange {
    pub fn total_size(&self) -> u64 {
        self.iteration_size.saturating_mul(self.group_repeat as u64)
    }
}

/// Locate the contiguous span sharing the group of `queue[member_index]`.
pub fn get_group_range(queue: &[QueueEntry], member_index: usize) -> Option<GroupRange> {
    let tag = queue.get(member_index)?.group?;
    let same_group = |entry: &QueueEntry| entry.group_id() == Some(tag.id);

    let mut start_idx = member_index;
    while start_idx > 0 && same_group(&queue[start_idx - 1]) {
        start_idx -= 1;
    }
    let mut end_idx = member_index;
    while end_idx + 1 < queue.len() && same_group(&queue[end_idx + 1]) {
        end_idx += 1;
    }

    let iteration_size = queue[start_idx..=end_idx]
        .iter()
        .fold(0_u64, |acc, entry| acc.saturating_add(entry.repeat.ticks()));

    Some(GroupRange {
        start_idx,
        end_idx,
        group_repeat: tag.repeat,
        iteration_size,
    })
}

/// Total logical size of the queue, or `None` when something repeats forever.
pub fn get_queue_logical_size(queue: &[QueueEntry]) -> Option<u64> {
    let mut total = 0_u64;
    let mut i = 0;
    while i < queue.len() {
        match get_group_range(queue, i) {
            Some(range) => {
                if queue[range.start_idx..=range.end_idx]
                    .iter()
                    .any(|entry| entry.repeat.is_forever())
                {
                    return None;
                }
                let group_total = range.iteration_size.checked_mul(range.group_repeat as u64)?;
                total = total.checked_add(group_total)?;
                i = range.end_idx + 1;
            }
            None => {
                if queue[i].repeat.is_forever() {
                    return None;
                }
                total = total.checked_add(queue[i].repeat.ticks())?;
                i += 1;
            }
        }
    }
    Some(total)
}

pub fn is_infinite(queue: &[QueueEntry]) -> bool {
    get_queue_logical_size(queue).is_none()
}

/// Which queue slot is active at `logical_index`. `None` once a finite queue
/// is exhausted.
pub fn resolve_logical_index(queue: &[QueueEntry], logical_index: u64) -> Option<ResolvedPosition> {
    let mut remaining = logical_index;
    let mut i = 0;
    while i < queue.len() {
        let Some(range) = get_group_range(queue, i) else {
            match queue[i].repeat {
                Repeat::Forever => {
                    return Some(ResolvedPosition {
                        array_index: i,
                        group_iteration: 0,
                        repeat_within_entry: remaining,
                    });
                }
                Repeat::Times(n) => {
                    let n = n as u64;
                    if remaining < n {
                        return Some(ResolvedPosition {
                            array_index: i,
                            group_iteration: 0,
                            repeat_within_entry: remaining,
                        });
                    }
                    remaining -= n;
                }
            }
            i += 1;
            continue;
        };

        let total = range.total_size();
        if range.iteration_size > 0 && remaining < total {
            let group_iteration = remaining / range.iteration_size;
            let mut offset = remaining % range.iteration_size;
            for array_index in range.start_idx..=range.end_idx {
                let ticks = queue[array_index].repeat.ticks();
                if offset < ticks {
                    return Some(ResolvedPosition {
                        array_index,
                        group_iteration,
                        repeat_within_entry: offset,
                    });
                }
                offset -= ticks;
            }
        }
        remaining = remaining.saturating_sub(total);
        i = range.end_idx + 1;
    }
    None
}

/// Inverse of [`resolve_logical_index`]: the logical index at which
/// `queue[array_index]` runs repeat `repeat_within_entry` of group iteration
/// `group_iteration`.
///
/// Counts past the end of the entry or its group are clamped, so an
/// overshooting position lands on whatever follows. `group_iteration` is
/// ignored for ungrouped entries. `None` when the slot does not exist or sits
/// behind an entry that repeats forever.
pub fn logical_index_of(
    queue: &[QueueEntry],
    array_index: usize,
    group_iteration: u64,
    repeat_within_entry: u64,
) -> Option<u64> {
    let entry = queue.get(array_index)?;

    let mut block_start = 0_u64;
    let mut i = 0;
    let range = loop {
        let range = get_group_range(queue, i);
        let end = range.map_or(i, |range| range.end_idx);
        if end >= array_index {
            break range;
        }
        let ticks = match range {
            Some(range) => finite_ticks(&queue[range.start_idx..=range.end_idx])?
                .checked_mul(range.group_repeat as u64)?,
            None => finite_ticks(&queue[i..=i])?,
        };
        block_start = block_start.checked_add(ticks)?;
        i = end + 1;
    };

    let within = repeat_within_entry.min(entry.repeat.ticks());
    let Some(range) = range else {
        return block_start.checked_add(within);
    };
    if group_iteration >= range.group_repeat as u64 {
        return block_start.checked_add(range.total_size());
    }
    let earlier_members = finite_ticks(&queue[range.start_idx..array_index])?;
    block_start
        .checked_add(group_iteration.checked_mul(range.iteration_size)?)?
        .checked_add(earlier_members)?
        .checked_add(within)
}

fn finite_ticks(entries: &[QueueEntry]) -> Option<u64> {
    entries.iter().try_fold(0_u64, |acc, entry| match entry.repeat {
        Repeat::Times(n) => acc.checked_add(n as u64),
        Repeat::Forever => None,
    })
}

/// Display-oriented view of the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryProgress {
    pub position: ResolvedPosition,
    pub entry_repeat: Repeat,
    pub group_repeat: Option<u32>,
}

pub fn entry_progress(queue: &[QueueEntry], logical_index: u64) -> Option<EntryProgress> {
    let position = resolve_logical_index(queue, logical_index)?;
    let entry = &queue[position.array_index];
    Some(EntryProgress {
        position,
        entry_repeat: entry.repeat,
        group_repeat: entry.group.map(|tag| tag.repeat),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("entry {entry} references unknown action '{action}'")]
    UnknownAction { entry: EntryId, action: String },
    #[error("entry {entry} has a repeat count of zero")]
    ZeroRepeat { entry: EntryId },
    #[error("entry id {entry} appears more than once")]
    DuplicateEntry { entry: EntryId },
    #[error("group {group} has a repeat count of zero")]
    ZeroGroupRepeat { group: GroupId },
    #[error("group {group} is split across non-adjacent entries")]
    SplitGroup { group: GroupId },
    #[error("members of group {group} disagree on its repeat count")]
    InconsistentGroupRepeat { group: GroupId },
    #[error("entry {entry} repeats forever inside group {group}")]
    InfiniteGroupMember { entry: EntryId, group: GroupId },
}

/// Structural checks for queues arriving from files or saves.
pub fn validate_queue(queue: &[QueueEntry]) -> Result<(), QueueError> {
    let mut entry_ids = BTreeSet::new();
    let mut closed_groups = BTreeSet::new();
    let mut open_group: Option<GroupTag> = None;

    for entry in queue {
        if !entry_ids.insert(entry.id) {
            return Err(QueueError::DuplicateEntry { entry: entry.id });
        }
        if catalog::get_action_def(&entry.action_id).is_none() {
            return Err(QueueError::UnknownAction {
                entry: entry.id,
                action: entry.action_id.clone(),
            });
        }
        if entry.repeat == Repeat::Times(0) {
            return Err(QueueError::ZeroRepeat { entry: entry.id });
        }

        match (open_group, entry.group) {
            (Some(open), Some(tag)) if open.id == tag.id => {
                if open.repeat != tag.repeat {
                    return Err(QueueError::InconsistentGroupRepeat { group: tag.id });
                }
            }
            (open, tag) => {
                if let Some(open) = open {
                    closed_groups.insert(open.id);
                }
                if let Some(tag) = tag {
                    if closed_groups.contains(&tag.id) {
                        return Err(QueueError::SplitGroup { group: tag.id });
                    }
                    if tag.repeat == 0 {
                        return Err(QueueError::ZeroGroupRepeat { group: tag.id });
                    }
                }
                open_group = tag;
            }
        }

        if let (Some(tag), Repeat::Forever) = (entry.group, entry.repeat) {
            return Err(QueueError::InfiniteGroupMember {
                entry: entry.id,
                group: tag.id,
            });
        }
    }
    Ok(())
}
