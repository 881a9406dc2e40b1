//! Mission queue ordering.
//!
//! Order: pinned (paused) missions first, most recently paused at the head,
//! then priority descending, then deadline ascending with deadlines ahead of
//! none, then submission order.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::request::Priority;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueueEntry {
    pub mission_id: String,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub seq: u64,
    /// Re-entered after a pause; stays ahead of everything unpinned
    pub pinned: bool,
}

fn compare(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    match (a.pinned, b.pinned) {
        // the most recent pause sits at the very head
        (true, true) => return b.seq.cmp(&a.seq),
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.seq.cmp(&b.seq))
}

#[derive(Debug, Default)]
pub(crate) struct MissionQueue {
    entries: Vec<QueueEntry>,
}

impl MissionQueue {
    /// Insert and re-sort.
    pub fn insert(&mut self, entry: QueueEntry) {
        self.entries.push(entry);
        self.entries.sort_by(compare);
    }

    pub fn remove(&mut self, mission_id: &str) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.mission_id == mission_id)?;
        Some(self.entries.remove(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.mission_id.clone()).collect()
    }
}
