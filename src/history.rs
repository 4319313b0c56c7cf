use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::drawing::DrawableObject;
use crate::error::EditorError;

pub const SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_CAPACITY: usize = 50;

/// Immutable, self-describing serialization of the editable object sequence
/// at one point in time. The background layer is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(String);

#[derive(Serialize)]
struct SnapshotBodyRef<'a> {
    version: u32,
    objects: &'a [DrawableObject],
}

#[derive(Deserialize)]
struct SnapshotBody {
    version: u32,
    #[serde(default)]
    objects: serde_json::Value,
}

impl Snapshot {
    pub fn capture(objects: &[DrawableObject]) -> Result<Snapshot, EditorError> {
        let body = SnapshotBodyRef {
            version: SNAPSHOT_VERSION,
            objects,
        };
        Ok(Snapshot(serde_json::to_string(&body)?))
    }

    /// Decode back into an object sequence. The version is checked before
    /// any object is reconstructed, so a failed decode has no side effects.
    pub fn decode(&self) -> Result<Vec<DrawableObject>, EditorError> {
        let body: SnapshotBody = serde_json::from_str(&self.0)?;
        if body.version != SNAPSHOT_VERSION {
            return Err(EditorError::SnapshotVersion {
                found: body.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(serde_json::from_value(body.objects)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bounded linear undo/redo stack. Capturing while the cursor sits before
/// the tail discards the redo branch; capturing past capacity evicts the
/// oldest entry. No branching, no diffs.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: Option<usize>,
    capacity: usize,
    paused: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        History {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
            paused: false,
        }
    }

    /// Suppress captures until `resume`. Used while intermediate states are
    /// flowing through the document (snapshot restore, background load).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn capture(&mut self, snapshot: Snapshot) {
        if self.paused {
            return;
        }
        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
            log::debug!("history: capacity {} reached, evicted oldest entry", self.capacity);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one entry. Returns the snapshot to restore, or `None` when
    /// already at the oldest retained state.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1)
    }

    /// Step forward one entry. `None` when the cursor is already at the tail.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<&Snapshot> {
        self.entries.front()
    }
}
