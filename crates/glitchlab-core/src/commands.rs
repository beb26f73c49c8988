use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::PixelBuffer;
use crate::effects::EffectRecord;
use crate::error::{CoreError, Result};
use crate::pipeline::EffectRegistry;

/// Whether the history keeps a copy of the buffer from before each effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// One snapshot per record; undo is a copy.
    #[default]
    Keep,
    /// Records only; undo replays the remaining records from the original.
    ReplayOnly,
}

/// An applied record plus, optionally, the buffer it was applied to.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: EffectRecord,
    snapshot: Option<PixelBuffer>,
}

impl HistoryEntry {
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Ordered record of applied effects. The records are authoritative; the
/// snapshots are a cache that saves a replay on undo.
#[derive(Debug, Clone, Default)]
pub struct EffectHistory {
    entries: Vec<HistoryEntry>,
    policy: SnapshotPolicy,
}

impl EffectHistory {
    pub fn new(policy: SnapshotPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// Run `record` against `current` and append it. On error the history is
    /// unchanged.
    pub fn apply(
        &mut self,
        registry: &EffectRegistry,
        current: &PixelBuffer,
        record: EffectRecord,
    ) -> Result<PixelBuffer> {
        let output = registry.apply_record(current, &record)?;
        let snapshot = match self.policy {
            SnapshotPolicy::Keep => Some(current.clone()),
            SnapshotPolicy::ReplayOnly => None,
        };
        self.entries.push(HistoryEntry { record, snapshot });
        Ok(output)
    }

    /// Drop the last record and return the buffer as it was before it.
    pub fn undo(
        &mut self,
        registry: &EffectRegistry,
        original: &PixelBuffer,
    ) -> Result<PixelBuffer> {
        let (last, rest) = self.entries.split_last().ok_or(CoreError::NothingToUndo)?;
        let restored = match &last.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => registry.replay(original, rest.iter().map(|e| &e.record))?,
        };
        self.entries.pop();
        Ok(restored)
    }

    /// Fold every record over `original`, recomputing each effect.
    pub fn replay(&self, registry: &EffectRegistry, original: &PixelBuffer) -> Result<PixelBuffer> {
        registry.replay(original, self.records())
    }

    /// Remove one record from anywhere in the history. Snapshots taken after
    /// it no longer describe a reachable state and are dropped; the caller
    /// regenerates the current buffer with [`replay`](Self::replay).
    pub fn remove(&mut self, id: Uuid) -> Result<EffectRecord> {
        let index = self
            .entries
            .iter()
            .position(|e| e.record.id == id)
            .ok_or(CoreError::RecordNotFound(id))?;
        let removed = self.entries.remove(index);
        let mut tail = self.entries[index..].iter_mut();
        if let Some(next) = tail.next() {
            // The next record now runs on whatever the removed one ran on.
            next.snapshot = removed.snapshot;
        }
        tail.for_each(|e| e.snapshot = None);
        Ok(removed.record)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn records(&self) -> impl Iterator<Item = &EffectRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.entries.last().map(|e| e.record.description())
    }
}
