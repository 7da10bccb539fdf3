#![forbid(unsafe_code)]

//! Bounded, deduplicated log of whole-model snapshots.
//!
//! [`History`] keeps every snapshot in one index-addressed arena plus a
//! cursor marking the current state. Undo and redo only move the cursor;
//! saving is the single place where the arena changes shape, always in the
//! same three steps:
//!
//! ```text
//! capacity 4, cursor at s1 after two undos
//! ┌──────────────────────────────────────────────┐
//! │ [s0, s1, s2, s3]        cursor = 1           │
//! └──────────────────────────────────────────────┘
//! save(s4): truncate after cursor
//! │ [s0, s1]                cursor = 1           │
//! append
//! │ [s0, s1, s4]            cursor = 2           │
//! evict while len > capacity (none needed here)
//! ```
//!
//! # Invariants
//!
//! 1. `len() <= capacity()` after every operation.
//! 2. Once initialized, `cursor()` is a valid index.
//! 3. No two adjacent snapshots around a save are equal: a candidate equal
//!    to the cursor snapshot is discarded.
//! 4. Right after an append, `has_next_snapshot()` is false.
//!
//! # Memory Model
//!
//! A [`Snapshot`] is an `Arc<[Descriptor]>` and each descriptor is itself
//! `Arc`-shared, so handing snapshots out of the history clones pointers,
//! not values.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use warden_core::{AnyComponent, Descriptor};

use crate::config::HistoryConfig;

/// The frozen, ordered component registry a history captures from.
pub type ComponentList = Arc<[Arc<dyn AnyComponent>]>;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Index-aligned capture of every registered component's value.
#[derive(Clone, PartialEq)]
pub struct Snapshot {
    values: Arc<[Descriptor]>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl Snapshot {
    /// Capture the current value of each component, in order.
    #[must_use]
    pub fn capture(components: &[Arc<dyn AnyComponent>]) -> Self {
        Self {
            values: components.iter().map(|c| c.capture()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Descriptor of the component at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.values.iter()
    }

    /// Write each descriptor back into its index-aligned component.
    ///
    /// The caller must hold the write lock. A descriptor whose type does not
    /// match its component is logged and skipped.
    pub fn restore_domain_model_to_state_at_snapshot(&self, components: &[Arc<dyn AnyComponent>]) {
        debug_assert_eq!(
            components.len(),
            self.values.len(),
            "snapshot is not aligned with the component registry"
        );
        for (index, (component, descriptor)) in components.iter().zip(self.values.iter()).enumerate()
        {
            if !component.restore(descriptor) {
                tracing::error!(
                    target: "warden.history",
                    index = index,
                    expected = component.value_type_name(),
                    "snapshot descriptor type does not match component; component left unchanged"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Running counters for a [`History`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Snapshots appended by saves (the seed snapshot is not counted).
    pub saved: u64,
    /// Saves discarded because nothing changed.
    pub duplicates_skipped: u64,
    /// Redo snapshots dropped because a save diverged from them.
    pub truncated: u64,
    /// Oldest snapshots dropped to respect the capacity.
    pub evicted: u64,
}

/// Snapshot log with a cursor, bounded by a fixed capacity.
pub struct History {
    components: ComponentList,
    snapshots: VecDeque<Snapshot>,
    cursor: Option<usize>,
    capacity: usize,
    stats: HistoryStats,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("components", &self.components.len())
            .field("len", &self.snapshots.len())
            .field("cursor", &self.cursor)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl History {
    /// Create an uninitialized history. A capacity below 1 is raised to 1.
    #[must_use]
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            components: Arc::from(Vec::<Arc<dyn AnyComponent>>::new()),
            snapshots: VecDeque::new(),
            cursor: None,
            capacity: config.capacity.max(1),
            stats: HistoryStats::default(),
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Bind the history to the final component list and capture the seed
    /// snapshot. Only the first call has an effect.
    pub fn initialize(&mut self, components: ComponentList) {
        if self.cursor.is_some() {
            tracing::warn!(target: "warden.history", "history already initialized; ignoring");
            return;
        }
        self.snapshots.push_back(Snapshot::capture(&components));
        self.components = components;
        self.cursor = Some(0);
    }

    /// Capture the components and append the result unless it equals the
    /// snapshot under the cursor.
    ///
    /// Returns `true` if a snapshot was appended.
    pub fn save_snapshot_if_unique_from_last_snapshot(&mut self) -> bool {
        let Some(cursor) = self.cursor else {
            tracing::warn!(target: "warden.history", "save requested before initialization");
            return false;
        };
        let candidate = Snapshot::capture(&self.components);
        if self.snapshots[cursor] == candidate {
            self.stats.duplicates_skipped += 1;
            tracing::debug!(target: "warden.history", cursor = cursor, "state unchanged; snapshot skipped");
            return false;
        }
        self.append(cursor, candidate);
        true
    }

    /// Truncate after `cursor`, append, then evict from the front.
    fn append(&mut self, cursor: usize, snapshot: Snapshot) {
        let discarded = self.snapshots.len() - cursor - 1;
        self.snapshots.truncate(cursor + 1);
        self.snapshots.push_back(snapshot);

        let mut evicted = 0usize;
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
            evicted += 1;
        }
        let cursor = self.snapshots.len() - 1;
        self.cursor = Some(cursor);

        self.stats.saved += 1;
        self.stats.truncated += discarded as u64;
        self.stats.evicted += evicted as u64;
        tracing::debug!(
            target: "warden.history",
            cursor = cursor,
            len = self.snapshots.len(),
            truncated = discarded,
            evicted = evicted,
            "snapshot saved"
        );
    }

    #[must_use]
    pub fn has_previous_snapshot(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    #[must_use]
    pub fn has_next_snapshot(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.snapshots.len())
    }

    /// Step the cursor back and return the snapshot now under it.
    ///
    /// Returns `None` and leaves the cursor alone at the earliest snapshot.
    pub fn move_to_previous_snapshot_and_get(&mut self) -> Option<Snapshot> {
        let cursor = self.cursor.filter(|&c| c > 0)? - 1;
        self.cursor = Some(cursor);
        self.snapshots.get(cursor).cloned()
    }

    /// Step the cursor forward and return the snapshot now under it.
    ///
    /// Returns `None` and leaves the cursor alone at the latest snapshot.
    pub fn move_to_next_snapshot_and_get(&mut self) -> Option<Snapshot> {
        let cursor = self.cursor.filter(|&c| c + 1 < self.snapshots.len())? + 1;
        self.cursor = Some(cursor);
        self.snapshots.get(cursor).cloned()
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cursor.is_some()
    }

    /// The component list snapshots are captured from and restored into.
    #[must_use]
    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The snapshot under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|c| self.snapshots.get(c))
    }

    #[must_use]
    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use warden_core::{DataComponent, Result};

    /// Unguarded integer component for exercising the history directly.
    struct Num(Mutex<i64>);

    impl Num {
        fn set(&self, v: i64) {
            *self.0.lock().unwrap() = v;
        }
    }

    impl DataComponent for Num {
        type Value = i64;

        fn reset(&self) -> Result<()> {
            self.set(0);
            Ok(())
        }

        fn is_reset(&self) -> bool {
            *self.0.lock().unwrap() == 0
        }

        fn capture_value(&self) -> i64 {
            *self.0.lock().unwrap()
        }

        fn restore_value(&self, value: i64) {
            self.set(value);
        }
    }

    fn setup(capacity: usize) -> (Arc<Num>, History) {
        let num = Arc::new(Num(Mutex::new(0)));
        let components: ComponentList = Arc::from(vec![num.clone() as Arc<dyn AnyComponent>]);
        let mut history = History::new(&HistoryConfig::new(capacity));
        history.initialize(components);
        (num, history)
    }

    fn value_at(history: &History, index: usize) -> i64 {
        *history
            .snapshot(index)
            .and_then(|s| s.get(0))
            .and_then(|d| d.downcast_ref::<i64>())
            .unwrap()
    }

    fn save(num: &Num, history: &mut History, v: i64) -> bool {
        num.set(v);
        history.save_snapshot_if_unique_from_last_snapshot()
    }

    #[test]
    fn new_history_is_uninitialized() {
        let history = History::default();
        assert!(!history.is_initialized());
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert_eq!(history.capacity(), 10);
        assert!(!history.has_previous_snapshot());
        assert!(!history.has_next_snapshot());
        assert!(history.current().is_none());
    }

    #[test]
    fn save_before_initialize_is_ignored() {
        let mut history = History::default();
        assert!(!history.save_snapshot_if_unique_from_last_snapshot());
        assert!(history.is_empty());
    }

    #[test]
    fn initialize_seeds_one_snapshot() {
        let (_, history) = setup(10);
        assert!(history.is_initialized());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(value_at(&history, 0), 0);
    }

    #[test]
    fn second_initialize_is_ignored() {
        let (num, mut history) = setup(10);
        num.set(5);
        let again = history.components().clone();
        history.initialize(again);
        assert_eq!(history.len(), 1);
        assert_eq!(value_at(&history, 0), 0);
    }

    #[test]
    fn identical_state_is_not_saved() {
        let (num, mut history) = setup(10);
        assert!(!save(&num, &mut history, 0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.stats().duplicates_skipped, 1);
    }

    #[test]
    fn distinct_state_is_appended() {
        let (num, mut history) = setup(10);
        assert!(save(&num, &mut history, 1));
        assert!(save(&num, &mut history, 2));
        assert!(!save(&num, &mut history, 2));
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.stats().saved, 2);
    }

    #[test]
    fn navigation_moves_cursor() {
        let (num, mut history) = setup(10);
        save(&num, &mut history, 1);
        save(&num, &mut history, 2);

        let prev = history.move_to_previous_snapshot_and_get().unwrap();
        assert_eq!(prev.get(0).unwrap().downcast_ref::<i64>(), Some(&1));
        assert_eq!(history.cursor(), Some(1));
        assert!(history.has_next_snapshot());

        let next = history.move_to_next_snapshot_and_get().unwrap();
        assert_eq!(next.get(0).unwrap().downcast_ref::<i64>(), Some(&2));
        assert!(history.move_to_next_snapshot_and_get().is_none());
        assert_eq!(history.cursor(), Some(2));
    }

    #[test]
    fn cannot_move_before_earliest() {
        let (_, mut history) = setup(10);
        assert!(history.move_to_previous_snapshot_and_get().is_none());
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn save_after_undo_truncates_redo_branch() {
        let (num, mut history) = setup(10);
        save(&num, &mut history, 1);
        save(&num, &mut history, 2);
        save(&num, &mut history, 3);
        history.move_to_previous_snapshot_and_get();
        history.move_to_previous_snapshot_and_get();
        assert_eq!(history.cursor(), Some(1));

        assert!(save(&num, &mut history, 9));
        assert!(!history.has_next_snapshot());
        assert_eq!(history.len(), 3);
        assert_eq!(value_at(&history, 2), 9);
        assert_eq!(history.stats().truncated, 2);
    }

    #[test]
    fn save_equal_to_cursor_after_undo_keeps_redo_branch() {
        let (num, mut history) = setup(10);
        save(&num, &mut history, 1);
        save(&num, &mut history, 2);
        let prev = history.move_to_previous_snapshot_and_get().unwrap();
        prev.restore_domain_model_to_state_at_snapshot(history.components());

        assert!(!history.save_snapshot_if_unique_from_last_snapshot());
        assert!(history.has_next_snapshot());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let (num, mut history) = setup(2);
        save(&num, &mut history, 1);
        save(&num, &mut history, 2);

        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
        assert_eq!(value_at(&history, 0), 1);
        assert_eq!(value_at(&history, 1), 2);
        assert_eq!(history.stats().evicted, 1);

        let prev = history.move_to_previous_snapshot_and_get().unwrap();
        assert_eq!(prev.get(0).unwrap().downcast_ref::<i64>(), Some(&1));
        assert!(history.move_to_previous_snapshot_and_get().is_none());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (num, mut history) = setup(0);
        assert_eq!(history.capacity(), 1);
        save(&num, &mut history, 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), Some(0));
        assert!(!history.has_previous_snapshot());
    }

    #[test]
    fn restore_writes_back_into_components() {
        let (num, mut history) = setup(10);
        save(&num, &mut history, 4);
        num.set(100);
        history
            .current()
            .unwrap()
            .clone()
            .restore_domain_model_to_state_at_snapshot(history.components());
        assert_eq!(num.capture_value(), 4);
    }

    #[test]
    fn snapshot_debug_lists_values() {
        let (num, history) = setup(10);
        num.set(3);
        let snap = Snapshot::capture(history.components());
        assert_eq!(format!("{snap:?}"), "[3]");
        assert_eq!(snap.len(), 1);
        assert!(!snap.is_empty());
        assert_eq!(snap.iter().count(), 1);
    }

    #[test]
    fn history_debug_reports_shape() {
        let (_, history) = setup(5);
        let s = format!("{history:?}");
        assert!(s.contains("History"));
        assert!(s.contains("capacity: 5"));
    }
}
