#![forbid(unsafe_code)]

//! Property tests for domain model history invariants.
//!
//! Validates, for random write/undo/redo sequences:
//! - The model state always equals a plain reference log's cursor entry.
//! - History length never exceeds the configured capacity.
//! - Releases without a change never grow the history.
//! - A save after undo always drops the redo branch.

use proptest::prelude::*;

use warden_model::{DomainModel, HistoryConfig, ModelConfig};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Write(i8),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<i8>().prop_map(Op::Write),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

/// Straightforward log + cursor the model must agree with.
struct Reference {
    log: Vec<i8>,
    cursor: usize,
    capacity: usize,
}

impl Reference {
    fn new(capacity: usize) -> Self {
        Self {
            log: vec![0],
            cursor: 0,
            capacity,
        }
    }

    fn write(&mut self, v: i8) {
        if self.log[self.cursor] == v {
            return;
        }
        self.log.truncate(self.cursor + 1);
        self.log.push(v);
        while self.log.len() > self.capacity {
            self.log.remove(0);
        }
        self.cursor = self.log.len() - 1;
    }

    fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.log.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    fn current(&self) -> i8 {
        self.log[self.cursor]
    }
}

fn model(capacity: usize) -> DomainModel {
    DomainModel::with_config(ModelConfig::default().with_history(HistoryConfig::new(capacity)))
}

// ============================================================================
// Invariant 1: model agrees with the reference log
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn model_matches_reference(capacity in 1usize..8, ops in ops_strategy(60)) {
        let model = model(capacity);
        let field = model.register_field(0i8).unwrap();
        let mut reference = Reference::new(capacity);

        for op in &ops {
            match op {
                Op::Write(v) => {
                    model.run_under_write_lock(|s| field.set(s, *v)).unwrap();
                    reference.write(*v);
                }
                Op::Undo => prop_assert_eq!(model.undo_under_write_lock(), reference.undo()),
                Op::Redo => prop_assert_eq!(model.redo_under_write_lock(), reference.redo()),
            }
            prop_assert_eq!(field.get(), reference.current());
            prop_assert_eq!(model.history_len(), reference.log.len());
            prop_assert_eq!(model.history_cursor(), Some(reference.cursor));
        }
    }
}

// ============================================================================
// Invariant 2: capacity is never exceeded
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn capacity_never_exceeded(capacity in 1usize..6, values in prop::collection::vec(any::<u16>(), 1..40)) {
        let model = model(capacity);
        let field = model.register_field(0u16).unwrap();

        for v in &values {
            model.run_under_write_lock(|s| field.set(s, *v)).unwrap();
            prop_assert!(model.history_len() <= capacity);
        }
    }
}

// ============================================================================
// Invariant 3: unchanged releases never grow history
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn unchanged_release_is_noop(v in any::<i32>(), repeats in 1usize..10) {
        let model = model(10);
        let field = model.register_field(0i32).unwrap();
        model.run_under_write_lock(|s| field.set(s, v)).unwrap();
        let len = model.history_len();
        let cursor = model.history_cursor();

        for _ in 0..repeats {
            model.run_under_write_lock(|s| field.set(s, v)).unwrap();
            model.acquire_write_lock().release();
        }
        prop_assert_eq!(model.history_len(), len);
        prop_assert_eq!(model.history_cursor(), cursor);
    }
}

// ============================================================================
// Invariant 4: saving after undo truncates redo history
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn save_after_undo_drops_redo(
        values in prop::collection::vec(1i64..1000, 2..12),
        undos in 1usize..11,
        fresh in 1000i64..2000,
    ) {
        let model = model(usize::MAX);
        let field = model.register_field(0i64).unwrap();
        for v in &values {
            model.run_under_write_lock(|s| field.set(s, *v)).unwrap();
        }
        for _ in 0..undos {
            model.undo_under_write_lock();
        }
        prop_assert!(model.can_redo());

        model.run_under_write_lock(|s| field.set(s, fresh)).unwrap();
        prop_assert!(!model.can_redo());
        prop_assert!(!model.redo_under_write_lock());
        prop_assert_eq!(field.get(), fresh);
    }
}
