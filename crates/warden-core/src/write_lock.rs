#![forbid(unsafe_code)]

//! Reentrant exclusive/shared lock with ownership metadata.
//!
//! [`WriteLock`] is the single lock behind a domain model. Unlike
//! `std::sync::RwLock` it is not tied to a borrowed value: acquisition and
//! release are explicit calls, exclusive access is reentrant for the owning
//! thread, and the lock can answer "who holds me?" so that components can
//! reject writes from the wrong thread.
//!
//! # Rules
//!
//! | Request | Granted when |
//! |---------|--------------|
//! | write | no writer and no readers, or the caller already writes |
//! | read | caller already writes or reads, or no writer and none queued |
//!
//! Queued writers block new readers so a steady stream of readers cannot
//! starve a writer. Upgrading a read lock to a write lock deadlocks, as it
//! does with any reader/writer lock.
//!
//! # Poisoning
//!
//! The internal state is plain bookkeeping that is never left half-updated,
//! so a poisoned mutex is recovered with `into_inner`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::error::{IllegalModificationError, IllegalStateError, Result};

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`WriteLock`], unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId(u64);

impl LockId {
    fn next() -> Self {
        Self(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Human-readable label for the current thread: its name, or its id.
#[must_use]
pub fn current_thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", current.id()),
    }
}

#[derive(Debug)]
struct Holder {
    id: ThreadId,
    label: String,
}

#[derive(Debug, Default)]
struct LockState {
    writer: Option<Holder>,
    write_depth: usize,
    /// Read hold count per thread.
    readers: HashMap<ThreadId, usize>,
    waiting_writers: usize,
}

impl LockState {
    fn is_writer(&self, id: ThreadId) -> bool {
        self.writer.as_ref().is_some_and(|h| h.id == id)
    }
}

/// Reentrant exclusive/shared lock.
pub struct WriteLock {
    id: LockId,
    state: Mutex<LockState>,
    changed: Condvar,
}

impl fmt::Debug for WriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("WriteLock")
            .field("id", &self.id)
            .field("writer", &state.writer.as_ref().map(|h| h.label.as_str()))
            .field("write_depth", &state.write_depth)
            .field("readers", &state.readers.values().sum::<usize>())
            .field("waiting_writers", &state.waiting_writers)
            .finish()
    }
}

impl Default for WriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteLock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: LockId::next(),
            state: Mutex::new(LockState::default()),
            changed: Condvar::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> LockId {
        self.id
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ====================================================================
    // Exclusive access
    // ====================================================================

    /// Block until the calling thread holds the write lock.
    ///
    /// Returns the hold count after acquisition (1 for a fresh hold).
    pub fn acquire_write(&self) -> usize {
        let me = thread::current().id();
        let mut state = self.state();
        if state.is_writer(me) {
            state.write_depth += 1;
            tracing::trace!(
                target: "warden.lock",
                lock_id = self.id.0,
                depth = state.write_depth,
                "write lock re-entered"
            );
            return state.write_depth;
        }

        state.waiting_writers += 1;
        while state.writer.is_some() || !state.readers.is_empty() {
            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        state.waiting_writers -= 1;
        state.writer = Some(Holder {
            id: me,
            label: current_thread_label(),
        });
        state.write_depth = 1;
        tracing::trace!(target: "warden.lock", lock_id = self.id.0, "write lock acquired");
        1
    }

    /// Release one hold of the write lock.
    ///
    /// Returns the remaining hold count; the lock is free once it reaches 0.
    /// Fails if the calling thread does not hold the lock.
    pub fn release_write(&self) -> std::result::Result<usize, IllegalStateError> {
        let me = thread::current().id();
        let mut state = self.state();
        if !state.is_writer(me) {
            return Err(IllegalStateError::UnbalancedRelease {
                thread: current_thread_label(),
            });
        }
        state.write_depth -= 1;
        let remaining = state.write_depth;
        if remaining == 0 {
            state.writer = None;
            drop(state);
            self.changed.notify_all();
            tracing::trace!(target: "warden.lock", lock_id = self.id.0, "write lock released");
        }
        Ok(remaining)
    }

    // ====================================================================
    // Shared access
    // ====================================================================

    /// Block until the calling thread holds a read lock.
    pub fn acquire_read(&self) {
        let me = thread::current().id();
        let mut state = self.state();
        loop {
            let reentrant = state.is_writer(me) || state.readers.contains_key(&me);
            let free = state.writer.is_none() && state.waiting_writers == 0;
            if reentrant || free {
                break;
            }
            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        *state.readers.entry(me).or_insert(0) += 1;
    }

    /// Release one read hold of the calling thread.
    pub fn release_read(&self) -> std::result::Result<(), IllegalStateError> {
        let me = thread::current().id();
        let mut state = self.state();
        let Some(count) = state.readers.get_mut(&me) else {
            return Err(IllegalStateError::UnbalancedReadRelease);
        };
        *count -= 1;
        if *count == 0 {
            state.readers.remove(&me);
            if state.readers.is_empty() {
                drop(state);
                self.changed.notify_all();
            }
        }
        Ok(())
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.state().writer.is_some()
    }

    #[must_use]
    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.state().is_writer(thread::current().id())
    }

    /// Write holds owned by the calling thread (0 if it is not the writer).
    #[must_use]
    pub fn write_hold_count(&self) -> usize {
        let state = self.state();
        if state.is_writer(thread::current().id()) {
            state.write_depth
        } else {
            0
        }
    }

    /// Total read holds across all threads.
    #[must_use]
    pub fn read_lock_count(&self) -> usize {
        self.state().readers.values().sum()
    }

    /// Label of the thread holding the write lock, if any.
    #[must_use]
    pub fn writer_label(&self) -> Option<String> {
        self.state().writer.as_ref().map(|h| h.label.clone())
    }

    /// Check that the calling thread may modify data guarded by this lock.
    pub fn check_writable(&self) -> std::result::Result<(), IllegalModificationError> {
        let state = self.state();
        match &state.writer {
            None => Err(IllegalModificationError::NotWriteLocked),
            Some(holder) if holder.id == thread::current().id() => Ok(()),
            Some(holder) => Err(IllegalModificationError::HeldByOtherThread {
                attempted_by: current_thread_label(),
                held_by: holder.label.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// WriteGuard
// ---------------------------------------------------------------------------

/// Cloneable handle that data components keep to police their own writes.
///
/// Every mutating component operation calls
/// [`assert_writable`](Self::assert_writable) before touching state.
#[derive(Clone)]
pub struct WriteGuard {
    lock: Arc<WriteLock>,
}

impl fmt::Debug for WriteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteGuard")
            .field("lock_id", &self.lock.id)
            .finish()
    }
}

impl WriteGuard {
    #[must_use]
    pub fn new(lock: Arc<WriteLock>) -> Self {
        Self { lock }
    }

    #[must_use]
    pub fn lock_id(&self) -> LockId {
        self.lock.id
    }

    /// Fail unless the calling thread holds the write lock.
    pub fn assert_writable(&self) -> Result<()> {
        self.lock.check_writable().map_err(Into::into)
    }
}
