#![forbid(unsafe_code)]

//! Scoped proofs of lock ownership.
//!
//! A [`WriteSession`] exists only while its thread holds the model's write
//! lock. Component mutators that take `&WriteSession` therefore cannot run
//! outside a write session, and because sessions are `!Send` they cannot be
//! handed to a thread that does not own the lock.
//!
//! Dropping a session is the release. [`WriteSession::release`] spells it
//! out at call sites that want the release to be visible.

use std::fmt;
use std::marker::PhantomData;

use warden_core::LockId;

use crate::model::DomainModel;

/// Proof that the current thread holds a model's write lock.
///
/// Ending the session saves a snapshot if the model changed (except for
/// undo/redo sessions) and then releases one hold of the lock. A session
/// dropped while its thread panics releases without saving.
#[must_use = "the write lock is released as soon as the session is dropped"]
pub struct WriteSession<'a> {
    model: &'a DomainModel,
    save_on_release: bool,
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for WriteSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSession")
            .field("lock_id", &self.lock_id())
            .field("depth", &self.depth())
            .field("save_on_release", &self.save_on_release)
            .finish()
    }
}

impl<'a> WriteSession<'a> {
    /// The caller must already hold the write lock.
    pub(crate) fn new(model: &'a DomainModel, save_on_release: bool) -> Self {
        Self {
            model,
            save_on_release,
            _not_send: PhantomData,
        }
    }

    /// Identity of the lock this session holds.
    #[must_use]
    pub fn lock_id(&self) -> LockId {
        self.model.lock_id()
    }

    /// Current reentrant hold count of the write lock.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.model.write_hold_count()
    }

    #[must_use]
    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    /// End the session.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for WriteSession<'_> {
    fn drop(&mut self) {
        // A session unwinding from a panic may hold a half-applied change.
        let save = self.save_on_release && !std::thread::panicking();
        self.model.end_write_session(save);
    }
}

/// Shared access for read-only observers.
#[must_use = "the read lock is released as soon as the session is dropped"]
pub struct ReadSession<'a> {
    model: &'a DomainModel,
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for ReadSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSession")
            .field("lock_id", &self.model.lock_id())
            .finish()
    }
}

impl<'a> ReadSession<'a> {
    pub(crate) fn new(model: &'a DomainModel) -> Self {
        Self {
            model,
            _not_send: PhantomData,
        }
    }

    #[must_use]
    pub fn model(&self) -> &'a DomainModel {
        self.model
    }

    /// End the session.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ReadSession<'_> {
    fn drop(&mut self) {
        self.model.end_read_session();
    }
}
