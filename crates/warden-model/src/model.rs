#![forbid(unsafe_code)]

//! The write-lock coordinator.
//!
//! [`DomainModel`] owns the component registry, the snapshot
//! [`History`], and the single [`WriteLock`] that serializes every change.
//!
//! # Lifecycle
//!
//! ```text
//! AcceptingRegistrations ──(first acquire_write_lock)──► Finalized
//!        register() ok                                   register() fails
//! ```
//!
//! Finalization captures the seed snapshot from the registered components'
//! current (default) values and freezes the registry.
//!
//! # Write sessions
//!
//! ```text
//! acquire_write_lock ─► mutate components ─► release
//!                                              │ save snapshot if changed
//! undo/redo_under_write_lock ─► move cursor ─► restore ─► release (no save)
//! ```
//!
//! Undo and redo transitions are not themselves recorded.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use warden_core::{
    AnyComponent, DataComponent, IllegalStateError, LockId, Result, WriteGuard, WriteLock,
};

use crate::components::{Field, ListField};
use crate::config::ModelConfig;
use crate::history::{ComponentList, History, HistoryStats};
use crate::session::{ReadSession, WriteSession};

enum Registry {
    AcceptingRegistrations(Vec<Arc<dyn AnyComponent>>),
    Finalized(ComponentList),
}

/// Coordinator enforcing single-writer access and recording undo history.
pub struct DomainModel {
    lock: Arc<WriteLock>,
    registry: Mutex<Registry>,
    history: Mutex<History>,
}

impl fmt::Debug for DomainModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainModel")
            .field("initialized", &self.is_initialized())
            .field("components", &self.component_count())
            .field("lock", &self.lock)
            .field("history", &*self.history())
            .finish()
    }
}

impl Default for DomainModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainModel {
    /// Create a model with the default history capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            lock: Arc::new(WriteLock::new()),
            registry: Mutex::new(Registry::AcceptingRegistrations(Vec::new())),
            history: Mutex::new(History::new(&config.history)),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ====================================================================
    // Registration
    // ====================================================================

    /// Add a component to the registry.
    ///
    /// Fails with [`IllegalStateError::LateRegistration`] once the first
    /// write lock has been acquired.
    pub fn register<C: DataComponent>(&self, component: C) -> Result<()> {
        let mut registry = self.registry();
        match &mut *registry {
            Registry::AcceptingRegistrations(components) => {
                components.push(Arc::new(component));
                tracing::trace!(
                    target: "warden.model",
                    index = components.len() - 1,
                    value_type = std::any::type_name::<C::Value>(),
                    "data component registered"
                );
                Ok(())
            }
            Registry::Finalized(_) => {
                tracing::warn!(
                    target: "warden.model",
                    value_type = std::any::type_name::<C::Value>(),
                    "registration rejected after initialization"
                );
                Err(IllegalStateError::LateRegistration.into())
            }
        }
    }

    /// Create a [`Field`] bound to this model and register it.
    pub fn register_field<T>(&self, default: T) -> Result<Field<T>>
    where
        T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let field = Field::new(self.write_guard(), default);
        self.register(field.clone())?;
        Ok(field)
    }

    /// Create a [`ListField`] bound to this model and register it.
    pub fn register_list<T>(&self, default: Vec<T>) -> Result<ListField<T>>
    where
        T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let list = ListField::new(self.write_guard(), default);
        self.register(list.clone())?;
        Ok(list)
    }

    /// Handle components keep to verify writes against this model's lock.
    #[must_use]
    pub fn write_guard(&self) -> WriteGuard {
        WriteGuard::new(Arc::clone(&self.lock))
    }

    fn finish_initialization(&self) {
        let mut registry = self.registry();
        let pending = match &mut *registry {
            Registry::AcceptingRegistrations(pending) => std::mem::take(pending),
            Registry::Finalized(_) => return,
        };
        let components: ComponentList = pending.into();
        let mut history = self.history();
        history.initialize(Arc::clone(&components));
        tracing::info!(
            target: "warden.model",
            components = components.len(),
            capacity = history.capacity(),
            "domain model initialized"
        );
        *registry = Registry::Finalized(components);
    }

    // ====================================================================
    // Write sessions
    // ====================================================================

    /// Block until the calling thread holds the write lock.
    ///
    /// Reentrant: every returned session must be ended. The first
    /// acquisition ever finalizes the model.
    pub fn acquire_write_lock(&self) -> WriteSession<'_> {
        self.begin_write_session(true)
    }

    fn begin_write_session(&self, save_on_release: bool) -> WriteSession<'_> {
        let depth = self.lock.acquire_write();
        if depth == 1 && !self.is_initialized() {
            self.finish_initialization();
        }
        tracing::debug!(target: "warden.model", depth = depth, "write session started");
        WriteSession::new(self, save_on_release)
    }

    /// Called when a [`WriteSession`] ends.
    pub(crate) fn end_write_session(&self, save_snapshot_of_new_state: bool) {
        let saved = save_snapshot_of_new_state
            && self.history().save_snapshot_if_unique_from_last_snapshot();
        match self.lock.release_write() {
            Ok(remaining) => tracing::debug!(
                target: "warden.model",
                depth = remaining,
                saved = saved,
                "write session ended"
            ),
            Err(err) => tracing::error!(
                target: "warden.model",
                error = %err,
                "write session ended on a thread that does not hold the lock"
            ),
        }
    }

    /// Run `f` inside a write session and return its result.
    pub fn run_under_write_lock<R>(&self, f: impl FnOnce(&WriteSession<'_>) -> R) -> R {
        let session = self.acquire_write_lock();
        f(&session)
    }

    /// Wrap `action` so that every call runs it inside a write session.
    pub fn apply_write_lock<F>(self: &Arc<Self>, action: F) -> impl Fn() + Send + Sync + 'static
    where
        F: Fn() + Send + Sync + 'static,
    {
        let model = Arc::clone(self);
        move || {
            let _session = model.acquire_write_lock();
            action();
        }
    }

    /// Fail unless the calling thread holds the write lock.
    pub fn assert_writable(&self) -> Result<()> {
        self.lock.check_writable().map_err(Into::into)
    }

    // ====================================================================
    // Read sessions
    // ====================================================================

    /// Block until the calling thread holds a read lock.
    pub fn acquire_read_lock(&self) -> ReadSession<'_> {
        self.lock.acquire_read();
        ReadSession::new(self)
    }

    pub(crate) fn end_read_session(&self) {
        if let Err(err) = self.lock.release_read() {
            tracing::error!(target: "warden.model", error = %err, "read session release failed");
        }
    }

    // ====================================================================
    // Whole-model operations
    // ====================================================================

    fn components(&self) -> ComponentList {
        match &*self.registry() {
            Registry::AcceptingRegistrations(pending) => pending.iter().cloned().collect(),
            Registry::Finalized(components) => Arc::clone(components),
        }
    }

    /// Reset every component in registry order.
    ///
    /// Does not take the lock itself; components reject the reset unless
    /// the caller holds it.
    pub fn reset(&self) -> Result<()> {
        for component in self.components().iter() {
            component.reset()?;
        }
        Ok(())
    }

    /// Whether every component holds its default value.
    ///
    /// Advisory: reads race with a concurrent writer.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.components().iter().all(|c| c.is_reset())
    }

    /// Restore the previous snapshot, if any.
    ///
    /// Returns `true` if the model moved.
    pub fn undo_under_write_lock(&self) -> bool {
        let _session = self.begin_write_session(false);
        let mut history = self.history();
        let Some(snapshot) = history.move_to_previous_snapshot_and_get() else {
            tracing::debug!(target: "warden.model", "nothing to undo");
            return false;
        };
        let components = Arc::clone(history.components());
        let cursor = history.cursor();
        drop(history);
        snapshot.restore_domain_model_to_state_at_snapshot(&components);
        tracing::debug!(target: "warden.model", cursor = ?cursor, "undo applied");
        true
    }

    /// Restore the next snapshot, if any.
    ///
    /// Returns `true` if the model moved.
    pub fn redo_under_write_lock(&self) -> bool {
        let _session = self.begin_write_session(false);
        let mut history = self.history();
        let Some(snapshot) = history.move_to_next_snapshot_and_get() else {
            tracing::debug!(target: "warden.model", "nothing to redo");
            return false;
        };
        let components = Arc::clone(history.components());
        let cursor = history.cursor();
        drop(history);
        snapshot.restore_domain_model_to_state_at_snapshot(&components);
        tracing::debug!(target: "warden.model", cursor = ?cursor, "redo applied");
        true
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn lock_id(&self) -> LockId {
        self.lock.id()
    }

    /// Whether the first write lock has been acquired.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.registry(), Registry::Finalized(_))
    }

    #[must_use]
    pub fn component_count(&self) -> usize {
        match &*self.registry() {
            Registry::AcceptingRegistrations(pending) => pending.len(),
            Registry::Finalized(components) => components.len(),
        }
    }

    #[must_use]
    pub fn is_write_locked(&self) -> bool {
        self.lock.is_write_locked()
    }

    #[must_use]
    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.lock.is_write_locked_by_current_thread()
    }

    #[must_use]
    pub fn write_hold_count(&self) -> usize {
        self.lock.write_hold_count()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history().has_previous_snapshot()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history().has_next_snapshot()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history().len()
    }

    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history().capacity()
    }

    #[must_use]
    pub fn history_cursor(&self) -> Option<usize> {
        self.history().cursor()
    }

    #[must_use]
    pub fn history_stats(&self) -> HistoryStats {
        self.history().stats()
    }
}
