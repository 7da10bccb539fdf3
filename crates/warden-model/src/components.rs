#![forbid(unsafe_code)]

//! Ready-made data components.
//!
//! [`Field<T>`] holds one value with a default; [`ListField<T>`] holds an
//! ordered list. Both are cheap handles: cloning shares the same state, so
//! one clone can be registered with the model while others are handed to
//! the code that reads and writes them.
//!
//! Every mutator comes in two flavours:
//!
//! | Flavour | Proof of access | Failure |
//! |---------|-----------------|---------|
//! | `set`, `update`, `push`, ... | `&WriteSession` | session of another model |
//! | `try_set`, `try_update`, `try_push` | runtime lock check | no lock, or lock on another thread |
//!
//! Mutators report whether the value changed (by `PartialEq`).

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use warden_core::{DataComponent, IllegalModificationError, Result, WriteGuard};

use crate::session::WriteSession;

struct FieldInner<T> {
    value: RwLock<T>,
    default: T,
    guard: WriteGuard,
}

/// A single value guarded by a domain model's write lock.
///
/// [`DataComponent::restore_value`] bypasses the lock and is reserved for
/// the model's history; it is not a lock-free setter.
pub struct Field<T> {
    inner: Arc<FieldInner<T>>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.inner.value.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("Field")
            .field("value", &*value)
            .field("default", &self.inner.default)
            .finish()
    }
}

impl<T> Field<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    /// Create a field holding `default`. It must still be registered with
    /// the model that issued `guard`.
    #[must_use]
    pub fn new(guard: WriteGuard, default: T) -> Self {
        Self {
            inner: Arc::new(FieldInner {
                value: RwLock::new(default.clone()),
                default,
                guard,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.value.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.value.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.read().clone()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.read())
    }

    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    fn check_session(&self, session: &WriteSession<'_>) -> Result<()> {
        if session.lock_id() == self.inner.guard.lock_id() {
            Ok(())
        } else {
            Err(IllegalModificationError::ForeignSession.into())
        }
    }

    fn replace(&self, value: T) -> bool {
        let mut current = self.write();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    fn modify(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut current = self.write();
        let old = current.clone();
        f(&mut *current);
        *current != old
    }

    pub fn set(&self, session: &WriteSession<'_>, value: T) -> Result<bool> {
        self.check_session(session)?;
        Ok(self.replace(value))
    }

    pub fn update(&self, session: &WriteSession<'_>, f: impl FnOnce(&mut T)) -> Result<bool> {
        self.check_session(session)?;
        Ok(self.modify(f))
    }

    /// Set without a session token; fails unless this thread holds the lock.
    pub fn try_set(&self, value: T) -> Result<bool> {
        self.inner.guard.assert_writable()?;
        Ok(self.replace(value))
    }

    /// Modify without a session token; fails unless this thread holds the lock.
    pub fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<bool> {
        self.inner.guard.assert_writable()?;
        Ok(self.modify(f))
    }
}

impl<T> DataComponent for Field<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    type Value = T;

    fn reset(&self) -> Result<()> {
        self.inner.guard.assert_writable()?;
        self.replace(self.inner.default.clone());
        Ok(())
    }

    fn is_reset(&self) -> bool {
        *self.read() == self.inner.default
    }

    fn capture_value(&self) -> T {
        self.get()
    }

    fn restore_value(&self, value: T) {
        *self.write() = value;
    }
}

/// An ordered list guarded by a domain model's write lock.
///
/// As with [`Field`], `restore_value` is reserved for the model's history.
pub struct ListField<T> {
    items: Field<Vec<T>>,
}

impl<T> Clone for ListField<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ListField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.items.inner.value.read().unwrap_or_else(|e| e.into_inner());
        f.debug_list().entries(items.iter()).finish()
    }
}

impl<T> ListField<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(guard: WriteGuard, default: Vec<T>) -> Self {
        Self {
            items: Field::new(guard, default),
        }
    }

    /// Clone of all items.
    #[must_use]
    pub fn get(&self) -> Vec<T> {
        self.items.get()
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<T> {
        self.items.with(|items| items.get(index).cloned())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.with(Vec::is_empty)
    }

    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.items.with(|items| f(items.as_slice()))
    }

    pub fn push(&self, session: &WriteSession<'_>, item: T) -> Result<()> {
        self.items.update(session, |items| items.push(item))?;
        Ok(())
    }

    /// Remove and return the item at `index`, or `None` if out of range.
    pub fn remove(&self, session: &WriteSession<'_>, index: usize) -> Result<Option<T>> {
        let mut removed = None;
        self.items.update(session, |items| {
            if index < items.len() {
                removed = Some(items.remove(index));
            }
        })?;
        Ok(removed)
    }

    pub fn clear(&self, session: &WriteSession<'_>) -> Result<bool> {
        self.items.update(session, Vec::clear)
    }

    pub fn replace(&self, session: &WriteSession<'_>, items: Vec<T>) -> Result<bool> {
        self.items.set(session, items)
    }

    /// Push without a session token; fails unless this thread holds the lock.
    pub fn try_push(&self, item: T) -> Result<()> {
        self.items.try_update(|items| items.push(item))?;
        Ok(())
    }
}

impl<T> DataComponent for ListField<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    type Value = Vec<T>;

    fn reset(&self) -> Result<()> {
        DataComponent::reset(&self.items)
    }

    fn is_reset(&self) -> bool {
        DataComponent::is_reset(&self.items)
    }

    fn capture_value(&self) -> Vec<T> {
        self.items.capture_value()
    }

    fn restore_value(&self, value: Vec<T>) {
        self.items.restore_value(value);
    }
}
