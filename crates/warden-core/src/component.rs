#![forbid(unsafe_code)]

//! The data component capability and its type-erased form.
//!
//! A [`DataComponent`] is one independently typed piece of mutable state.
//! The domain model never looks inside it; it only needs four things:
//!
//! | Operation | Purity | Notes |
//! |-----------|--------|-------|
//! | `reset` | mutating | guarded by the write lock, idempotent |
//! | `is_reset` | pure | safe without the lock (advisory) |
//! | `capture_value` | pure | returns an immutable value |
//! | `restore_value` | mutating | never re-enters the write-lock guard |
//!
//! Components of different value types live side by side in one registry
//! through [`AnyComponent`], which a blanket impl provides for every
//! `DataComponent`. Captured values travel as [`Descriptor`]s: `Arc`-shared,
//! cheap to clone, compared with the value type's own `PartialEq`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Capability every piece of state managed by the domain model implements.
///
/// # Invariants
///
/// 1. `restore_value(capture_value())` leaves the component observably unchanged.
/// 2. `reset()` is equivalent to restoring the component's default value.
/// 3. `is_reset()` is true iff the current value equals the default.
pub trait DataComponent: Send + Sync + 'static {
    /// Immutable description of the component's value.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Return to the default value.
    ///
    /// Implementations check the write lock before mutating and surface
    /// the guard's error.
    fn reset(&self) -> Result<()>;

    /// Whether the component currently holds its default value.
    fn is_reset(&self) -> bool;

    /// Capture the current value.
    fn capture_value(&self) -> Self::Value;

    /// Overwrite the current value.
    ///
    /// Called by the domain model while it already holds the write lock on
    /// the caller's behalf, so implementations must not consult the guard.
    fn restore_value(&self, value: Self::Value);
}

impl<C: DataComponent> DataComponent for Arc<C> {
    type Value = C::Value;

    fn reset(&self) -> Result<()> {
        <C as DataComponent>::reset(self)
    }

    fn is_reset(&self) -> bool {
        <C as DataComponent>::is_reset(self)
    }

    fn capture_value(&self) -> Self::Value {
        <C as DataComponent>::capture_value(self)
    }

    fn restore_value(&self, value: Self::Value) {
        <C as DataComponent>::restore_value(self, value);
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

trait DescriptorValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn DescriptorValue) -> bool;
}

impl<T> DescriptorValue for T
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn DescriptorValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Opaque, immutable captured value of one component.
///
/// Two descriptors are equal iff they hold the same value type and the
/// values compare equal.
#[derive(Clone)]
pub struct Descriptor {
    value: Arc<dyn DescriptorValue>,
}

impl Descriptor {
    /// Wrap a captured value.
    #[must_use]
    pub fn new<T>(value: T) -> Self
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
        }
    }

    /// Borrow the value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Whether both descriptors share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.value.eq_dyn(other.value.as_ref())
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

// ---------------------------------------------------------------------------
// Type-erased component
// ---------------------------------------------------------------------------

/// Object-safe view of a [`DataComponent`], used by the component registry.
pub trait AnyComponent: Send + Sync {
    fn reset(&self) -> Result<()>;

    fn is_reset(&self) -> bool;

    fn capture(&self) -> Descriptor;

    /// Restore from a descriptor. Returns `false` and leaves the component
    /// untouched if the descriptor holds a different value type.
    fn restore(&self, descriptor: &Descriptor) -> bool;

    /// Name of the captured value type, for diagnostics.
    fn value_type_name(&self) -> &'static str;
}

impl<C: DataComponent> AnyComponent for C {
    fn reset(&self) -> Result<()> {
        DataComponent::reset(self)
    }

    fn is_reset(&self) -> bool {
        DataComponent::is_reset(self)
    }

    fn capture(&self) -> Descriptor {
        Descriptor::new(self.capture_value())
    }

    fn restore(&self, descriptor: &Descriptor) -> bool {
        match descriptor.downcast_ref::<C::Value>() {
            Some(value) => {
                self.restore_value(value.clone());
                true
            }
            None => false,
        }
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<C::Value>()
    }
}
