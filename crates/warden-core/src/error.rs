#![forbid(unsafe_code)]

//! Error types for the domain model.
//!
//! Every error here is a programming error in calling code: a startup
//! ordering bug, or a write that bypassed the write-lock discipline. None
//! of them are meant to be retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Coarse classification of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The model was driven through its lifecycle in the wrong order.
    IllegalState,
    /// A data component was mutated outside a write session.
    IllegalModification,
}

/// Lifecycle misuse of the model or its lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalStateError {
    #[error(
        "new data components cannot be registered in the domain model after it has been fully initialized"
    )]
    LateRegistration,

    #[error("write lock released by thread {thread}, which does not hold it")]
    UnbalancedRelease { thread: String },

    #[error("read lock released while no read lock is held")]
    UnbalancedReadRelease,
}

/// A write to a data component that the write-lock discipline forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalModificationError {
    #[error(
        "data components cannot be changed without a write lock; run the change under the domain model's write lock instead of modifying the component directly"
    )]
    NotWriteLocked,

    #[error(
        "modification was attempted by thread {attempted_by}, while the write lock is held by thread {held_by}"
    )]
    HeldByOtherThread {
        attempted_by: String,
        held_by: String,
    },

    #[error("write session belongs to a different domain model than the modified component")]
    ForeignSession,
}

/// Top-level error for domain model operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),

    #[error(transparent)]
    IllegalModification(#[from] IllegalModificationError),
}

impl ModelError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IllegalState(_) => ErrorKind::IllegalState,
            Self::IllegalModification(_) => ErrorKind::IllegalModification,
        }
    }

    #[must_use]
    pub fn is_illegal_modification(&self) -> bool {
        self.kind() == ErrorKind::IllegalModification
    }

    #[must_use]
    pub fn is_late_registration(&self) -> bool {
        matches!(self, Self::IllegalState(IllegalStateError::LateRegistration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        let late: ModelError = IllegalStateError::LateRegistration.into();
        assert_eq!(late.kind(), ErrorKind::IllegalState);
        assert!(late.is_late_registration());
        assert!(!late.is_illegal_modification());

        let unlocked: ModelError = IllegalModificationError::NotWriteLocked.into();
        assert_eq!(unlocked.kind(), ErrorKind::IllegalModification);
        assert!(unlocked.is_illegal_modification());
    }

    #[test]
    fn other_thread_message_names_both_threads() {
        let err: ModelError = IllegalModificationError::HeldByOtherThread {
            attempted_by: "worker-2".into(),
            held_by: "main".into(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("worker-2"));
        assert!(msg.contains("main"));
    }

    #[test]
    fn transparent_display_matches_inner() {
        let inner = IllegalStateError::UnbalancedReadRelease;
        let outer = ModelError::from(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
    }
}
