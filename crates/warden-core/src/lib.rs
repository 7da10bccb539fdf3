#![forbid(unsafe_code)]

//! Core: the data component capability and the write-lock primitive.
//!
//! # Role in Warden
//! `warden-core` defines what a piece of model state must offer
//! ([`DataComponent`]), how its value travels through history
//! ([`Descriptor`]), and the reentrant lock ([`WriteLock`]) whose ownership
//! decides who may write.
//!
//! # How it fits in the system
//! `warden-model` builds the coordinator and the snapshot history on top of
//! these pieces. Component authors depend on this crate alone: they
//! implement [`DataComponent`] and call [`WriteGuard::assert_writable`]
//! before every mutation.

pub mod component;
pub mod error;
pub mod write_lock;

pub use component::{AnyComponent, DataComponent, Descriptor};
pub use error::{ErrorKind, IllegalModificationError, IllegalStateError, ModelError, Result};
pub use write_lock::{LockId, WriteGuard, WriteLock, current_thread_label};
