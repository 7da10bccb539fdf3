#![forbid(unsafe_code)]

//! Warden public facade crate.
//!
//! Re-exports the component capability and write lock from `warden-core`
//! and the domain model from `warden-model`, plus a prelude for
//! day-to-day usage.
//!
//! ```
//! use warden::prelude::*;
//!
//! let model = DomainModel::new();
//! let title = model.register_field(String::from("untitled"))?;
//! let tags = model.register_list(Vec::<String>::new())?;
//!
//! model.run_under_write_lock(|s| -> Result<()> {
//!     title.set(s, "draft".into())?;
//!     tags.push(s, "todo".into())?;
//!     Ok(())
//! })?;
//!
//! model.undo_under_write_lock();
//! assert!(model.is_reset());
//! # Ok::<(), ModelError>(())
//! ```

// --- Core re-exports -------------------------------------------------------

pub use warden_core::{
    AnyComponent, DataComponent, Descriptor, ErrorKind, IllegalModificationError,
    IllegalStateError, LockId, ModelError, Result, WriteGuard, WriteLock, current_thread_label,
};

// --- Model re-exports ------------------------------------------------------

pub use warden_model::{
    ConfigError, DEFAULT_HISTORY_CAPACITY, DomainModel, Field, History, HistoryConfig,
    HistoryStats, ListField, ModelConfig, ReadSession, Snapshot, WriteSession,
};

pub mod prelude {
    pub use crate::{
        DataComponent, DomainModel, Field, HistoryConfig, ListField, ModelConfig, ModelError,
        Result, WriteGuard, WriteSession,
    };

    pub use crate::{core, model};
}

pub use warden_core as core;
pub use warden_model as model;
