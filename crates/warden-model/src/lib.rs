#![forbid(unsafe_code)]

//! Warden Model
//!
//! A domain model whose state lives in independently typed data components,
//! mutated only inside serialized write sessions, with a bounded
//! snapshot history for undo and redo.
//!
//! # Key Components
//!
//! - [`DomainModel`] - registry, write-lock coordinator, undo/redo entry point
//! - [`WriteSession`] - scoped proof that the current thread holds the write lock
//! - [`History`] - bounded, deduplicated snapshot log with a cursor
//! - [`Field`] / [`ListField`] - ready-made components
//! - [`ModelConfig`] - history limits, loadable from TOML/JSON with `model-config`
//!
//! # Example
//!
//! ```
//! use warden_model::DomainModel;
//!
//! let model = DomainModel::new();
//! let count = model.register_field(0u32)?;
//!
//! model.run_under_write_lock(|session| count.set(session, 1))?;
//! model.run_under_write_lock(|session| count.set(session, 2))?;
//!
//! model.undo_under_write_lock();
//! assert_eq!(count.get(), 1);
//! model.redo_under_write_lock();
//! assert_eq!(count.get(), 2);
//! # Ok::<(), warden_core::ModelError>(())
//! ```

pub mod components;
pub mod config;
pub mod history;
pub mod model;
pub mod session;

pub use components::{Field, ListField};
pub use config::{ConfigError, DEFAULT_HISTORY_CAPACITY, HistoryConfig, ModelConfig};
pub use history::{ComponentList, History, HistoryStats, Snapshot};
pub use model::DomainModel;
pub use session::{ReadSession, WriteSession};
