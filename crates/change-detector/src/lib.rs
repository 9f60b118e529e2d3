//! Change Detector
//!
//! Decides which cluster object mutations are real changes.
//!
//! - [`cache`]: last-observed snapshot per object, optionally LRU-bounded
//! - [`diff`]: structural edit operations between two JSON documents
//! - [`change_set`]: bookkeeping filter and old/new value resolution
//! - [`engine`]: per-notification handling that ties the cache, the diff and
//!   the hub together
//!
//! Objects are handled as untyped [`serde_json::Value`] trees so every
//! resource kind, including ones discovered at runtime, goes through the same
//! code path.

pub mod cache;
pub mod change_set;
pub mod diff;
pub mod engine;
pub mod error;
pub mod pointer;

pub use cache::{ObjectCache, Snapshot};
pub use change_set::{ChangeSet, FieldChange};
pub use diff::{Operation, OperationKind};
pub use engine::{cache_key, ChangeEngine, Delivery, EventType, Outcome};
pub use error::EngineError;
