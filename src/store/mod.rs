//! Store adapter layer.
//!
//! [`traits`] defines the abstract interface the engine consumes;
//! [`memory`] provides a thread-safe reference backend for embedded use
//! and tests.

mod memory;
mod traits;

pub use memory::InMemoryRecordStore;
pub use traits::{BatchResult, FieldFilter, RecordStore, StoreError};
