//! Storage Collaborator - Query descriptions and the backend contract

pub mod backend;
pub mod memory;
pub mod query;

pub use backend::{
    first_row, row_from_json, scalar, Row, StorageBackend, StorageError, StorageResult,
};
pub use memory::MemoryBackend;
pub use query::{OrderDirection, Query, SortSpec};
