//! Database layer: the document store seam and its backends.

pub mod field_path;
pub mod firestore;
pub mod memory;
pub mod store;

pub use field_path::{FieldPath, FieldPathError};
pub use firestore::FirestoreStore;
pub use memory::{FailureMode, MemoryStore};
pub use store::{Document, DocumentStore, FieldUpdate, QueryFilter, StoreError};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}
