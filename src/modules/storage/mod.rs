//! Document storage backed by any S3-compatible object store.

mod object_storage;

pub use object_storage::{document_key, ObjectStorage, StoredObject};
