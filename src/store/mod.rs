//! Persistence: document/chunk metadata store and blob storage for
//! file-backed sources.

mod documents;
mod object;

pub use documents::DocumentStore;
pub use object::{FsObjectStore, ObjectStore};

pub(crate) use object::object_key;
