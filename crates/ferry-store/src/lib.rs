//! # ferry-store
//!
//! Reference [`ferry_core::ContentStore`] implementations for the ferry
//! migration engine: an in-memory store for tests and a directory-persisted
//! store for the CLI, plus the filesystem asset backend both share.

pub mod backend;
pub mod file;
pub mod memory;

pub use backend::{compute_content_hash, FilesystemBackend, StorageBackend};
pub use file::FileStore;
pub use memory::MemoryStore;
