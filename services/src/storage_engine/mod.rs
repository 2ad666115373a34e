// services/src/storage_engine/mod.rs

pub mod blob_store;
pub mod memory_store;
pub mod postgres_store;
pub mod record_store;

pub use blob_store::{BlobStore, DiskStore, MemoryBlobStore};
pub use memory_store::MemoryStore;
pub use postgres_store::PostgresStore;
pub use record_store::{FileFilter, RecordStore};
