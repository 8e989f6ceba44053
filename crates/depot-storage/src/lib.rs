//! Depot Storage Library
//!
//! Storage abstraction for uploaded files plus local filesystem and S3 implementations.
//!
//! # Storage key format
//!
//! Keys are content addressed: `original/{sha1[0..2]}/{sha1}.{ext}`. The two character
//! shard keeps directory listings small on local disk. Key generation lives in the
//! `keys` module so every backend lays files out the same way.
//!
//! # URLs
//!
//! `store` returns the URL recorded on the upload. `resolve` only accepts URLs that the
//! backend itself produced; anything else (another backend, a bucket that was migrated
//! away from, a path escaping the base directory) is reported as `NotFound`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use depot_core::StorageBackend;
pub use factory::create_storage;
pub use keys::storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Resolved, Storage, StorageError, StorageResult};
