use crate::error::Result;
use async_trait::async_trait;

/// Bucket-and-key object storage the stages read from and write to.
/// `put` overwrites, which is what makes a job-scoped re-run idempotent.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

pub mod fs;
pub mod in_memory;

pub use fs::FsObjectStore;
pub use in_memory::InMemoryObjectStore;
