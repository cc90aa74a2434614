//! Storage backends the retention engine lists and deletes through

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;

/// A namespace of stored backups.
///
/// Keys are relative to the namespace root and use `/` as separator.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// List every object key in the namespace
    async fn list(&self) -> Result<Vec<String>>;

    /// Remove one object
    async fn delete(&self, key: &str) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
