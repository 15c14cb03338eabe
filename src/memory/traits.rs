//! Abstraction over the process-wide memory store.

use async_trait::async_trait;

use crate::error::Result;

/// A process-wide string→string map persisted across runs.
///
/// Implementations must flush on every mutation so that the durable copy
/// never lags the in-process view by more than one mutation.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store or overwrite the value at `key`.
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value at `key`, if present.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Returns `true` if it was present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List all keys currently stored, in no particular order.
    async fn list(&self) -> Result<Vec<String>>;
}
