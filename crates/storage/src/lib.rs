//! Storage plumbing for SplitUp workers: a content-addressed local cache
//! of task graphs and weight bundles, and presigned-URL object transfers,
//! both behind a shared exponential-backoff retry helper.

pub mod artifact_store;
pub mod error;
pub mod id;
pub mod object_client;
pub mod retry;

pub use artifact_store::{ArtifactKind, ArtifactStore};
pub use error::StorageError;
pub use id::artifact_id;
pub use object_client::{
    ObjectClient, ObjectOperation, StorageConfig, DEFAULT_PRESIGN_EXPIRY_SECONDS,
};
pub use retry::{with_exponential_backoff, RetryPolicy};
