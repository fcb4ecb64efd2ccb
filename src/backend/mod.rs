//! Storage backend abstraction
//!
//! The transfer controller only needs two things from a store: put a named
//! object from a byte stream, and get a named object as a byte stream.
//! Everything else (authentication, URLs, folders) stays behind this trait.

pub mod yandex;

use async_trait::async_trait;
use tokio::io::AsyncRead;

pub use crate::error::BackendError;
pub use yandex::YandexDisk;

/// Owned byte stream handed across the backend boundary
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Remote object store used for uploads and downloads
#[async_trait]
pub trait Repository: Send + Sync {
	/// Store `source` under `name`, replacing an existing object when `overwrite` is set
	async fn upload(&self, name: &str, source: ByteSource, overwrite: bool) -> Result<(), BackendError>;

	/// Open the object stored under `name` for reading
	async fn download(&self, name: &str) -> Result<ByteSource, BackendError>;
}

// vim: ts=4
