//! Storage abstraction.
//!
//! Provides a single interface over S3 (and S3-compatible endpoints) and the
//! local filesystem. Every provider is rooted at a URL; all paths passed to
//! and returned from it are relative to that root.

mod local;
mod s3;
mod url_parser;

pub use local::LocalConfig;
pub use s3::S3Config;
pub use url_parser::BackendConfig;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::emit;
use crate::error::{IoSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{RequestStatus, StorageOperation, StorageRequest};

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// Storage provider that abstracts over the supported backends.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    ///
    /// Options carry credentials and backend settings explicitly; they are
    /// ignored by the local backend.
    pub async fn for_url_with_options(
        url: &str,
        options: &HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
        }
    }

    /// Canonical URL of the provider root.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// List every object under `prefix` (recursively).
    ///
    /// Returned paths are relative to the provider root and sorted. A prefix
    /// that does not exist lists as empty.
    pub async fn list_with_prefix(&self, prefix: &str) -> Result<Vec<Path>, StorageError> {
        let prefix = Path::from(prefix);
        let full_prefix = self.qualify_path(&prefix).into_owned();
        let key_part_count = self
            .config
            .key()
            .map(|key| key.parts().count())
            .unwrap_or_default();

        let start = Instant::now();
        let listed: Result<Vec<_>, _> = self
            .object_store
            .list(Some(&full_prefix))
            .try_collect()
            .await;

        emit!(StorageRequest {
            operation: StorageOperation::List,
            status: RequestStatus::from_result(&listed),
            duration: start.elapsed(),
        });

        let listed = match listed {
            Ok(listed) => listed,
            Err(object_store::Error::NotFound { .. }) => Vec::new(),
            Err(source) => return Err(StorageError::ObjectStore { source }),
        };

        // Strip the root prefix so callers get paths they can pass back to get/put.
        let mut paths: Vec<Path> = listed
            .into_iter()
            .map(|meta| meta.location.parts().skip(key_part_count).collect())
            .collect();
        paths.sort();

        debug!(
            root = %self.canonical_url,
            prefix = %prefix,
            count = paths.len(),
            "Listed objects"
        );

        Ok(paths)
    }

    /// Get the contents of a file.
    pub async fn get(&self, path: impl Into<Path>) -> Result<Bytes, StorageError> {
        let path = path.into();
        let start = Instant::now();
        let result = match self.object_store.get(&self.qualify_path(&path)).await {
            Ok(result) => result.bytes().await,
            Err(e) => Err(e),
        };

        emit!(StorageRequest {
            operation: StorageOperation::Get,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)
    }

    /// Put a payload to a path.
    pub async fn put_payload(&self, path: &Path, payload: PutPayload) -> Result<(), StorageError> {
        self.put_payload_with_opts(path, payload, PutOptions::default())
            .await
    }

    /// Put a Parquet file to a path with the correct content type.
    ///
    /// Local filesystem doesn't support attributes, so they are skipped there.
    pub async fn put_parquet(&self, path: &Path, payload: PutPayload) -> Result<(), StorageError> {
        if matches!(self.config, BackendConfig::Local(_)) {
            return self.put_payload(path, payload).await;
        }

        let opts = PutOptions {
            attributes: Attributes::from_iter([(
                Attribute::ContentType,
                AttributeValue::from("application/vnd.apache.parquet"),
            )]),
            ..Default::default()
        };
        self.put_payload_with_opts(path, payload, opts).await
    }

    async fn put_payload_with_opts(
        &self,
        path: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.put_opts(&path, payload, opts).await;

        emit!(StorageRequest {
            operation: StorageOperation::Put,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Delete a file at the given path.
    pub async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self.object_store.delete(&path).await;

        emit!(StorageRequest {
            operation: StorageOperation::Delete,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        match result {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(source) => Err(StorageError::ObjectStore { source }),
        }
    }

    /// Server-side rename (move).
    ///
    /// S3 implements this as copy + delete; the local backend uses
    /// `std::fs::rename` and creates missing parent directories.
    pub async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        let from = self.qualify_path(from);
        let to = self.qualify_path(to);
        let start = Instant::now();
        let result = self.object_store.rename(&from, &to).await;

        emit!(StorageRequest {
            operation: StorageOperation::Rename,
            status: RequestStatus::from_result(&result),
            duration: start.elapsed(),
        });

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }

    /// Atomically write content to a path using temp file + rename.
    ///
    /// If the write or rename fails, the original file (if any) is unchanged.
    pub async fn atomic_write(&self, path: &Path, content: Vec<u8>) -> Result<(), StorageError> {
        let temp_path = Path::from(format!("{path}.tmp"));
        self.put_payload(&temp_path, PutPayload::from(Bytes::from(content)))
            .await?;
        self.rename(&temp_path, path).await
    }

    /// Remove empty directories under `prefix`, including `prefix` itself.
    ///
    /// Object stores have no directories, so this only does work on the
    /// local backend, where renames and deletes leave empty ones behind.
    pub async fn prune_empty_dirs(&self, prefix: &str) -> Result<(), StorageError> {
        let BackendConfig::Local(config) = &self.config else {
            return Ok(());
        };

        let root = std::path::Path::new(&config.path).join(prefix);
        tokio::task::spawn_blocking(move || local::prune_empty_dirs(&root))
            .await
            .map_err(|e| StorageError::Io {
                source: std::io::Error::other(e),
            })?
            .context(IoSnafu)?;
        Ok(())
    }
}
