use std::sync::Arc;

use bytes::Bytes;
use zarrs::storage::{ListableStorageTraits, ReadableStorageTraits, StoreKey, StorePrefix};

use crate::{
    BackendError,
    locator::{attributes_path, normalize_path},
};

#[cfg(feature = "async")]
mod asynch;
mod memory;

#[cfg(feature = "async")]
pub use asynch::AsyncStoreBackend;
pub use memory::MemoryBackend;

/// What a backend can tell about a path without interpreting its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The path exists but has no `attributes.json`.
    Group,
    /// The path has an `attributes.json`, which may or may not describe a dataset.
    DatasetCandidate,
    Absent,
}

/// Read access to the objects of an N5 container.
///
/// Paths are `/`-separated and relative to the container root.
/// An absent object is `Ok(None)`, never an error.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait N5Backend: Send + Sync {
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Bytes>, BackendError>;

    async fn fetch_text(&self, path: &str) -> Result<Option<String>, BackendError> {
        match self.fetch_bytes(path).await? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    /// The default suits transports which cannot list:
    /// a node exists exactly when its `attributes.json` does.
    async fn classify(&self, path: &str) -> Result<NodeKind, BackendError> {
        if self.fetch_bytes(&attributes_path(path)).await?.is_some() {
            Ok(NodeKind::DatasetCandidate)
        } else {
            Ok(NodeKind::Absent)
        }
    }

    /// Names of the direct children of a node.
    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        Err(BackendError::unsupported(format!("listing {path:?}")))
    }

    /// A token which changes whenever the object at `path` changes.
    ///
    /// `Ok(None)` if the object is absent or the backend has no such tokens.
    async fn etag(&self, _path: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    /// Fetch an object together with its [`etag`](N5Backend::etag).
    async fn fetch_bytes_with_etag(
        &self,
        path: &str,
    ) -> Result<Option<(Bytes, Option<String>)>, BackendError> {
        let Some(bytes) = self.fetch_bytes(path).await? else {
            return Ok(None);
        };
        let etag = self.etag(path).await?;
        Ok(Some((bytes, etag)))
    }
}

/// Entity tag derived from object content.
pub(crate) fn content_etag(bytes: &[u8]) -> String {
    format!("\"{:08x}-{:x}\"", crc32c::crc32c(bytes), bytes.len())
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<B: N5Backend + ?Sized> N5Backend for Arc<B> {
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Bytes>, BackendError> {
        (**self).fetch_bytes(path).await
    }

    async fn fetch_text(&self, path: &str) -> Result<Option<String>, BackendError> {
        (**self).fetch_text(path).await
    }

    async fn classify(&self, path: &str) -> Result<NodeKind, BackendError> {
        (**self).classify(path).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        (**self).list(path).await
    }

    async fn etag(&self, path: &str) -> Result<Option<String>, BackendError> {
        (**self).etag(path).await
    }

    async fn fetch_bytes_with_etag(
        &self,
        path: &str,
    ) -> Result<Option<(Bytes, Option<String>)>, BackendError> {
        (**self).fetch_bytes_with_etag(path).await
    }
}

/// An [`N5Backend`] over a synchronous zarrs store, such as a `FilesystemStore`.
///
/// zarrs stores expose no modification metadata, so etags are content checksums.
pub struct StoreBackend<S> {
    inner: S,
}

impl<S> StoreBackend<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

pub(crate) fn store_key(path: &str) -> Result<StoreKey, BackendError> {
    StoreKey::new(normalize_path(path)).map_err(BackendError::wrap)
}

pub(crate) fn store_prefix(path: &str) -> Result<StorePrefix, BackendError> {
    let path = normalize_path(path);
    if path.is_empty() {
        Ok(StorePrefix::root())
    } else {
        StorePrefix::new(format!("{path}/")).map_err(BackendError::wrap)
    }
}

/// Names of child prefixes directly below `prefix`.
pub(crate) fn child_names<'a>(
    prefix: &StorePrefix,
    children: impl IntoIterator<Item = &'a StorePrefix>,
) -> Vec<String> {
    children
        .into_iter()
        .filter_map(|child| {
            child
                .as_str()
                .strip_prefix(prefix.as_str())
                .map(|name| name.trim_end_matches('/').to_owned())
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<S> N5Backend for StoreBackend<S>
where
    S: ReadableStorageTraits + ListableStorageTraits + Send + Sync,
{
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Bytes>, BackendError> {
        Ok(self.inner.get(&store_key(path)?)?)
    }

    async fn classify(&self, path: &str) -> Result<NodeKind, BackendError> {
        if self.inner.size_key(&store_key(&attributes_path(path))?)?.is_some() {
            return Ok(NodeKind::DatasetCandidate);
        }
        let listing = self.inner.list_dir(&store_prefix(path)?)?;
        if listing.keys().is_empty() && listing.prefixes().is_empty() {
            Ok(NodeKind::Absent)
        } else {
            Ok(NodeKind::Group)
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let prefix = store_prefix(path)?;
        let listing = self.inner.list_dir(&prefix)?;
        Ok(child_names(&prefix, listing.prefixes()))
    }

    async fn etag(&self, path: &str) -> Result<Option<String>, BackendError> {
        let bytes = self.inner.get(&store_key(path)?)?;
        Ok(bytes.map(|b| content_etag(&b)))
    }

    async fn fetch_bytes_with_etag(
        &self,
        path: &str,
    ) -> Result<Option<(Bytes, Option<String>)>, BackendError> {
        let bytes = self.inner.get(&store_key(path)?)?;
        Ok(bytes.map(|b| {
            let etag = content_etag(&b);
            (b, Some(etag))
        }))
    }
}
