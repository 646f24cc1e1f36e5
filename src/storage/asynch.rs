use bytes::Bytes;
use zarrs::storage::{AsyncListableStorageTraits, AsyncReadableStorageTraits};

use super::{N5Backend, NodeKind, child_names, content_etag, store_key, store_prefix};
use crate::{BackendError, locator::attributes_path};

/// An [`N5Backend`] over an asynchronous zarrs store, such as an object store.
pub struct AsyncStoreBackend<S> {
    inner: S,
}

impl<S> AsyncStoreBackend<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<S> N5Backend for AsyncStoreBackend<S>
where
    S: AsyncReadableStorageTraits + AsyncListableStorageTraits + Send + Sync,
{
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Bytes>, BackendError> {
        let key = store_key(path)?;
        Ok(self.inner.get(&key).await?)
    }

    async fn classify(&self, path: &str) -> Result<NodeKind, BackendError> {
        let key = store_key(&attributes_path(path))?;
        if self.inner.size_key(&key).await?.is_some() {
            return Ok(NodeKind::DatasetCandidate);
        }
        let prefix = store_prefix(path)?;
        let listing = self.inner.list_dir(&prefix).await?;
        if listing.keys().is_empty() && listing.prefixes().is_empty() {
            Ok(NodeKind::Absent)
        } else {
            Ok(NodeKind::Group)
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let prefix = store_prefix(path)?;
        let listing = self.inner.list_dir(&prefix).await?;
        Ok(child_names(&prefix, listing.prefixes()))
    }

    async fn etag(&self, path: &str) -> Result<Option<String>, BackendError> {
        let key = store_key(path)?;
        Ok(self.inner.get(&key).await?.map(|b| content_etag(&b)))
    }

    async fn fetch_bytes_with_etag(
        &self,
        path: &str,
    ) -> Result<Option<(Bytes, Option<String>)>, BackendError> {
        let key = store_key(path)?;
        Ok(self.inner.get(&key).await?.map(|b| {
            let etag = content_etag(&b);
            (b, Some(etag))
        }))
    }
}
