use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use parking_lot::RwLock;

use super::{N5Backend, NodeKind, content_etag};
use crate::{
    BackendError,
    locator::{attributes_path, normalize_path},
};

/// An in-memory container, keyed by normalized object path.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, value: impl Into<Bytes>) {
        self.objects.write().insert(normalize_path(path), value.into());
    }

    pub fn insert_json(&self, path: &str, value: &serde_json::Value) {
        self.insert(path, value.to_string());
    }

    pub fn remove(&self, path: &str) -> Option<Bytes> {
        self.objects.write().remove(&normalize_path(path))
    }

    /// Keys strictly below `path`, relative to it.
    fn descendants(&self, path: &str) -> Vec<String> {
        let path = normalize_path(path);
        let objects = self.objects.read();
        if path.is_empty() {
            return objects.keys().cloned().collect();
        }
        let prefix = format!("{path}/");
        objects
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
            .map(|k| k[prefix.len()..].to_owned())
            .collect()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl N5Backend for MemoryBackend {
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Bytes>, BackendError> {
        Ok(self.objects.read().get(&normalize_path(path)).cloned())
    }

    async fn classify(&self, path: &str) -> Result<NodeKind, BackendError> {
        if self.objects.read().contains_key(&attributes_path(path)) {
            Ok(NodeKind::DatasetCandidate)
        } else if self.descendants(path).is_empty() {
            Ok(NodeKind::Absent)
        } else {
            Ok(NodeKind::Group)
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, BackendError> {
        let children: BTreeSet<String> = self
            .descendants(path)
            .into_iter()
            .filter_map(|rel| rel.split_once('/').map(|(child, _)| child.to_owned()))
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn etag(&self, path: &str) -> Result<Option<String>, BackendError> {
        let objects = self.objects.read();
        Ok(objects.get(&normalize_path(path)).map(|b| content_etag(b)))
    }

    async fn fetch_bytes_with_etag(
        &self,
        path: &str,
    ) -> Result<Option<(Bytes, Option<String>)>, BackendError> {
        let objects = self.objects.read();
        Ok(objects
            .get(&normalize_path(path))
            .map(|b| (b.clone(), Some(content_etag(b)))))
    }
}
