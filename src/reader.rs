use serde_json::Value;

use crate::{
    Error, FormatError, Result,
    attributes::{AttributeResolver, Attributes},
    block::DataBlock,
    codec::decode_block,
    config::ReaderConfig,
    locator::{attributes_path, block_path, normalize_path},
    metadata::{DatasetAttributes, missing_dataset_keys},
    storage::{N5Backend, NodeKind},
    version::{VERSION_ATTRIBUTE_KEY, Version},
};

/// The kind of node at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Group,
    Dataset,
    Absent,
}

/// Read-only access to an N5 container through an [`N5Backend`].
///
/// All operations are independent; any number may be in flight at once.
pub struct N5Reader<B> {
    backend: B,
    config: ReaderConfig,
    attributes: AttributeResolver,
}

impl<B: N5Backend> N5Reader<B> {
    /// Create a reader without touching the backend.
    pub fn new(backend: B, config: ReaderConfig) -> Self {
        let attributes = AttributeResolver::new(config.attribute_cache_capacity());
        Self {
            backend,
            config,
            attributes,
        }
    }

    /// Create a reader with the default configuration, refusing incompatible containers.
    pub async fn open(backend: B) -> Result<Self> {
        Self::open_with_config(backend, ReaderConfig::default()).await
    }

    pub async fn open_with_config(backend: B, config: ReaderConfig) -> Result<Self> {
        let reader = Self::new(backend, config);
        if reader.config.check_version() {
            let version = reader.get_version().await?;
            version.check_compatible(reader.config.supported_version())?;
            log::debug!("opened N5 container version {version}");
        }
        Ok(reader)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Version of the container, from the root's `n5` attribute.
    ///
    /// A container without one is taken to be the oldest version
    /// with the supported major version.
    pub async fn get_version(&self) -> Result<Version> {
        let attrs = self.list_attributes("").await?;
        match attrs.get(VERSION_ATTRIBUTE_KEY) {
            None => {
                let version = Version::oldest_compatible(self.config.supported_version());
                log::debug!("no {VERSION_ATTRIBUTE_KEY:?} attribute at root, assuming {version}");
                Ok(version)
            }
            Some(Value::String(s)) => Version::parse(s).map_err(|e| e.at(attributes_path(""))),
            Some(v) => Err(FormatError::new(format!(
                "{VERSION_ATTRIBUTE_KEY:?} must be a string, got {v}"
            ))
            .at(attributes_path(""))),
        }
    }

    /// Whether a group or dataset exists at `path`.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.classify(path).await? != NodeKind::Absent)
    }

    pub async fn path_kind(&self, path: &str) -> Result<PathKind> {
        match self.classify(path).await? {
            NodeKind::Absent => Ok(PathKind::Absent),
            NodeKind::Group => Ok(PathKind::Group),
            NodeKind::DatasetCandidate => {
                let attrs = self.list_attributes(path).await?;
                match DatasetAttributes::from_attributes(&attrs) {
                    Ok(Some(_)) => Ok(PathKind::Dataset),
                    Ok(None) => Ok(PathKind::Group),
                    Err(e) => Err(e.at(attributes_path(path))),
                }
            }
        }
    }

    /// Whether `path` holds well-formed dataset attributes.
    ///
    /// Absent paths, groups and malformed metadata all give `false`;
    /// only backend failures are errors.
    pub async fn dataset_exists(&self, path: &str) -> Result<bool> {
        match self.get_dataset_attributes(path).await {
            Ok(_) => Ok(true),
            Err(e @ Error::Backend { .. }) => Err(e),
            Err(e) => {
                log::debug!("{path:?} is not a dataset: {e}");
                Ok(false)
            }
        }
    }

    /// All attributes of the node at `path`, in file order.
    pub async fn list_attributes(&self, path: &str) -> Result<Attributes> {
        self.attributes.resolve(&self.backend, path).await
    }

    pub async fn get_dataset_attributes(&self, path: &str) -> Result<DatasetAttributes> {
        let attrs = self.list_attributes(path).await?;
        DatasetAttributes::from_attributes(&attrs)
            .map_err(|e| e.at(attributes_path(path)))?
            .ok_or_else(|| Error::NotADataset {
                path: normalize_path(path),
                missing: missing_dataset_keys(&attrs),
            })
    }

    /// Read one block of the dataset at `path`.
    ///
    /// Returns `Ok(None)` if no block is stored at `grid_position`,
    /// including positions outside the dataset's grid.
    /// A position with the wrong number of axes is a format error.
    pub async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<DataBlock>> {
        let block_path = locate_block(path, attributes, &grid_position)?;
        log::trace!("fetching block {block_path:?}");
        let bytes = self
            .backend
            .fetch_bytes(&block_path)
            .await
            .map_err(|e| Error::backend(&block_path, e))?;
        let Some(bytes) = bytes else {
            log::debug!("no block at {block_path:?}");
            return Ok(None);
        };
        decode_block(&bytes, attributes, grid_position)
            .map(Some)
            .map_err(|e| e.at(block_path))
    }

    /// Like [`N5Reader::read_block`], also returning the block's etag if the backend has one.
    pub async fn read_block_with_etag(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<(DataBlock, Option<String>)>> {
        let block_path = locate_block(path, attributes, &grid_position)?;
        log::trace!("fetching block {block_path:?} with etag");
        let fetched = self
            .backend
            .fetch_bytes_with_etag(&block_path)
            .await
            .map_err(|e| Error::backend(&block_path, e))?;
        let Some((bytes, etag)) = fetched else {
            log::debug!("no block at {block_path:?}");
            return Ok(None);
        };
        let block =
            decode_block(&bytes, attributes, grid_position).map_err(|e| e.at(block_path))?;
        Ok(Some((block, etag)))
    }

    /// Etag of a stored block, without decoding it.
    ///
    /// `Ok(None)` if the block is absent or the backend has no etags.
    pub async fn block_etag(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: &[i64],
    ) -> Result<Option<String>> {
        let block_path = locate_block(path, attributes, grid_position)?;
        self.backend
            .etag(&block_path)
            .await
            .map_err(|e| Error::backend(block_path, e))
    }

    /// Names of the groups and datasets directly below `path`.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.backend
            .list(path)
            .await
            .map_err(|e| Error::backend(normalize_path(path), e))
    }

    /// Backend path of a block.
    pub fn block_path(&self, path: &str, grid_position: &[i64]) -> String {
        block_path(path, grid_position)
    }

    async fn classify(&self, path: &str) -> Result<NodeKind> {
        self.backend
            .classify(path)
            .await
            .map_err(|e| Error::backend(normalize_path(path), e))
    }
}

fn locate_block(
    path: &str,
    attributes: &DatasetAttributes,
    grid_position: &[i64],
) -> Result<String> {
    if grid_position.len() != attributes.ndim() {
        return Err(FormatError::new(format!(
            "grid position has {} axes, dataset has {}",
            grid_position.len(),
            attributes.ndim()
        ))
        .at(normalize_path(path)));
    }
    Ok(block_path(path, grid_position))
}

/// The read operations shared by [`N5Reader`] and [`N5CacheReader`](crate::N5CacheReader).
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait N5Read: Send + Sync {
    async fn get_version(&self) -> Result<Version>;

    async fn exists(&self, path: &str) -> Result<bool>;

    async fn dataset_exists(&self, path: &str) -> Result<bool>;

    async fn list_attributes(&self, path: &str) -> Result<Attributes>;

    async fn get_dataset_attributes(&self, path: &str) -> Result<DatasetAttributes>;

    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<DataBlock>>;

    async fn list(&self, path: &str) -> Result<Vec<String>>;
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<B: N5Backend> N5Read for N5Reader<B> {
    async fn get_version(&self) -> Result<Version> {
        N5Reader::get_version(self).await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        N5Reader::exists(self, path).await
    }

    async fn dataset_exists(&self, path: &str) -> Result<bool> {
        N5Reader::dataset_exists(self, path).await
    }

    async fn list_attributes(&self, path: &str) -> Result<Attributes> {
        N5Reader::list_attributes(self, path).await
    }

    async fn get_dataset_attributes(&self, path: &str) -> Result<DatasetAttributes> {
        N5Reader::get_dataset_attributes(self, path).await
    }

    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<DataBlock>> {
        N5Reader::read_block(self, path, attributes, grid_position).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        N5Reader::list(self, path).await
    }
}
