use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::{
    Result,
    attributes::Attributes,
    block::DataBlock,
    locator::normalize_path,
    metadata::DatasetAttributes,
    reader::{N5Read, N5Reader},
    storage::N5Backend,
    version::Version,
};

/// Wraps an [`N5Reader`] with an LRU cache of the blocks of one dataset.
///
/// Absent blocks are cached as well. Reads of other paths go straight to the reader.
/// Through [`N5Read`] it stands in for the reader it wraps.
pub struct N5CacheReader<B> {
    reader: N5Reader<B>,
    dataset: String,
    blocks: Mutex<LruCache<Vec<i64>, Option<DataBlock>>>,
}

impl<B: N5Backend> N5CacheReader<B> {
    pub fn wrap(reader: N5Reader<B>, dataset: &str, blocks_capacity: NonZeroUsize) -> Self {
        Self {
            reader,
            dataset: normalize_path(dataset),
            blocks: Mutex::new(LruCache::new(blocks_capacity)),
        }
    }

    pub fn reader(&self) -> &N5Reader<B> {
        &self.reader
    }

    pub fn into_inner(self) -> N5Reader<B> {
        self.reader
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Number of grid positions currently cached.
    pub fn cached_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    pub async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<DataBlock>> {
        if normalize_path(path) != self.dataset {
            return self.reader.read_block(path, attributes, grid_position).await;
        }

        let cached = self.blocks.lock().get(&grid_position).cloned();
        if let Some(block) = cached {
            log::trace!("block cache hit for {grid_position:?} in {:?}", self.dataset);
            return Ok(block);
        }

        let block = self
            .reader
            .read_block(path, attributes, grid_position.clone())
            .await?;
        self.blocks.lock().put(grid_position, block.clone());
        Ok(block)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<B: N5Backend> N5Read for N5CacheReader<B> {
    async fn get_version(&self) -> Result<Version> {
        self.reader.get_version().await
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.reader.exists(path).await
    }

    async fn dataset_exists(&self, path: &str) -> Result<bool> {
        self.reader.dataset_exists(path).await
    }

    async fn list_attributes(&self, path: &str) -> Result<Attributes> {
        self.reader.list_attributes(path).await
    }

    async fn get_dataset_attributes(&self, path: &str) -> Result<DatasetAttributes> {
        self.reader.get_dataset_attributes(path).await
    }

    async fn read_block(
        &self,
        path: &str,
        attributes: &DatasetAttributes,
        grid_position: Vec<i64>,
    ) -> Result<Option<DataBlock>> {
        N5CacheReader::read_block(self, path, attributes, grid_position).await
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.reader.list(path).await
    }
}
