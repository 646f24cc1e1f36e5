//! Asynchronous, read-only access to N5 containers.
//!
//! An N5 container is a hierarchy of groups and datasets. Each node may carry an
//! `attributes.json`; a dataset's attributes describe an n-dimensional array which is
//! stored as independently compressed blocks, one object per grid position.
//!
//! [`N5Reader`] resolves attributes and decodes blocks from any [`N5Backend`]:
//! an in-memory [`MemoryBackend`], any zarrs store through [`StoreBackend`],
//! or a custom transport.

pub mod attributes;
pub mod block;
pub mod cache;
mod chunk;
pub mod codec;
pub mod config;
mod error;
pub mod locator;
pub mod metadata;
pub mod reader;
pub mod storage;
pub mod version;

pub use zarrs;

pub use attributes::{AttributeResolver, Attributes};
pub use block::{BlockData, DataBlock, N5Element};
pub use cache::N5CacheReader;
pub use config::ReaderConfig;
pub use error::{BackendError, Error, FormatError, Result};
pub use metadata::{DataType, DatasetAttributes, N5Compression};
pub use reader::{N5Read, N5Reader, PathKind};
#[cfg(feature = "async")]
pub use storage::AsyncStoreBackend;
pub use storage::{MemoryBackend, N5Backend, NodeKind, StoreBackend};
pub use version::Version;
