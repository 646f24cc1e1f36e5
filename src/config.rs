use crate::version::{SUPPORTED_VERSION, Version};

/// Options for an [`N5Reader`](crate::N5Reader).
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    supported_version: Version,
    attribute_cache_capacity: usize,
    check_version: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            supported_version: SUPPORTED_VERSION,
            attribute_cache_capacity: 0,
            check_version: true,
        }
    }
}

impl ReaderConfig {
    /// The version containers are checked against; only its major version must match.
    #[must_use]
    pub fn with_supported_version(mut self, version: Version) -> Self {
        self.supported_version = version;
        self
    }

    /// Keep up to `capacity` resolved attribute sets, keyed by path. 0 disables the cache.
    #[must_use]
    pub fn with_attribute_cache_capacity(mut self, capacity: usize) -> Self {
        self.attribute_cache_capacity = capacity;
        self
    }

    /// Whether [`N5Reader::open`](crate::N5Reader::open) checks the container version.
    #[must_use]
    pub fn with_check_version(mut self, check_version: bool) -> Self {
        self.check_version = check_version;
        self
    }

    pub fn supported_version(&self) -> &Version {
        &self.supported_version
    }

    pub fn attribute_cache_capacity(&self) -> usize {
        self.attribute_cache_capacity
    }

    pub fn check_version(&self) -> bool {
        self.check_version
    }
}
