use crate::version::Version;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Metadata or block bytes at `path` do not match the N5 format.
    #[error("invalid N5 data at {path:?}: {message}")]
    Format { path: String, message: String },
    #[error("{path:?} is not a dataset: missing {}", missing.join(", "))]
    NotADataset {
        path: String,
        missing: Vec<&'static str>,
    },
    #[error("unsupported N5 version {found}, this reader supports {supported}")]
    VersionMismatch { found: Version, supported: Version },
    #[error("backend failure at {path:?}")]
    Backend {
        path: String,
        #[source]
        source: BackendError,
    },
}

impl Error {
    pub fn backend(path: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            path: path.into(),
            source,
        }
    }

    /// Whether this error reports malformed data, as opposed to a missing dataset,
    /// an incompatible version or a storage fault.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}

/// A violated format expectation, not yet tied to a location in the container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FormatError(String);

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    /// Attach the path whose content was malformed.
    pub fn at(self, path: impl Into<String>) -> Error {
        Error::Format {
            path: path.into(),
            message: self.0,
        }
    }
}

/// Failure reported by a storage backend, distinct from an absent object.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("object is not valid UTF-8 text")]
    InvalidText(#[from] std::string::FromUtf8Error),
    #[error("unsupported backend operation: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Storage(#[from] zarrs::storage::StorageError),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    pub fn wrap(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}
