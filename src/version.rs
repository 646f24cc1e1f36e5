use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::{Error, error::FormatError};

/// Attribute key holding the container version on the root node.
pub const VERSION_ATTRIBUTE_KEY: &str = "n5";

/// N5 specification version which this crate reads.
pub const SUPPORTED_VERSION: Version = Version::new(2, 0, 2);

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)([^0-9].*)?$").expect("valid")
});

/// An N5 specification version, `major.minor.patch` with an optional suffix.
///
/// ```
/// # use n5_reader::Version;
/// let v: Version = "2.0.3-SNAPSHOT".parse().unwrap();
/// assert_eq!((v.major(), v.minor(), v.patch()), (2, 0, 3));
/// assert_eq!(v.suffix(), Some("-SNAPSHOT"));
/// assert_eq!(v.to_string(), "2.0.3-SNAPSHOT");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    suffix: Option<String>,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Parse `"<major>.<minor>.<patch>"` followed by an optional non-numeric suffix.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let invalid = || FormatError::new(format!("invalid version string {text:?}"));

        let caps = VERSION_PATTERN.captures(text).ok_or_else(invalid)?;
        let component = |idx: usize| -> Result<u32, FormatError> {
            caps.get(idx)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(invalid)
        };
        let version = Self::new(component(1)?, component(2)?, component(3)?);
        Ok(match caps.get(4) {
            Some(suffix) => version.with_suffix(suffix.as_str()),
            None => version,
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Component-wise ordering; the suffix does not take part.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    /// Whether a container written at `self` is readable by a reader supporting `supported`.
    ///
    /// Only the major version must match; newer minor and patch versions are tolerated.
    pub fn is_compatible(&self, supported: &Version) -> bool {
        self.major == supported.major
    }

    /// Like [`Version::is_compatible`], surfacing [`Error::VersionMismatch`] on failure.
    pub fn check_compatible(&self, supported: &Version) -> crate::Result<()> {
        if !self.is_compatible(supported) {
            return Err(Error::VersionMismatch {
                found: self.clone(),
                supported: supported.clone(),
            });
        }
        if self.cmp_precedence(supported) == Ordering::Greater {
            log::warn!("container version {self} is newer than supported version {supported}");
        }
        Ok(())
    }

    /// The oldest version sharing `supported`'s major version.
    pub(crate) fn oldest_compatible(supported: &Version) -> Self {
        Self::new(supported.major, 0, 0)
    }
}

impl Default for Version {
    fn default() -> Self {
        SUPPORTED_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(suffix) = &self.suffix {
            f.write_str(suffix)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
