use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    BackendError, Error, Result,
    locator::{attributes_path, normalize_path},
    storage::N5Backend,
};

/// Name of the per-node metadata object.
pub const ATTRIBUTES_FILE: &str = "attributes.json";

/// Ordered attributes of a single node.
pub type Attributes = serde_json::Map<String, Value>;

/// Reads the `attributes.json` of exactly one node.
///
/// Attributes of ancestor groups are never merged in.
/// Resolved sets may be kept in a path-keyed LRU cache;
/// containers are treated as immutable for the lifetime of the resolver.
pub struct AttributeResolver {
    cache: Option<Mutex<LruCache<String, Attributes>>>,
}

impl AttributeResolver {
    /// A capacity of 0 disables caching.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(cache_capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub async fn resolve<B: N5Backend + ?Sized>(
        &self,
        backend: &B,
        path: &str,
    ) -> Result<Attributes> {
        let path = normalize_path(path);
        let cached = self
            .cache
            .as_ref()
            .and_then(|cache| cache.lock().get(&path).cloned());
        if let Some(attrs) = cached {
            log::trace!("attribute cache hit for {path:?}");
            return Ok(attrs);
        }

        let attrs_path = attributes_path(&path);
        log::trace!("fetching {attrs_path:?}");
        let text = match backend.fetch_text(&attrs_path).await {
            Ok(text) => text,
            Err(BackendError::InvalidText(e)) => {
                return Err(Error::Format {
                    path: attrs_path,
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(Error::backend(attrs_path, e)),
        };
        let attrs = match text {
            Some(text) => parse_attributes(&text).map_err(|e| e.at(&attrs_path))?,
            None => {
                log::debug!("no {ATTRIBUTES_FILE} at {path:?}");
                Attributes::new()
            }
        };

        if let Some(cache) = &self.cache {
            cache.lock().put(path, attrs.clone());
        }
        Ok(attrs)
    }
}

impl Default for AttributeResolver {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Parse the text of an `attributes.json`; the root must be an object.
pub fn parse_attributes(text: &str) -> Result<Attributes, crate::FormatError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(crate::FormatError::new(format!(
            "attributes must be a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(crate::FormatError::new(format!("malformed JSON: {e}"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
