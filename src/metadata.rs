use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{attributes::Attributes, error::FormatError};

pub const DIMENSIONS_KEY: &str = "dimensions";
pub const BLOCK_SIZE_KEY: &str = "blockSize";
pub const DATA_TYPE_KEY: &str = "dataType";
pub const COMPRESSION_KEY: &str = "compression";

/// Keys which must all be present on a node for it to be a dataset.
pub const DATASET_KEYS: [&str; 4] = [DIMENSIONS_KEY, BLOCK_SIZE_KEY, DATA_TYPE_KEY, COMPRESSION_KEY];

/// Element type of an N5 dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::Int8,
        DataType::Uint8,
        DataType::Int16,
        DataType::Uint16,
        DataType::Int32,
        DataType::Uint32,
        DataType::Int64,
        DataType::Uint64,
        DataType::Float32,
        DataType::Float64,
    ];

    /// Name as written in `attributes.json`.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::Uint8 => "uint8",
            DataType::Int16 => "int16",
            DataType::Uint16 => "uint16",
            DataType::Int32 => "int32",
            DataType::Uint32 => "uint32",
            DataType::Int64 => "int64",
            DataType::Uint64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Width of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Uint64 | DataType::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = FormatError;

    /// Case-sensitive; only the ten N5 names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dt| dt.name() == s)
            .ok_or_else(|| FormatError::new(format!("unsupported data type: {s:?}")))
    }
}

/// N5 block compression configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Copy)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum N5Compression {
    /// Uncompressed.
    #[default]
    Raw,
    #[serde(rename_all = "camelCase")]
    Bzip2 {
        /// Default 9. Must be in the range 1..=9.
        #[serde(default = "default_bzip2_block_size")]
        block_size: u8,
    },
    #[serde(rename_all = "camelCase")]
    Gzip {
        /// Default -1, meaning "implementation default" (usually 6).
        #[serde(default = "default_gzip_level")]
        level: i8,
        /// Zlib framing instead of gzip framing.
        #[serde(default)]
        use_zlib: bool,
    },
    #[serde(rename_all = "camelCase")]
    Lz4 {
        /// Default 65536. Must be a positive integer.
        #[serde(default = "default_lz4_block_size")]
        block_size: u32,
    },
    Xz {
        /// Default 6.
        #[serde(default = "default_xz_preset")]
        preset: u32,
    },
    Zstd {
        /// Default 0, meaning the zstd default level.
        #[serde(default)]
        level: i32,
    },
    // TODO https://github.com/saalfeldlab/n5-blosc
}

fn default_bzip2_block_size() -> u8 {
    9
}

fn default_gzip_level() -> i8 {
    -1
}

fn default_lz4_block_size() -> u32 {
    65536
}

fn default_xz_preset() -> u32 {
    6
}

impl N5Compression {
    /// The `type` field of the compression descriptor.
    pub fn type_name(&self) -> &'static str {
        match self {
            N5Compression::Raw => "raw",
            N5Compression::Bzip2 { .. } => "bzip2",
            N5Compression::Gzip { .. } => "gzip",
            N5Compression::Lz4 { .. } => "lz4",
            N5Compression::Xz { .. } => "xz",
            N5Compression::Zstd { .. } => "zstd",
        }
    }

    /// Every field of the descriptor other than `type`, with defaults filled in.
    pub fn params(&self) -> serde_json::Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.remove("type");
        map
    }

    /// The full descriptor: `type` plus [`N5Compression::params`].
    pub fn descriptor(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("type".to_string(), Value::from(self.type_name()));
        map.extend(self.params());
        map
    }

    /// Check parameter ranges which the serde defaults cannot express.
    pub fn validate(&self) -> Result<(), FormatError> {
        match *self {
            N5Compression::Bzip2 { block_size } if !(1..=9).contains(&block_size) => Err(
                FormatError::new(format!("invalid bzip2 block size {block_size}")),
            ),
            N5Compression::Gzip { level, .. } if !(-1..=9).contains(&level) => Err(
                FormatError::new(format!("invalid gzip compression level {level}")),
            ),
            N5Compression::Lz4 { block_size: 0 } => {
                Err(FormatError::new("lz4 block size must be positive"))
            }
            _ => Ok(()),
        }
    }

    fn from_value(value: &Value) -> Result<Self, FormatError> {
        if !value.is_object() {
            return Err(FormatError::new(format!(
                "{COMPRESSION_KEY} must be an object, got {value}"
            )));
        }
        let compression: Self = serde_json::from_value(value.clone())
            .map_err(|e| FormatError::new(format!("invalid {COMPRESSION_KEY}: {e}")))?;
        compression.validate()?;
        Ok(compression)
    }
}

/// The dataset-defining subset of a node's attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    dimensions: Vec<u64>,
    block_size: Vec<u32>,
    data_type: DataType,
    #[serde(skip)]
    compression: N5Compression,
    /// The `compression` object as given, unknown fields and omitted defaults included.
    #[serde(rename = "compression")]
    compression_descriptor: Attributes,
}

impl DatasetAttributes {
    /// Checks that the axes agree, every extent is positive and the compression is valid.
    pub fn new(
        dimensions: Vec<u64>,
        block_size: Vec<u32>,
        data_type: DataType,
        compression: N5Compression,
    ) -> Result<Self, FormatError> {
        let descriptor = compression.descriptor();
        Self::with_descriptor(dimensions, block_size, data_type, compression, descriptor)
    }

    fn with_descriptor(
        dimensions: Vec<u64>,
        block_size: Vec<u32>,
        data_type: DataType,
        compression: N5Compression,
        compression_descriptor: Attributes,
    ) -> Result<Self, FormatError> {
        if dimensions.is_empty() {
            return Err(FormatError::new(format!("{DIMENSIONS_KEY} must not be empty")));
        }
        if dimensions.len() != block_size.len() {
            return Err(FormatError::new(format!(
                "{DIMENSIONS_KEY} has {} axes but {BLOCK_SIZE_KEY} has {}",
                dimensions.len(),
                block_size.len()
            )));
        }
        if let Some(axis) = dimensions.iter().position(|&d| d == 0) {
            return Err(FormatError::new(format!(
                "{DIMENSIONS_KEY}[{axis}] must be positive"
            )));
        }
        if let Some(axis) = block_size.iter().position(|&b| b == 0) {
            return Err(FormatError::new(format!(
                "{BLOCK_SIZE_KEY}[{axis}] must be positive"
            )));
        }
        compression.validate()?;
        Ok(Self {
            dimensions,
            block_size,
            data_type,
            compression,
            compression_descriptor,
        })
    }

    /// Build from a node's attributes.
    ///
    /// Returns `Ok(None)` if any dataset key is missing, i.e. the node is not a dataset.
    /// Other keys are ignored.
    pub fn from_attributes(attributes: &Attributes) -> Result<Option<Self>, FormatError> {
        let (Some(dimensions), Some(block_size), Some(data_type), Some(compression)) = (
            attributes.get(DIMENSIONS_KEY),
            attributes.get(BLOCK_SIZE_KEY),
            attributes.get(DATA_TYPE_KEY),
            attributes.get(COMPRESSION_KEY),
        ) else {
            return Ok(None);
        };

        let dimensions = positive_integers(DIMENSIONS_KEY, dimensions)?;
        let block_size = positive_integers(BLOCK_SIZE_KEY, block_size)?
            .into_iter()
            .enumerate()
            .map(|(axis, b)| {
                u32::try_from(b).map_err(|_| {
                    FormatError::new(format!("{BLOCK_SIZE_KEY}[{axis}] = {b} is too large"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let data_type = match data_type {
            Value::String(s) => s.parse()?,
            v => {
                return Err(FormatError::new(format!(
                    "{DATA_TYPE_KEY} must be a string, got {v}"
                )));
            }
        };
        let descriptor = match compression {
            Value::Object(map) => map.clone(),
            _ => Attributes::new(),
        };
        let compression = N5Compression::from_value(compression)?;

        Self::with_descriptor(dimensions, block_size, data_type, compression, descriptor).map(Some)
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    pub fn block_size(&self) -> &[u32] {
        &self.block_size
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn compression(&self) -> &N5Compression {
        &self.compression
    }

    /// The `compression` object exactly as it appeared in the attributes.
    pub fn compression_descriptor(&self) -> &Attributes {
        &self.compression_descriptor
    }

    /// Fields of the `compression` object other than `type`, as written.
    ///
    /// Unlike [`N5Compression::params`], omitted defaults are not filled in.
    pub fn compression_params(&self) -> Attributes {
        let mut params = self.compression_descriptor.clone();
        params.remove("type");
        params
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of blocks along each axis.
    pub fn grid_size(&self) -> Vec<u64> {
        self.dimensions
            .iter()
            .zip(&self.block_size)
            .map(|(&d, &b)| d.div_ceil(u64::from(b)))
            .collect()
    }

    /// Total number of elements in the dataset.
    pub fn num_elements(&self) -> u64 {
        self.dimensions.iter().product()
    }

    /// Number of elements in a full block.
    pub fn block_num_elements(&self) -> u64 {
        self.block_size.iter().map(|&b| u64::from(b)).product()
    }

    /// The four dataset keys as they appeared in `attributes.json`.
    pub fn to_attributes(&self) -> Attributes {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Attributes::new(),
        }
    }
}

/// Whether the attributes carry every dataset key.
pub fn is_dataset(attributes: &Attributes) -> bool {
    missing_dataset_keys(attributes).is_empty()
}

pub fn missing_dataset_keys(attributes: &Attributes) -> Vec<&'static str> {
    DATASET_KEYS
        .into_iter()
        .filter(|k| !attributes.contains_key(*k))
        .collect()
}

fn positive_integers(key: &str, value: &Value) -> Result<Vec<u64>, FormatError> {
    let Value::Array(items) = value else {
        return Err(FormatError::new(format!("{key} must be an array, got {value}")));
    };
    items
        .iter()
        .enumerate()
        .map(|(axis, item)| match item {
            Value::Number(n) => n.as_u64().filter(|&n| n > 0).ok_or_else(|| {
                FormatError::new(format!("{key}[{axis}] must be a positive integer, got {n}"))
            }),
            v => Err(FormatError::new(format!(
                "{key}[{axis}] must be a positive integer, got {v}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("test attributes should be an object"),
        }
    }

    fn volume() -> Value {
        json!({
            "dimensions": [64, 64, 64],
            "blockSize": [32, 32, 32],
            "dataType": "uint8",
            "compression": {"type": "gzip", "level": 5, "useZlib": false},
            "resolution": [4.0, 4.0, 40.0],
        })
    }

    #[test]
    fn builds_from_attributes() {
        let da = DatasetAttributes::from_attributes(&attrs(volume()))
            .unwrap()
            .unwrap();
        assert_eq!(da.dimensions(), &[64, 64, 64]);
        assert_eq!(da.block_size(), &[32, 32, 32]);
        assert_eq!(da.data_type(), DataType::Uint8);
        assert_eq!(
            da.compression(),
            &N5Compression::Gzip {
                level: 5,
                use_zlib: false
            }
        );
        assert_eq!(da.grid_size(), vec![2, 2, 2]);
        assert_eq!(da.num_elements(), 64 * 64 * 64);
        assert_eq!(da.block_num_elements(), 32 * 32 * 32);
    }

    #[test]
    fn round_trips_dataset_keys() {
        let input = attrs(volume());
        let da = DatasetAttributes::from_attributes(&input).unwrap().unwrap();
        let output = da.to_attributes();
        for key in DATASET_KEYS {
            assert_eq!(input.get(key), output.get(key), "{key}");
        }
        assert!(!output.contains_key("resolution"));
    }

    #[test]
    fn round_trips_sparse_compression_descriptors() {
        let descriptors = [
            json!({"type": "gzip"}),
            json!({"type": "xz"}),
            json!({"type": "bzip2", "blockSize": 4, "comment": "kept"}),
        ];
        for descriptor in descriptors {
            let mut input = attrs(volume());
            input.insert(COMPRESSION_KEY.to_string(), descriptor.clone());
            let da = DatasetAttributes::from_attributes(&input).unwrap().unwrap();
            let output = da.to_attributes();
            for key in DATASET_KEYS {
                assert_eq!(input.get(key), output.get(key), "{key} of {descriptor}");
            }
            assert_eq!(
                Value::Object(da.compression_descriptor().clone()),
                descriptor
            );
        }
    }

    #[test]
    fn compression_params_are_as_written() {
        let mut input = attrs(volume());
        input.insert(COMPRESSION_KEY.to_string(), json!({"type": "gzip"}));
        let da = DatasetAttributes::from_attributes(&input).unwrap().unwrap();
        assert!(da.compression_params().is_empty());
        assert_eq!(da.compression().params().get("level"), Some(&json!(-1)));
    }

    #[test]
    fn new_fills_in_descriptor_and_validates() {
        let da = DatasetAttributes::new(
            vec![4],
            vec![2],
            DataType::Int8,
            N5Compression::Xz { preset: 6 },
        )
        .unwrap();
        assert_eq!(
            da.to_attributes().get(COMPRESSION_KEY),
            Some(&json!({"type": "xz", "preset": 6}))
        );

        let invalid = N5Compression::Gzip {
            level: -3,
            use_zlib: false,
        };
        assert!(DatasetAttributes::new(vec![4], vec![2], DataType::Int8, invalid).is_err());
    }

    #[test]
    fn missing_key_is_not_a_dataset() {
        let mut a = attrs(volume());
        a.remove(DATA_TYPE_KEY);
        assert_eq!(DatasetAttributes::from_attributes(&a).unwrap(), None);
        assert_eq!(missing_dataset_keys(&a), vec![DATA_TYPE_KEY]);
        assert!(!is_dataset(&a));
    }

    #[test]
    fn malformed_values_are_format_errors() {
        let cases = [
            (DIMENSIONS_KEY, json!([64, 64])),
            (DIMENSIONS_KEY, json!([])),
            (DIMENSIONS_KEY, json!([64, 0, 64])),
            (DIMENSIONS_KEY, json!([64, -1, 64])),
            (DIMENSIONS_KEY, json!("64,64,64")),
            (BLOCK_SIZE_KEY, json!([32, 32, 1.5])),
            (BLOCK_SIZE_KEY, json!([32, 32, 5_000_000_000u64])),
            (DATA_TYPE_KEY, json!("UINT8")),
            (DATA_TYPE_KEY, json!("complex64")),
            (DATA_TYPE_KEY, json!(8)),
            (COMPRESSION_KEY, json!({"type": "snappy"})),
            (COMPRESSION_KEY, json!("gzip")),
            (COMPRESSION_KEY, json!({"type": "gzip", "level": 12})),
            (COMPRESSION_KEY, json!({"type": "bzip2", "blockSize": 0})),
        ];
        for (key, value) in cases {
            let mut a = attrs(volume());
            a.insert(key.to_string(), value.clone());
            assert!(
                DatasetAttributes::from_attributes(&a).is_err(),
                "{key} = {value} should be rejected"
            );
        }
    }

    #[test]
    fn compression_defaults() {
        let c = N5Compression::from_value(&json!({"type": "gzip"})).unwrap();
        assert_eq!(
            c,
            N5Compression::Gzip {
                level: -1,
                use_zlib: false
            }
        );
        assert_eq!(c.type_name(), "gzip");
        assert_eq!(c.params().get("level"), Some(&json!(-1)));

        let c = N5Compression::from_value(&json!({"type": "bzip2"})).unwrap();
        assert_eq!(c, N5Compression::Bzip2 { block_size: 9 });
        assert_eq!(c.params().get("blockSize"), Some(&json!(9)));

        let c = N5Compression::from_value(&json!({"type": "raw"})).unwrap();
        assert!(c.params().is_empty());
    }

    #[test]
    fn data_type_names_are_exact() {
        for dt in DataType::ALL {
            assert_eq!(dt.name().parse::<DataType>().unwrap(), dt);
            assert_eq!(serde_json::to_value(dt).unwrap(), json!(dt.name()));
        }
        assert!("Float32".parse::<DataType>().is_err());
    }
}
