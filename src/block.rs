use crate::metadata::DataType;

/// Decoded elements of one block, as stored.
///
/// The first axis of the block's size varies fastest: element `(x, y)` of a block
/// with size `[w, h]` is at index `x + w * y`.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockData {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! from_be {
    ($bytes:expr, $ty:ty) => {
        $bytes
            .chunks_exact(size_of::<$ty>())
            .map(|c| {
                let mut buf = [0u8; size_of::<$ty>()];
                buf.copy_from_slice(c);
                <$ty>::from_be_bytes(buf)
            })
            .collect()
    };
}

impl BlockData {
    /// Reinterpret big-endian bytes as elements of `data_type`.
    ///
    /// Trailing bytes which do not fill a whole element are ignored;
    /// callers check the length beforehand.
    pub(crate) fn from_be_bytes(data_type: DataType, bytes: &[u8]) -> Self {
        match data_type {
            DataType::Int8 => BlockData::Int8(bytes.iter().map(|&b| b as i8).collect()),
            DataType::Uint8 => BlockData::Uint8(bytes.to_vec()),
            DataType::Int16 => BlockData::Int16(from_be!(bytes, i16)),
            DataType::Uint16 => BlockData::Uint16(from_be!(bytes, u16)),
            DataType::Int32 => BlockData::Int32(from_be!(bytes, i32)),
            DataType::Uint32 => BlockData::Uint32(from_be!(bytes, u32)),
            DataType::Int64 => BlockData::Int64(from_be!(bytes, i64)),
            DataType::Uint64 => BlockData::Uint64(from_be!(bytes, u64)),
            DataType::Float32 => BlockData::Float32(from_be!(bytes, f32)),
            DataType::Float64 => BlockData::Float64(from_be!(bytes, f64)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            BlockData::Int8(_) => DataType::Int8,
            BlockData::Uint8(_) => DataType::Uint8,
            BlockData::Int16(_) => DataType::Int16,
            BlockData::Uint16(_) => DataType::Uint16,
            BlockData::Int32(_) => DataType::Int32,
            BlockData::Uint32(_) => DataType::Uint32,
            BlockData::Int64(_) => DataType::Int64,
            BlockData::Uint64(_) => DataType::Uint64,
            BlockData::Float32(_) => DataType::Float32,
            BlockData::Float64(_) => DataType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BlockData::Int8(v) => v.len(),
            BlockData::Uint8(v) => v.len(),
            BlockData::Int16(v) => v.len(),
            BlockData::Uint16(v) => v.len(),
            BlockData::Int32(v) => v.len(),
            BlockData::Uint32(v) => v.len(),
            BlockData::Int64(v) => v.len(),
            BlockData::Uint64(v) => v.len(),
            BlockData::Float32(v) => v.len(),
            BlockData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rust element types corresponding to N5 data types.
pub trait N5Element: Sized + Copy + 'static {
    fn as_slice(data: &BlockData) -> Option<&[Self]>;

    fn into_vec(data: BlockData) -> Result<Vec<Self>, BlockData>;
}

macro_rules! n5_element {
    ($variant:ident, $ty:ty) => {
        impl N5Element for $ty {
            fn as_slice(data: &BlockData) -> Option<&[Self]> {
                match data {
                    BlockData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_vec(data: BlockData) -> Result<Vec<Self>, BlockData> {
                match data {
                    BlockData::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }

        impl From<Vec<$ty>> for BlockData {
            fn from(value: Vec<$ty>) -> Self {
                BlockData::$variant(value)
            }
        }
    };
}

n5_element!(Int8, i8);
n5_element!(Uint8, u8);
n5_element!(Int16, i16);
n5_element!(Uint16, u16);
n5_element!(Int32, i32);
n5_element!(Uint32, u32);
n5_element!(Int64, i64);
n5_element!(Uint64, u64);
n5_element!(Float32, f32);
n5_element!(Float64, f64);

/// One decoded block of a dataset.
///
/// Absent blocks are not represented; readers return `None` for them.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    size: Vec<u32>,
    grid_position: Vec<i64>,
    data: BlockData,
}

impl DataBlock {
    pub fn new(size: Vec<u32>, grid_position: Vec<i64>, data: BlockData) -> Self {
        Self {
            size,
            grid_position,
            data,
        }
    }

    /// Extent of this block along each axis; smaller than the block size at the grid boundary.
    pub fn size(&self) -> &[u32] {
        &self.size
    }

    pub fn grid_position(&self) -> &[i64] {
        &self.grid_position
    }

    pub fn num_elements(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn data(&self) -> &BlockData {
        &self.data
    }

    pub fn into_data(self) -> BlockData {
        self.data
    }

    /// The elements as `T`, if `T` matches the block's data type.
    pub fn as_slice<T: N5Element>(&self) -> Option<&[T]> {
        T::as_slice(&self.data)
    }

    /// Take the elements as `T`, handing the block back on a type mismatch.
    pub fn into_vec<T: N5Element>(self) -> Result<Vec<T>, Self> {
        let Self {
            size,
            grid_position,
            data,
        } = self;
        T::into_vec(data).map_err(|data| Self {
            size,
            grid_position,
            data,
        })
    }
}
