use crate::{error::FormatError, metadata::DatasetAttributes};

/// Parsed header of an N5 block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct N5ChunkHeader {
    pub(crate) mode: N5ChunkMode,
    /// Actual extent of the block along each axis.
    pub(crate) shape: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub(crate) enum N5ChunkMode {
    Default = 0,
    VarLen {
        num_el: u32,
    } = 1,
    Object = 2,
}

/// Big-endian field reader which reports the field it could not read.
struct HeaderCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl HeaderCursor<'_> {
    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N], FormatError> {
        let end = self.offset + N;
        let Some(slice) = self.bytes.get(self.offset..end) else {
            return Err(FormatError::new(format!(
                "block header truncated reading {field}: need {end} bytes, have {}",
                self.bytes.len()
            )));
        };
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        self.offset = end;
        Ok(buf)
    }

    fn u16(&mut self, field: &str) -> Result<u16, FormatError> {
        self.take(field).map(u16::from_be_bytes)
    }

    fn i32(&mut self, field: &str) -> Result<i32, FormatError> {
        self.take(field).map(i32::from_be_bytes)
    }
}

impl N5ChunkHeader {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = HeaderCursor { bytes, offset: 0 };

        let mode_num = cursor.u16("mode")?;
        let ndim = cursor.u16("numDimensions")?;
        let mut shape = Vec::with_capacity(ndim as usize);
        for axis in 0..ndim {
            let field = format!("size[{axis}]");
            let n = cursor.i32(&field)?;
            let n = u32::try_from(n)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| FormatError::new(format!("{field} = {n} must be positive")))?;
            shape.push(n);
        }

        let mode = match mode_num {
            0 => N5ChunkMode::Default,
            1 => {
                let n = cursor.i32("numElements")?;
                let num_el = u32::try_from(n).map_err(|_| {
                    FormatError::new(format!("numElements = {n} must not be negative"))
                })?;
                N5ChunkMode::VarLen { num_el }
            }
            2 => N5ChunkMode::Object,
            n => return Err(FormatError::new(format!("invalid N5 block mode {n}"))),
        };
        Ok(N5ChunkHeader { mode, shape })
    }

    pub(crate) fn data_offset(&self) -> usize {
        size_of::<u16>()  // mode discriminator
            + size_of::<u16>() // ndim
            + self.shape.len() * size_of::<u32>()  // shape
            + match self.mode {
                N5ChunkMode::VarLen { .. } => size_of::<u32>(),
                _ => 0,
            }
    }

    /// Check the header against the dataset it was read for.
    pub(crate) fn validate(&self, attributes: &DatasetAttributes) -> Result<(), FormatError> {
        if self.shape.len() != attributes.ndim() {
            return Err(FormatError::new(format!(
                "block header has numDimensions {}, dataset has {}",
                self.shape.len(),
                attributes.ndim()
            )));
        }
        for (axis, (&size, &block_size)) in self.shape.iter().zip(attributes.block_size()).enumerate()
        {
            if size > block_size {
                return Err(FormatError::new(format!(
                    "size[{axis}] = {size} exceeds blockSize[{axis}] = {block_size}"
                )));
            }
        }
        Ok(())
    }

    /// Number of elements the payload must hold.
    pub(crate) fn num_elements(&self) -> u64 {
        match self.mode {
            N5ChunkMode::VarLen { num_el } => u64::from(num_el),
            _ => self.shape.iter().map(|&n| u64::from(n)).product(),
        }
    }
}
