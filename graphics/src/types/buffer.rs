//! Buffer types.

use bitflags::bitflags;

/// Map the whole buffer starting at the given offset.
pub const MAP_FULL_BUFFER: usize = usize::MAX;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 0;
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 1;
        /// Buffer holds indirect draw arguments.
        const INDIRECT_DRAW = 1 << 2;
        /// Buffer holds indirect dispatch arguments.
        const INDIRECT_DISPATCH = 1 << 3;
        /// Buffer can back a uniform block.
        const UNIFORM_BLOCK = 1 << 4;
        /// Buffer can back a read/write uniform buffer.
        const UNIFORM_BUFFER = 1 << 5;
        /// Buffer can be sampled as a texture buffer.
        const TEXTURE = 1 << 6;
        /// Buffer can be used as an image buffer.
        const IMAGE = 1 << 7;
        /// Buffer can be copied from.
        const COPY_FROM = 1 << 8;
        /// Buffer can be copied to.
        const COPY_TO = 1 << 9;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// How a mapped buffer range is accessed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferMapFlags: u32 {
        /// Read data from the buffer.
        const READ = 1 << 0;
        /// Write data to the buffer.
        const WRITE = 1 << 1;
        /// Orphan the previous contents.
        const ORPHAN = 1 << 2;
        /// Keep the buffer mapped while it is used for drawing.
        const PERSISTENT = 1 << 3;
    }
}

/// Level of buffer mapping a backend supports.
///
/// Each level includes the features of the previous ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BufferMapSupport {
    /// Buffers cannot be mapped.
    None,
    /// Only whole buffers can be mapped; ranges are emulated by offsetting.
    Full,
    /// Arbitrary ranges can be mapped.
    Range,
    /// Buffers can stay mapped while in use.
    #[default]
    Persistent,
}

/// Range of a buffer that was mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferMapping {
    /// Start of the range handed to the backend.
    pub backend_offset: usize,
    /// Size of the range handed to the backend, or [`MAP_FULL_BUFFER`].
    pub backend_size: usize,
    /// Offset of the requested data within the backend range.
    pub data_offset: usize,
}

/// Whether `offset..offset + size` lies within a buffer of `buffer_size` bytes.
pub fn is_buffer_range_valid(offset: usize, size: usize, buffer_size: usize) -> bool {
    offset
        .checked_add(size)
        .is_some_and(|end| end <= buffer_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_range() {
        assert!(is_buffer_range_valid(0, 16, 16));
        assert!(is_buffer_range_valid(16, 0, 16));
        assert!(!is_buffer_range_valid(8, 9, 16));
        assert!(!is_buffer_range_valid(usize::MAX, 2, 16));
    }

    #[test]
    fn test_map_support_ordering() {
        assert!(BufferMapSupport::Persistent > BufferMapSupport::Range);
        assert!(BufferMapSupport::Full > BufferMapSupport::None);
    }
}
