//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, texture shape descriptions
//! and the texture layout algebra used throughout the graphics system.

mod buffer;
mod common;
mod format;
mod layout;
mod texture;

pub use buffer::{
    BufferMapFlags, BufferMapSupport, BufferMapping, BufferUsage, MAP_FULL_BUFFER,
    is_buffer_range_valid,
};
pub use common::{DrawIndexedRange, DrawRange, PrimitiveType};
pub use format::{FormatSupport, TextureFormat};
pub use layout::max_mipmap_levels;
pub use texture::{
    ALL_MIP_LEVELS, BufferTextureCopyRegion, CubeFace, DEFAULT_SAMPLES, INVALID_OFFSET,
    INVALID_SURFACE, MemoryHints, TextureCopyRegion, TextureDim, TextureInfo, TexturePosition,
    TextureUsage,
};
