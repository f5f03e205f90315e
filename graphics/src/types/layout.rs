//! Texture memory layout and surface addressing.
//!
//! Textures are laid out mip level by mip level. Within a mip level, layers
//! follow each other, and within a layer the six faces of a cube follow each
//! other. Array textures keep the same layer count for every mip level, while
//! 3D textures halve their depth with each level, so addressing a 3D texture
//! depends on the mip level being addressed.

use super::{CubeFace, INVALID_OFFSET, INVALID_SURFACE, TextureDim, TextureInfo};

/// Maximum number of mip levels for a texture of the given dimensions.
///
/// A dimension of 0 contributes no levels. Pass a depth of 0 (or 1) for
/// anything other than 3D textures.
pub fn max_mipmap_levels(width: u32, height: u32, depth: u32) -> u32 {
    let bit_length = |n: u32| u32::BITS - n.leading_zeros();
    bit_length(width).max(bit_length(height)).max(bit_length(depth))
}

/// One level of the mip chain walked by the layout functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MipLevel {
    /// Layers in this level, not counting cube faces.
    depth: u32,
    /// Bytes taken by a single surface of this level.
    surface_size: usize,
}

/// Walk the mip chain of a texture, starting at level 0.
fn mip_chain(info: &TextureInfo) -> impl Iterator<Item = MipLevel> + '_ {
    let (block_x, block_y) = info.format.block_dimensions();
    let (min_x, min_y) = info.format.min_dimensions();
    let format_size = info.format.size() as usize;
    let depth = info.depth.max(1);

    (0..info.clamped_mip_levels()).map(move |level| {
        let width = (info.width >> level).max(1);
        let height = (info.height >> level).max(1);
        let blocks_x = width.max(min_x).div_ceil(block_x) as usize;
        let blocks_y = height.max(min_y).div_ceil(block_y) as usize;
        let depth = match info.dimension {
            TextureDim::Dim3D => (depth >> level).max(1),
            _ => depth,
        };
        MipLevel {
            depth,
            surface_size: blocks_x * blocks_y * format_size,
        }
    })
}

impl TextureInfo {
    /// Depth that takes part in the mip level count.
    pub fn mip_depth(&self) -> u32 {
        match self.dimension {
            TextureDim::Dim3D => self.depth,
            _ => 1,
        }
    }

    /// Mip level count clamped to `1..=max_mipmap_levels`.
    pub fn clamped_mip_levels(&self) -> u32 {
        let depth = match self.dimension {
            TextureDim::Dim3D => self.depth.max(1),
            _ => 1,
        };
        let max_levels = max_mipmap_levels(self.width, self.height, depth);
        self.mip_levels.min(max_levels).max(1)
    }

    /// Width and height of a mip level in texels.
    pub fn mip_extent(&self, mip_level: u32) -> (u32, u32) {
        (
            self.width.checked_shr(mip_level).unwrap_or(0).max(1),
            self.height.checked_shr(mip_level).unwrap_or(0).max(1),
        )
    }

    /// Number of addressable layers of a mip level, counting cube faces.
    pub fn mip_layers(&self, mip_level: u32) -> u32 {
        let layers = self.depth.max(1);
        match self.dimension {
            TextureDim::Dim3D => layers.checked_shr(mip_level).unwrap_or(0).max(1),
            TextureDim::Cube => layers.saturating_mul(6),
            _ => layers,
        }
    }

    /// Total size of the texture in bytes, including every mip level, layer,
    /// face and sample.
    pub fn size(&self) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }

        let size: usize = mip_chain(self)
            .map(|level| level.surface_size * level.depth as usize)
            .sum();
        size * self.samples.max(1) as usize * self.dimension.faces() as usize
    }

    /// Number of individually addressable surfaces.
    pub fn surface_count(&self) -> u32 {
        let faces = self.dimension.faces();
        match self.dimension {
            TextureDim::Dim3D => mip_chain(self).map(|level| level.depth * faces).sum(),
            _ => self.clamped_mip_levels() * self.depth.max(1) * faces,
        }
    }

    /// Index of a surface, or [`INVALID_SURFACE`] if it lies outside the
    /// texture. Only cube maps may be addressed with a face.
    pub fn surface_index(&self, face: Option<CubeFace>, depth_index: u32, mip_index: u32) -> u32 {
        let depth = self.depth.max(1);
        let mip_levels = self.clamped_mip_levels();
        if depth_index >= depth
            || mip_index >= mip_levels
            || (self.dimension != TextureDim::Cube && face.is_some())
        {
            return INVALID_SURFACE;
        }

        let faces = self.dimension.faces();
        if self.dimension == TextureDim::Dim3D {
            let mut index = 0u32;
            for (mip, level) in mip_chain(self).enumerate() {
                if (mip as u32) < mip_index {
                    index = match level.depth.checked_mul(faces).and_then(|n| index.checked_add(n)) {
                        Some(index) => index,
                        None => return INVALID_SURFACE,
                    };
                    continue;
                }
                if depth_index >= level.depth {
                    return INVALID_SURFACE;
                }
                return index.checked_add(depth_index).unwrap_or(INVALID_SURFACE);
            }
            return INVALID_SURFACE;
        }

        mip_index
            .checked_mul(depth)
            .and_then(|n| n.checked_add(depth_index))
            .and_then(|n| n.checked_mul(faces))
            .and_then(|n| n.checked_add(CubeFace::index(face)))
            .unwrap_or(INVALID_SURFACE)
    }

    /// Byte offset of a surface from the start of the texture, or
    /// [`INVALID_OFFSET`] if it lies outside the texture.
    pub fn surface_offset(&self, face: Option<CubeFace>, depth_index: u32, mip_index: u32) -> usize {
        if self.width == 0 || self.height == 0 {
            return INVALID_OFFSET;
        }
        if depth_index >= self.depth.max(1) || mip_index >= self.clamped_mip_levels() {
            return INVALID_OFFSET;
        }

        let faces = self.dimension.faces() as usize;
        let mut offset = 0;
        for (mip, level) in mip_chain(self).enumerate() {
            if (mip as u32) < mip_index {
                offset += level.surface_size * level.depth as usize * faces;
                continue;
            }
            if depth_index >= level.depth {
                return INVALID_OFFSET;
            }
            let layer = depth_index as usize * faces + CubeFace::index(face) as usize;
            return offset + level.surface_size * layer;
        }
        INVALID_OFFSET
    }

    /// Byte offset of a layer, counting cube faces as layers, or
    /// [`INVALID_OFFSET`] if it lies outside the texture.
    ///
    /// Bounds are checked against the layer count of the base level.
    pub fn layer_offset(&self, layer_index: u32, mip_index: u32) -> usize {
        if self.width == 0 || self.height == 0 {
            return INVALID_OFFSET;
        }

        let faces = self.dimension.faces();
        let layers = self.depth.max(1).saturating_mul(faces);
        if layer_index >= layers || mip_index >= self.clamped_mip_levels() {
            return INVALID_OFFSET;
        }

        let mut offset = 0;
        for (mip, level) in mip_chain(self).enumerate() {
            if (mip as u32) < mip_index {
                offset += level.surface_size * (level.depth * faces) as usize;
                continue;
            }
            return offset + level.surface_size * layer_index as usize;
        }
        INVALID_OFFSET
    }
}
