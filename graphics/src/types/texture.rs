//! Texture types and descriptors.

use bitflags::bitflags;

use super::TextureFormat;

/// Request the full mip chain when creating a texture.
pub const ALL_MIP_LEVELS: u32 = u32::MAX;

/// Use the renderer's surface sample count when creating an offscreen.
pub const DEFAULT_SAMPLES: u32 = u32::MAX;

/// Returned by [`TextureInfo::surface_index`] for surfaces outside the texture.
pub const INVALID_SURFACE: u32 = u32::MAX;

/// Returned by the offset functions for surfaces outside the texture.
pub const INVALID_OFFSET: usize = usize::MAX;

/// Dimension of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDim {
    /// One-dimensional texture, optionally an array.
    Dim1D,
    /// Two-dimensional texture, optionally an array.
    #[default]
    Dim2D,
    /// Volume texture. Depth halves with each mip level.
    Dim3D,
    /// Cube map, optionally an array of cubes.
    Cube,
}

impl TextureDim {
    /// Number of faces per layer.
    pub fn faces(&self) -> u32 {
        match self {
            Self::Cube => 6,
            _ => 1,
        }
    }
}

/// Face of a cube map, in layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl CubeFace {
    /// Index of an optional face within a cube layer. No face maps to 0.
    pub fn index(face: Option<CubeFace>) -> u32 {
        face.map_or(0, |f| f as u32)
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled in a shader.
        const TEXTURE = 1 << 0;
        /// Texture can be used as a storage image.
        const IMAGE = 1 << 1;
        /// Texture can be read as a subpass input.
        const SUBPASS_INPUT = 1 << 2;
        /// Texture can be copied from.
        const COPY_FROM = 1 << 3;
        /// Texture can be copied to.
        const COPY_TO = 1 << 4;
        /// Hint that mip levels will be sampled individually.
        const ORIGINAL_MIP_LEVELS = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::TEXTURE
    }
}

bitflags! {
    /// Hints for how the memory of a resource is accessed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryHints: u32 {
        /// Memory is only ever touched by the GPU.
        const GPU_ONLY = 1 << 0;
        /// Contents are written once.
        const STATIC = 1 << 1;
        /// Contents are written occasionally.
        const DYNAMIC = 1 << 2;
        /// Contents are written every frame.
        const STREAM = 1 << 3;
        /// Contents are used for drawing.
        const DRAW = 1 << 4;
        /// Contents are read back on the CPU.
        const READ = 1 << 5;
        /// Memory stays mapped across frames.
        const PERSISTENT = 1 << 6;
        /// Mapped writes are visible without flushing.
        const COHERENT = 1 << 7;
        /// The CPU waits for the GPU before mapping.
        const SYNCHRONIZE = 1 << 8;
    }
}

/// Shape of a texture.
///
/// Purely descriptive; creation clamps `depth`, `mip_levels` and `samples`
/// to legal values and stores the clamped copy with the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureInfo {
    /// Pixel format.
    pub format: TextureFormat,
    /// Texture dimension.
    pub dimension: TextureDim,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, array layers otherwise. 0 means not an array.
    pub depth: u32,
    /// Number of mip levels, or [`ALL_MIP_LEVELS`].
    pub mip_levels: u32,
    /// Multisample count, or [`DEFAULT_SAMPLES`] for offscreens.
    pub samples: u32,
}

impl TextureInfo {
    /// Create a 2D texture description with a single mip level.
    pub fn new_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            dimension: TextureDim::Dim2D,
            width,
            height,
            depth: 0,
            mip_levels: 1,
            samples: 1,
        }
    }

    /// Create a 1D texture description.
    pub fn new_1d(format: TextureFormat, width: u32) -> Self {
        Self {
            dimension: TextureDim::Dim1D,
            ..Self::new_2d(format, width, 1)
        }
    }

    /// Create a 3D texture description.
    pub fn new_3d(format: TextureFormat, width: u32, height: u32, depth: u32) -> Self {
        Self {
            dimension: TextureDim::Dim3D,
            depth,
            ..Self::new_2d(format, width, height)
        }
    }

    /// Create a cube map description.
    pub fn new_cube(format: TextureFormat, size: u32) -> Self {
        Self {
            dimension: TextureDim::Cube,
            ..Self::new_2d(format, size, size)
        }
    }

    /// Set the depth or array layer count.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    /// Set the sample count.
    pub fn with_sample_count(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }
}

/// Position of a texel block within a texture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexturePosition {
    /// Cube face, only valid for cube maps.
    pub face: Option<CubeFace>,
    /// X coordinate in texels.
    pub x: u32,
    /// Y coordinate in texels.
    pub y: u32,
    /// Depth or array layer.
    pub depth: u32,
    /// Mip level.
    pub mip_level: u32,
}

impl TexturePosition {
    /// Position at a texel of a mip level.
    pub fn new(x: u32, y: u32, mip_level: u32) -> Self {
        Self {
            x,
            y,
            mip_level,
            ..Self::default()
        }
    }

    /// Set the depth or array layer.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set the cube face.
    pub fn with_face(mut self, face: CubeFace) -> Self {
        self.face = Some(face);
        self
    }

    /// Layer index counting cube faces as separate layers.
    pub fn layer(&self, dimension: TextureDim) -> u32 {
        match dimension {
            TextureDim::Cube => self.depth * 6 + CubeFace::index(self.face),
            _ => self.depth,
        }
    }
}

/// Region copied between two textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureCopyRegion {
    /// Start of the region in the source texture.
    pub src_position: TexturePosition,
    /// Start of the region in the destination texture.
    pub dst_position: TexturePosition,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Number of layers, with cube faces counted separately.
    pub layers: u32,
}

/// Region copied from a texture into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferTextureCopyRegion {
    /// Byte offset into the buffer.
    pub buffer_offset: usize,
    /// Row length of the buffer image in texels. 0 means tightly packed.
    pub buffer_width: u32,
    /// Height of the buffer image in texels. 0 means tightly packed.
    pub buffer_height: u32,
    /// Start of the region in the texture.
    pub texture_position: TexturePosition,
    /// Width in texels.
    pub texture_width: u32,
    /// Height in texels.
    pub texture_height: u32,
    /// Number of layers, with cube faces counted separately.
    pub layers: u32,
}
