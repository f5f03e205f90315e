//! Pixel formats and per-format support queries.

use bitflags::bitflags;

/// Texture format enumeration.
///
/// Block-compressed formats store fixed-size blocks of texels; for every other
/// format the block is a single texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    // Standard formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    R8G8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    R8G8B8A8Unorm,
    /// 8-bit RGBA channels, sRGB.
    R8G8B8A8Srgb,
    /// 8-bit BGRA channels, unsigned normalized.
    B8G8R8A8Unorm,
    /// Packed 5-6-5 RGB.
    R5G6B5Unorm,
    /// Packed 10-10-10-2 RGBA.
    A2B10G10R10Unorm,
    /// 16-bit red channel, float.
    R16Float,
    /// 16-bit RGBA channels, float.
    R16G16B16A16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 32-bit RG channels, float.
    R32G32Float,
    /// 32-bit RGBA channels, float.
    R32G32B32A32Float,

    // Special formats
    /// Packed unsigned float 10-11-11.
    B10G11R11UFloat,
    /// Shared exponent RGB.
    E5B9G9R9UFloat,
    /// 16-bit depth.
    D16,
    /// 24-bit depth padded to 32 bits.
    X8D24,
    /// 32-bit float depth.
    D32Float,
    /// 8-bit stencil.
    S8,
    /// 16-bit depth with 8-bit stencil.
    D16S8,
    /// 24-bit depth with 8-bit stencil.
    D24S8,
    /// 32-bit float depth with 8-bit stencil.
    D32S8Float,

    // Block-compressed formats
    /// BC1 RGB, 4x4 blocks of 8 bytes.
    Bc1Rgb,
    /// BC1 RGBA, 4x4 blocks of 8 bytes.
    Bc1Rgba,
    /// BC2, 4x4 blocks of 16 bytes.
    Bc2,
    /// BC3, 4x4 blocks of 16 bytes.
    Bc3,
    /// BC4, 4x4 blocks of 8 bytes.
    Bc4,
    /// BC5, 4x4 blocks of 16 bytes.
    Bc5,
    /// BC6H, 4x4 blocks of 16 bytes.
    Bc6H,
    /// BC7, 4x4 blocks of 16 bytes.
    Bc7,
    /// ETC1 RGB.
    Etc1,
    /// ETC2 RGB.
    Etc2R8G8B8,
    /// ETC2 RGB with punch-through alpha.
    Etc2R8G8B8A1,
    /// ETC2 RGBA.
    Etc2R8G8B8A8,
    /// EAC single channel.
    EacR11,
    /// EAC two channel.
    EacR11G11,
    /// ASTC 4x4 blocks.
    Astc4x4,
    /// ASTC 5x4 blocks.
    Astc5x4,
    /// ASTC 5x5 blocks.
    Astc5x5,
    /// ASTC 6x5 blocks.
    Astc6x5,
    /// ASTC 6x6 blocks.
    Astc6x6,
    /// ASTC 8x5 blocks.
    Astc8x5,
    /// ASTC 8x6 blocks.
    Astc8x6,
    /// ASTC 8x8 blocks.
    Astc8x8,
    /// ASTC 10x5 blocks.
    Astc10x5,
    /// ASTC 10x6 blocks.
    Astc10x6,
    /// ASTC 10x8 blocks.
    Astc10x8,
    /// ASTC 10x10 blocks.
    Astc10x10,
    /// ASTC 12x10 blocks.
    Astc12x10,
    /// ASTC 12x12 blocks.
    Astc12x12,
    /// PVRTC1 RGB at 2 bits per pixel.
    Pvrtc1Rgb2Bpp,
    /// PVRTC1 RGBA at 2 bits per pixel.
    Pvrtc1Rgba2Bpp,
    /// PVRTC1 RGB at 4 bits per pixel.
    Pvrtc1Rgb4Bpp,
    /// PVRTC1 RGBA at 4 bits per pixel.
    Pvrtc1Rgba4Bpp,
    /// PVRTC2 RGBA at 2 bits per pixel.
    Pvrtc2Rgba2Bpp,
    /// PVRTC2 RGBA at 4 bits per pixel.
    Pvrtc2Rgba4Bpp,
}

impl TextureFormat {
    /// Size in bytes of one texel, or of one block for compressed formats.
    pub fn size(&self) -> u32 {
        match self {
            Self::R8Unorm | Self::S8 => 1,
            Self::R8G8Unorm | Self::R5G6B5Unorm | Self::R16Float | Self::D16 => 2,
            Self::D16S8 => 3,
            Self::R8G8B8A8Unorm
            | Self::R8G8B8A8Srgb
            | Self::B8G8R8A8Unorm
            | Self::A2B10G10R10Unorm
            | Self::R32Float
            | Self::R32Uint
            | Self::B10G11R11UFloat
            | Self::E5B9G9R9UFloat
            | Self::X8D24
            | Self::D32Float
            | Self::D24S8 => 4,
            Self::D32S8Float => 5,
            Self::R16G16B16A16Float | Self::R32G32Float => 8,
            Self::R32G32B32A32Float => 16,
            Self::Bc1Rgb
            | Self::Bc1Rgba
            | Self::Bc4
            | Self::Etc1
            | Self::Etc2R8G8B8
            | Self::Etc2R8G8B8A1
            | Self::EacR11 => 8,
            Self::Pvrtc1Rgb2Bpp
            | Self::Pvrtc1Rgba2Bpp
            | Self::Pvrtc1Rgb4Bpp
            | Self::Pvrtc1Rgba4Bpp
            | Self::Pvrtc2Rgba2Bpp
            | Self::Pvrtc2Rgba4Bpp => 8,
            // BC2/3/5/6H/7, ETC2 RGBA, EAC RG and every ASTC block.
            _ => 16,
        }
    }

    /// Block dimensions in texels. Uncompressed formats use 1x1 blocks.
    pub fn block_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Bc1Rgb
            | Self::Bc1Rgba
            | Self::Bc2
            | Self::Bc3
            | Self::Bc4
            | Self::Bc5
            | Self::Bc6H
            | Self::Bc7
            | Self::Etc1
            | Self::Etc2R8G8B8
            | Self::Etc2R8G8B8A1
            | Self::Etc2R8G8B8A8
            | Self::EacR11
            | Self::EacR11G11
            | Self::Astc4x4 => (4, 4),
            Self::Astc5x4 => (5, 4),
            Self::Astc5x5 => (5, 5),
            Self::Astc6x5 => (6, 5),
            Self::Astc6x6 => (6, 6),
            Self::Astc8x5 => (8, 5),
            Self::Astc8x6 => (8, 6),
            Self::Astc8x8 => (8, 8),
            Self::Astc10x5 => (10, 5),
            Self::Astc10x6 => (10, 6),
            Self::Astc10x8 => (10, 8),
            Self::Astc10x10 => (10, 10),
            Self::Astc12x10 => (12, 10),
            Self::Astc12x12 => (12, 12),
            Self::Pvrtc1Rgb2Bpp | Self::Pvrtc1Rgba2Bpp | Self::Pvrtc2Rgba2Bpp => (8, 4),
            Self::Pvrtc1Rgb4Bpp | Self::Pvrtc1Rgba4Bpp | Self::Pvrtc2Rgba4Bpp => (4, 4),
            _ => (1, 1),
        }
    }

    /// Minimum dimensions a single mip level occupies in memory.
    ///
    /// PVRTC needs at least two blocks in each direction; every other format
    /// needs a single block.
    pub fn min_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Pvrtc1Rgb2Bpp | Self::Pvrtc1Rgba2Bpp | Self::Pvrtc2Rgba2Bpp => (16, 8),
            Self::Pvrtc1Rgb4Bpp | Self::Pvrtc1Rgba4Bpp | Self::Pvrtc2Rgba4Bpp => (8, 8),
            _ => self.block_dimensions(),
        }
    }

    /// Returns true if this is a block-compressed format.
    pub fn is_compressed(&self) -> bool {
        self.block_dimensions() != (1, 1)
    }

    /// Returns true if this is a packed, depth or stencil format.
    pub fn is_special(&self) -> bool {
        matches!(self, Self::B10G11R11UFloat | Self::E5B9G9R9UFloat) || self.is_depth_stencil()
    }

    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::D16
                | Self::X8D24
                | Self::D32Float
                | Self::S8
                | Self::D16S8
                | Self::D24S8
                | Self::D32S8Float
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::S8 | Self::D16S8 | Self::D24S8 | Self::D32S8Float)
    }
}

bitflags! {
    /// What a backend can do with a given format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatSupport: u32 {
        /// Format can be used for sampled textures.
        const TEXTURE = 1 << 0;
        /// Format can be used for offscreen render targets.
        const OFFSCREEN = 1 << 1;
        /// Format can be used for texture buffers.
        const TEXTURE_BUFFER = 1 << 2;
        /// Format can be used for storage images.
        const IMAGE = 1 << 3;
        /// Format can be used for vertex attributes.
        const VERTEX = 1 << 4;
        /// Mipmaps can be generated on the GPU.
        const GENERATE_MIPMAPS = 1 << 5;
        /// Texture contents can be copied into a buffer.
        const COPY_TO_BUFFER = 1 << 6;
        /// Texture contents can be copied from a buffer.
        const COPY_FROM_BUFFER = 1 << 7;
    }
}
