//! GPU texture resource.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::command_buffer::CommandBuffer;
use crate::error::{DestroyError, GraphicsError, reject};
use crate::profiling::{profile_plot, profile_scope};
use crate::resource_manager::ResourceManager;
use crate::types::{
    BufferTextureCopyRegion, BufferUsage, DEFAULT_SAMPLES, FormatSupport, MemoryHints,
    TextureCopyRegion, TextureDim, TextureInfo, TexturePosition, TextureUsage, is_buffer_range_valid,
    max_mipmap_levels,
};

use super::GfxBuffer;

/// A GPU texture resource.
///
/// Textures are created through [`Texture::create`] or
/// [`Texture::create_offscreen`] and destroyed explicitly with
/// [`Texture::destroy`]. The stored [`TextureInfo`] is the clamped description
/// the backend received.
///
/// # Example
///
/// ```ignore
/// let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 512, 512)
///     .with_mip_levels(ALL_MIP_LEVELS);
/// let texture = Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None)?;
/// assert_eq!(texture.info().mip_levels, 10);
/// ```
pub struct Texture {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    usage: TextureUsage,
    memory_hints: MemoryHints,
    info: TextureInfo,
    offscreen: bool,
    resolve: bool,
    memory_size: usize,
}

/// Validation shared by textures and offscreens, returning the clamped description.
fn validate_info(
    manager: &ResourceManager,
    usage: TextureUsage,
    memory_hints: MemoryHints,
    info: &TextureInfo,
    required_support: FormatSupport,
) -> Result<TextureInfo, GraphicsError> {
    if usage.is_empty() {
        return Err(reject!(InvalidArgument, "at least one texture usage flag must be set"));
    }
    if memory_hints.is_empty() {
        return Err(reject!(InvalidArgument, "at least one memory hint flag must be set"));
    }
    if info.width == 0 || (info.dimension != TextureDim::Dim1D && info.height == 0) {
        return Err(reject!(
            InvalidArgument,
            "texture dimensions {}x{} must be non-zero",
            info.width,
            info.height
        ));
    }

    let caps = manager.capabilities();
    match info.dimension {
        TextureDim::Dim3D => {
            if info.depth == 0 {
                return Err(reject!(InvalidArgument, "3D textures must have a non-zero depth"));
            }
            if info.depth > caps.max_texture_depth {
                return Err(reject!(
                    CapabilityExceeded,
                    "texture depth {} exceeds the maximum of {}",
                    info.depth,
                    caps.max_texture_depth
                ));
            }
        }
        _ => {
            if info.depth > caps.max_texture_array_levels {
                return Err(reject!(
                    CapabilityExceeded,
                    "texture array levels {} exceeds the maximum of {}",
                    info.depth,
                    caps.max_texture_array_levels
                ));
            }
        }
    }
    if info.dimension == TextureDim::Cube && info.depth > 0 && !caps.has_cube_arrays {
        return Err(reject!(CapabilityExceeded, "current target doesn't support cube map arrays"));
    }

    if !manager.format_support(info.format).contains(required_support) {
        return Err(reject!(
            CapabilityExceeded,
            "format {:?} not supported for {:?}",
            info.format,
            required_support
        ));
    }

    let max_levels = max_mipmap_levels(info.width, info.height, info.mip_depth());
    let mip_levels = info.mip_levels.min(max_levels).max(1);
    if !caps.has_arbitrary_mipmapping && mip_levels != 1 && mip_levels != max_levels {
        return Err(reject!(
            CapabilityExceeded,
            "current target can't specify arbitrary mipmap levels, only 1 or {}",
            max_levels
        ));
    }

    let height = match info.dimension {
        TextureDim::Dim1D => info.format.min_dimensions().1,
        _ => info.height,
    };
    if info.width > caps.max_texture_size || height > caps.max_texture_size {
        return Err(reject!(
            CapabilityExceeded,
            "texture dimensions {}x{} exceed the maximum of {}",
            info.width,
            height,
            caps.max_texture_size
        ));
    }

    let (block_x, block_y) = info.format.block_dimensions();
    let (min_width, min_height) = info.format.min_dimensions();
    if info.width % block_x != 0 || height % block_y != 0 {
        return Err(reject!(
            InvalidArgument,
            "texture dimensions {}x{} must be a multiple of the {}x{} block size of {:?}",
            info.width,
            height,
            block_x,
            block_y,
            info.format
        ));
    }
    if info.width < min_width || height < min_height {
        return Err(reject!(
            InvalidArgument,
            "texture dimensions {}x{} are below the {}x{} minimum of {:?}",
            info.width,
            height,
            min_width,
            min_height,
            info.format
        ));
    }

    Ok(TextureInfo {
        height,
        mip_levels,
        ..*info
    })
}

/// Check that a region lies within a texture and respects its block layout.
fn check_region(
    info: &TextureInfo,
    position: &TexturePosition,
    width: u32,
    height: u32,
    layers: u32,
) -> Result<(), GraphicsError> {
    let (block_x, block_y) = info.format.block_dimensions();
    if position.x % block_x != 0 || position.y % block_y != 0 {
        return Err(reject!(
            InvalidArgument,
            "texture position ({}, {}) must be a multiple of the {}x{} block size",
            position.x,
            position.y,
            block_x,
            block_y
        ));
    }
    if position.mip_level >= info.mip_levels {
        return Err(reject!(
            OutOfRange,
            "mip level {} is out of range for a texture with {} levels",
            position.mip_level,
            info.mip_levels
        ));
    }
    if position.face.is_some() && info.dimension != TextureDim::Cube {
        return Err(reject!(InvalidArgument, "only cube maps can be addressed by face"));
    }

    let (mip_width, mip_height) = info.mip_extent(position.mip_level);
    let mip_layers = info.mip_layers(position.mip_level);
    let end_x = u64::from(position.x) + u64::from(width);
    let end_y = u64::from(position.y) + u64::from(height);
    let end_layer = u64::from(position.layer(info.dimension)) + u64::from(layers);
    if end_x > u64::from(mip_width) || end_y > u64::from(mip_height) || end_layer > u64::from(mip_layers) {
        return Err(reject!(
            OutOfRange,
            "region {}x{}x{} at ({}, {}, layer {}) is out of range of mip level {} ({}x{}x{})",
            width,
            height,
            layers,
            position.x,
            position.y,
            position.layer(info.dimension),
            position.mip_level,
            mip_width,
            mip_height,
            mip_layers
        ));
    }

    let aligned_x = end_x % u64::from(block_x) == 0 || end_x == u64::from(mip_width);
    let aligned_y = end_y % u64::from(block_y) == 0 || end_y == u64::from(mip_height);
    if !aligned_x || !aligned_y {
        return Err(reject!(
            InvalidArgument,
            "texture region must end on a block boundary or the edge of the surface"
        ));
    }
    Ok(())
}

/// Size in bytes of a tightly packed region.
fn region_size(info: &TextureInfo, width: u32, height: u32, layers: u32) -> usize {
    let dimension = match info.dimension {
        TextureDim::Cube => TextureDim::Dim2D,
        dimension => dimension,
    };
    TextureInfo {
        format: info.format,
        dimension,
        width,
        height,
        depth: layers,
        mip_levels: 1,
        samples: 1,
    }
    .size()
}

fn check_same_manager(texture: &Texture, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
    if !Arc::ptr_eq(&texture.manager, command_buffer.manager()) {
        return Err(reject!(
            InvalidArgument,
            "texture and command buffer were created with different resource managers"
        ));
    }
    Ok(())
}

impl Texture {
    /// Create a texture, optionally with its initial contents.
    ///
    /// `data` must hold every mip level, layer and face in the layout described
    /// by [`TextureInfo::surface_offset`].
    pub fn create(
        manager: &Arc<ResourceManager>,
        usage: TextureUsage,
        memory_hints: MemoryHints,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<Self, GraphicsError> {
        profile_scope!("Texture::create");
        manager.require(BackendOperations::TEXTURE_LIFECYCLE, "texture creation")?;

        let mut info = validate_info(manager, usage, memory_hints, info, FormatSupport::TEXTURE)?;
        info.samples = info.samples.max(1);
        if info.samples > 1 {
            return Err(reject!(
                InvalidArgument,
                "only offscreens can be multisampled, requested {} samples",
                info.samples
            ));
        }

        let size = info.size();
        if let Some(data) = data {
            if data.len() != size {
                return Err(reject!(
                    InvalidArgument,
                    "texture data size {} doesn't match the expected size {}",
                    data.len(),
                    size
                ));
            }
        }

        manager.ensure_context()?;
        let handle = manager
            .backend()
            .create_texture(usage, memory_hints, &info, data)?;

        let texture = Self::register(manager, handle, usage, memory_hints, info, false, false, size);
        log::trace!(
            "Texture: created {} ({:?} {:?} {}x{}x{}, {} mips, {} bytes)",
            texture.id,
            info.dimension,
            info.format,
            info.width,
            info.height,
            info.depth,
            info.mip_levels,
            size
        );
        Ok(texture)
    }

    /// Create an offscreen that can be rendered to.
    ///
    /// A sample count of [`DEFAULT_SAMPLES`] uses the current surface sample
    /// count. With `resolve`, a multisampled offscreen is resolved into a
    /// single-sampled surface before it is sampled or read back.
    pub fn create_offscreen(
        manager: &Arc<ResourceManager>,
        usage: TextureUsage,
        memory_hints: MemoryHints,
        info: &TextureInfo,
        resolve: bool,
    ) -> Result<Self, GraphicsError> {
        profile_scope!("Texture::create_offscreen");
        manager.require(BackendOperations::TEXTURE_LIFECYCLE, "offscreen creation")?;

        let mut info = validate_info(manager, usage, memory_hints, info, FormatSupport::OFFSCREEN)?;
        let caps = manager.capabilities();
        if info.samples == DEFAULT_SAMPLES {
            info.samples = manager.surface_samples();
        }
        info.samples = info.samples.max(1).min(caps.max_surface_samples.max(1));
        let resolve = resolve && info.samples > 1;
        if !resolve && info.samples > caps.max_texture_samples {
            return Err(reject!(
                CapabilityExceeded,
                "offscreen samples {} exceeds the maximum of {} for textures that aren't resolved",
                info.samples,
                caps.max_texture_samples
            ));
        }

        let size = Self::offscreen_memory(&info, resolve);
        manager.ensure_context()?;
        let handle = manager
            .backend()
            .create_offscreen(usage, memory_hints, &info, resolve)?;

        let texture = Self::register(manager, handle, usage, memory_hints, info, true, resolve, size);
        log::trace!(
            "Texture: created offscreen {} ({:?} {}x{}, {} samples, resolve {}, {} bytes)",
            texture.id,
            info.format,
            info.width,
            info.height,
            info.samples,
            resolve,
            size
        );
        Ok(texture)
    }

    /// Memory taken by an offscreen, including its multisampled surface when resolving.
    fn offscreen_memory(info: &TextureInfo, resolve: bool) -> usize {
        if !resolve {
            return info.size();
        }
        let resolved = info.with_sample_count(1).size();
        let multisampled = TextureInfo {
            depth: 1,
            mip_levels: 1,
            ..*info
        }
        .size();
        resolved + multisampled
    }

    #[allow(clippy::too_many_arguments)]
    fn register(
        manager: &Arc<ResourceManager>,
        handle: BackendHandle,
        usage: TextureUsage,
        memory_hints: MemoryHints,
        info: TextureInfo,
        offscreen: bool,
        resolve: bool,
        memory_size: usize,
    ) -> Self {
        let counters = &manager.counters;
        counters.textures.fetch_add(1, Ordering::AcqRel);
        let total = counters.texture_memory.fetch_add(memory_size, Ordering::AcqRel) + memory_size;
        profile_plot!("texture_memory", total);

        Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            usage,
            memory_hints,
            info,
            offscreen,
            resolve,
            memory_size,
        }
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Unique identifier of the texture.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Backend handle of the texture.
    pub fn handle(&self) -> BackendHandle {
        self.handle
    }

    /// Get the clamped texture description.
    pub fn info(&self) -> &TextureInfo {
        &self.info
    }

    /// Get the usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Get the memory hints.
    pub fn memory_hints(&self) -> MemoryHints {
        self.memory_hints
    }

    /// Whether the texture is an offscreen.
    pub fn is_offscreen(&self) -> bool {
        self.offscreen
    }

    /// Whether the offscreen is resolved to a single-sampled surface.
    pub fn resolves(&self) -> bool {
        self.resolve
    }

    /// Memory counted for this texture by the resource manager.
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Copy data into a region of the texture.
    ///
    /// `layers` counts cube faces individually. `data` is tightly packed.
    pub fn copy_data(
        &self,
        command_buffer: &CommandBuffer,
        position: &TexturePosition,
        width: u32,
        height: u32,
        layers: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        profile_scope!("Texture::copy_data");
        self.manager
            .require(BackendOperations::TEXTURE_COPY_DATA, "texture data copying")?;
        check_same_manager(self, command_buffer)?;
        if !self.usage.contains(TextureUsage::COPY_TO) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data to a texture without the copy to usage flag"
            ));
        }

        check_region(&self.info, position, width, height, layers)?;
        let expected = region_size(&self.info, width, height, layers);
        if data.len() != expected {
            return Err(reject!(
                InvalidArgument,
                "texture data size {} doesn't match the expected size {}",
                data.len(),
                expected
            ));
        }
        command_buffer.require_frame_outside_render_pass("texture copying")?;

        self.manager.backend().copy_texture_data(
            command_buffer,
            self,
            position,
            width,
            height,
            layers,
            data,
        )?;
        log::trace!(
            "Texture: copied {} bytes into {} at mip {}",
            data.len(),
            self.id,
            position.mip_level
        );
        Ok(())
    }

    /// Copy typed data into a region of the texture.
    pub fn copy_data_typed<T: bytemuck::Pod>(
        &self,
        command_buffer: &CommandBuffer,
        position: &TexturePosition,
        width: u32,
        height: u32,
        layers: u32,
        data: &[T],
    ) -> Result<(), GraphicsError> {
        self.copy_data(
            command_buffer,
            position,
            width,
            height,
            layers,
            bytemuck::cast_slice(data),
        )
    }

    /// Copy regions from one texture to another.
    pub fn copy(
        command_buffer: &CommandBuffer,
        src: &Texture,
        dst: &Texture,
        regions: &[TextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        profile_scope!("Texture::copy");
        src.manager
            .require(BackendOperations::TEXTURE_COPY, "texture copying")?;
        if !Arc::ptr_eq(&src.manager, &dst.manager) {
            return Err(reject!(
                InvalidArgument,
                "textures were created with different resource managers"
            ));
        }
        check_same_manager(src, command_buffer)?;
        if src.info.format != dst.info.format {
            return Err(reject!(
                InvalidArgument,
                "textures must have the same format to copy, got {:?} and {:?}",
                src.info.format,
                dst.info.format
            ));
        }
        if !src
            .manager
            .backend()
            .texture_copy_supported(src.info.format, dst.info.format)
        {
            return Err(reject!(
                CapabilityExceeded,
                "texture copies aren't supported from {:?} to {:?}",
                src.info.format,
                dst.info.format
            ));
        }
        if !src.usage.contains(TextureUsage::COPY_FROM) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data from a texture without the copy from usage flag"
            ));
        }
        if !dst.usage.contains(TextureUsage::COPY_TO) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data to a texture without the copy to usage flag"
            ));
        }

        for region in regions {
            check_region(
                &src.info,
                &region.src_position,
                region.width,
                region.height,
                region.layers,
            )?;
            check_region(
                &dst.info,
                &region.dst_position,
                region.width,
                region.height,
                region.layers,
            )?;
        }
        command_buffer.require_frame_outside_render_pass("texture copying")?;

        src.manager
            .backend()
            .copy_texture(command_buffer, src, dst, regions)?;
        log::trace!(
            "Texture: copied {} regions from {} to {}",
            regions.len(),
            src.id,
            dst.id
        );
        Ok(())
    }

    /// Copy regions of the texture into a buffer.
    pub fn copy_to_buffer(
        &self,
        command_buffer: &CommandBuffer,
        buffer: &GfxBuffer,
        regions: &[BufferTextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        profile_scope!("Texture::copy_to_buffer");
        self.manager
            .require(BackendOperations::TEXTURE_COPY_TO_BUFFER, "texture to buffer copying")?;
        check_same_manager(self, command_buffer)?;
        if !Arc::ptr_eq(&self.manager, buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "texture and buffer were created with different resource managers"
            ));
        }
        if !self
            .manager
            .format_support(self.info.format)
            .contains(FormatSupport::COPY_TO_BUFFER)
        {
            return Err(reject!(
                CapabilityExceeded,
                "format {:?} can't be copied to buffers",
                self.info.format
            ));
        }
        if !self.usage.contains(TextureUsage::COPY_FROM) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data from a texture without the copy from usage flag"
            ));
        }
        if !buffer.usage().contains(BufferUsage::COPY_TO) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data to a buffer without the copy to usage flag"
            ));
        }

        let format_size = self.info.format.size() as usize;
        let (block_x, block_y) = self.info.format.block_dimensions();
        for region in regions {
            check_region(
                &self.info,
                &region.texture_position,
                region.texture_width,
                region.texture_height,
                region.layers,
            )?;
            if region.buffer_offset % format_size != 0 {
                return Err(reject!(
                    InvalidArgument,
                    "buffer offset {} must be a multiple of the format size {}",
                    region.buffer_offset,
                    format_size
                ));
            }

            let buffer_width = match region.buffer_width {
                0 => region.texture_width,
                width => width,
            };
            let buffer_height = match region.buffer_height {
                0 => region.texture_height,
                height => height,
            };
            if buffer_width < region.texture_width || buffer_height < region.texture_height {
                return Err(reject!(
                    InvalidArgument,
                    "buffer image {}x{} is smaller than the texture region {}x{}",
                    buffer_width,
                    buffer_height,
                    region.texture_width,
                    region.texture_height
                ));
            }

            let size = buffer_width.div_ceil(block_x) as usize
                * buffer_height.div_ceil(block_y) as usize
                * format_size
                * region.layers as usize;
            if !is_buffer_range_valid(region.buffer_offset, size, buffer.size()) {
                return Err(reject!(
                    OutOfRange,
                    "attempting to copy {} bytes at offset {} out of range of a {} byte buffer",
                    size,
                    region.buffer_offset,
                    buffer.size()
                ));
            }
        }
        command_buffer.require_frame_outside_render_pass("texture copying")?;

        self.manager
            .backend()
            .copy_texture_to_buffer(command_buffer, self, buffer, regions)?;
        log::trace!(
            "Texture: copied {} regions from {} to buffer {}",
            regions.len(),
            self.id,
            buffer.id()
        );
        Ok(())
    }

    /// Generate the mip chain from the first mip level.
    ///
    /// Succeeds without doing anything for textures with a single mip level.
    pub fn generate_mipmaps(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("Texture::generate_mipmaps");
        self.manager
            .require(BackendOperations::TEXTURE_GENERATE_MIPMAPS, "mipmap generation")?;
        check_same_manager(self, command_buffer)?;
        if !self
            .manager
            .format_support(self.info.format)
            .contains(FormatSupport::GENERATE_MIPMAPS)
        {
            return Err(reject!(
                CapabilityExceeded,
                "mipmaps can't be generated for format {:?}",
                self.info.format
            ));
        }
        if self.info.samples > 1 {
            return Err(reject!(
                InvalidArgument,
                "mipmaps can't be generated for multisampled textures"
            ));
        }
        if !self
            .usage
            .contains(TextureUsage::COPY_FROM | TextureUsage::COPY_TO)
        {
            return Err(reject!(
                InvalidArgument,
                "generating mipmaps requires both the copy from and copy to usage flags"
            ));
        }
        command_buffer.require_frame_outside_render_pass("mipmap generation")?;
        if self.info.mip_levels == 1 {
            return Ok(());
        }

        self.manager
            .backend()
            .generate_texture_mipmaps(command_buffer, self)?;
        log::trace!("Texture: generated {} mip levels for {}", self.info.mip_levels, self.id);
        Ok(())
    }

    /// Read back a region of a single surface.
    ///
    /// `out` must be exactly the tightly packed size of the region.
    pub fn get_data(
        &self,
        position: &TexturePosition,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<(), GraphicsError> {
        profile_scope!("Texture::get_data");
        self.manager
            .require(BackendOperations::TEXTURE_GET_DATA, "texture readback")?;
        if !self.usage.contains(TextureUsage::COPY_FROM) {
            return Err(reject!(
                InvalidArgument,
                "attempting to read data from a texture without the copy from usage flag"
            ));
        }
        if !self.memory_hints.contains(MemoryHints::READ) {
            return Err(reject!(
                InvalidArgument,
                "attempting to read data from a texture without the read memory hint"
            ));
        }
        if !self.offscreen && !self.manager.capabilities().textures_readable {
            return Err(reject!(
                CapabilityExceeded,
                "current target can only read data from offscreens"
            ));
        }
        if self.info.samples > 1 && !self.resolve {
            return Err(reject!(
                InvalidState,
                "multisampled offscreens must be resolved to read their data"
            ));
        }

        check_region(&self.info, position, width, height, 1)?;
        let expected = region_size(&self.info, width, height, 1);
        if out.len() != expected {
            return Err(reject!(
                InvalidArgument,
                "output size {} doesn't match the expected size {}",
                out.len(),
                expected
            ));
        }

        self.manager.ensure_context()?;
        self.manager
            .backend()
            .get_texture_data(out, self, position, width, height)
    }

    /// Read back a region of a single surface into typed storage.
    pub fn get_data_typed<T: bytemuck::Pod>(
        &self,
        position: &TexturePosition,
        width: u32,
        height: u32,
        out: &mut [T],
    ) -> Result<(), GraphicsError> {
        self.get_data(position, width, height, bytemuck::cast_slice_mut(out))
    }

    /// Destroy the texture.
    ///
    /// On failure the texture is handed back with the error.
    pub fn destroy(self) -> Result<(), DestroyError<Self>> {
        profile_scope!("Texture::destroy");
        if let Err(err) = self.manager.ensure_context() {
            return Err(DestroyError::new(self, err));
        }
        if let Err(err) = self.manager.backend().destroy_texture(&self) {
            return Err(DestroyError::new(self, err));
        }

        let counters = &self.manager.counters;
        counters.textures.fetch_sub(1, Ordering::AcqRel);
        counters.texture_memory.fetch_sub(self.memory_size, Ordering::AcqRel);
        log::trace!("Texture: destroyed {} ({} bytes)", self.id, self.memory_size);
        Ok(())
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("info", &self.info)
            .field("usage", &self.usage)
            .field("offscreen", &self.offscreen)
            .field("resolve", &self.resolve)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::command_buffer::CommandBufferUsage;
    use crate::render_pass::{RenderPass, RenderSubpassInfo};
    use crate::resource_manager::ResourceCapabilities;
    use crate::types::{ALL_MIP_LEVELS, CubeFace, TextureFormat};

    fn setup() -> (Arc<DummyBackend>, Arc<ResourceManager>) {
        let backend = Arc::new(DummyBackend::new());
        let manager = ResourceManager::new(backend.clone());
        (backend, manager)
    }

    fn frame(manager: &Arc<ResourceManager>) -> CommandBuffer {
        let mut command_buffer = CommandBuffer::new(manager, CommandBufferUsage::empty());
        command_buffer.begin().unwrap();
        command_buffer
    }

    const COPY: TextureUsage = TextureUsage::TEXTURE
        .union(TextureUsage::COPY_FROM)
        .union(TextureUsage::COPY_TO);

    #[test]
    fn test_create_updates_counters() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 512, 512)
            .with_mip_levels(ALL_MIP_LEVELS);
        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();
        assert_eq!(texture.info().mip_levels, 10);
        assert_eq!(texture.memory_size(), 1_398_100);

        let stats = manager.statistics();
        assert_eq!(stats.textures, 1);
        assert_eq!(stats.texture_memory, 1_398_100);

        texture.destroy().unwrap();
        let stats = manager.statistics();
        assert_eq!(stats.textures, 0);
        assert_eq!(stats.texture_memory, 0);
    }

    #[test]
    fn test_create_validation_order() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 16, 16);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::empty(), MemoryHints::STATIC, &info, None),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::empty(), &info, None),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let too_deep = TextureInfo::new_3d(TextureFormat::R8G8B8A8Unorm, 16, 16, 257);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &too_deep, None),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
        let flat_3d = TextureInfo::new_3d(TextureFormat::R8G8B8A8Unorm, 16, 16, 0);
        assert!(Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &flat_3d, None).is_err());

        let too_big = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 8192, 16);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &too_big, None),
            Err(GraphicsError::CapabilityExceeded(_))
        ));

        let multisampled = info.with_sample_count(4);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &multisampled, None),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let data = vec![0u8; 16];
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, Some(&data)),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert_eq!(manager.statistics().textures, 0);
    }

    #[test]
    fn test_partial_mip_chain_requires_arbitrary_mipmapping() {
        let caps = ResourceCapabilities {
            has_arbitrary_mipmapping: false,
            has_cube_arrays: false,
            ..ResourceCapabilities::default()
        };
        let manager = ResourceManager::new(Arc::new(DummyBackend::new().with_capabilities(caps)));
        let partial = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 64, 64).with_mip_levels(3);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &partial, None),
            Err(GraphicsError::CapabilityExceeded(_))
        ));

        let full = partial.with_mip_levels(ALL_MIP_LEVELS);
        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &full, None).unwrap();
        assert_eq!(texture.info().mip_levels, 7);
        texture.destroy().unwrap();

        let cube_array = TextureInfo::new_cube(TextureFormat::R8G8B8A8Unorm, 64).with_depth(2);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &cube_array, None),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
    }

    #[test]
    fn test_one_dimensional_height() {
        let (_, manager) = setup();
        let info = TextureInfo::new_1d(TextureFormat::R8G8B8A8Unorm, 64);
        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();
        assert_eq!(texture.info().height, 1);
        assert_eq!(texture.memory_size(), 256);
        texture.destroy().unwrap();
    }

    #[test]
    fn test_backend_failure_leaves_counters() {
        let (backend, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 16, 16);
        backend.fail_next_call();
        assert!(Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).is_err());
        assert_eq!(manager.statistics().textures, 0);
        assert_eq!(manager.statistics().texture_memory, 0);

        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();
        backend.fail_next_call();
        let err = texture.destroy().unwrap_err();
        assert_eq!(manager.statistics().textures, 1);
        err.into_resource().destroy().unwrap();
        assert_eq!(manager.statistics().textures, 0);
    }

    #[test]
    fn test_offscreen_resolve_memory() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 512, 512)
            .with_sample_count(DEFAULT_SAMPLES);

        let resolved =
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &info, true)
                .unwrap();
        assert_eq!(resolved.info().samples, 4);
        assert!(resolved.resolves());
        assert_eq!(resolved.memory_size(), 1_048_576 + 4_194_304);
        assert_eq!(manager.statistics().texture_memory, 5_242_880);

        let single = info.with_sample_count(1);
        let unresolved =
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &single, true)
                .unwrap();
        assert!(!unresolved.resolves());
        assert_eq!(unresolved.memory_size(), 1_048_576);

        resolved.destroy().unwrap();
        unresolved.destroy().unwrap();
        assert_eq!(manager.statistics().texture_memory, 0);
    }

    #[test]
    fn test_offscreen_sample_limits() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 64, 64).with_sample_count(32);
        let clamped =
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &info, true)
                .unwrap();
        assert_eq!(clamped.info().samples, 16);
        assert!(clamped.resolves());
        clamped.destroy().unwrap();

        let compressed = TextureInfo::new_2d(TextureFormat::Bc3, 64, 64);
        assert!(matches!(
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &compressed, false),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
    }

    #[test]
    fn test_offscreen_texture_samples_checked_after_clamp() {
        let caps = ResourceCapabilities {
            max_texture_samples: 4,
            max_surface_samples: 8,
            ..ResourceCapabilities::default()
        };
        let manager = ResourceManager::new(Arc::new(DummyBackend::new().with_capabilities(caps)));
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 64, 64).with_sample_count(32);
        assert!(matches!(
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &info, false),
            Err(GraphicsError::CapabilityExceeded(_))
        ));

        let resolved =
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &info, true)
                .unwrap();
        assert_eq!(resolved.info().samples, 8);
        resolved.destroy().unwrap();

        let four = info.with_sample_count(4);
        let unresolved =
            Texture::create_offscreen(&manager, TextureUsage::TEXTURE, MemoryHints::GPU_ONLY, &four, false)
                .unwrap();
        assert_eq!(unresolved.info().samples, 4);
        unresolved.destroy().unwrap();
    }

    #[test]
    fn test_copy_data_and_read_back() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 4, 4);
        let texture = Texture::create(&manager, COPY, MemoryHints::READ, &info, None).unwrap();
        let command_buffer = frame(&manager);

        let pixels: Vec<u32> = (0..4).collect();
        texture
            .copy_data_typed(&command_buffer, &TexturePosition::new(2, 2, 0), 2, 2, 1, &pixels)
            .unwrap();

        let mut out = [0u32; 4];
        texture
            .get_data_typed(&TexturePosition::new(2, 2, 0), 2, 2, &mut out)
            .unwrap();
        assert_eq!(out, [0, 1, 2, 3]);

        let mut corner = [0u32; 1];
        texture
            .get_data_typed(&TexturePosition::new(0, 0, 0), 1, 1, &mut corner)
            .unwrap();
        assert_eq!(corner, [0]);
        texture.destroy().unwrap();
    }

    #[test]
    fn test_copy_data_bounds() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 8, 8).with_mip_levels(2);
        let texture = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, None).unwrap();
        let command_buffer = frame(&manager);

        let data = vec![0u8; 4 * 4 * 4];
        assert!(matches!(
            texture.copy_data(&command_buffer, &TexturePosition::new(2, 0, 1), 4, 4, 1, &data),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            texture.copy_data(&command_buffer, &TexturePosition::new(0, 0, 2), 4, 4, 1, &data),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            texture.copy_data(&command_buffer, &TexturePosition::new(0, 0, 0), 4, 4, 2, &data),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            texture.copy_data(
                &command_buffer,
                &TexturePosition::new(0, 0, 0).with_face(CubeFace::PosX),
                4,
                4,
                1,
                &data
            ),
            Err(GraphicsError::InvalidArgument(_))
        ));
        texture
            .copy_data(&command_buffer, &TexturePosition::new(0, 0, 1), 4, 4, 1, &data)
            .unwrap();
        texture.destroy().unwrap();
    }

    #[test]
    fn test_create_rejects_unaligned_or_undersized_dimensions() {
        let (_, manager) = setup();
        let unaligned = TextureInfo::new_2d(TextureFormat::Bc1Rgb, 6, 6);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &unaligned, None),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let undersized = TextureInfo::new_2d(TextureFormat::Pvrtc1Rgb2Bpp, 8, 8);
        assert!(matches!(
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &undersized, None),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert_eq!(manager.statistics().textures, 0);

        let minimum = TextureInfo::new_2d(TextureFormat::Pvrtc1Rgb2Bpp, 16, 8);
        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &minimum, None).unwrap();
        texture.destroy().unwrap();
    }

    #[test]
    fn test_compressed_block_alignment() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::Bc1Rgb, 16, 16);
        let texture = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, None).unwrap();
        let command_buffer = frame(&manager);

        let block = vec![0u8; 8];
        assert!(matches!(
            texture.copy_data(&command_buffer, &TexturePosition::new(2, 0, 0), 4, 4, 1, &block),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            texture.copy_data(&command_buffer, &TexturePosition::new(0, 0, 0), 2, 4, 1, &block),
            Err(GraphicsError::InvalidArgument(_))
        ));
        texture
            .copy_data(&command_buffer, &TexturePosition::new(4, 8, 0), 4, 4, 1, &block)
            .unwrap();
        texture.destroy().unwrap();
    }

    #[test]
    fn test_copy_inside_render_pass_fails() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 4, 4).with_mip_levels(ALL_MIP_LEVELS);
        let texture = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, None).unwrap();
        let render_pass =
            RenderPass::create(&manager, "main", &[], &[RenderSubpassInfo::new("color")]).unwrap();
        let mut command_buffer = frame(&manager);
        let data = vec![0u8; 64];
        let position = TexturePosition::default();

        render_pass.begin(&mut command_buffer, false).unwrap();
        assert!(matches!(
            texture.copy_data(&command_buffer, &position, 4, 4, 1, &data),
            Err(GraphicsError::InvalidState(_))
        ));
        assert!(matches!(
            texture.generate_mipmaps(&command_buffer),
            Err(GraphicsError::InvalidState(_))
        ));
        render_pass.end(&mut command_buffer).unwrap();

        texture.copy_data(&command_buffer, &position, 4, 4, 1, &data).unwrap();
        texture.generate_mipmaps(&command_buffer).unwrap();
        texture.destroy().unwrap();
    }

    #[test]
    fn test_copy_between_textures() {
        let (backend, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8Unorm, 4, 4);
        let data: Vec<u8> = (0..16).collect();
        let src = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, Some(&data)).unwrap();
        let dst = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, None).unwrap();
        let command_buffer = frame(&manager);

        let region = TextureCopyRegion {
            src_position: TexturePosition::new(0, 0, 0),
            dst_position: TexturePosition::new(2, 2, 0),
            width: 2,
            height: 2,
            layers: 1,
        };
        Texture::copy(&command_buffer, &src, &dst, &[region]).unwrap();
        let contents = backend.texture_contents(dst.handle()).unwrap();
        assert_eq!(&contents[10..12], &[0, 1]);
        assert_eq!(&contents[14..16], &[4, 5]);

        let other = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 4, 4);
        let mismatched = Texture::create(&manager, COPY, MemoryHints::STATIC, &other, None).unwrap();
        assert!(matches!(
            Texture::copy(&command_buffer, &src, &mismatched, &[region]),
            Err(GraphicsError::InvalidArgument(_))
        ));

        src.destroy().unwrap();
        dst.destroy().unwrap();
        mismatched.destroy().unwrap();
    }

    #[test]
    fn test_generate_mipmaps_requirements() {
        let (_, manager) = setup();
        let command_buffer = frame(&manager);
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 16, 16).with_mip_levels(ALL_MIP_LEVELS);
        let sample_only =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();
        assert!(matches!(
            sample_only.generate_mipmaps(&command_buffer),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let single = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 16, 16);
        let single = Texture::create(&manager, COPY, MemoryHints::STATIC, &single, None).unwrap();
        let idle = CommandBuffer::new(&manager, CommandBufferUsage::empty());
        assert!(matches!(
            single.generate_mipmaps(&idle),
            Err(GraphicsError::InvalidState(_))
        ));
        single.generate_mipmaps(&command_buffer).unwrap();

        let render_pass =
            RenderPass::create(&manager, "main", &[], &[RenderSubpassInfo::new("color")]).unwrap();
        let mut recording = frame(&manager);
        render_pass.begin(&mut recording, false).unwrap();
        assert!(matches!(
            single.generate_mipmaps(&recording),
            Err(GraphicsError::InvalidState(_))
        ));
        render_pass.end(&mut recording).unwrap();

        sample_only.destroy().unwrap();
        single.destroy().unwrap();
    }

    #[test]
    fn test_get_data_requirements() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 4, 4);
        let no_read = Texture::create(&manager, COPY, MemoryHints::STATIC, &info, None).unwrap();
        let mut out = vec![0u8; 64];
        assert!(matches!(
            no_read.get_data(&TexturePosition::default(), 4, 4, &mut out),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let multisampled = info.with_sample_count(4);
        let offscreen =
            Texture::create_offscreen(&manager, COPY, MemoryHints::READ, &multisampled, false).unwrap();
        assert!(matches!(
            offscreen.get_data(&TexturePosition::default(), 4, 4, &mut out),
            Err(GraphicsError::InvalidState(_))
        ));

        let resolved =
            Texture::create_offscreen(&manager, COPY, MemoryHints::READ, &multisampled, true).unwrap();
        resolved.get_data(&TexturePosition::default(), 4, 4, &mut out).unwrap();
        assert!(matches!(
            resolved.get_data(&TexturePosition::default().with_depth(1), 4, 4, &mut out),
            Err(GraphicsError::OutOfRange(_))
        ));

        no_read.destroy().unwrap();
        offscreen.destroy().unwrap();
        resolved.destroy().unwrap();
    }

    #[test]
    fn test_destroy_requires_context() {
        let (_, manager) = setup();
        let info = TextureInfo::new_2d(TextureFormat::R8G8B8A8Unorm, 4, 4);
        let texture =
            Texture::create(&manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();

        let texture = std::thread::spawn(move || {
            let err = texture.destroy().unwrap_err();
            assert_eq!(err.error, GraphicsError::NoContext);
            err.into_resource()
        })
        .join()
        .unwrap();
        texture.destroy().unwrap();
    }
}
