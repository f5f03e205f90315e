//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Textures and buffers are plain byte
//! vectors so that copies, readbacks and uploads can be checked in tests, and
//! every other operation succeeds without doing anything. Capabilities and the
//! set of implemented operations are configurable, and the next dispatch can be
//! made to fail to exercise the core's "no state change on failure" paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::command_buffer::CommandBuffer;
use crate::error::GraphicsError;
use crate::materials::{
    Material, MaterialDesc, MaterialElement, ShaderVariableElement, ShaderVariableGroupDesc,
    SharedMaterialValues,
};
use crate::render_pass::RenderPass;
use crate::resource_manager::ResourceCapabilities;
use crate::resources::{GfxBuffer, Texture};
use crate::shader::{DynamicRenderStates, Shader, ShaderModule, ShaderPipeline};
use crate::types::{
    BufferMapFlags, BufferTextureCopyRegion, BufferUsage, DrawIndexedRange, DrawRange,
    FormatSupport, MemoryHints, PrimitiveType, TextureCopyRegion, TextureFormat, TextureInfo,
    TexturePosition, TextureUsage,
};

use super::{BackendHandle, BackendOperations, GpuBackend};

/// Dummy GPU backend.
pub struct DummyBackend {
    capabilities: ResourceCapabilities,
    operations: BackendOperations,
    next_handle: AtomicU64,
    dispatch_count: AtomicU64,
    fail_next: AtomicBool,
    textures: Mutex<HashMap<BackendHandle, Vec<u8>>>,
    buffers: Mutex<HashMap<BackendHandle, Vec<u8>>>,
    mapped_buffers: Mutex<HashMap<BackendHandle, (usize, usize)>>,
    internal_uniforms: Vec<String>,
}

impl DummyBackend {
    /// Create a new dummy backend implementing every operation.
    pub fn new() -> Self {
        Self {
            capabilities: ResourceCapabilities::default(),
            operations: BackendOperations::all(),
            next_handle: AtomicU64::new(1),
            dispatch_count: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
            textures: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            mapped_buffers: Mutex::new(HashMap::new()),
            internal_uniforms: Vec::new(),
        }
    }

    /// Replace the declared capabilities.
    pub fn with_capabilities(mut self, capabilities: ResourceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the set of implemented operations.
    pub fn with_operations(mut self, operations: BackendOperations) -> Self {
        self.operations = operations;
        self
    }

    /// Remove operations from the implemented set.
    pub fn without_operations(mut self, operations: BackendOperations) -> Self {
        self.operations.remove(operations);
        self
    }

    /// Push constant members the backend provides itself.
    pub fn with_internal_uniforms(mut self, names: &[&str]) -> Self {
        self.internal_uniforms = names.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy"
    }

    /// Make the next dispatched operation fail.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::Release);
    }

    /// Number of operations dispatched so far.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count.load(Ordering::Acquire)
    }

    /// Contents of a live texture.
    pub fn texture_contents(&self, handle: BackendHandle) -> Option<Vec<u8>> {
        self.textures.lock().get(&handle).cloned()
    }

    /// Contents of a live buffer.
    pub fn buffer_contents(&self, handle: BackendHandle) -> Option<Vec<u8>> {
        self.buffers.lock().get(&handle).cloned()
    }

    /// Range passed to the last map of a buffer that is still mapped.
    pub fn mapped_range(&self, handle: BackendHandle) -> Option<(usize, usize)> {
        self.mapped_buffers.lock().get(&handle).copied()
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.lock().len()
    }

    fn dispatch(&self, operation: &str) -> Result<(), GraphicsError> {
        self.dispatch_count.fetch_add(1, Ordering::AcqRel);
        if self.fail_next.swap(false, Ordering::AcqRel) {
            log::trace!("DummyBackend: failing {}", operation);
            return Err(GraphicsError::Internal(format!("{operation} failed")));
        }
        log::trace!("DummyBackend: {}", operation);
        Ok(())
    }

    fn allocate_handle(&self) -> BackendHandle {
        BackendHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyBackend")
            .field("operations", &self.operations)
            .field("dispatch_count", &self.dispatch_count())
            .finish_non_exhaustive()
    }
}

fn out_of_bounds() -> GraphicsError {
    GraphicsError::Internal("copy outside of the resource storage".to_string())
}

/// Copy `rows` rows of `row_size` bytes between two byte slices with their own pitches.
fn copy_rows(
    dst: &mut [u8],
    mut dst_offset: usize,
    dst_pitch: usize,
    src: &[u8],
    mut src_offset: usize,
    src_pitch: usize,
    row_size: usize,
    rows: usize,
) -> Result<(), GraphicsError> {
    for _ in 0..rows {
        let from = src
            .get(src_offset..src_offset + row_size)
            .ok_or_else(out_of_bounds)?;
        dst.get_mut(dst_offset..dst_offset + row_size)
            .ok_or_else(out_of_bounds)?
            .copy_from_slice(from);
        src_offset += src_pitch;
        dst_offset += dst_pitch;
    }
    Ok(())
}

/// Bytes per row of blocks of a mip level.
fn mip_pitch(info: &TextureInfo, mip_level: u32) -> usize {
    let (block_x, _) = info.format.block_dimensions();
    let (min_x, _) = info.format.min_dimensions();
    let (width, _) = info.mip_extent(mip_level);
    width.max(min_x).div_ceil(block_x) as usize * info.format.size() as usize
}

/// Byte offset of a block-aligned position within a mip level.
fn position_offset(info: &TextureInfo, position: &TexturePosition) -> usize {
    let (block_x, block_y) = info.format.block_dimensions();
    (position.y / block_y) as usize * mip_pitch(info, position.mip_level)
        + (position.x / block_x) as usize * info.format.size() as usize
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn capabilities(&self) -> ResourceCapabilities {
        self.capabilities.clone()
    }

    fn operations(&self) -> BackendOperations {
        self.operations
    }

    fn format_support(&self, format: TextureFormat) -> FormatSupport {
        let mut support =
            FormatSupport::TEXTURE | FormatSupport::COPY_TO_BUFFER | FormatSupport::COPY_FROM_BUFFER;
        if !format.is_compressed() {
            support |= FormatSupport::OFFSCREEN;
            if !format.is_special() {
                support |= FormatSupport::TEXTURE_BUFFER
                    | FormatSupport::IMAGE
                    | FormatSupport::VERTEX
                    | FormatSupport::GENERATE_MIPMAPS;
            }
        }
        support
    }

    fn is_shader_uniform_internal(&self, name: &str) -> bool {
        self.internal_uniforms.iter().any(|internal| internal == name)
    }

    fn create_resource_context(&self) -> Result<(), GraphicsError> {
        self.dispatch("create resource context")
    }

    fn destroy_resource_context(&self) -> Result<(), GraphicsError> {
        self.dispatch("destroy resource context")
    }

    fn flush_resource_context(&self) -> Result<(), GraphicsError> {
        self.dispatch("flush resource context")
    }

    // ========================================================================
    // Textures
    // ========================================================================

    fn create_texture(
        &self,
        _usage: TextureUsage,
        _memory_hints: MemoryHints,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create texture")?;
        let handle = self.allocate_handle();
        let contents = match data {
            Some(data) => data.to_vec(),
            None => vec![0; info.size()],
        };
        log::trace!(
            "DummyBackend: created texture {:?} ({}x{}x{}, {} bytes)",
            handle,
            info.width,
            info.height,
            info.depth,
            contents.len()
        );
        self.textures.lock().insert(handle, contents);
        Ok(handle)
    }

    fn create_offscreen(
        &self,
        _usage: TextureUsage,
        _memory_hints: MemoryHints,
        info: &TextureInfo,
        resolve: bool,
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create offscreen")?;
        let handle = self.allocate_handle();
        // Readback goes through the resolved surface, so store single-sampled contents.
        let stored = if resolve { info.with_sample_count(1) } else { *info };
        self.textures.lock().insert(handle, vec![0; stored.size()]);
        Ok(handle)
    }

    fn destroy_texture(&self, texture: &Texture) -> Result<(), GraphicsError> {
        self.dispatch("destroy texture")?;
        self.textures.lock().remove(&texture.handle());
        Ok(())
    }

    fn copy_texture_data(
        &self,
        _command_buffer: &CommandBuffer,
        texture: &Texture,
        position: &TexturePosition,
        width: u32,
        height: u32,
        layers: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.dispatch("copy texture data")?;
        let info = texture.info();
        let (block_x, block_y) = info.format.block_dimensions();
        let (min_x, min_y) = info.format.min_dimensions();
        let block_size = info.format.size() as usize;
        let data_pitch = width.max(min_x).div_ceil(block_x) as usize * block_size;
        let rows = height.max(min_y).div_ceil(block_y) as usize;
        let surface_pitch = mip_pitch(info, position.mip_level);
        let first_layer = position.layer(info.dimension);

        let mut textures = self.textures.lock();
        let contents = textures.get_mut(&texture.handle()).ok_or_else(out_of_bounds)?;
        for layer in 0..layers {
            let offset = info.layer_offset(first_layer + layer, position.mip_level)
                + position_offset(info, position);
            let src_offset = layer as usize * data_pitch * rows;
            copy_rows(contents, offset, surface_pitch, data, src_offset, data_pitch, data_pitch, rows)?;
        }
        Ok(())
    }

    fn copy_texture(
        &self,
        _command_buffer: &CommandBuffer,
        src: &Texture,
        dst: &Texture,
        regions: &[TextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        self.dispatch("copy texture")?;
        let src_info = src.info();
        let dst_info = dst.info();
        let (block_x, block_y) = src_info.format.block_dimensions();
        let block_size = src_info.format.size() as usize;

        let mut textures = self.textures.lock();
        let src_contents = textures.get(&src.handle()).ok_or_else(out_of_bounds)?.clone();
        let dst_contents = textures.get_mut(&dst.handle()).ok_or_else(out_of_bounds)?;
        for region in regions {
            let src_pitch = mip_pitch(src_info, region.src_position.mip_level);
            let dst_pitch = mip_pitch(dst_info, region.dst_position.mip_level);
            let row_size = region.width.div_ceil(block_x) as usize * block_size;
            let rows = region.height.div_ceil(block_y) as usize;
            let src_layer = region.src_position.layer(src_info.dimension);
            let dst_layer = region.dst_position.layer(dst_info.dimension);
            for layer in 0..region.layers {
                let src_offset = src_info.layer_offset(src_layer + layer, region.src_position.mip_level)
                    + position_offset(src_info, &region.src_position);
                let dst_offset = dst_info.layer_offset(dst_layer + layer, region.dst_position.mip_level)
                    + position_offset(dst_info, &region.dst_position);
                copy_rows(
                    dst_contents,
                    dst_offset,
                    dst_pitch,
                    &src_contents,
                    src_offset,
                    src_pitch,
                    row_size,
                    rows,
                )?;
            }
        }
        Ok(())
    }

    fn copy_texture_to_buffer(
        &self,
        _command_buffer: &CommandBuffer,
        src: &Texture,
        dst: &GfxBuffer,
        regions: &[BufferTextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        self.dispatch("copy texture to buffer")?;
        let info = src.info();
        let (block_x, block_y) = info.format.block_dimensions();
        let format_size = info.format.size() as usize;

        let textures = self.textures.lock();
        let contents = textures.get(&src.handle()).ok_or_else(out_of_bounds)?;
        let mut buffers = self.buffers.lock();
        let buffer = buffers.get_mut(&dst.handle()).ok_or_else(out_of_bounds)?;
        for region in regions {
            if region.texture_width == 0 || region.texture_height == 0 || region.layers == 0 {
                continue;
            }
            let position = &region.texture_position;
            let buffer_width = if region.buffer_width == 0 { region.texture_width } else { region.buffer_width };
            let buffer_height =
                if region.buffer_height == 0 { region.texture_height } else { region.buffer_height };
            let row_size = region.texture_width.div_ceil(block_x) as usize * format_size;
            let rows = region.texture_height.div_ceil(block_y) as usize;
            let buffer_pitch = buffer_width.div_ceil(block_x) as usize * format_size;
            let buffer_layer_stride = buffer_pitch * buffer_height.div_ceil(block_y) as usize;
            let texture_pitch = mip_pitch(info, position.mip_level);
            let first_layer = position.layer(info.dimension);
            for layer in 0..region.layers {
                let texture_offset = info.layer_offset(first_layer + layer, position.mip_level)
                    + position_offset(info, position);
                let buffer_offset = region.buffer_offset + buffer_layer_stride * layer as usize;
                copy_rows(
                    buffer,
                    buffer_offset,
                    buffer_pitch,
                    contents,
                    texture_offset,
                    texture_pitch,
                    row_size,
                    rows,
                )?;
            }
        }
        Ok(())
    }

    fn generate_texture_mipmaps(
        &self,
        _command_buffer: &CommandBuffer,
        _texture: &Texture,
    ) -> Result<(), GraphicsError> {
        self.dispatch("generate texture mipmaps")
    }

    fn get_texture_data(
        &self,
        out: &mut [u8],
        texture: &Texture,
        position: &TexturePosition,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        self.dispatch("get texture data")?;
        let info = texture.info();
        let stored = if texture.resolves() { info.with_sample_count(1) } else { *info };
        let (block_x, block_y) = info.format.block_dimensions();
        let (min_x, min_y) = info.format.min_dimensions();
        let row_size = width.max(min_x).div_ceil(block_x) as usize * info.format.size() as usize;
        let rows = height.max(min_y).div_ceil(block_y) as usize;
        let offset = stored.surface_offset(position.face, position.depth, position.mip_level)
            + position_offset(info, position);

        let textures = self.textures.lock();
        let contents = textures.get(&texture.handle()).ok_or_else(out_of_bounds)?;
        copy_rows(out, 0, row_size, contents, offset, mip_pitch(info, position.mip_level), row_size, rows)
    }

    // ========================================================================
    // Buffers
    // ========================================================================

    fn create_buffer(
        &self,
        _usage: BufferUsage,
        _memory_hints: MemoryHints,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create buffer")?;
        let handle = self.allocate_handle();
        let contents = data.map_or_else(|| vec![0; size], <[u8]>::to_vec);
        self.buffers.lock().insert(handle, contents);
        Ok(handle)
    }

    fn destroy_buffer(&self, buffer: &GfxBuffer) -> Result<(), GraphicsError> {
        self.dispatch("destroy buffer")?;
        self.buffers.lock().remove(&buffer.handle());
        self.mapped_buffers.lock().remove(&buffer.handle());
        Ok(())
    }

    fn map_buffer(
        &self,
        buffer: &GfxBuffer,
        _flags: BufferMapFlags,
        offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        self.dispatch("map buffer")?;
        self.mapped_buffers.lock().insert(buffer.handle(), (offset, size));
        Ok(())
    }

    fn unmap_buffer(&self, buffer: &GfxBuffer) -> Result<(), GraphicsError> {
        self.dispatch("unmap buffer")?;
        self.mapped_buffers.lock().remove(&buffer.handle());
        Ok(())
    }

    fn flush_buffer(&self, _buffer: &GfxBuffer, _offset: usize, _size: usize) -> Result<(), GraphicsError> {
        self.dispatch("flush buffer")
    }

    fn invalidate_buffer(
        &self,
        _buffer: &GfxBuffer,
        _offset: usize,
        _size: usize,
    ) -> Result<(), GraphicsError> {
        self.dispatch("invalidate buffer")
    }

    fn copy_buffer_data(
        &self,
        _command_buffer: &CommandBuffer,
        buffer: &GfxBuffer,
        offset: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        self.dispatch("copy buffer data")?;
        let mut buffers = self.buffers.lock();
        let contents = buffers.get_mut(&buffer.handle()).ok_or_else(out_of_bounds)?;
        contents
            .get_mut(offset..offset + data.len())
            .ok_or_else(out_of_bounds)?
            .copy_from_slice(data);
        Ok(())
    }

    fn copy_buffer(
        &self,
        _command_buffer: &CommandBuffer,
        src: &GfxBuffer,
        src_offset: usize,
        dst: &GfxBuffer,
        dst_offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        self.dispatch("copy buffer")?;
        let mut buffers = self.buffers.lock();
        let data = buffers
            .get(&src.handle())
            .and_then(|contents| contents.get(src_offset..src_offset + size))
            .ok_or_else(out_of_bounds)?
            .to_vec();
        buffers
            .get_mut(&dst.handle())
            .and_then(|contents| contents.get_mut(dst_offset..dst_offset + size))
            .ok_or_else(out_of_bounds)?
            .copy_from_slice(&data);
        Ok(())
    }

    // ========================================================================
    // Materials and shaders
    // ========================================================================

    fn create_material_desc(&self, elements: &[MaterialElement]) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create material desc")?;
        log::trace!("DummyBackend: material desc with {} elements", elements.len());
        Ok(self.allocate_handle())
    }

    fn destroy_material_desc(&self, _desc: &MaterialDesc) -> Result<(), GraphicsError> {
        self.dispatch("destroy material desc")
    }

    fn create_variable_group_desc(
        &self,
        elements: &[ShaderVariableElement],
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create shader variable group desc")?;
        log::trace!("DummyBackend: variable group desc with {} elements", elements.len());
        Ok(self.allocate_handle())
    }

    fn destroy_variable_group_desc(&self, _desc: &ShaderVariableGroupDesc) -> Result<(), GraphicsError> {
        self.dispatch("destroy shader variable group desc")
    }

    fn create_shader_module(
        &self,
        name: &str,
        pipelines: &[ShaderPipeline],
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create shader module")?;
        log::trace!("DummyBackend: shader module {:?} with {} pipelines", name, pipelines.len());
        Ok(self.allocate_handle())
    }

    fn destroy_shader_module(&self, _module: &ShaderModule) -> Result<(), GraphicsError> {
        self.dispatch("destroy shader module")
    }

    fn create_shader(
        &self,
        _module: &ShaderModule,
        pipeline: &ShaderPipeline,
        _material_desc: &MaterialDesc,
    ) -> Result<BackendHandle, GraphicsError> {
        self.dispatch("create shader")?;
        log::trace!("DummyBackend: shader {:?}", pipeline.name);
        Ok(self.allocate_handle())
    }

    fn destroy_shader(&self, _shader: &Shader) -> Result<(), GraphicsError> {
        self.dispatch("destroy shader")
    }

    fn bind_shader(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
        _material: &Material,
        _global_values: Option<&SharedMaterialValues>,
        _render_states: Option<&DynamicRenderStates>,
    ) -> Result<(), GraphicsError> {
        self.dispatch("bind shader")
    }

    fn update_shader_instance_values(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
        _instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        self.dispatch("update shader instance values")
    }

    fn update_shader_dynamic_render_states(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
        _render_states: &DynamicRenderStates,
    ) -> Result<(), GraphicsError> {
        self.dispatch("update shader dynamic render states")
    }

    fn unbind_shader(&self, _command_buffer: &CommandBuffer, _shader: &Shader) -> Result<(), GraphicsError> {
        self.dispatch("unbind shader")
    }

    fn bind_compute_shader(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
        _material: &Material,
        _global_values: Option<&SharedMaterialValues>,
    ) -> Result<(), GraphicsError> {
        self.dispatch("bind compute shader")
    }

    fn update_compute_shader_instance_values(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
        _instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        self.dispatch("update compute shader instance values")
    }

    fn unbind_compute_shader(
        &self,
        _command_buffer: &CommandBuffer,
        _shader: &Shader,
    ) -> Result<(), GraphicsError> {
        self.dispatch("unbind compute shader")
    }

    // ========================================================================
    // Command buffers, frames and render passes
    // ========================================================================

    fn begin_command_buffer(&self, _command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        self.dispatch("begin command buffer")
    }

    fn end_command_buffer(&self, _command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        self.dispatch("end command buffer")
    }

    fn submit_command_buffer(
        &self,
        _command_buffer: &CommandBuffer,
        _submit: &CommandBuffer,
    ) -> Result<(), GraphicsError> {
        self.dispatch("submit command buffer")
    }

    fn begin_frame(&self) -> Result<(), GraphicsError> {
        self.dispatch("begin frame")
    }

    fn end_frame(&self) -> Result<(), GraphicsError> {
        self.dispatch("end frame")
    }

    fn begin_render_pass(
        &self,
        _command_buffer: &CommandBuffer,
        render_pass: &RenderPass,
        _secondary: bool,
    ) -> Result<(), GraphicsError> {
        self.dispatch("begin render pass")?;
        log::trace!("DummyBackend: render pass {:?}", render_pass.name());
        Ok(())
    }

    fn next_render_subpass(
        &self,
        _command_buffer: &CommandBuffer,
        _render_pass: &RenderPass,
        _subpass: u32,
        _secondary: bool,
    ) -> Result<(), GraphicsError> {
        self.dispatch("next render subpass")
    }

    fn end_render_pass(
        &self,
        _command_buffer: &CommandBuffer,
        _render_pass: &RenderPass,
    ) -> Result<(), GraphicsError> {
        self.dispatch("end render pass")
    }

    fn draw(
        &self,
        _command_buffer: &CommandBuffer,
        range: &DrawRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        self.dispatch("draw")?;
        log::trace!("DummyBackend: draw {} vertices as {:?}", range.vertex_count, primitive);
        Ok(())
    }

    fn draw_indexed(
        &self,
        _command_buffer: &CommandBuffer,
        range: &DrawIndexedRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        self.dispatch("draw indexed")?;
        log::trace!("DummyBackend: draw {} indices as {:?}", range.index_count, primitive);
        Ok(())
    }

    fn dispatch_compute(
        &self,
        _command_buffer: &CommandBuffer,
        x: u32,
        y: u32,
        z: u32,
    ) -> Result<(), GraphicsError> {
        self.dispatch("dispatch compute")?;
        log::trace!("DummyBackend: dispatch {}x{}x{}", x, y, z);
        Ok(())
    }

    fn dispatch_compute_indirect(
        &self,
        _command_buffer: &CommandBuffer,
        _buffer: &GfxBuffer,
        _offset: usize,
    ) -> Result<(), GraphicsError> {
        self.dispatch("dispatch compute indirect")
    }
}
