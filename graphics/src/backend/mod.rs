//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends. The core
//! validates every request against the capabilities a backend declares and only
//! then dispatches it to the backend, which performs the native work.
//!
//! # Available Backends
//!
//! - `dummy` (default): Software backend that keeps resource contents in memory,
//!   used for testing the validation layer without GPU hardware
//!
//! # Dispatch table
//!
//! Each operation is a method of [`GpuBackend`] with a default body returning
//! [`GraphicsError::Unsupported`]. A backend declares the methods it implements
//! through [`GpuBackend::operations`]; the core checks that set before running
//! any validation, so an operation a backend never supports is told apart from
//! one that was attempted and failed.

pub mod dummy;

use std::sync::Arc;

use bitflags::bitflags;

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

pub use dummy::DummyBackend;

/// Opaque handle to a backend-private resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendHandle(pub u64);

bitflags! {
    /// Operations a backend implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BackendOperations: u64 {
        const RESOURCE_CONTEXT = 1 << 0;

        const TEXTURE_CREATE = 1 << 1;
        const OFFSCREEN_CREATE = 1 << 2;
        const TEXTURE_DESTROY = 1 << 3;
        const TEXTURE_COPY_DATA = 1 << 4;
        const TEXTURE_COPY = 1 << 5;
        const TEXTURE_COPY_TO_BUFFER = 1 << 6;
        const TEXTURE_GENERATE_MIPMAPS = 1 << 7;
        const TEXTURE_GET_DATA = 1 << 8;

        const BUFFER_CREATE = 1 << 9;
        const BUFFER_DESTROY = 1 << 10;
        const BUFFER_MAP = 1 << 11;
        const BUFFER_UNMAP = 1 << 12;
        const BUFFER_FLUSH = 1 << 13;
        const BUFFER_INVALIDATE = 1 << 14;
        const BUFFER_COPY_DATA = 1 << 15;
        const BUFFER_COPY = 1 << 16;

        const MATERIAL_DESC_CREATE = 1 << 17;
        const MATERIAL_DESC_DESTROY = 1 << 18;
        const VARIABLE_GROUP_DESC_CREATE = 1 << 19;
        const VARIABLE_GROUP_DESC_DESTROY = 1 << 20;

        const SHADER_MODULE_CREATE = 1 << 21;
        const SHADER_MODULE_DESTROY = 1 << 22;
        const SHADER_CREATE = 1 << 23;
        const SHADER_DESTROY = 1 << 24;
        const SHADER_BIND = 1 << 25;
        const SHADER_UPDATE_INSTANCE_VALUES = 1 << 26;
        const SHADER_UPDATE_DYNAMIC_RENDER_STATES = 1 << 27;
        const SHADER_UNBIND = 1 << 28;
        const SHADER_BIND_COMPUTE = 1 << 29;
        const SHADER_UPDATE_COMPUTE_INSTANCE_VALUES = 1 << 30;
        const SHADER_UNBIND_COMPUTE = 1 << 31;

        const COMMAND_BUFFER_BEGIN = 1 << 32;
        const COMMAND_BUFFER_END = 1 << 33;
        const COMMAND_BUFFER_SUBMIT = 1 << 34;
        const FRAME_BEGIN = 1 << 35;
        const FRAME_END = 1 << 36;
        const RENDER_PASS_BEGIN = 1 << 37;
        const RENDER_PASS_NEXT_SUBPASS = 1 << 38;
        const RENDER_PASS_END = 1 << 39;
        const DRAW = 1 << 40;
        const DRAW_INDEXED = 1 << 41;
        const DISPATCH_COMPUTE = 1 << 42;
    }
}

impl BackendOperations {
    /// Texture creation and destruction, including offscreens.
    pub const TEXTURE_LIFECYCLE: Self = Self::TEXTURE_CREATE
        .union(Self::OFFSCREEN_CREATE)
        .union(Self::TEXTURE_DESTROY);

    /// Buffer creation and destruction.
    pub const BUFFER_LIFECYCLE: Self = Self::BUFFER_CREATE.union(Self::BUFFER_DESTROY);

    /// Shader creation and destruction.
    pub const SHADER_LIFECYCLE: Self = Self::SHADER_CREATE.union(Self::SHADER_DESTROY);
}

fn unsupported<T>(operation: &str) -> Result<T, GraphicsError> {
    Err(GraphicsError::Unsupported(operation.to_string()))
}

/// Trait implemented by every GPU backend.
///
/// Arguments reaching a backend have already been validated and clamped by
/// the core. Operations not listed in [`GpuBackend::operations`] are never
/// called.
#[allow(unused_variables)]
pub trait GpuBackend: Send + Sync + 'static {
    /// Human readable backend name.
    fn name(&self) -> &'static str;

    /// Capability limits of the device.
    fn capabilities(&self) -> ResourceCapabilities;

    /// Operations this backend implements.
    fn operations(&self) -> BackendOperations;

    /// What the backend can do with a format.
    fn format_support(&self, format: TextureFormat) -> FormatSupport;

    /// Whether textures of `src` format can be copied into textures of `dst` format.
    fn texture_copy_supported(&self, src: TextureFormat, dst: TextureFormat) -> bool {
        src == dst
    }

    /// Whether a push constant member is provided by the backend itself rather
    /// than by a material.
    fn is_shader_uniform_internal(&self, name: &str) -> bool {
        false
    }

    // ------------------------------------------------------------------------
    // Resource contexts
    // ------------------------------------------------------------------------

    fn create_resource_context(&self) -> Result<(), GraphicsError> {
        unsupported("create_resource_context")
    }

    fn destroy_resource_context(&self) -> Result<(), GraphicsError> {
        unsupported("destroy_resource_context")
    }

    fn flush_resource_context(&self) -> Result<(), GraphicsError> {
        unsupported("flush_resource_context")
    }

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    fn create_texture(
        &self,
        usage: TextureUsage,
        memory_hints: MemoryHints,
        info: &TextureInfo,
        data: Option<&[u8]>,
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_texture")
    }

    fn create_offscreen(
        &self,
        usage: TextureUsage,
        memory_hints: MemoryHints,
        info: &TextureInfo,
        resolve: bool,
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_offscreen")
    }

    fn destroy_texture(&self, texture: &Texture) -> Result<(), GraphicsError> {
        unsupported("destroy_texture")
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_texture_data(
        &self,
        command_buffer: &CommandBuffer,
        texture: &Texture,
        position: &TexturePosition,
        width: u32,
        height: u32,
        layers: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        unsupported("copy_texture_data")
    }

    fn copy_texture(
        &self,
        command_buffer: &CommandBuffer,
        src: &Texture,
        dst: &Texture,
        regions: &[TextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        unsupported("copy_texture")
    }

    fn copy_texture_to_buffer(
        &self,
        command_buffer: &CommandBuffer,
        src: &Texture,
        dst: &GfxBuffer,
        regions: &[BufferTextureCopyRegion],
    ) -> Result<(), GraphicsError> {
        unsupported("copy_texture_to_buffer")
    }

    fn generate_texture_mipmaps(
        &self,
        command_buffer: &CommandBuffer,
        texture: &Texture,
    ) -> Result<(), GraphicsError> {
        unsupported("generate_texture_mipmaps")
    }

    fn get_texture_data(
        &self,
        out: &mut [u8],
        texture: &Texture,
        position: &TexturePosition,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        unsupported("get_texture_data")
    }

    // ------------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------------

    fn create_buffer(
        &self,
        usage: BufferUsage,
        memory_hints: MemoryHints,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_buffer")
    }

    fn destroy_buffer(&self, buffer: &GfxBuffer) -> Result<(), GraphicsError> {
        unsupported("destroy_buffer")
    }

    /// Map `size` bytes at `offset`. `size` may be [`crate::types::MAP_FULL_BUFFER`].
    fn map_buffer(
        &self,
        buffer: &GfxBuffer,
        flags: BufferMapFlags,
        offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        unsupported("map_buffer")
    }

    fn unmap_buffer(&self, buffer: &GfxBuffer) -> Result<(), GraphicsError> {
        unsupported("unmap_buffer")
    }

    fn flush_buffer(&self, buffer: &GfxBuffer, offset: usize, size: usize) -> Result<(), GraphicsError> {
        unsupported("flush_buffer")
    }

    fn invalidate_buffer(
        &self,
        buffer: &GfxBuffer,
        offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        unsupported("invalidate_buffer")
    }

    fn copy_buffer_data(
        &self,
        command_buffer: &CommandBuffer,
        buffer: &GfxBuffer,
        offset: usize,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        unsupported("copy_buffer_data")
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_buffer(
        &self,
        command_buffer: &CommandBuffer,
        src: &GfxBuffer,
        src_offset: usize,
        dst: &GfxBuffer,
        dst_offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        unsupported("copy_buffer")
    }

    // ------------------------------------------------------------------------
    // Material descriptions
    // ------------------------------------------------------------------------

    fn create_material_desc(
        &self,
        elements: &[MaterialElement],
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_material_desc")
    }

    fn destroy_material_desc(&self, desc: &MaterialDesc) -> Result<(), GraphicsError> {
        unsupported("destroy_material_desc")
    }

    fn create_variable_group_desc(
        &self,
        elements: &[ShaderVariableElement],
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_variable_group_desc")
    }

    fn destroy_variable_group_desc(
        &self,
        desc: &ShaderVariableGroupDesc,
    ) -> Result<(), GraphicsError> {
        unsupported("destroy_variable_group_desc")
    }

    // ------------------------------------------------------------------------
    // Shaders
    // ------------------------------------------------------------------------

    fn create_shader_module(
        &self,
        name: &str,
        pipelines: &[ShaderPipeline],
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_shader_module")
    }

    fn destroy_shader_module(&self, module: &ShaderModule) -> Result<(), GraphicsError> {
        unsupported("destroy_shader_module")
    }

    fn create_shader(
        &self,
        module: &ShaderModule,
        pipeline: &ShaderPipeline,
        material_desc: &MaterialDesc,
    ) -> Result<BackendHandle, GraphicsError> {
        unsupported("create_shader")
    }

    fn destroy_shader(&self, shader: &Shader) -> Result<(), GraphicsError> {
        unsupported("destroy_shader")
    }

    fn bind_shader(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
        material: &Material,
        global_values: Option<&SharedMaterialValues>,
        render_states: Option<&DynamicRenderStates>,
    ) -> Result<(), GraphicsError> {
        unsupported("bind_shader")
    }

    fn update_shader_instance_values(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
        instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        unsupported("update_shader_instance_values")
    }

    fn update_shader_dynamic_render_states(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
        render_states: &DynamicRenderStates,
    ) -> Result<(), GraphicsError> {
        unsupported("update_shader_dynamic_render_states")
    }

    fn unbind_shader(&self, command_buffer: &CommandBuffer, shader: &Shader) -> Result<(), GraphicsError> {
        unsupported("unbind_shader")
    }

    fn bind_compute_shader(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
        material: &Material,
        global_values: Option<&SharedMaterialValues>,
    ) -> Result<(), GraphicsError> {
        unsupported("bind_compute_shader")
    }

    fn update_compute_shader_instance_values(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
        instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        unsupported("update_compute_shader_instance_values")
    }

    fn unbind_compute_shader(
        &self,
        command_buffer: &CommandBuffer,
        shader: &Shader,
    ) -> Result<(), GraphicsError> {
        unsupported("unbind_compute_shader")
    }

    // ------------------------------------------------------------------------
    // Command buffers, frames and render passes
    // ------------------------------------------------------------------------

    fn begin_command_buffer(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        unsupported("begin_command_buffer")
    }

    fn end_command_buffer(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        unsupported("end_command_buffer")
    }

    fn submit_command_buffer(
        &self,
        command_buffer: &CommandBuffer,
        submit: &CommandBuffer,
    ) -> Result<(), GraphicsError> {
        unsupported("submit_command_buffer")
    }

    fn begin_frame(&self) -> Result<(), GraphicsError> {
        unsupported("begin_frame")
    }

    fn end_frame(&self) -> Result<(), GraphicsError> {
        unsupported("end_frame")
    }

    fn begin_render_pass(
        &self,
        command_buffer: &CommandBuffer,
        render_pass: &RenderPass,
        secondary: bool,
    ) -> Result<(), GraphicsError> {
        unsupported("begin_render_pass")
    }

    fn next_render_subpass(
        &self,
        command_buffer: &CommandBuffer,
        render_pass: &RenderPass,
        subpass: u32,
        secondary: bool,
    ) -> Result<(), GraphicsError> {
        unsupported("next_render_subpass")
    }

    fn end_render_pass(
        &self,
        command_buffer: &CommandBuffer,
        render_pass: &RenderPass,
    ) -> Result<(), GraphicsError> {
        unsupported("end_render_pass")
    }

    fn draw(
        &self,
        command_buffer: &CommandBuffer,
        range: &DrawRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        unsupported("draw")
    }

    fn draw_indexed(
        &self,
        command_buffer: &CommandBuffer,
        range: &DrawIndexedRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        unsupported("draw_indexed")
    }

    fn dispatch_compute(
        &self,
        command_buffer: &CommandBuffer,
        x: u32,
        y: u32,
        z: u32,
    ) -> Result<(), GraphicsError> {
        unsupported("dispatch_compute")
    }

    fn dispatch_compute_indirect(
        &self,
        command_buffer: &CommandBuffer,
        buffer: &GfxBuffer,
        offset: usize,
    ) -> Result<(), GraphicsError> {
        unsupported("dispatch_compute_indirect")
    }
}

/// Backend to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// In-memory backend for testing.
    #[default]
    Dummy,
}

/// Create a backend of the given kind.
pub fn create_backend(kind: BackendKind) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    let backend: Arc<dyn GpuBackend> = match kind {
        BackendKind::Dummy => Arc::new(DummyBackend::new()),
    };
    log::info!("Using {} backend", backend.name());
    Ok(backend)
}

static_assertions::assert_impl_all!(BackendHandle: Send, Sync);
static_assertions::assert_obj_safe!(GpuBackend);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dummy_backend() {
        let backend = create_backend(BackendKind::Dummy).unwrap();
        assert_eq!(backend.name(), "Dummy");
        assert!(backend.operations().contains(BackendOperations::TEXTURE_LIFECYCLE));
    }

    #[test]
    fn test_lifecycle_groups() {
        assert!(BackendOperations::TEXTURE_LIFECYCLE.contains(BackendOperations::TEXTURE_DESTROY));
        assert!(!BackendOperations::SHADER_LIFECYCLE.contains(BackendOperations::SHADER_BIND));
    }
}
