//! Frames, draws and compute dispatches.
//!
//! The [`Renderer`] owns the main command buffer, which records between
//! [`Renderer::begin_frame`] and [`Renderer::end_frame`] and is never begun,
//! ended or submitted directly. Draws and dispatches may be recorded on any
//! command buffer created from the same resource manager.

use std::sync::Arc;

use crate::backend::BackendOperations;
use crate::command_buffer::CommandBuffer;
use crate::error::{GraphicsError, reject};
use crate::profiling::{profile_plot, profile_scope};
use crate::resource_manager::ResourceManager;
use crate::resources::GfxBuffer;
use crate::types::{BufferUsage, DrawIndexedRange, DrawRange, PrimitiveType, is_buffer_range_valid};

/// Size of the indirect dispatch arguments: three `u32` group counts.
const DISPATCH_INDIRECT_SIZE: usize = 3 * std::mem::size_of::<u32>();

/// Frame and draw entry points of a resource manager.
pub struct Renderer {
    manager: Arc<ResourceManager>,
    main_command_buffer: CommandBuffer,
    frame_number: u64,
}

impl Renderer {
    /// Create the renderer and its main command buffer.
    pub fn new(manager: &Arc<ResourceManager>) -> Self {
        log::info!("Renderer: created for the {} backend", manager.backend().name());
        Self {
            manager: Arc::clone(manager),
            main_command_buffer: CommandBuffer::new_main(manager),
            frame_number: 0,
        }
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// The command buffer that records directly into the frame.
    pub fn main_command_buffer(&self) -> &CommandBuffer {
        &self.main_command_buffer
    }

    pub fn main_command_buffer_mut(&mut self) -> &mut CommandBuffer {
        &mut self.main_command_buffer
    }

    /// Number of frames ended so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Whether a frame is being recorded.
    pub fn is_in_frame(&self) -> bool {
        self.main_command_buffer.frame_active
    }

    fn require_main_thread(&self, operation: &str) -> Result<(), GraphicsError> {
        if !self.manager.is_main_thread() {
            return Err(reject!(InvalidState, "{} must be done on the main thread", operation));
        }
        Ok(())
    }

    /// Begin a frame.
    pub fn begin_frame(&mut self) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::begin_frame");
        self.manager.require(
            BackendOperations::FRAME_BEGIN | BackendOperations::FRAME_END,
            "frames",
        )?;
        self.require_main_thread("beginning a frame")?;
        if self.main_command_buffer.frame_active {
            return Err(reject!(
                InvalidState,
                "frame {} has already begun",
                self.frame_number
            ));
        }

        self.manager.backend().begin_frame()?;
        self.main_command_buffer.frame_active = true;
        log::trace!("Renderer: began frame {}", self.frame_number);
        Ok(())
    }

    /// End the frame. Render passes and compute shaders must be finished first.
    pub fn end_frame(&mut self) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::end_frame");
        self.manager
            .require(BackendOperations::FRAME_END, "frames")?;
        self.require_main_thread("ending a frame")?;
        let command_buffer = &self.main_command_buffer;
        if !command_buffer.frame_active {
            return Err(reject!(InvalidState, "no frame has begun"));
        }
        if command_buffer.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot end a frame while a render pass is active"
            ));
        }
        if command_buffer.bound_compute_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot end a frame while a compute shader is bound"
            ));
        }

        self.manager.backend().end_frame()?;
        self.main_command_buffer.frame_active = false;
        log::trace!("Renderer: ended frame {}", self.frame_number);
        self.frame_number += 1;
        profile_plot!("frame_number", self.frame_number as f64);
        Ok(())
    }

    fn check_command_buffer(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        if !Arc::ptr_eq(&self.manager, command_buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "command buffer {} was created with a different resource manager",
                command_buffer.id()
            ));
        }
        Ok(())
    }

    fn check_draw_state(&self, command_buffer: &CommandBuffer, operation: &str) -> Result<(), GraphicsError> {
        if command_buffer.secondary_render_pass_commands {
            return Err(reject!(
                InvalidState,
                "{} can only be done with commands recorded inline in the render pass",
                operation
            ));
        }
        if command_buffer.bound_shader.is_none() {
            return Err(reject!(InvalidState, "{} requires a bound shader", operation));
        }
        Ok(())
    }

    fn check_instances(&self, instance_count: u32, first_instance: u32) -> Result<(), GraphicsError> {
        let capabilities = self.manager.capabilities();
        if instance_count == 0 {
            return Err(reject!(InvalidArgument, "at least one instance must be drawn"));
        }
        if !capabilities.has_instanced_drawing && (instance_count != 1 || first_instance != 0) {
            return Err(reject!(
                CapabilityExceeded,
                "current target only supports drawing a single instance starting at 0, requested {} starting at {}",
                instance_count,
                first_instance
            ));
        }
        if !capabilities.has_start_instance && first_instance != 0 {
            return Err(reject!(
                CapabilityExceeded,
                "current target doesn't support drawing from instance {}",
                first_instance
            ));
        }
        Ok(())
    }

    /// Draw `range` out of `vertex_count` vertices of the bound geometry.
    pub fn draw(
        &self,
        command_buffer: &CommandBuffer,
        vertex_count: u32,
        range: &DrawRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::draw");
        self.manager.require(BackendOperations::DRAW, "drawing")?;
        self.check_command_buffer(command_buffer)?;
        if range.vertex_count == 0 {
            return Err(reject!(InvalidArgument, "at least one vertex must be drawn"));
        }
        let in_bounds = range
            .first_vertex
            .checked_add(range.vertex_count)
            .is_some_and(|end| end <= vertex_count);
        if !in_bounds {
            return Err(reject!(
                OutOfRange,
                "draw range of {} vertices from {} is out of range for {} vertices",
                range.vertex_count,
                range.first_vertex,
                vertex_count
            ));
        }
        self.check_instances(range.instance_count, range.first_instance)?;
        self.check_draw_state(command_buffer, "drawing")?;

        self.manager
            .backend()
            .draw(command_buffer, range, primitive)
    }

    /// Draw `range` out of `index_count` indices of the bound geometry.
    pub fn draw_indexed(
        &self,
        command_buffer: &CommandBuffer,
        index_count: u32,
        range: &DrawIndexedRange,
        primitive: PrimitiveType,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::draw_indexed");
        self.manager
            .require(BackendOperations::DRAW_INDEXED, "indexed drawing")?;
        self.check_command_buffer(command_buffer)?;
        if range.index_count == 0 {
            return Err(reject!(InvalidArgument, "at least one index must be drawn"));
        }
        let in_bounds = range
            .first_index
            .checked_add(range.index_count)
            .is_some_and(|end| end <= index_count);
        if !in_bounds {
            return Err(reject!(
                OutOfRange,
                "draw range of {} indices from {} is out of range for {} indices",
                range.index_count,
                range.first_index,
                index_count
            ));
        }
        self.check_instances(range.instance_count, range.first_instance)?;
        self.check_draw_state(command_buffer, "indexed drawing")?;

        self.manager
            .backend()
            .draw_indexed(command_buffer, range, primitive)
    }

    fn check_dispatch_state(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        if !self.manager.capabilities().has_compute_shaders() {
            return Err(reject!(
                CapabilityExceeded,
                "current target doesn't support compute shaders"
            ));
        }
        if command_buffer.bound_compute_shader.is_none() {
            return Err(reject!(InvalidState, "dispatching compute requires a bound compute shader"));
        }
        Ok(())
    }

    /// Dispatch `x * y * z` work groups with the bound compute shader.
    pub fn dispatch_compute(
        &self,
        command_buffer: &CommandBuffer,
        x: u32,
        y: u32,
        z: u32,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::dispatch_compute");
        self.manager
            .require(BackendOperations::DISPATCH_COMPUTE, "compute dispatches")?;
        self.check_command_buffer(command_buffer)?;
        let max = self.manager.capabilities().max_compute_work_group_size;
        if [x, y, z].iter().zip(max).any(|(&count, max)| count > max) {
            return Err(reject!(
                CapabilityExceeded,
                "dispatch size ({}, {}, {}) is above the maximum {:?}",
                x,
                y,
                z,
                max
            ));
        }
        self.check_dispatch_state(command_buffer)?;

        self.manager
            .backend()
            .dispatch_compute(command_buffer, x, y, z)
    }

    /// Dispatch with the work group counts stored in `buffer` at `offset`.
    pub fn dispatch_compute_indirect(
        &self,
        command_buffer: &CommandBuffer,
        buffer: &GfxBuffer,
        offset: usize,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Renderer::dispatch_compute_indirect");
        self.manager
            .require(BackendOperations::DISPATCH_COMPUTE, "compute dispatches")?;
        self.check_command_buffer(command_buffer)?;
        if !Arc::ptr_eq(&self.manager, buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "indirect dispatch buffer was created with a different resource manager"
            ));
        }
        if !buffer.usage().contains(BufferUsage::INDIRECT_DISPATCH) {
            return Err(reject!(
                InvalidArgument,
                "buffer {} must have indirect dispatch usage",
                buffer.id()
            ));
        }
        if offset % std::mem::size_of::<u32>() != 0 {
            return Err(reject!(
                InvalidArgument,
                "indirect dispatch offset {} must be a multiple of 4",
                offset
            ));
        }
        if !is_buffer_range_valid(offset, DISPATCH_INDIRECT_SIZE, buffer.size()) {
            return Err(reject!(
                OutOfRange,
                "indirect dispatch at offset {} is out of range for buffer of size {}",
                offset,
                buffer.size()
            ));
        }
        self.check_dispatch_state(command_buffer)?;

        self.manager
            .backend()
            .dispatch_compute_indirect(command_buffer, buffer, offset)
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("frame_number", &self.frame_number)
            .field("in_frame", &self.is_in_frame())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::command_buffer::CommandBufferUsage;
    use crate::materials::{Material, MaterialDesc};
    use crate::render_pass::{RenderPass, RenderSubpassInfo};
    use crate::resource_manager::ResourceCapabilities;
    use crate::shader::{Shader, ShaderModule, ShaderPipeline, ShaderStages};
    use crate::types::MemoryHints;

    struct Fixture {
        manager: Arc<ResourceManager>,
        renderer: Renderer,
        render_pass: RenderPass,
        material: Material,
        opaque: Shader,
        blur: Shader,
    }

    fn fixture(capabilities: ResourceCapabilities) -> Fixture {
        let manager =
            ResourceManager::new(Arc::new(DummyBackend::new().with_capabilities(capabilities)));
        let module = ShaderModule::create(
            &manager,
            "renderer",
            vec![
                ShaderPipeline::new("opaque", ShaderStages::VERTEX | ShaderStages::FRAGMENT),
                ShaderPipeline::new("blur", ShaderStages::COMPUTE),
            ],
            true,
        )
        .unwrap();
        let desc = MaterialDesc::create(&manager, &[]).unwrap();
        let opaque = Shader::create_by_name(&manager, &module, "opaque", &desc).unwrap();
        let blur = Shader::create_by_name(&manager, &module, "blur", &desc).unwrap();
        Fixture {
            renderer: Renderer::new(&manager),
            render_pass: RenderPass::create(&manager, "main", &[], &[RenderSubpassInfo::new("color")])
                .unwrap(),
            material: Material::new(&desc),
            manager,
            opaque,
            blur,
        }
    }

    #[test]
    fn test_frames() {
        let mut f = fixture(ResourceCapabilities::default());
        assert!(f.renderer.end_frame().is_err());
        f.renderer.begin_frame().unwrap();
        assert!(f.renderer.is_in_frame());
        assert!(f.renderer.begin_frame().is_err());

        let Fixture { renderer, render_pass, .. } = &mut f;
        render_pass
            .begin(renderer.main_command_buffer_mut(), false)
            .unwrap();
        assert!(renderer.end_frame().is_err());
        render_pass.end(renderer.main_command_buffer_mut()).unwrap();

        renderer.end_frame().unwrap();
        assert_eq!(renderer.frame_number(), 1);
        assert!(!renderer.is_in_frame());
    }

    #[test]
    fn test_frames_on_other_threads() {
        let mut f = fixture(ResourceCapabilities::default());
        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(matches!(
                    f.renderer.begin_frame(),
                    Err(GraphicsError::InvalidState(_))
                ));
            });
        });
        f.renderer.begin_frame().unwrap();
    }

    #[test]
    fn test_draw() {
        let mut f = fixture(ResourceCapabilities::default());
        f.renderer.begin_frame().unwrap();
        let Fixture { renderer, render_pass, material, opaque, .. } = &mut f;
        let range = DrawRange::new(6);

        // No render pass, so no shader can be bound.
        assert!(matches!(
            renderer.draw(renderer.main_command_buffer(), 6, &range, PrimitiveType::TriangleList),
            Err(GraphicsError::InvalidState(_))
        ));

        let mut command_buffer = CommandBuffer::new(renderer.manager(), CommandBufferUsage::empty());
        command_buffer.begin().unwrap();
        render_pass.begin(&mut command_buffer, false).unwrap();
        assert!(renderer.draw(&command_buffer, 6, &range, PrimitiveType::TriangleList).is_err());

        opaque.bind(&mut command_buffer, material, None, None).unwrap();
        renderer
            .draw(&command_buffer, 6, &range, PrimitiveType::TriangleList)
            .unwrap();
        assert!(matches!(
            renderer.draw(&command_buffer, 4, &range, PrimitiveType::TriangleList),
            Err(GraphicsError::OutOfRange(_))
        ));
        let mut shifted = range;
        shifted.first_vertex = u32::MAX;
        assert!(renderer.draw(&command_buffer, 6, &shifted, PrimitiveType::TriangleList).is_err());

        let instanced = DrawRange::new(6).with_instances(2, 8);
        renderer
            .draw(&command_buffer, 6, &instanced, PrimitiveType::TriangleList)
            .unwrap();

        let indexed = DrawIndexedRange::new(36);
        renderer
            .draw_indexed(&command_buffer, 36, &indexed, PrimitiveType::TriangleList)
            .unwrap();
        assert!(matches!(
            renderer.draw_indexed(&command_buffer, 12, &indexed, PrimitiveType::TriangleList),
            Err(GraphicsError::OutOfRange(_))
        ));

        opaque.unbind(&mut command_buffer).unwrap();
        render_pass.end(&mut command_buffer).unwrap();
        command_buffer.end().unwrap();
    }

    #[test]
    fn test_draw_instancing_limits() {
        let capabilities = ResourceCapabilities {
            has_instanced_drawing: false,
            has_start_instance: false,
            ..Default::default()
        };
        let mut f = fixture(capabilities);
        f.renderer.begin_frame().unwrap();
        let Fixture { renderer, render_pass, material, opaque, .. } = &mut f;

        let mut command_buffer = CommandBuffer::new(renderer.manager(), CommandBufferUsage::empty());
        command_buffer.begin().unwrap();
        render_pass.begin(&mut command_buffer, false).unwrap();
        opaque.bind(&mut command_buffer, material, None, None).unwrap();

        renderer
            .draw(&command_buffer, 3, &DrawRange::new(3), PrimitiveType::TriangleList)
            .unwrap();
        for range in [
            DrawRange::new(3).with_instances(0, 2),
            DrawRange::new(3).with_instances(1, 1),
        ] {
            assert!(matches!(
                renderer.draw(&command_buffer, 3, &range, PrimitiveType::TriangleList),
                Err(GraphicsError::CapabilityExceeded(_))
            ));
        }
        assert!(matches!(
            renderer.draw(&command_buffer, 3, &DrawRange::new(3).with_instances(0, 0), PrimitiveType::TriangleList),
            Err(GraphicsError::InvalidArgument(_))
        ));
        opaque.unbind(&mut command_buffer).unwrap();
        render_pass.end(&mut command_buffer).unwrap();
    }

    #[test]
    fn test_dispatch() {
        let mut f = fixture(ResourceCapabilities::default());
        f.renderer.begin_frame().unwrap();
        let Fixture { manager, renderer, material, blur, .. } = &mut f;

        let command_buffer = renderer.main_command_buffer_mut();
        assert!(matches!(
            Renderer::new(manager).dispatch_compute(command_buffer, 1, 1, 1),
            Err(GraphicsError::InvalidState(_))
        ));
        blur.bind_compute(command_buffer, material, None).unwrap();

        renderer
            .dispatch_compute(renderer.main_command_buffer(), 64, 64, 1)
            .unwrap();
        assert!(matches!(
            renderer.dispatch_compute(renderer.main_command_buffer(), 70000, 1, 1),
            Err(GraphicsError::CapabilityExceeded(_))
        ));

        let indirect = GfxBuffer::create(
            manager,
            BufferUsage::INDIRECT_DISPATCH,
            MemoryHints::GPU_ONLY,
            32,
            None,
        )
        .unwrap();
        let vertices =
            GfxBuffer::create(manager, BufferUsage::VERTEX, MemoryHints::GPU_ONLY, 32, None).unwrap();
        let main = renderer.main_command_buffer();
        renderer.dispatch_compute_indirect(main, &indirect, 20).unwrap();
        assert!(matches!(
            renderer.dispatch_compute_indirect(main, &indirect, 2),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            renderer.dispatch_compute_indirect(main, &indirect, 24),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            renderer.dispatch_compute_indirect(main, &vertices, 0),
            Err(GraphicsError::InvalidArgument(_))
        ));

        blur.unbind_compute(renderer.main_command_buffer_mut()).unwrap();
        renderer.end_frame().unwrap();
        indirect.destroy().unwrap();
        vertices.destroy().unwrap();
    }

    #[test]
    fn test_dispatch_without_compute_support() {
        let capabilities = ResourceCapabilities {
            max_compute_work_group_size: [0; 3],
            ..Default::default()
        };
        let manager =
            ResourceManager::new(Arc::new(DummyBackend::new().with_capabilities(capabilities)));
        let renderer = Renderer::new(&manager);
        assert!(matches!(
            renderer.dispatch_compute(renderer.main_command_buffer(), 1, 1, 1),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
    }
}
