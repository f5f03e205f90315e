//! Common utilities for HAL integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

use std::sync::Arc;

use redlilium_hal::materials::{ScalarKind, ShaderType};
use redlilium_hal::shader::{ShaderStructMember, ShaderUniform, UniformKind};
use redlilium_hal::{
    BackendKind, CommandBuffer, CommandBufferUsage, DummyBackend, GpuBackend, MaterialDesc,
    MaterialElement, MaterialType, RenderPass, RenderSubpassInfo, Renderer, ResourceCapabilities,
    ResourceManager, ShaderModule, ShaderPipeline, ShaderStages, ShaderVariableElement,
    ShaderVariableGroupDesc, create_backend,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// In-memory backend with no GPU.
    Dummy,
}

impl Backend {
    /// Check if this backend is currently available.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Dummy => cfg!(feature = "dummy"),
        }
    }

    /// Get the backend name for display.
    #[allow(dead_code)]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Dummy => "dummy",
        }
    }

    /// Backend kind passed to [`create_backend`].
    pub fn kind(self) -> BackendKind {
        match self {
            Backend::Dummy => BackendKind::Dummy,
        }
    }

    /// Create the backend with custom capabilities.
    ///
    /// Only the dummy backend can pretend to have other limits than the device it runs on.
    pub fn with_capabilities(self, capabilities: ResourceCapabilities) -> Arc<dyn GpuBackend> {
        match self {
            Backend::Dummy => Arc::new(DummyBackend::new().with_capabilities(capabilities)),
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context providing a resource manager and renderer.
///
/// The renderer is inside a frame for the lifetime of the context, so command
/// buffers created through [`TestContext::command_buffer`] can record right away.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    /// Resource manager for creating resources.
    pub manager: Arc<ResourceManager>,
    /// Renderer owning the main command buffer.
    pub renderer: Renderer,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not available.
    pub fn new(backend: Backend) -> Option<Self> {
        if !backend.is_available() {
            return None;
        }
        let gpu = create_backend(backend.kind()).ok()?;
        Self::with_backend(backend, gpu)
    }

    /// Create a test context whose backend declares `capabilities`.
    #[allow(dead_code)]
    pub fn with_capabilities(backend: Backend, capabilities: ResourceCapabilities) -> Option<Self> {
        if !backend.is_available() {
            return None;
        }
        Self::with_backend(backend, backend.with_capabilities(capabilities))
    }

    fn with_backend(backend: Backend, gpu: Arc<dyn GpuBackend>) -> Option<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        let manager = ResourceManager::new(gpu);
        let mut renderer = Renderer::new(&manager);
        renderer.begin_frame().ok()?;
        Some(Self {
            backend,
            manager,
            renderer,
        })
    }

    /// Create a primary command buffer that is already recording.
    pub fn command_buffer(&self) -> CommandBuffer {
        let mut command_buffer = CommandBuffer::new(&self.manager, CommandBufferUsage::empty());
        command_buffer
            .begin()
            .expect("Failed to begin command buffer");
        command_buffer
    }

    /// Create a render pass with a single subpass.
    pub fn render_pass(&self) -> RenderPass {
        RenderPass::create(&self.manager, "main", &[], &[RenderSubpassInfo::new("color")])
            .expect("Failed to create render pass")
    }

    /// Create a material description.
    pub fn material_desc(&self, elements: &[MaterialElement]) -> Arc<MaterialDesc> {
        MaterialDesc::create(&self.manager, elements).expect("Failed to create material description")
    }

    /// Create a shader module from pipelines.
    pub fn shader_module(&self, pipelines: Vec<ShaderPipeline>) -> Arc<ShaderModule> {
        ShaderModule::create(&self.manager, "test", pipelines, true)
            .expect("Failed to create shader module")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if self.renderer.is_in_frame() {
            let _ = self.renderer.end_frame();
        }
    }
}

// ============================================================================
// Shader Helpers
// ============================================================================

#[allow(dead_code)]
pub const VEC4: ShaderType = ShaderType::Vector(ScalarKind::Float, 4);

#[allow(dead_code)]
pub const MAT4: ShaderType = ShaderType::Matrix {
    double: false,
    columns: 4,
    rows: 4,
};

#[allow(dead_code)]
pub const MAT4X3: ShaderType = ShaderType::Matrix {
    double: false,
    columns: 4,
    rows: 3,
};

/// A graphics pipeline sampling `diffuse`.
#[allow(dead_code)]
pub fn textured_pipeline(name: &str) -> ShaderPipeline {
    ShaderPipeline::new(name, ShaderStages::VERTEX | ShaderStages::FRAGMENT)
        .with_uniform(ShaderUniform::new("diffuse", UniformKind::SampledImage))
}

/// A graphics pipeline reading a `Skin` variable group of 16 bones and a tint.
#[allow(dead_code)]
pub fn skinned_pipeline(bones: ShaderStructMember) -> ShaderPipeline {
    ShaderPipeline::new("skinned", ShaderStages::VERTEX | ShaderStages::FRAGMENT).with_struct_uniform(
        "Skin",
        UniformKind::Block,
        [bones, ShaderStructMember::new("tint", VEC4)],
    )
}

/// Variable group matching [`skinned_pipeline`] with 16 column-major bones.
#[allow(dead_code)]
pub fn skin_group(ctx: &TestContext) -> Arc<ShaderVariableGroupDesc> {
    ShaderVariableGroupDesc::create(
        &ctx.manager,
        &[
            ShaderVariableElement::new("bones", MaterialType::Mat4x3).with_count(16),
            ShaderVariableElement::new("tint", MaterialType::Vec4),
        ],
    )
    .expect("Failed to create variable group description")
}
