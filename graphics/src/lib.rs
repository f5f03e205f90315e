//! # RedLilium HAL
//!
//! Backend-independent core of the RedLilium GPU abstraction.
//!
//! ## Overview
//!
//! This crate validates every GPU request before a backend performs it:
//! - [`ResourceManager`] - Capability limits, backend dispatch and resource counters
//! - [`TextureInfo`] - Texture shapes and the layout of their surfaces in memory
//! - [`Texture`] and [`GfxBuffer`] - Resources with usage and copy validation
//! - [`MaterialDesc`] and [`Shader`] - Material layouts and their compatibility with compiled shaders
//! - [`CommandBuffer`], [`RenderPass`] and [`Renderer`] - Frame, render pass and binding state
//!
//! Backends implement [`GpuBackend`]. The `dummy` backend keeps resource
//! contents in memory and is used for testing.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_hal::{BackendKind, ResourceManager, Renderer, create_backend};
//!
//! let manager = ResourceManager::new(create_backend(BackendKind::Dummy)?);
//! let mut renderer = Renderer::new(&manager);
//! renderer.begin_frame()?;
//! // Record render passes, draws and dispatches...
//! renderer.end_frame()?;
//! ```

pub mod backend;
pub mod command_buffer;
pub mod error;
pub mod materials;
pub mod profiling;
pub mod render_pass;
pub mod renderer;
pub mod resource_manager;
pub mod resources;
pub mod shader;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendHandle, BackendKind, BackendOperations, DummyBackend, GpuBackend, create_backend};
pub use command_buffer::{CommandBuffer, CommandBufferUsage};
pub use error::{DestroyError, GraphicsError};
pub use materials::{
    Material, MaterialBinding, MaterialDesc, MaterialElement, MaterialType, ShaderVariableElement,
    ShaderVariableGroup, ShaderVariableGroupDesc, SharedMaterialValues,
};
pub use render_pass::{AttachmentInfo, RenderPass, RenderSubpassInfo};
pub use renderer::Renderer;
pub use resource_manager::{ResourceCapabilities, ResourceManager, ResourceStatistics};
pub use resources::{GfxBuffer, Texture};
pub use shader::{
    DynamicRenderStates, PipelineEntryPoints, Shader, ShaderModule, ShaderPipeline, ShaderStages,
};
pub use types::{
    BufferUsage, CubeFace, DrawIndexedRange, DrawRange, FormatSupport, MemoryHints, PrimitiveType,
    TextureDim, TextureFormat, TextureInfo, TexturePosition, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("RedLilium HAL v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "Dummy");
    }

    #[test]
    fn test_frame_roundtrip() {
        init();
        let manager = ResourceManager::new(create_backend(BackendKind::Dummy).unwrap());
        let mut renderer = Renderer::new(&manager);
        renderer.begin_frame().unwrap();
        renderer.end_frame().unwrap();
        assert_eq!(renderer.frame_number(), 1);
    }
}
