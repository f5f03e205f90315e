//! Shader modules: named collections of compiled pipelines.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::error::{DestroyError, GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;

use super::program::{ShaderPipeline, UniformKind};

/// A loaded shader module.
///
/// Shared as `Arc<ShaderModule>` by the shaders created from it, and only
/// destroyed once no shader references it.
pub struct ShaderModule {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    name: String,
    pipelines: Vec<ShaderPipeline>,
    native_subpass_input: bool,
}

impl ShaderModule {
    /// Create a shader module from reflected pipelines.
    ///
    /// `native_subpass_input` is set when the compiled target has its own
    /// subpass input type. Without it, subpass inputs are read as ordinary
    /// textures or images, and material elements of either kind may back them.
    pub fn create(
        manager: &Arc<ResourceManager>,
        name: &str,
        pipelines: Vec<ShaderPipeline>,
        native_subpass_input: bool,
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_scope!("ShaderModule::create");
        manager.require(
            BackendOperations::SHADER_MODULE_CREATE | BackendOperations::SHADER_MODULE_DESTROY,
            "shader modules",
        )?;

        if name.is_empty() {
            return Err(reject!(InvalidArgument, "shader module name must not be empty"));
        }
        if pipelines.is_empty() {
            return Err(reject!(
                InvalidArgument,
                "shader module '{}' doesn't contain any pipelines",
                name
            ));
        }

        let mut names = HashSet::with_capacity(pipelines.len());
        for pipeline in &pipelines {
            if !names.insert(pipeline.name.as_str()) {
                return Err(reject!(
                    InvalidArgument,
                    "pipeline '{}' specified multiple times in shader module '{}'",
                    pipeline.name,
                    name
                ));
            }
            if pipeline.stages.is_empty() {
                return Err(reject!(
                    InvalidArgument,
                    "pipeline '{}' in shader module '{}' has no stages",
                    pipeline.name,
                    name
                ));
            }
            for uniform in &pipeline.uniforms {
                let struct_valid = match (uniform.kind, uniform.struct_index) {
                    (_, Some(index)) => index < pipeline.structs.len(),
                    (UniformKind::PushConstant, None) => false,
                    _ => true,
                };
                if !struct_valid {
                    return Err(reject!(
                        InvalidArgument,
                        "uniform '{}' of pipeline '{}' refers to a missing struct",
                        uniform.name,
                        pipeline.name
                    ));
                }
            }
        }

        manager.ensure_context()?;
        let handle = manager.backend().create_shader_module(name, &pipelines)?;
        manager.counters.shader_modules.fetch_add(1, Ordering::AcqRel);

        let module = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            name: name.to_string(),
            pipelines,
            native_subpass_input,
        };
        log::trace!(
            "ShaderModule: created '{}' with {} pipelines",
            module.name,
            module.pipelines.len()
        );
        Ok(Arc::new(module))
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> BackendHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pipelines in declaration order.
    pub fn pipelines(&self) -> &[ShaderPipeline] {
        &self.pipelines
    }

    /// Number of pipelines, each of which can become a shader.
    pub fn shader_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Find the index of a pipeline by name.
    pub fn find_pipeline(&self, name: &str) -> Option<usize> {
        self.pipelines.iter().position(|pipeline| pipeline.name == name)
    }

    /// Whether the compiled target has a native subpass input type.
    pub fn has_native_subpass_input(&self) -> bool {
        self.native_subpass_input
    }

    /// Destroy the module.
    ///
    /// Fails with [`GraphicsError::InvalidState`] while shaders still use it.
    pub fn destroy(module: Arc<Self>) -> Result<(), DestroyError<Arc<Self>>> {
        profile_scope!("ShaderModule::destroy");
        let module = match Arc::try_unwrap(module) {
            Ok(module) => module,
            Err(shared) => {
                let err = reject!(
                    InvalidState,
                    "shader module '{}' is still used by {} shaders",
                    shared.name,
                    Arc::strong_count(&shared) - 1
                );
                return Err(DestroyError::new(shared, err));
            }
        };

        if let Err(err) = module.manager.ensure_context() {
            return Err(DestroyError::new(Arc::new(module), err));
        }
        if let Err(err) = module.manager.backend().destroy_shader_module(&module) {
            return Err(DestroyError::new(Arc::new(module), err));
        }

        module
            .manager
            .counters
            .shader_modules
            .fetch_sub(1, Ordering::AcqRel);
        log::trace!("ShaderModule: destroyed '{}'", module.name);
        Ok(())
    }
}

impl fmt::Debug for ShaderModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderModule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pipelines", &self.pipelines.len())
            .field("native_subpass_input", &self.native_subpass_input)
            .finish()
    }
}

static_assertions::assert_impl_all!(ShaderModule: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::shader::{ShaderStages, ShaderUniform};

    fn manager() -> Arc<ResourceManager> {
        ResourceManager::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_create_and_destroy() {
        let manager = manager();
        let module = ShaderModule::create(
            &manager,
            "basic",
            vec![
                ShaderPipeline::new("opaque", ShaderStages::VERTEX | ShaderStages::FRAGMENT),
                ShaderPipeline::new("shadow", ShaderStages::VERTEX),
            ],
            true,
        )
        .unwrap();
        assert_eq!(module.shader_count(), 2);
        assert_eq!(module.find_pipeline("shadow"), Some(1));
        assert_eq!(module.find_pipeline("missing"), None);
        assert_eq!(manager.statistics().shader_modules, 1);

        let extra = Arc::clone(&module);
        let err = ShaderModule::destroy(module).unwrap_err();
        assert!(matches!(err.error, GraphicsError::InvalidState(_)));
        drop(err);

        ShaderModule::destroy(extra).unwrap();
        assert_eq!(manager.statistics().shader_modules, 0);
    }

    #[test]
    fn test_invalid_modules() {
        let manager = manager();
        assert!(ShaderModule::create(&manager, "empty", Vec::new(), true).is_err());

        let pipeline = ShaderPipeline::new("opaque", ShaderStages::VERTEX);
        assert!(
            ShaderModule::create(&manager, "dup", vec![pipeline.clone(), pipeline], true).is_err()
        );

        let dangling = ShaderPipeline::new("opaque", ShaderStages::VERTEX).with_uniform(
            ShaderUniform::new("Constants", UniformKind::PushConstant),
        );
        assert!(matches!(
            ShaderModule::create(&manager, "dangling", vec![dangling], true),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert_eq!(manager.statistics().shader_modules, 0);
    }

    #[test]
    fn test_missing_backend_support() {
        let backend =
            DummyBackend::new().without_operations(BackendOperations::SHADER_MODULE_DESTROY);
        let manager = ResourceManager::new(Arc::new(backend));
        let err = ShaderModule::create(
            &manager,
            "basic",
            vec![ShaderPipeline::new("opaque", ShaderStages::VERTEX)],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, GraphicsError::Unsupported(_)));
    }
}
