//! Shaders and their binding rules.
//!
//! A [`ShaderModule`] holds the pipelines reflected from a compiled program.
//! A [`Shader`] is one pipeline of a module paired with the [`MaterialDesc`]
//! it reads from. The pairing is validated once, when the shader is created:
//!
//! - every uniform needs a material element of a matching kind
//! - variable groups must match the reflected block member by member
//! - push constant members resolve against the description, or against exactly
//!   one variable group when the device has no uniform block buffers
//! - the stages, compute work group and clip/cull distances must fit the
//!   device limits
//!
//! # Binding
//!
//! Graphics shaders are bound inside a render pass whose commands are recorded
//! inline, one at a time. Compute shaders are bound inside a frame but outside
//! of any render pass. Updates and unbinding apply only to the shader that is
//! currently bound.
//!
//! ```ignore
//! let shader = Shader::create_by_name(&manager, &module, "opaque", &material_desc)?;
//! render_pass.begin(&mut command_buffer, false)?;
//! shader.bind(&mut command_buffer, &material, Some(&globals), None)?;
//! renderer.draw(&command_buffer, vertex_count, &DrawRange::new(vertex_count), PrimitiveType::TriangleList)?;
//! shader.unbind(&mut command_buffer)?;
//! render_pass.end(&mut command_buffer)?;
//! ```

mod compat;
mod module;
mod program;
mod reflect;
mod render_states;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::command_buffer::{CommandBuffer, CommandBufferUsage};
use crate::error::{DestroyError, GraphicsError, reject};
use crate::materials::{Material, MaterialBinding, MaterialDesc, SharedMaterialValues, verify_shared_values};
use crate::profiling::profile_scope;
use crate::resource_manager::{ResourceCapabilities, ResourceManager};
use crate::types::BufferUsage;

use compat::{CompatibilityTarget, compatibility_issues};

pub use module::ShaderModule;
pub use program::{
    ShaderPipeline, ShaderStages, ShaderStruct, ShaderStructMember, ShaderUniform, UniformKind,
};
pub use reflect::PipelineEntryPoints;
pub use render_states::DynamicRenderStates;

/// A pipeline of a shader module, validated against a material description.
pub struct Shader {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    module: Arc<ShaderModule>,
    pipeline_index: usize,
    material_desc: Arc<MaterialDesc>,
}

impl Shader {
    /// Create a shader from the pipeline with the given name.
    pub fn create_by_name(
        manager: &Arc<ResourceManager>,
        module: &Arc<ShaderModule>,
        name: &str,
        material_desc: &Arc<MaterialDesc>,
    ) -> Result<Self, GraphicsError> {
        let Some(index) = module.find_pipeline(name) else {
            return Err(reject!(
                NotFound,
                "shader '{}' not found in shader module '{}'",
                name,
                module.name()
            ));
        };
        Self::create_by_index(manager, module, index, material_desc)
    }

    /// Create a shader from the pipeline at `index`.
    ///
    /// Every incompatibility between the pipeline and `material_desc` is logged
    /// before the shader is rejected with [`GraphicsError::Incompatible`].
    pub fn create_by_index(
        manager: &Arc<ResourceManager>,
        module: &Arc<ShaderModule>,
        index: usize,
        material_desc: &Arc<MaterialDesc>,
    ) -> Result<Self, GraphicsError> {
        profile_scope!("Shader::create");
        manager.require(BackendOperations::SHADER_LIFECYCLE, "shaders")?;
        if !Arc::ptr_eq(module.manager(), manager) || !Arc::ptr_eq(material_desc.manager(), manager) {
            return Err(reject!(
                InvalidArgument,
                "shader module and material description must be created with the same resource manager as the shader"
            ));
        }
        let Some(pipeline) = module.pipelines().get(index) else {
            return Err(reject!(
                OutOfRange,
                "shader index {} is out of range for shader module '{}' with {} shaders",
                index,
                module.name(),
                module.shader_count()
            ));
        };

        let capabilities = manager.capabilities();
        let target = CompatibilityTarget {
            native_subpass_input: module.has_native_subpass_input(),
            uniform_blocks: capabilities
                .supported_buffers
                .contains(BufferUsage::UNIFORM_BLOCK),
            backend: manager.backend(),
        };
        let issues = compatibility_issues(&target, pipeline, material_desc);
        if !issues.is_empty() {
            for issue in &issues {
                log::error!("Shader: {}", issue);
            }
            return Err(reject!(
                Incompatible,
                "material description isn't compatible with shader '{}': {}",
                pipeline.name,
                issues.join("; ")
            ));
        }
        check_capabilities(capabilities, pipeline)?;

        manager.ensure_context()?;
        let handle = manager
            .backend()
            .create_shader(module, pipeline, material_desc)?;
        manager.counters.shaders.fetch_add(1, Ordering::AcqRel);

        let shader = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            module: Arc::clone(module),
            pipeline_index: index,
            material_desc: Arc::clone(material_desc),
        };
        log::trace!("Shader: created '{}' ({})", pipeline.name, shader.id);
        Ok(shader)
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

    /// The module the shader was created from.
    pub fn module(&self) -> &Arc<ShaderModule> {
        &self.module
    }

    pub fn pipeline_index(&self) -> usize {
        self.pipeline_index
    }

    pub fn pipeline(&self) -> &ShaderPipeline {
        &self.module.pipelines()[self.pipeline_index]
    }

    pub fn name(&self) -> &str {
        &self.pipeline().name
    }

    /// The material description the shader was validated against.
    pub fn material_desc(&self) -> &Arc<MaterialDesc> {
        &self.material_desc
    }

    /// Whether the pipeline has all of `stages`.
    pub fn has_stage(&self, stages: ShaderStages) -> bool {
        self.pipeline().stages.contains(stages)
    }

    fn check_command_buffer(&self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        if !Arc::ptr_eq(&self.manager, command_buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "shader '{}' and the command buffer were created with different resource managers",
                self.name()
            ));
        }
        Ok(())
    }

    fn check_material(&self, material: &Material) -> Result<(), GraphicsError> {
        if !Arc::ptr_eq(material.description(), &self.material_desc) {
            return Err(reject!(
                Incompatible,
                "material description for the material doesn't match shader '{}'",
                self.name()
            ));
        }
        Ok(())
    }

    fn check_inline_commands(&self, command_buffer: &CommandBuffer, operation: &str) -> Result<(), GraphicsError> {
        if command_buffer.secondary_render_pass_commands {
            return Err(reject!(
                InvalidState,
                "{} shader '{}' can only be done with commands recorded inline in the render pass",
                operation,
                self.name()
            ));
        }
        Ok(())
    }

    fn check_bound(&self, bound: Option<u64>, operation: &str) -> Result<(), GraphicsError> {
        if bound != Some(self.id) {
            return Err(reject!(
                InvalidState,
                "{} shader '{}' requires it to be the currently bound shader",
                operation,
                self.name()
            ));
        }
        Ok(())
    }

    /// Bind the shader for drawing inside the active render pass.
    ///
    /// `global_values` must provide every element of the material description
    /// with the [`MaterialBinding::Global`] binding.
    pub fn bind(
        &self,
        command_buffer: &mut CommandBuffer,
        material: &Material,
        global_values: Option<&SharedMaterialValues>,
        render_states: Option<&DynamicRenderStates>,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Shader::bind");
        self.manager.require(
            BackendOperations::SHADER_BIND | BackendOperations::SHADER_UNBIND,
            "shader binding",
        )?;
        self.check_command_buffer(command_buffer)?;
        if !self.has_stage(ShaderStages::VERTEX) {
            return Err(reject!(
                InvalidArgument,
                "shader '{}' has no vertex stage and can't be bound for drawing",
                self.name()
            ));
        }
        self.check_material(material)?;
        verify_shared_values(&self.material_desc, global_values, MaterialBinding::Global, self.name())?;
        if let Some(render_states) = render_states {
            render_states.validate()?;
        }

        if command_buffer.bound_render_pass.is_none() {
            return Err(reject!(
                InvalidState,
                "shader '{}' can only be bound within a render pass",
                self.name()
            ));
        }
        self.check_inline_commands(command_buffer, "binding")?;
        if command_buffer.bound_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "can't bind shader '{}' while another shader is bound",
                self.name()
            ));
        }

        self.manager.backend().bind_shader(
            command_buffer,
            self,
            material,
            global_values,
            render_states,
        )?;
        command_buffer.bound_shader = Some(self.id);
        log::trace!("Shader: bound '{}' on {}", self.name(), command_buffer.id());
        Ok(())
    }

    /// Replace the instance values of the bound shader.
    pub fn update_instance_values(
        &self,
        command_buffer: &CommandBuffer,
        instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Shader::update_instance_values");
        self.manager.require(
            BackendOperations::SHADER_UPDATE_INSTANCE_VALUES,
            "shader instance value updates",
        )?;
        self.check_command_buffer(command_buffer)?;
        instance_values.verify(&self.material_desc, MaterialBinding::Instance, self.name())?;
        self.check_inline_commands(command_buffer, "updating instance values for")?;
        self.check_bound(command_buffer.bound_shader, "updating instance values for")?;

        self.manager
            .backend()
            .update_shader_instance_values(command_buffer, self, instance_values)
    }

    /// Replace the dynamic render states of the bound shader.
    pub fn update_dynamic_render_states(
        &self,
        command_buffer: &CommandBuffer,
        render_states: &DynamicRenderStates,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Shader::update_dynamic_render_states");
        self.manager.require(
            BackendOperations::SHADER_UPDATE_DYNAMIC_RENDER_STATES,
            "dynamic render state updates",
        )?;
        self.check_command_buffer(command_buffer)?;
        render_states.validate()?;
        self.check_inline_commands(command_buffer, "updating render states for")?;
        self.check_bound(command_buffer.bound_shader, "updating render states for")?;

        self.manager
            .backend()
            .update_shader_dynamic_render_states(command_buffer, self, render_states)
    }

    /// Unbind the shader. It must be the bound shader and the render pass must still be active.
    pub fn unbind(&self, command_buffer: &mut CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("Shader::unbind");
        self.manager
            .require(BackendOperations::SHADER_UNBIND, "shader binding")?;
        self.check_command_buffer(command_buffer)?;
        if command_buffer.bound_render_pass.is_none() {
            return Err(reject!(
                InvalidState,
                "shader '{}' can only be unbound within a render pass",
                self.name()
            ));
        }
        self.check_inline_commands(command_buffer, "unbinding")?;
        self.check_bound(command_buffer.bound_shader, "unbinding")?;

        self.manager.backend().unbind_shader(command_buffer, self)?;
        command_buffer.bound_shader = None;
        log::trace!("Shader: unbound '{}' from {}", self.name(), command_buffer.id());
        Ok(())
    }

    /// Bind the shader for compute dispatches, inside a frame and outside of any render pass.
    pub fn bind_compute(
        &self,
        command_buffer: &mut CommandBuffer,
        material: &Material,
        global_values: Option<&SharedMaterialValues>,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Shader::bind_compute");
        self.manager.require(
            BackendOperations::SHADER_BIND_COMPUTE | BackendOperations::SHADER_UNBIND_COMPUTE,
            "compute shader binding",
        )?;
        self.check_command_buffer(command_buffer)?;
        if !self.has_stage(ShaderStages::COMPUTE) {
            return Err(reject!(
                InvalidArgument,
                "shader '{}' has no compute stage",
                self.name()
            ));
        }
        if !self.manager.capabilities().has_compute_shaders() {
            return Err(reject!(
                CapabilityExceeded,
                "current target doesn't support compute shaders"
            ));
        }
        self.check_material(material)?;
        verify_shared_values(&self.material_desc, global_values, MaterialBinding::Global, self.name())?;

        command_buffer.require_frame_outside_render_pass("binding a compute shader")?;
        if command_buffer.usage().contains(CommandBufferUsage::RESOURCE) {
            return Err(reject!(
                InvalidState,
                "compute shader '{}' can't be bound to a resource command buffer",
                self.name()
            ));
        }
        if command_buffer.bound_compute_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "can't bind compute shader '{}' while another compute shader is bound",
                self.name()
            ));
        }

        self.manager
            .backend()
            .bind_compute_shader(command_buffer, self, material, global_values)?;
        command_buffer.bound_compute_shader = Some(self.id);
        log::trace!("Shader: bound compute '{}' on {}", self.name(), command_buffer.id());
        Ok(())
    }

    /// Replace the instance values of the bound compute shader.
    pub fn update_compute_instance_values(
        &self,
        command_buffer: &CommandBuffer,
        instance_values: &SharedMaterialValues,
    ) -> Result<(), GraphicsError> {
        profile_scope!("Shader::update_compute_instance_values");
        self.manager.require(
            BackendOperations::SHADER_UPDATE_COMPUTE_INSTANCE_VALUES,
            "compute shader instance value updates",
        )?;
        self.check_command_buffer(command_buffer)?;
        instance_values.verify(&self.material_desc, MaterialBinding::Instance, self.name())?;
        self.check_bound(command_buffer.bound_compute_shader, "updating instance values for compute")?;

        self.manager
            .backend()
            .update_compute_shader_instance_values(command_buffer, self, instance_values)
    }

    /// Unbind the compute shader. It must be the bound compute shader.
    pub fn unbind_compute(&self, command_buffer: &mut CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("Shader::unbind_compute");
        self.manager
            .require(BackendOperations::SHADER_UNBIND_COMPUTE, "compute shader binding")?;
        self.check_command_buffer(command_buffer)?;
        if command_buffer.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "compute shader '{}' can't be unbound within a render pass",
                self.name()
            ));
        }
        self.check_bound(command_buffer.bound_compute_shader, "unbinding compute")?;

        self.manager
            .backend()
            .unbind_compute_shader(command_buffer, self)?;
        command_buffer.bound_compute_shader = None;
        log::trace!("Shader: unbound compute '{}' from {}", self.name(), command_buffer.id());
        Ok(())
    }

    /// Destroy the shader, releasing its module and material description.
    pub fn destroy(self) -> Result<(), DestroyError<Self>> {
        profile_scope!("Shader::destroy");
        if let Err(err) = self.manager.ensure_context() {
            return Err(DestroyError::new(self, err));
        }
        if let Err(err) = self.manager.backend().destroy_shader(&self) {
            return Err(DestroyError::new(self, err));
        }

        self.manager.counters.shaders.fetch_sub(1, Ordering::AcqRel);
        log::trace!("Shader: destroyed '{}' ({})", self.name(), self.id);
        Ok(())
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("module", &self.module.name())
            .field("material_desc", &self.material_desc.id())
            .finish()
    }
}

static_assertions::assert_impl_all!(Shader: Send, Sync);

/// Check the stages, compute work group and distances of a pipeline against the device.
fn check_capabilities(
    capabilities: &ResourceCapabilities,
    pipeline: &ShaderPipeline,
) -> Result<(), GraphicsError> {
    let name = &pipeline.name;
    if pipeline.stages.intersects(ShaderStages::TESSELLATION) && !capabilities.has_tessellation_shaders {
        return Err(reject!(
            CapabilityExceeded,
            "current target doesn't support tessellation shaders for shader '{}'",
            name
        ));
    }
    if pipeline.stages.contains(ShaderStages::GEOMETRY) && !capabilities.has_geometry_shaders {
        return Err(reject!(
            CapabilityExceeded,
            "current target doesn't support geometry shaders for shader '{}'",
            name
        ));
    }

    if pipeline.stages.contains(ShaderStages::COMPUTE) {
        if !capabilities.has_compute_shaders() {
            return Err(reject!(
                CapabilityExceeded,
                "current target doesn't support compute shaders for shader '{}'",
                name
            ));
        }
        let local_size = pipeline.compute_local_size;
        if pipeline.compute_invocations() == 0 {
            return Err(reject!(
                InvalidArgument,
                "compute local work group size {:?} for shader '{}' has no invocations",
                local_size,
                name
            ));
        }
        let max_size = capabilities.max_compute_local_work_group_size;
        if local_size.iter().zip(max_size).any(|(&size, max)| size > max) {
            return Err(reject!(
                CapabilityExceeded,
                "compute local work group size {:?} for shader '{}' is above the maximum {:?}",
                local_size,
                name,
                max_size
            ));
        }
        let max_invocations = capabilities.max_compute_local_work_group_invocations;
        if pipeline.compute_invocations() > u64::from(max_invocations) {
            return Err(reject!(
                CapabilityExceeded,
                "compute local work group for shader '{}' has {} invocations, above the maximum {}",
                name,
                pipeline.compute_invocations(),
                max_invocations
            ));
        }
    }

    let clip = pipeline.clip_distance_count;
    let cull = pipeline.cull_distance_count;
    if clip > capabilities.max_clip_distances {
        return Err(reject!(
            CapabilityExceeded,
            "shader '{}' uses {} clip distances, above the maximum {}",
            name,
            clip,
            capabilities.max_clip_distances
        ));
    }
    if cull > capabilities.max_cull_distances {
        return Err(reject!(
            CapabilityExceeded,
            "shader '{}' uses {} cull distances, above the maximum {}",
            name,
            cull,
            capabilities.max_cull_distances
        ));
    }
    if clip + cull > capabilities.max_combined_clip_and_cull_distances {
        return Err(reject!(
            CapabilityExceeded,
            "shader '{}' uses {} combined clip and cull distances, above the maximum {}",
            name,
            clip + cull,
            capabilities.max_combined_clip_and_cull_distances
        ));
    }
    Ok(())
}
