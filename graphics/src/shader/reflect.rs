//! Reflection of shader pipelines from a naga IR module.
//!
//! Each pipeline is made of entry points of the module. Its uniforms are the
//! global resources those entry points use, in declaration order:
//!
//! | naga global                       | uniform kind                  |
//! |-----------------------------------|-------------------------------|
//! | `var<uniform>`                    | [`UniformKind::Block`]        |
//! | `var<storage>`                    | [`UniformKind::BlockBuffer`]  |
//! | `var<push_constant>`              | [`UniformKind::PushConstant`] |
//! | storage texture                   | [`UniformKind::Image`]        |
//! | sampled or depth texture          | [`UniformKind::SampledImage`] |
//!
//! Samplers are paired with textures by the backend and aren't reflected.

use std::sync::Arc;

use naga::{AddressSpace, ArraySize, Binding, BuiltIn, Handle, ImageClass, TypeInner};

use crate::error::{GraphicsError, reject};
use crate::materials::{ScalarKind, ShaderType};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;

use super::module::ShaderModule;
use super::program::{
    ShaderPipeline, ShaderStages, ShaderStruct, ShaderStructMember, ShaderUniform, UniformKind,
};

/// Entry points of a module that make up one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineEntryPoints<'a> {
    pub name: &'a str,
    pub entry_points: &'a [&'a str],
}

impl<'a> PipelineEntryPoints<'a> {
    pub const fn new(name: &'a str, entry_points: &'a [&'a str]) -> Self {
        Self { name, entry_points }
    }
}

impl ShaderModule {
    /// Parse WGSL source and create a module from its reflected pipelines.
    ///
    /// WGSL has no subpass input type, so the module never has native subpass inputs.
    pub fn from_wgsl(
        manager: &Arc<ResourceManager>,
        name: &str,
        source: &str,
        pipelines: &[PipelineEntryPoints<'_>],
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_scope!("ShaderModule::from_wgsl");
        let module = naga::front::wgsl::parse_str(source).map_err(|err| {
            reject!(
                InvalidArgument,
                "failed to parse shader module '{}':\n{}",
                name,
                err.emit_to_string(source)
            )
        })?;
        Self::from_naga(manager, name, &module, pipelines, false)
    }

    /// Validate a naga module and create a shader module from its reflected pipelines.
    pub fn from_naga(
        manager: &Arc<ResourceManager>,
        name: &str,
        module: &naga::Module,
        pipelines: &[PipelineEntryPoints<'_>],
        native_subpass_input: bool,
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_scope!("ShaderModule::from_naga");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        let info = validator.validate(module).map_err(|err| {
            reject!(InvalidArgument, "shader module '{}' failed validation: {}", name, err)
        })?;

        let reflected = pipelines
            .iter()
            .map(|pipeline| reflect_pipeline(module, &info, pipeline))
            .collect::<Result<Vec<_>, _>>()?;
        Self::create(manager, name, reflected, native_subpass_input)
    }
}

fn reflect_pipeline(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    entry_points: &PipelineEntryPoints<'_>,
) -> Result<ShaderPipeline, GraphicsError> {
    let mut pipeline = ShaderPipeline::new(entry_points.name, ShaderStages::empty());
    let mut used = Vec::new();

    for &entry_name in entry_points.entry_points {
        let Some(index) = module
            .entry_points
            .iter()
            .position(|entry| entry.name == entry_name)
        else {
            return Err(reject!(
                NotFound,
                "entry point '{}' for pipeline '{}' not found",
                entry_name,
                entry_points.name
            ));
        };
        let entry = &module.entry_points[index];

        let stage = match entry.stage {
            naga::ShaderStage::Vertex => ShaderStages::VERTEX,
            naga::ShaderStage::Fragment => ShaderStages::FRAGMENT,
            naga::ShaderStage::Compute => ShaderStages::COMPUTE,
            #[allow(unreachable_patterns)]
            other => {
                return Err(reject!(
                    InvalidArgument,
                    "{:?} entry point '{}' can't be used in pipeline '{}'",
                    other,
                    entry_name,
                    entry_points.name
                ));
            }
        };
        if pipeline.stages.intersects(stage) {
            return Err(reject!(
                InvalidArgument,
                "pipeline '{}' has multiple {:?} entry points",
                entry_points.name,
                stage
            ));
        }
        pipeline.stages |= stage;

        if stage == ShaderStages::COMPUTE {
            pipeline.compute_local_size = entry.workgroup_size;
        } else if stage == ShaderStages::VERTEX {
            let (clip, cull) = distance_counts(module, &entry.function);
            pipeline.clip_distance_count = clip;
            pipeline.cull_distance_count = cull;
        }

        let function_info = info.get_entry_point(index);
        for (handle, _) in module.global_variables.iter() {
            if !function_info[handle].is_empty() && !used.contains(&handle) {
                used.push(handle);
            }
        }
    }

    used.sort_by_key(|handle| handle.index());
    for handle in used {
        reflect_global(module, &module.global_variables[handle], &mut pipeline);
    }
    Ok(pipeline)
}

fn reflect_global(module: &naga::Module, global: &naga::GlobalVariable, pipeline: &mut ShaderPipeline) {
    let Some(name) = &global.name else {
        log::warn!("ShaderModule: skipping unnamed global in pipeline '{}'", pipeline.name);
        return;
    };

    let mut ty = global.ty;
    let mut array_lengths = Vec::new();
    while let TypeInner::BindingArray { base, size } = module.types[ty].inner {
        array_lengths.push(array_length(size));
        ty = base;
    }
    let inner = &module.types[ty].inner;

    let kind = match global.space {
        AddressSpace::Uniform => UniformKind::Block,
        AddressSpace::Storage { .. } => UniformKind::BlockBuffer,
        AddressSpace::PushConstant => UniformKind::PushConstant,
        AddressSpace::Handle => match inner {
            TypeInner::Image {
                class: ImageClass::Storage { .. },
                ..
            } => UniformKind::Image,
            TypeInner::Image { .. } => UniformKind::SampledImage,
            _ => return,
        },
        _ => return,
    };

    let mut uniform = ShaderUniform::new(name.clone(), kind).with_array_lengths(array_lengths);
    if let TypeInner::Struct { members, .. } = inner {
        let struct_name = module.types[ty]
            .name
            .clone()
            .unwrap_or_else(|| name.clone());
        let members = members
            .iter()
            .enumerate()
            .map(|(index, member)| reflect_member(module, index, member))
            .collect::<Vec<_>>();
        uniform = uniform.with_struct(pipeline.structs.len());
        pipeline.structs.push(ShaderStruct::new(struct_name, members));
    }
    pipeline.uniforms.push(uniform);
}

fn reflect_member(module: &naga::Module, index: usize, member: &naga::StructMember) -> ShaderStructMember {
    let mut ty = member.ty;
    let mut array_lengths = Vec::new();
    while let TypeInner::Array { base, size, .. } = module.types[ty].inner {
        array_lengths.push(array_length(size));
        ty = base;
    }
    let name = member
        .name
        .clone()
        .unwrap_or_else(|| format!("member{index}"));
    // Naga stores every matrix column by column.
    ShaderStructMember::new(name, shader_type(&module.types[ty].inner)).with_array_lengths(array_lengths)
}

/// Length of a fixed size array, or 0 for runtime sized arrays.
fn array_length(size: ArraySize) -> u32 {
    match size {
        ArraySize::Constant(length) => length.get(),
        _ => 0,
    }
}

fn scalar_kind(scalar: naga::Scalar) -> Option<ScalarKind> {
    match scalar.kind {
        naga::ScalarKind::Float if scalar.width == 8 => Some(ScalarKind::Double),
        naga::ScalarKind::Float => Some(ScalarKind::Float),
        naga::ScalarKind::Sint => Some(ScalarKind::Int),
        naga::ScalarKind::Uint => Some(ScalarKind::UInt),
        naga::ScalarKind::Bool => Some(ScalarKind::Bool),
        _ => None,
    }
}

fn shader_type(inner: &TypeInner) -> ShaderType {
    match *inner {
        TypeInner::Scalar(scalar) => scalar_kind(scalar).map_or(ShaderType::Opaque, ShaderType::Scalar),
        TypeInner::Vector { size, scalar } => scalar_kind(scalar)
            .map_or(ShaderType::Opaque, |kind| ShaderType::Vector(kind, size as u8)),
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => ShaderType::Matrix {
            double: scalar.width == 8,
            columns: columns as u8,
            rows: rows as u8,
        },
        TypeInner::Struct { .. } => ShaderType::Struct,
        TypeInner::Image {
            class: ImageClass::Storage { .. },
            ..
        } => ShaderType::Image,
        TypeInner::Image { .. } => ShaderType::Sampler,
        _ => ShaderType::Opaque,
    }
}

/// Clip and cull distances written by an entry point.
fn distance_counts(module: &naga::Module, function: &naga::Function) -> (u32, u32) {
    let Some(result) = &function.result else {
        return (0, 0);
    };

    let outputs: Vec<(Option<&Binding>, Handle<naga::Type>)> = match &module.types[result.ty].inner {
        TypeInner::Struct { members, .. } => members
            .iter()
            .map(|member| (member.binding.as_ref(), member.ty))
            .collect(),
        _ => vec![(result.binding.as_ref(), result.ty)],
    };

    let mut counts = (0, 0);
    for (binding, ty) in outputs {
        let Some(Binding::BuiltIn(built_in)) = binding else {
            continue;
        };
        let count = match module.types[ty].inner {
            TypeInner::Array {
                size: ArraySize::Constant(length),
                ..
            } => length.get(),
            _ => 1,
        };
        match built_in {
            BuiltIn::ClipDistance => counts.0 = count,
            BuiltIn::CullDistance => counts.1 = count,
            _ => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    const LIT_WGSL: &str = r#"
struct Transform {
    world: mat4x4<f32>,
    tint: vec4<f32>,
    weights: array<vec4<f32>, 4>,
}

@group(0) @binding(0) var<uniform> transform: Transform;
@group(0) @binding(1) var diffuse: texture_2d<f32>;
@group(0) @binding(2) var diffuse_sampler: sampler;
@group(0) @binding(3) var<storage, read> lights: array<vec4<f32>>;
@group(0) @binding(4) var output: texture_storage_2d<rgba8unorm, write>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return transform.world * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let color = textureSample(diffuse, diffuse_sampler, vec2<f32>(0.5, 0.5));
    return color * transform.tint + transform.weights[0];
}

@compute @workgroup_size(8, 8, 1)
fn cs_main(@builtin(global_invocation_id) id: vec3<u32>) {
    textureStore(output, vec2<i32>(id.xy), lights[id.x]);
}
"#;

    fn manager() -> Arc<ResourceManager> {
        ResourceManager::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_reflect_wgsl() {
        let manager = manager();
        let module = ShaderModule::from_wgsl(
            &manager,
            "lit",
            LIT_WGSL,
            &[
                PipelineEntryPoints::new("lit", &["vs_main", "fs_main"]),
                PipelineEntryPoints::new("fill", &["cs_main"]),
            ],
        )
        .unwrap();
        assert!(!module.has_native_subpass_input());

        let lit = &module.pipelines()[0];
        assert_eq!(lit.stages, ShaderStages::VERTEX | ShaderStages::FRAGMENT);
        let names: Vec<_> = lit.uniforms.iter().map(|uniform| uniform.name.as_str()).collect();
        assert_eq!(names, vec!["transform", "diffuse"]);

        let transform = lit.find_uniform("transform").unwrap();
        assert_eq!(transform.kind, UniformKind::Block);
        let block = &lit.structs[transform.struct_index.unwrap()];
        assert_eq!(block.name, "Transform");
        assert_eq!(
            block.members[0].ty,
            ShaderType::Matrix {
                double: false,
                columns: 4,
                rows: 4
            }
        );
        assert_eq!(block.members[1].ty, ShaderType::Vector(ScalarKind::Float, 4));
        assert_eq!(block.members[2].array_lengths, vec![4]);
        assert_eq!(lit.find_uniform("diffuse").unwrap().kind, UniformKind::SampledImage);

        let fill = &module.pipelines()[1];
        assert_eq!(fill.stages, ShaderStages::COMPUTE);
        assert_eq!(fill.compute_local_size, [8, 8, 1]);
        assert_eq!(fill.find_uniform("lights").unwrap().kind, UniformKind::BlockBuffer);
        assert_eq!(fill.find_uniform("output").unwrap().kind, UniformKind::Image);
        assert!(fill.find_uniform("transform").is_none());

        ShaderModule::destroy(module).unwrap();
    }

    #[test]
    fn test_reflect_errors() {
        let manager = manager();
        let missing = ShaderModule::from_wgsl(
            &manager,
            "lit",
            LIT_WGSL,
            &[PipelineEntryPoints::new("lit", &["vs_main", "missing"])],
        );
        assert!(matches!(missing, Err(GraphicsError::NotFound(_))));

        let invalid = ShaderModule::from_wgsl(
            &manager,
            "broken",
            "fn main( {",
            &[PipelineEntryPoints::new("main", &["main"])],
        );
        assert!(matches!(invalid, Err(GraphicsError::InvalidArgument(_))));
        assert_eq!(manager.statistics().shader_modules, 0);
    }
}
