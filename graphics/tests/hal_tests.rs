//! Integration tests for the HAL core.
//!
//! These tests drive the public API the way a renderer does and check the
//! validation rules end to end. Tests are parameterized using `rstest` to run
//! against every available backend.
//!
//! # Test Categories
//!
//! - **Layout Tests**: Texture sizes, surface counts and addressing
//! - **Resource Tests**: Texture memory accounting and copies around render passes
//! - **Shader Tests**: Compatibility between reflected pipelines and material descriptions
//! - **Binding Tests**: Shader binding rules within render passes and frames
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test hal_tests
//! ```

mod common;

use rstest::rstest;

use common::{
    Backend, MAT4, MAT4X3, TestContext, VEC4, skin_group, skinned_pipeline, textured_pipeline,
};
use redlilium_hal::shader::{ShaderStructMember, UniformKind};
use redlilium_hal::types::{ALL_MIP_LEVELS, DEFAULT_SAMPLES};
use redlilium_hal::{
    CubeFace, DrawRange, GraphicsError, Material, MaterialElement, MaterialType, MemoryHints,
    PrimitiveType, ResourceCapabilities, Shader, ShaderPipeline, ShaderStages,
    ShaderVariableElement, ShaderVariableGroupDesc, Texture, TextureDim, TextureFormat,
    TextureInfo, TexturePosition, TextureUsage,
};

const RGBA8: TextureFormat = TextureFormat::R8G8B8A8Unorm;

// ============================================================================
// Layout Tests
// ============================================================================

#[rstest]
#[case::single(TextureInfo::new_2d(RGBA8, 512, 512), 1_048_576)]
#[case::cube(TextureInfo::new_cube(RGBA8, 512), 6_291_456)]
#[case::array(TextureInfo::new_2d(RGBA8, 512, 512).with_depth(3), 3_145_728)]
#[case::mip_chain(TextureInfo::new_2d(RGBA8, 512, 512).with_mip_levels(ALL_MIP_LEVELS), 1_398_100)]
#[case::multisampled(TextureInfo::new_2d(RGBA8, 512, 512).with_sample_count(4), 4_194_304)]
fn test_texture_sizes(#[case] info: TextureInfo, #[case] expected: usize) {
    assert_eq!(info.size(), expected);
}

#[rstest]
#[case::mip_chain(TextureInfo::new_2d(RGBA8, 512, 512), 10)]
#[case::cube(TextureInfo::new_cube(RGBA8, 512), 60)]
#[case::cube_array(TextureInfo::new_cube(RGBA8, 512).with_depth(5), 300)]
fn test_surface_counts(#[case] info: TextureInfo, #[case] expected: u32) {
    assert_eq!(info.with_mip_levels(ALL_MIP_LEVELS).surface_count(), expected);
}

#[test]
fn test_surface_indices() {
    let array = TextureInfo::new_2d(RGBA8, 512, 512).with_depth(8);
    assert_eq!(array.surface_index(None, 3, 0), 3);

    let cube_array = TextureInfo::new_cube(RGBA8, 512).with_depth(8);
    assert_eq!(cube_array.surface_index(Some(CubeFace::PosZ), 3, 0), 22);
    assert_eq!(CubeFace::index(Some(CubeFace::NegY)), 3);
    assert_eq!(cube_array.surface_index(Some(CubeFace::NegY), 3, 0), 21);
}

#[rstest]
#[case::dim_1d(TextureDim::Dim1D)]
#[case::dim_2d(TextureDim::Dim2D)]
#[case::dim_3d(TextureDim::Dim3D)]
#[case::cube(TextureDim::Cube)]
fn test_layout_properties(#[case] dimension: TextureDim) {
    for format in [RGBA8, TextureFormat::Bc1Rgba, TextureFormat::R32G32B32A32Float] {
        for depth in [0, 1, 3] {
            let base = TextureInfo {
                dimension,
                depth,
                ..TextureInfo::new_2d(format, 64, if dimension == TextureDim::Dim1D { 1 } else { 64 })
            };

            let mut previous = 0;
            let mut mip_sum = 0;
            for mip_levels in 1..=7 {
                let size = base.with_mip_levels(mip_levels).size();
                assert!(size >= previous);
                previous = size;
                mip_sum = size;
            }
            assert_eq!(base.with_mip_levels(ALL_MIP_LEVELS).size(), mip_sum);

            let faces = dimension.faces();
            let info = base.with_mip_levels(ALL_MIP_LEVELS);
            let face = (faces == 6).then_some(CubeFace::PosX);
            assert_eq!(info.surface_offset(face, 0, 0), 0);

            if dimension != TextureDim::Dim3D {
                for depth_index in 0..depth.max(1) {
                    for face_index in 0..faces {
                        let face = match face_index {
                            0 if faces == 1 => None,
                            0 => Some(CubeFace::PosX),
                            1 => Some(CubeFace::NegX),
                            2 => Some(CubeFace::PosY),
                            3 => Some(CubeFace::NegY),
                            4 => Some(CubeFace::PosZ),
                            _ => Some(CubeFace::NegZ),
                        };
                        let layer = depth_index * faces + face_index;
                        assert_eq!(
                            info.surface_offset(face, depth_index, 1),
                            info.layer_offset(layer, 1)
                        );
                    }
                }
            }
        }
    }
}

// ============================================================================
// Resource Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_texture_memory_accounting(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let info = TextureInfo::new_cube(RGBA8, 64).with_mip_levels(ALL_MIP_LEVELS);
    let texture =
        Texture::create(&ctx.manager, TextureUsage::TEXTURE, MemoryHints::STATIC, &info, None).unwrap();
    let offscreen_info = TextureInfo::new_2d(RGBA8, 256, 256).with_sample_count(DEFAULT_SAMPLES);
    let offscreen = Texture::create_offscreen(
        &ctx.manager,
        TextureUsage::TEXTURE,
        MemoryHints::GPU_ONLY,
        &offscreen_info,
        true,
    )
    .unwrap();

    let resolved = offscreen_info.with_sample_count(1).size();
    let samples = offscreen.info().samples;
    assert!(samples > 1);
    assert_eq!(
        offscreen.memory_size(),
        resolved + offscreen_info.with_sample_count(samples).size()
    );

    let stats = ctx.manager.statistics();
    assert_eq!(stats.textures, 2);
    assert_eq!(stats.texture_memory, info.size() + offscreen.memory_size());

    offscreen.destroy().unwrap();
    let stats = ctx.manager.statistics();
    assert_eq!(stats.textures, 1);
    assert_eq!(stats.texture_memory, info.size());

    texture.destroy().unwrap();
    assert_eq!(ctx.manager.statistics().texture_memory, 0);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_texture_commands_outside_render_pass(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let usage = TextureUsage::TEXTURE | TextureUsage::COPY_FROM | TextureUsage::COPY_TO;
    let info = TextureInfo::new_2d(RGBA8, 8, 8).with_mip_levels(ALL_MIP_LEVELS);
    let texture = Texture::create(&ctx.manager, usage, MemoryHints::STATIC, &info, None).unwrap();
    let render_pass = ctx.render_pass();
    let mut command_buffer = ctx.command_buffer();
    let data = vec![0x7fu8; 8 * 8 * 4];
    let position = TexturePosition::default();

    render_pass.begin(&mut command_buffer, false).unwrap();
    assert!(matches!(
        texture.copy_data(&command_buffer, &position, 8, 8, 1, &data),
        Err(GraphicsError::InvalidState(_))
    ));
    assert!(texture.generate_mipmaps(&command_buffer).is_err());
    render_pass.end(&mut command_buffer).unwrap();

    texture
        .copy_data(&command_buffer, &position, 8, 8, 1, &data)
        .unwrap();
    texture.generate_mipmaps(&command_buffer).unwrap();
    command_buffer.end().unwrap();
    texture.destroy().unwrap();
}

// ============================================================================
// Shader Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_shader_requires_matching_elements(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let module = ctx.shader_module(vec![textured_pipeline("opaque")]);
    let unrelated = ctx.material_desc(&[MaterialElement::new("normal", MaterialType::Texture)]);
    assert!(matches!(
        Shader::create_by_name(&ctx.manager, &module, "opaque", &unrelated),
        Err(GraphicsError::Incompatible(_))
    ));

    let matching = ctx.material_desc(&[MaterialElement::new("diffuse", MaterialType::Texture)]);
    let shader = Shader::create_by_name(&ctx.manager, &module, "opaque", &matching).unwrap();
    assert_eq!(ctx.manager.statistics().shaders, 1);
    shader.destroy().unwrap();
}

#[rstest]
#[case::array_count(ShaderStructMember::new("bones", MAT4X3).with_array_lengths([8]))]
#[case::row_major(ShaderStructMember::new("bones", MAT4X3).with_array_lengths([16]).with_row_major())]
#[case::multi_dimensional(ShaderStructMember::new("bones", MAT4X3).with_array_lengths([4, 4]))]
#[case::wrong_type(ShaderStructMember::new("bones", MAT4).with_array_lengths([16]))]
fn test_shader_rejects_mismatched_group(#[case] bones: ShaderStructMember) {
    let ctx = TestContext::new(Backend::Dummy).unwrap();
    let group = skin_group(&ctx);
    let desc = ctx.material_desc(&[MaterialElement::variable_group("Skin", &group)]);
    let module = ctx.shader_module(vec![skinned_pipeline(bones)]);

    assert!(matches!(
        Shader::create_by_index(&ctx.manager, &module, 0, &desc),
        Err(GraphicsError::Incompatible(_))
    ));
    assert_eq!(ctx.manager.statistics().shaders, 0);
}

#[test]
fn test_shader_accepts_matching_group() {
    let ctx = TestContext::new(Backend::Dummy).unwrap();
    let group = skin_group(&ctx);
    let desc = ctx.material_desc(&[MaterialElement::variable_group("Skin", &group)]);
    let module = ctx.shader_module(vec![skinned_pipeline(
        ShaderStructMember::new("bones", MAT4X3).with_array_lengths([16]),
    )]);
    Shader::create_by_index(&ctx.manager, &module, 0, &desc)
        .unwrap()
        .destroy()
        .unwrap();
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_push_constant_member_in_two_groups(#[case] backend: Backend) {
    let capabilities = ResourceCapabilities {
        supported_buffers: ResourceCapabilities::default().supported_buffers
            - redlilium_hal::BufferUsage::UNIFORM_BLOCK,
        ..Default::default()
    };
    let Some(ctx) = TestContext::with_capabilities(backend, capabilities) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let transform = ShaderVariableGroupDesc::create(
        &ctx.manager,
        &[ShaderVariableElement::new("world", MaterialType::Mat4)],
    )
    .unwrap();
    let lighting = ShaderVariableGroupDesc::create(
        &ctx.manager,
        &[
            ShaderVariableElement::new("world", MaterialType::Mat4),
            ShaderVariableElement::new("tint", MaterialType::Vec4),
        ],
    )
    .unwrap();
    let desc = ctx.material_desc(&[
        MaterialElement::variable_group("Transform", &transform),
        MaterialElement::variable_group("Lighting", &lighting),
    ]);
    let pipeline = |member: ShaderStructMember| {
        ShaderPipeline::new("constants", ShaderStages::VERTEX).with_struct_uniform(
            "Constants",
            UniformKind::PushConstant,
            [member],
        )
    };

    let module = ctx.shader_module(vec![pipeline(ShaderStructMember::new("world", MAT4))]);
    assert!(matches!(
        Shader::create_by_index(&ctx.manager, &module, 0, &desc),
        Err(GraphicsError::Incompatible(_))
    ));

    let unique = ctx.shader_module(vec![pipeline(ShaderStructMember::new("tint", VEC4))]);
    Shader::create_by_index(&ctx.manager, &unique, 0, &desc)
        .unwrap()
        .destroy()
        .unwrap();
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_shader_capability_limits(#[case] backend: Backend) {
    let capabilities = ResourceCapabilities {
        has_geometry_shaders: false,
        max_clip_distances: 4,
        ..Default::default()
    };
    let Some(ctx) = TestContext::with_capabilities(backend, capabilities) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = ctx.material_desc(&[]);
    let module = ctx.shader_module(vec![
        ShaderPipeline::new("geometry", ShaderStages::VERTEX | ShaderStages::GEOMETRY),
        ShaderPipeline::new("clipped", ShaderStages::VERTEX).with_distances(6, 0),
        ShaderPipeline::new("huge", ShaderStages::COMPUTE).with_compute_local_size([2048, 1, 1]),
        ShaderPipeline::new("plain", ShaderStages::VERTEX).with_distances(4, 2),
    ]);
    for name in ["geometry", "clipped", "huge"] {
        assert!(matches!(
            Shader::create_by_name(&ctx.manager, &module, name, &desc),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
    }
    Shader::create_by_name(&ctx.manager, &module, "plain", &desc)
        .unwrap()
        .destroy()
        .unwrap();
}

// ============================================================================
// Binding Tests
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_shader_binding_rules(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = ctx.material_desc(&[MaterialElement::new("diffuse", MaterialType::Texture)]);
    let module = ctx.shader_module(vec![textured_pipeline("first"), textured_pipeline("second")]);
    let first = Shader::create_by_name(&ctx.manager, &module, "first", &desc).unwrap();
    let second = Shader::create_by_name(&ctx.manager, &module, "second", &desc).unwrap();
    let material = Material::new(&desc);
    let render_pass = ctx.render_pass();
    let mut command_buffer = ctx.command_buffer();

    // Binding outside of a render pass.
    assert!(first.bind(&mut command_buffer, &material, None, None).is_err());

    render_pass.begin(&mut command_buffer, false).unwrap();
    first.bind(&mut command_buffer, &material, None, None).unwrap();

    // Binding while another shader is bound.
    assert!(second.bind(&mut command_buffer, &material, None, None).is_err());
    // Unbinding a shader that isn't bound.
    assert!(second.unbind(&mut command_buffer).is_err());
    // Ending the render pass with a bound shader.
    assert!(render_pass.end(&mut command_buffer).is_err());

    ctx.renderer
        .draw(&command_buffer, 3, &DrawRange::new(3), PrimitiveType::TriangleList)
        .unwrap();
    first.unbind(&mut command_buffer).unwrap();
    assert!(
        ctx.renderer
            .draw(&command_buffer, 3, &DrawRange::new(3), PrimitiveType::TriangleList)
            .is_err()
    );

    second.bind(&mut command_buffer, &material, None, None).unwrap();
    second.unbind(&mut command_buffer).unwrap();
    render_pass.end(&mut command_buffer).unwrap();
    command_buffer.end().unwrap();

    first.destroy().unwrap();
    second.destroy().unwrap();
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_compute_dispatch_flow(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };

    let desc = ctx.material_desc(&[]);
    let module = ctx.shader_module(vec![
        ShaderPipeline::new("reduce", ShaderStages::COMPUTE).with_compute_local_size([64, 1, 1]),
    ]);
    let shader = Shader::create_by_name(&ctx.manager, &module, "reduce", &desc).unwrap();
    let material = Material::new(&desc);

    shader
        .bind_compute(ctx.renderer.main_command_buffer_mut(), &material, None)
        .unwrap();
    assert!(ctx.renderer.end_frame().is_err());
    ctx.renderer
        .dispatch_compute(ctx.renderer.main_command_buffer(), 16, 1, 1)
        .unwrap();
    shader
        .unbind_compute(ctx.renderer.main_command_buffer_mut())
        .unwrap();
    assert!(
        ctx.renderer
            .dispatch_compute(ctx.renderer.main_command_buffer(), 16, 1, 1)
            .is_err()
    );
    ctx.renderer.end_frame().unwrap();

    shader.destroy().unwrap();
}
