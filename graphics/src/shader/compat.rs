//! Compatibility of a reflected pipeline with a material description.
//!
//! Every uniform of the pipeline must be backed by a material element of a
//! matching kind, with variable groups and push constants checked member by
//! member. All problems are collected so they can be reported together.

use crate::backend::GpuBackend;
use crate::materials::{
    MaterialDesc, MaterialType, ShaderVariableElement, ShaderVariableGroupDesc,
};

use super::program::{ShaderPipeline, ShaderStruct, ShaderStructMember, UniformKind};

/// Backend properties that affect compatibility.
pub(crate) struct CompatibilityTarget<'a> {
    /// The target reads subpass inputs through a dedicated type.
    pub(crate) native_subpass_input: bool,
    /// The device supports uniform block buffers. Without them push constant
    /// members may be provided by variable groups.
    pub(crate) uniform_blocks: bool,
    /// Decides which push constant members the backend provides itself.
    pub(crate) backend: &'a dyn GpuBackend,
}

/// Collect every reason `pipeline` can't be used with `desc`.
pub(crate) fn compatibility_issues(
    target: &CompatibilityTarget<'_>,
    pipeline: &ShaderPipeline,
    desc: &MaterialDesc,
) -> Vec<String> {
    let mut issues = Vec::new();
    for uniform in &pipeline.uniforms {
        let name = &uniform.name;
        let block = uniform.struct_index.and_then(|index| pipeline.structs.get(index));

        if uniform.kind == UniformKind::PushConstant {
            if let Some(block) = block {
                push_constant_issues(target, name, block, desc, &mut issues);
            }
            continue;
        }

        let Some(element) = desc
            .find_element(name)
            .map(|index| &desc.elements()[index])
        else {
            issues.push(format!("uniform '{name}' not found in material description"));
            continue;
        };

        let ty = element.ty;
        let types_match = match uniform.kind {
            UniformKind::Block => {
                if ty == MaterialType::VariableGroup {
                    if !uniform.array_lengths.is_empty() {
                        issues.push(format!("shader variable group '{name}' may not be an array"));
                    }
                    match (block, &element.variable_group) {
                        (Some(block), Some(group)) => variable_group_issues(name, block, group, &mut issues),
                        _ => issues.push(format!(
                            "variable group '{name}' doesn't match shader uniform block"
                        )),
                    }
                }
                matches!(ty, MaterialType::VariableGroup | MaterialType::UniformBlock)
            }
            UniformKind::BlockBuffer => ty == MaterialType::UniformBuffer,
            UniformKind::Image => {
                matches!(ty, MaterialType::Image | MaterialType::ImageBuffer)
                    || (!target.native_subpass_input && ty == MaterialType::SubpassInput)
            }
            UniformKind::SampledImage => {
                matches!(ty, MaterialType::Texture | MaterialType::TextureBuffer)
                    || (!target.native_subpass_input && ty == MaterialType::SubpassInput)
            }
            UniformKind::SubpassInput => ty == MaterialType::SubpassInput,
            UniformKind::PushConstant => true,
        };
        if !types_match {
            issues.push(format!(
                "types for uniform '{name}' differ between shader ({:?}) and material ({ty})",
                uniform.kind
            ));
        }
    }
    issues
}

/// Array length of a member, or `None` for arrays of arrays.
fn member_array_count(member: &ShaderStructMember) -> Option<u32> {
    match member.array_lengths.as_slice() {
        [] => Some(0),
        [length] => Some(*length),
        _ => None,
    }
}

fn push_constant_issues(
    target: &CompatibilityTarget<'_>,
    uniform: &str,
    block: &ShaderStruct,
    desc: &MaterialDesc,
    issues: &mut Vec<String>,
) {
    for member in &block.members {
        let name = &member.name;
        if target.backend.is_shader_uniform_internal(name) {
            continue;
        }

        let (ty, count) = match desc.find_element(name) {
            Some(index) => {
                let element = &desc.elements()[index];
                (element.ty, element.count)
            }
            None if target.uniform_blocks => {
                issues.push(format!(
                    "uniform '{uniform}.{name}' not found in material description"
                ));
                continue;
            }
            None => match find_group_element(desc, name) {
                Ok(element) => (element.ty, element.count),
                Err(GroupLookup::Ambiguous) => {
                    issues.push(format!(
                        "shader variable group element '{name}' found in multiple groups"
                    ));
                    continue;
                }
                Err(GroupLookup::Missing) => {
                    issues.push(format!(
                        "uniform '{uniform}.{name}' not found in material description or any shader variable group"
                    ));
                    continue;
                }
            },
        };

        let Some(array_count) = member_array_count(member) else {
            issues.push(format!(
                "multi-dimensional arrays aren't supported for uniform '{uniform}.{name}'"
            ));
            continue;
        };
        if MaterialType::from_shader_type(member.ty) != Some(ty) || array_count != count {
            issues.push(format!(
                "types for uniform '{uniform}.{name}' differ between shader and material"
            ));
        }
    }
}

enum GroupLookup {
    Missing,
    Ambiguous,
}

/// Find a member in exactly one of the variable groups of `desc`.
fn find_group_element<'a>(
    desc: &'a MaterialDesc,
    name: &str,
) -> Result<&'a ShaderVariableElement, GroupLookup> {
    let mut found = desc
        .elements()
        .iter()
        .filter(|element| element.ty == MaterialType::VariableGroup)
        .filter_map(|element| element.variable_group.as_deref())
        .filter_map(|group: &ShaderVariableGroupDesc| {
            group
                .find_element(name)
                .map(|index| &group.elements()[index])
        });
    let first = found.next().ok_or(GroupLookup::Missing)?;
    if found.next().is_some() {
        return Err(GroupLookup::Ambiguous);
    }
    Ok(first)
}

fn variable_group_issues(
    uniform: &str,
    block: &ShaderStruct,
    group: &ShaderVariableGroupDesc,
    issues: &mut Vec<String>,
) {
    let elements = group.elements();
    if block.members.len() != elements.len() {
        issues.push(format!(
            "variable group '{uniform}' has {} elements but the shader block has {} members",
            elements.len(),
            block.members.len()
        ));
        return;
    }

    for (member, element) in block.members.iter().zip(elements) {
        let name = &member.name;
        let Some(array_count) = member_array_count(member) else {
            issues.push(format!(
                "multi-dimensional arrays aren't supported for variable group member '{uniform}.{name}'"
            ));
            continue;
        };
        if MaterialType::from_shader_type(member.ty) != Some(element.ty)
            || array_count != element.count
        {
            issues.push(format!(
                "types for element '{uniform}.{name}' differ between shader and shader variable group"
            ));
        }
        // The variable group layout stores matrices column by column.
        if element.ty.is_non_square_matrix() && member.row_major {
            issues.push(format!(
                "element '{uniform}.{name}' is row major, non-square matrix elements within a shader variable group must be column major"
            ));
        }
    }
}
