//! Reflected description of a compiled shader program.
//!
//! A [`ShaderPipeline`] is one named program within a shader module: the
//! stages it has, and the uniforms and structs reflected from the compiled
//! code. Shader creation validates these against a material description.

use bitflags::bitflags;

use crate::materials::ShaderType;

bitflags! {
    /// Stages present in a pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const TESSELLATION_CONTROL = 1 << 1;
        const TESSELLATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
    }
}

impl ShaderStages {
    /// Both tessellation stages.
    pub const TESSELLATION: Self = Self::TESSELLATION_CONTROL.union(Self::TESSELLATION_EVALUATION);
}

/// Category of a reflected uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Struct of loose values supplied without a buffer.
    PushConstant,
    /// Uniform block backed by a uniform block buffer or a variable group.
    Block,
    /// Storage block backed by a uniform buffer.
    BlockBuffer,
    /// Storage image.
    Image,
    /// Sampled texture.
    SampledImage,
    /// Input attachment of a subpass.
    SubpassInput,
}

/// A uniform reflected from a compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderUniform {
    pub name: String,
    pub kind: UniformKind,
    /// Length of each array dimension, outermost first. Empty if not an array.
    pub array_lengths: Vec<u32>,
    /// Index into [`ShaderPipeline::structs`] for block and push constant uniforms.
    pub struct_index: Option<usize>,
}

impl ShaderUniform {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
            array_lengths: Vec::new(),
            struct_index: None,
        }
    }

    /// Set the struct describing the block contents.
    pub fn with_struct(mut self, index: usize) -> Self {
        self.struct_index = Some(index);
        self
    }

    pub fn with_array_lengths(mut self, lengths: impl Into<Vec<u32>>) -> Self {
        self.array_lengths = lengths.into();
        self
    }
}

/// A member of a reflected struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStructMember {
    pub name: String,
    pub ty: ShaderType,
    /// Length of each array dimension, outermost first. Empty if not an array.
    pub array_lengths: Vec<u32>,
    /// Whether a matrix member is stored row by row.
    pub row_major: bool,
}

impl ShaderStructMember {
    pub fn new(name: impl Into<String>, ty: ShaderType) -> Self {
        Self {
            name: name.into(),
            ty,
            array_lengths: Vec::new(),
            row_major: false,
        }
    }

    pub fn with_array_lengths(mut self, lengths: impl Into<Vec<u32>>) -> Self {
        self.array_lengths = lengths.into();
        self
    }

    pub fn with_row_major(mut self) -> Self {
        self.row_major = true;
        self
    }
}

/// A struct reflected from a compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStruct {
    pub name: String,
    pub members: Vec<ShaderStructMember>,
}

impl ShaderStruct {
    pub fn new(name: impl Into<String>, members: impl Into<Vec<ShaderStructMember>>) -> Self {
        Self {
            name: name.into(),
            members: members.into(),
        }
    }
}

/// One named program of a shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPipeline {
    pub name: String,
    pub stages: ShaderStages,
    pub uniforms: Vec<ShaderUniform>,
    pub structs: Vec<ShaderStruct>,
    /// Local work group size of the compute stage.
    pub compute_local_size: [u32; 3],
    /// Clip distances written by the last vertex processing stage.
    pub clip_distance_count: u32,
    /// Cull distances written by the last vertex processing stage.
    pub cull_distance_count: u32,
}

impl ShaderPipeline {
    /// Create a pipeline without uniforms.
    pub fn new(name: impl Into<String>, stages: ShaderStages) -> Self {
        Self {
            name: name.into(),
            stages,
            uniforms: Vec::new(),
            structs: Vec::new(),
            compute_local_size: [1, 1, 1],
            clip_distance_count: 0,
            cull_distance_count: 0,
        }
    }

    pub fn with_uniform(mut self, uniform: ShaderUniform) -> Self {
        self.uniforms.push(uniform);
        self
    }

    /// Add a struct and a uniform of the given kind that refers to it.
    pub fn with_struct_uniform(
        mut self,
        name: impl Into<String>,
        kind: UniformKind,
        members: impl Into<Vec<ShaderStructMember>>,
    ) -> Self {
        let name = name.into();
        let index = self.structs.len();
        self.structs.push(ShaderStruct::new(name.clone(), members));
        self.uniforms
            .push(ShaderUniform::new(name, kind).with_struct(index));
        self
    }

    pub fn with_compute_local_size(mut self, size: [u32; 3]) -> Self {
        self.compute_local_size = size;
        self
    }

    pub fn with_distances(mut self, clip: u32, cull: u32) -> Self {
        self.clip_distance_count = clip;
        self.cull_distance_count = cull;
        self
    }

    /// Find a uniform by name.
    pub fn find_uniform(&self, name: &str) -> Option<&ShaderUniform> {
        self.uniforms.iter().find(|uniform| uniform.name == name)
    }

    /// Total invocations of a local work group.
    pub fn compute_invocations(&self) -> u64 {
        self.compute_local_size
            .iter()
            .map(|&size| size as u64)
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::ScalarKind;

    #[test]
    fn test_struct_uniform_builder() {
        let pipeline = ShaderPipeline::new("lit", ShaderStages::VERTEX | ShaderStages::FRAGMENT)
            .with_struct_uniform(
                "Transform",
                UniformKind::Block,
                [ShaderStructMember::new(
                    "world",
                    ShaderType::Matrix {
                        double: false,
                        columns: 4,
                        rows: 4,
                    },
                )],
            )
            .with_uniform(ShaderUniform::new("diffuse", UniformKind::SampledImage));

        let transform = pipeline.find_uniform("Transform").unwrap();
        assert_eq!(transform.struct_index, Some(0));
        assert_eq!(pipeline.structs[0].members[0].name, "world");
        assert!(pipeline.find_uniform("diffuse").unwrap().struct_index.is_none());
        assert!(pipeline.find_uniform("specular").is_none());
    }

    #[test]
    fn test_compute_invocations() {
        let pipeline = ShaderPipeline::new("blur", ShaderStages::COMPUTE)
            .with_compute_local_size([8, 8, 2]);
        assert_eq!(pipeline.compute_invocations(), 128);

        let member = ShaderStructMember::new("weights", ShaderType::Scalar(ScalarKind::Float))
            .with_array_lengths([4]);
        assert_eq!(member.array_lengths, vec![4]);
        assert!(ShaderStages::TESSELLATION.contains(ShaderStages::TESSELLATION_EVALUATION));
    }
}
