//! Material element types and binding classes.

use std::fmt;

/// Type of a material element or shader variable.
///
/// Primitive, vector and matrix types come first; everything from
/// [`MaterialType::Texture`] on refers to a bound object rather than a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialType {
    // Scalars and vectors
    Float,
    Vec2,
    Vec3,
    Vec4,
    Double,
    DVec2,
    DVec3,
    DVec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    UInt,
    UVec2,
    UVec3,
    UVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,

    // Matrices, named by columns then rows
    Mat2,
    Mat3,
    Mat4,
    Mat2x3,
    Mat2x4,
    Mat3x2,
    Mat3x4,
    Mat4x2,
    Mat4x3,
    DMat2,
    DMat3,
    DMat4,
    DMat2x3,
    DMat2x4,
    DMat3x2,
    DMat3x4,
    DMat4x2,
    DMat4x3,

    // Objects
    /// Sampled texture.
    Texture,
    /// Storage image.
    Image,
    /// Input attachment read within a subpass.
    SubpassInput,
    /// Buffer sampled as a texture.
    TextureBuffer,
    /// Buffer accessed as a storage image.
    ImageBuffer,
    /// Group of primitive values backed by a shader variable group.
    VariableGroup,
    /// Read-only block backed by a buffer.
    UniformBlock,
    /// Read/write block backed by a buffer.
    UniformBuffer,
}

impl MaterialType {
    /// Whether the type is a scalar, vector or matrix value.
    pub fn is_primitive(&self) -> bool {
        *self < Self::Texture
    }

    /// Whether the type is a matrix.
    pub fn is_matrix(&self) -> bool {
        *self >= Self::Mat2 && *self <= Self::DMat4x3
    }

    /// Whether the type is a matrix with a different number of columns and rows.
    pub fn is_non_square_matrix(&self) -> bool {
        matches!(
            self,
            Self::Mat2x3
                | Self::Mat2x4
                | Self::Mat3x2
                | Self::Mat3x4
                | Self::Mat4x2
                | Self::Mat4x3
                | Self::DMat2x3
                | Self::DMat2x4
                | Self::DMat3x2
                | Self::DMat3x4
                | Self::DMat4x2
                | Self::DMat4x3
        )
    }

    /// Whether the type refers to a texture or image object.
    pub fn is_texture_like(&self) -> bool {
        matches!(
            self,
            Self::Texture | Self::Image | Self::SubpassInput | Self::TextureBuffer | Self::ImageBuffer
        )
    }

    /// Size in bytes of a single value with tightly packed columns.
    ///
    /// Object types have no size and return 0.
    pub fn size(&self) -> usize {
        use MaterialType::*;
        match self {
            Float | Int | UInt | Bool => 4,
            Vec2 | IVec2 | UVec2 | BVec2 => 8,
            Vec3 | IVec3 | UVec3 | BVec3 => 12,
            Vec4 | IVec4 | UVec4 | BVec4 => 16,
            Double => 8,
            DVec2 => 16,
            DVec3 => 24,
            DVec4 => 32,
            Mat2 => 16,
            Mat3 => 36,
            Mat4 => 64,
            Mat2x3 | Mat3x2 => 24,
            Mat2x4 | Mat4x2 => 32,
            Mat3x4 | Mat4x3 => 48,
            DMat2 => 32,
            DMat3 => 72,
            DMat4 => 128,
            DMat2x3 | DMat3x2 => 48,
            DMat2x4 | DMat4x2 => 64,
            DMat3x4 | DMat4x3 => 96,
            _ => 0,
        }
    }

    /// Size in bytes of one scalar component: 8 for double types, 4 otherwise.
    ///
    /// Object types return 0.
    pub fn scalar_size(&self) -> usize {
        use MaterialType::*;
        match self {
            Double | DVec2 | DVec3 | DVec4 => 8,
            DMat2 | DMat3 | DMat4 | DMat2x3 | DMat2x4 | DMat3x2 | DMat3x4 | DMat4x2 | DMat4x3 => 8,
            ty if ty.is_primitive() => 4,
            _ => 0,
        }
    }

    /// Number of columns. Scalars and vectors have a single column.
    pub fn matrix_columns(&self) -> u32 {
        use MaterialType::*;
        match self {
            Mat2 | DMat2 | Mat2x3 | DMat2x3 | Mat2x4 | DMat2x4 => 2,
            Mat3 | DMat3 | Mat3x2 | DMat3x2 | Mat3x4 | DMat3x4 => 3,
            Mat4 | DMat4 | Mat4x2 | DMat4x2 | Mat4x3 | DMat4x3 => 4,
            ty if ty.is_primitive() => 1,
            _ => 0,
        }
    }

    /// Number of rows: the component count of a vector or of a matrix column.
    pub fn matrix_rows(&self) -> u32 {
        use MaterialType::*;
        match self {
            Float | Double | Int | UInt | Bool => 1,
            Vec2 | DVec2 | IVec2 | UVec2 | BVec2 | Mat2 | DMat2 | Mat3x2 | DMat3x2 | Mat4x2
            | DMat4x2 => 2,
            Vec3 | DVec3 | IVec3 | UVec3 | BVec3 | Mat3 | DMat3 | Mat2x3 | DMat2x3 | Mat4x3
            | DMat4x3 => 3,
            Vec4 | DVec4 | IVec4 | UVec4 | BVec4 | Mat4 | DMat4 | Mat2x4 | DMat2x4 | Mat3x4
            | DMat3x4 => 4,
            _ => 0,
        }
    }

    /// Vector type of a single matrix column.
    pub fn matrix_column_type(&self) -> Option<MaterialType> {
        if !self.is_matrix() {
            return None;
        }
        let double = self.scalar_size() == 8;
        let column = match (self.matrix_rows(), double) {
            (2, false) => Self::Vec2,
            (3, false) => Self::Vec3,
            (4, false) => Self::Vec4,
            (2, true) => Self::DVec2,
            (3, true) => Self::DVec3,
            (4, true) => Self::DVec4,
            _ => return None,
        };
        Some(column)
    }

    /// Convert a reflected shader type to the material type it binds to.
    ///
    /// Returns `None` for shader types that have no material equivalent.
    pub fn from_shader_type(ty: ShaderType) -> Option<MaterialType> {
        use MaterialType::*;
        use ScalarKind as K;
        let converted = match ty {
            ShaderType::Scalar(K::Float) => Float,
            ShaderType::Scalar(K::Double) => Double,
            ShaderType::Scalar(K::Int) => Int,
            ShaderType::Scalar(K::UInt) => UInt,
            ShaderType::Scalar(K::Bool) => Bool,
            ShaderType::Vector(kind, size) => {
                let vectors = match kind {
                    K::Float => [Vec2, Vec3, Vec4],
                    K::Double => [DVec2, DVec3, DVec4],
                    K::Int => [IVec2, IVec3, IVec4],
                    K::UInt => [UVec2, UVec3, UVec4],
                    K::Bool => [BVec2, BVec3, BVec4],
                };
                match size {
                    2..=4 => vectors[usize::from(size) - 2],
                    _ => return None,
                }
            }
            ShaderType::Matrix { double, columns, rows } => {
                let single = match (columns, rows) {
                    (2, 2) => Mat2,
                    (3, 3) => Mat3,
                    (4, 4) => Mat4,
                    (2, 3) => Mat2x3,
                    (2, 4) => Mat2x4,
                    (3, 2) => Mat3x2,
                    (3, 4) => Mat3x4,
                    (4, 2) => Mat4x2,
                    (4, 3) => Mat4x3,
                    _ => return None,
                };
                if double {
                    // Double matrices mirror the single precision order.
                    let offset = single as usize - Mat2 as usize;
                    DOUBLE_MATRICES[offset]
                } else {
                    single
                }
            }
            ShaderType::Sampler => Texture,
            ShaderType::Image => Image,
            ShaderType::SubpassInput => SubpassInput,
            ShaderType::Struct => VariableGroup,
            ShaderType::Opaque => return None,
        };
        Some(converted)
    }
}

const DOUBLE_MATRICES: [MaterialType; 9] = [
    MaterialType::DMat2,
    MaterialType::DMat3,
    MaterialType::DMat4,
    MaterialType::DMat2x3,
    MaterialType::DMat2x4,
    MaterialType::DMat3x2,
    MaterialType::DMat3x4,
    MaterialType::DMat4x2,
    MaterialType::DMat4x3,
];

/// Scalar component kind of a reflected shader type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Float,
    Double,
    Int,
    UInt,
    Bool,
}

/// Type of a uniform or struct member as reflected from a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Scalar(ScalarKind),
    /// Vector with 2 to 4 components.
    Vector(ScalarKind, u8),
    /// Float or double matrix, `columns` vectors of `rows` components.
    Matrix { double: bool, columns: u8, rows: u8 },
    /// Sampled texture, including shadow and buffer samplers.
    Sampler,
    /// Storage image.
    Image,
    SubpassInput,
    /// Struct, used for blocks and push constants.
    Struct,
    /// Anything without a material equivalent, such as atomics.
    Opaque,
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How often a material element's value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialBinding {
    /// Set on the material and applied when the shader is bound.
    #[default]
    Material,
    /// Set per draw through instance values.
    Instance,
    /// Set once per bind through global values.
    Global,
}
