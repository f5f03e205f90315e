//! Material system.
//!
//! - [`MaterialDesc`] - Named, typed elements a shader reads, created through the manager
//! - [`Material`] - Values for the material-bound elements of a description
//! - [`SharedMaterialValues`] - Global and instance values supplied when binding and drawing
//! - [`ShaderVariableGroupDesc`] / [`ShaderVariableGroup`] - std140 packed groups of
//!   primitive values, backed by a uniform block buffer when the device has one
//!
//! Descriptions are shared through `Arc`. Materials, shaders and material
//! elements keep the descriptions they were built from alive, and a
//! description can only be destroyed once nothing else references it.

mod desc;
mod material;
mod shared_values;
mod types;
mod variable_group;

pub use desc::{MaterialDesc, MaterialElement};
pub use material::Material;
pub use shared_values::{SharedMaterialValues, SharedValue};
pub use types::{MaterialBinding, MaterialType, ScalarKind, ShaderType};
pub use variable_group::{
    ShaderVariableElement, ShaderVariableGroup, ShaderVariableGroupDesc, ShaderVariablePos,
    std140_layout,
};

pub(crate) use shared_values::verify_shared_values;
