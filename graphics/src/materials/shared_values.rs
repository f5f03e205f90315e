//! Values shared between materials, set per bind or per instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GraphicsError, reject};
use crate::resources::{GfxBuffer, Texture};
use crate::types::{
    BufferUsage, FormatSupport, TextureFormat, TextureUsage, is_buffer_range_valid,
};

use super::desc::MaterialDesc;
use super::types::{MaterialBinding, MaterialType};
use super::variable_group::{ShaderVariableGroup, ShaderVariableGroupDesc};

/// A value stored in [`SharedMaterialValues`].
///
/// Resources are recorded by identifier together with the usage they were
/// created with, so the values can be verified without borrowing them.
#[derive(Debug, Clone)]
pub enum SharedValue {
    /// A texture, image or subpass input.
    Texture { id: u64, usage: TextureUsage },
    /// A range of a buffer viewed as a texture buffer or image buffer.
    TextureBuffer {
        id: u64,
        usage: BufferUsage,
        format: TextureFormat,
        offset: usize,
        count: usize,
    },
    /// A range of a buffer bound as a uniform block or buffer.
    Buffer {
        id: u64,
        usage: BufferUsage,
        offset: usize,
        size: usize,
    },
    /// A shader variable group, possibly backed by a buffer.
    VariableGroup {
        id: u64,
        desc: Arc<ShaderVariableGroupDesc>,
        buffer: Option<(u64, BufferUsage)>,
    },
}

impl SharedValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Texture { .. } => "texture",
            Self::TextureBuffer { .. } => "texture buffer",
            Self::Buffer { .. } => "buffer",
            Self::VariableGroup { .. } => "variable group",
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Named textures, buffers and variable groups supplied when a shader is
/// bound (global values) or for each draw (instance values).
#[derive(Debug, Clone)]
pub struct SharedMaterialValues {
    values: HashMap<String, SharedValue>,
    max_values: usize,
    pointer_version: u32,
    offset_version: u32,
}

impl SharedMaterialValues {
    /// Create an empty set that holds at most `max_values` values.
    pub fn new(max_values: usize) -> Self {
        Self {
            values: HashMap::with_capacity(max_values),
            max_values,
            pointer_version: 0,
            offset_version: 0,
        }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values that can still be added.
    pub fn remaining_values(&self) -> usize {
        self.max_values - self.values.len()
    }

    /// Incremented whenever a value is added or replaced by a different resource.
    pub fn pointer_version(&self) -> u32 {
        self.pointer_version
    }

    /// Incremented whenever only the offset of a buffer range changes.
    pub fn offset_version(&self) -> u32 {
        self.offset_version
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<&SharedValue> {
        self.values.get(name)
    }

    fn set(&mut self, name: &str, value: SharedValue) -> Result<(), GraphicsError> {
        if name.is_empty() {
            return Err(reject!(InvalidArgument, "shared material value names must not be empty"));
        }

        if let Some(existing) = self.values.get_mut(name) {
            if !existing.same_kind(&value) {
                return Err(reject!(
                    InvalidArgument,
                    "shared value '{}' is a {} and can't be replaced by a {}",
                    name,
                    existing.kind(),
                    value.kind()
                ));
            }

            let offset_only = match (&*existing, &value) {
                (
                    SharedValue::Buffer { id, usage, size, offset },
                    SharedValue::Buffer {
                        id: new_id,
                        usage: new_usage,
                        size: new_size,
                        offset: new_offset,
                    },
                ) => id == new_id && usage == new_usage && size == new_size && offset != new_offset,
                _ => false,
            };
            let unchanged = match (&*existing, &value) {
                (SharedValue::Texture { id, .. }, SharedValue::Texture { id: new_id, .. }) => id == new_id,
                // A new offset changes the texture view, so it never counts as offset only.
                (
                    SharedValue::TextureBuffer { id, format, offset, count, .. },
                    SharedValue::TextureBuffer {
                        id: new_id,
                        format: new_format,
                        offset: new_offset,
                        count: new_count,
                        ..
                    },
                ) => id == new_id && format == new_format && offset == new_offset && count == new_count,
                (
                    SharedValue::Buffer { id, offset, size, .. },
                    SharedValue::Buffer {
                        id: new_id,
                        offset: new_offset,
                        size: new_size,
                        ..
                    },
                ) => id == new_id && offset == new_offset && size == new_size,
                (SharedValue::VariableGroup { id, .. }, SharedValue::VariableGroup { id: new_id, .. }) => {
                    id == new_id
                }
                _ => false,
            };

            if offset_only {
                self.offset_version = self.offset_version.wrapping_add(1);
            } else if !unchanged {
                self.pointer_version = self.pointer_version.wrapping_add(1);
            }
            *existing = value;
            return Ok(());
        }

        if self.values.len() >= self.max_values {
            return Err(reject!(
                CapabilityExceeded,
                "shared material values are full with {} values, can't add '{}'",
                self.max_values,
                name
            ));
        }
        self.values.insert(name.to_string(), value);
        self.pointer_version = self.pointer_version.wrapping_add(1);
        Ok(())
    }

    /// Set a texture, image or subpass input.
    pub fn set_texture(&mut self, name: &str, texture: &Texture) -> Result<(), GraphicsError> {
        self.set(
            name,
            SharedValue::Texture {
                id: texture.id(),
                usage: texture.usage(),
            },
        )
    }

    /// Set `count` texels of a buffer starting at `offset`, viewed with `format`.
    pub fn set_texture_buffer(
        &mut self,
        name: &str,
        buffer: &GfxBuffer,
        format: TextureFormat,
        offset: usize,
        count: usize,
    ) -> Result<(), GraphicsError> {
        let usage = buffer.usage();
        if !usage.intersects(BufferUsage::TEXTURE | BufferUsage::IMAGE) {
            return Err(reject!(
                InvalidArgument,
                "buffer for '{}' doesn't support being used as a texture",
                name
            ));
        }
        if !buffer
            .manager()
            .format_support(format)
            .contains(FormatSupport::TEXTURE_BUFFER)
        {
            return Err(reject!(
                CapabilityExceeded,
                "format {:?} isn't supported for texture buffer '{}'",
                format,
                name
            ));
        }
        let size = count.saturating_mul(format.size() as usize);
        if count == 0 || !is_buffer_range_valid(offset, size, buffer.size()) {
            return Err(reject!(
                OutOfRange,
                "viewing {} texels at offset {} for '{}' is outside of a {} byte buffer",
                count,
                offset,
                name,
                buffer.size()
            ));
        }
        self.set(
            name,
            SharedValue::TextureBuffer {
                id: buffer.id(),
                usage,
                format,
                offset,
                count,
            },
        )
    }

    /// Set a range of a buffer used as a uniform block or uniform buffer.
    pub fn set_buffer(
        &mut self,
        name: &str,
        buffer: &GfxBuffer,
        offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        let usage = buffer.usage();
        if !usage.intersects(BufferUsage::UNIFORM_BLOCK | BufferUsage::UNIFORM_BUFFER) {
            return Err(reject!(
                InvalidArgument,
                "buffer for '{}' doesn't support uniform blocks or buffers",
                name
            ));
        }
        if !is_buffer_range_valid(offset, size, buffer.size()) {
            return Err(reject!(
                OutOfRange,
                "binding {} bytes at offset {} for '{}' is outside of a {} byte buffer",
                size,
                offset,
                name,
                buffer.size()
            ));
        }
        self.set(
            name,
            SharedValue::Buffer {
                id: buffer.id(),
                usage,
                offset,
                size,
            },
        )
    }

    /// Set a shader variable group.
    pub fn set_variable_group(
        &mut self,
        name: &str,
        group: &ShaderVariableGroup,
    ) -> Result<(), GraphicsError> {
        self.set(
            name,
            SharedValue::VariableGroup {
                id: group.id(),
                desc: Arc::clone(group.description()),
                buffer: group.buffer().map(|buffer| (buffer.id(), buffer.usage())),
            },
        )
    }

    /// Remove a value, returning whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Check that every object element of `desc` with the given binding has a
    /// value of a matching kind and usage.
    ///
    /// Primitive elements are stored with the material and never checked here.
    pub fn verify(
        &self,
        desc: &MaterialDesc,
        binding: MaterialBinding,
        shader_name: &str,
    ) -> Result<(), GraphicsError> {
        let objects = desc
            .elements()
            .iter()
            .filter(|element| element.binding == binding && !element.ty.is_primitive());
        for element in objects {
            let name = &element.name;
            let value = self.values.get(name);
            match element.ty {
                MaterialType::Texture | MaterialType::Image | MaterialType::SubpassInput => {
                    let Some(SharedValue::Texture { usage, .. }) = value else {
                        return Err(reject!(
                            InvalidArgument,
                            "shared texture '{}' not found for shader '{}'",
                            name,
                            shader_name
                        ));
                    };
                    let (required, purpose) = match element.ty {
                        MaterialType::Texture => (TextureUsage::TEXTURE, "a texture sampler"),
                        MaterialType::Image => (TextureUsage::IMAGE, "an image sampler"),
                        _ => (TextureUsage::SUBPASS_INPUT, "a subpass input"),
                    };
                    if !usage.contains(required) {
                        return Err(reject!(
                            InvalidArgument,
                            "texture '{}' doesn't support being used as {} for shader '{}'",
                            name,
                            purpose,
                            shader_name
                        ));
                    }
                }
                MaterialType::TextureBuffer | MaterialType::ImageBuffer => {
                    let Some(SharedValue::TextureBuffer { usage, .. }) = value else {
                        return Err(reject!(
                            InvalidArgument,
                            "shared texture buffer '{}' not found for shader '{}'",
                            name,
                            shader_name
                        ));
                    };
                    let required = if element.ty == MaterialType::TextureBuffer {
                        BufferUsage::TEXTURE
                    } else {
                        BufferUsage::IMAGE
                    };
                    if !usage.contains(required) {
                        return Err(reject!(
                            InvalidArgument,
                            "buffer '{}' doesn't support being used as a {} for shader '{}'",
                            name,
                            element.ty,
                            shader_name
                        ));
                    }
                }
                MaterialType::VariableGroup => match value {
                    Some(SharedValue::VariableGroup { desc: group_desc, .. }) => {
                        let matches = element
                            .variable_group
                            .as_ref()
                            .is_some_and(|expected| Arc::ptr_eq(expected, group_desc));
                        if !matches {
                            return Err(reject!(
                                InvalidArgument,
                                "shared variable group description for '{}' doesn't match the material element for shader '{}'",
                                name,
                                shader_name
                            ));
                        }
                    }
                    Some(SharedValue::Buffer { usage, .. }) => {
                        verify_buffer_usage(element.ty, *usage, name, shader_name)?;
                    }
                    _ => {
                        return Err(reject!(
                            InvalidArgument,
                            "shared variable group '{}' not found for shader '{}'",
                            name,
                            shader_name
                        ));
                    }
                },
                MaterialType::UniformBlock | MaterialType::UniformBuffer => {
                    let usage = match value {
                        Some(SharedValue::Buffer { usage, .. }) => *usage,
                        Some(SharedValue::VariableGroup {
                            buffer: Some((_, usage)),
                            ..
                        }) => *usage,
                        _ => {
                            return Err(reject!(
                                InvalidArgument,
                                "buffer '{}' not found for shader '{}'",
                                name,
                                shader_name
                            ));
                        }
                    };
                    verify_buffer_usage(element.ty, usage, name, shader_name)?;
                }
                _ => {
                    return Err(reject!(
                        InvalidArgument,
                        "element '{}' of type {} can't be a shared value for shader '{}'",
                        name,
                        element.ty,
                        shader_name
                    ));
                }
            }
        }
        Ok(())
    }
}

fn verify_buffer_usage(
    ty: MaterialType,
    usage: BufferUsage,
    name: &str,
    shader_name: &str,
) -> Result<(), GraphicsError> {
    if ty == MaterialType::UniformBlock && !usage.contains(BufferUsage::UNIFORM_BLOCK) {
        return Err(reject!(
            InvalidArgument,
            "buffer '{}' doesn't support being used as a uniform block for shader '{}'",
            name,
            shader_name
        ));
    }
    if ty == MaterialType::UniformBuffer && !usage.contains(BufferUsage::UNIFORM_BUFFER) {
        return Err(reject!(
            InvalidArgument,
            "buffer '{}' doesn't support being used as a uniform buffer for shader '{}'",
            name,
            shader_name
        ));
    }
    Ok(())
}

/// Verify values for `binding` against `desc`, treating missing values as empty.
pub(crate) fn verify_shared_values(
    desc: &MaterialDesc,
    values: Option<&SharedMaterialValues>,
    binding: MaterialBinding,
    shader_name: &str,
) -> Result<(), GraphicsError> {
    match values {
        Some(values) => values.verify(desc, binding, shader_name),
        None if desc
            .elements()
            .iter()
            .any(|element| element.binding == binding && !element.ty.is_primitive()) =>
        {
            Err(reject!(
                InvalidArgument,
                "material uses {:?} values, but none were provided for shader '{}'",
                binding,
                shader_name
            ))
        }
        None => Ok(()),
    }
}
