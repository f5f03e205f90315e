//! Material values for a material description.
//!
//! A [`Material`] stores the values of every element with the
//! [`MaterialBinding::Material`] binding: primitive data packed tightly on the
//! CPU, and the textures, buffers and variable groups bound to object elements.

use std::sync::Arc;

use crate::error::{GraphicsError, reject};
use crate::resources::{GfxBuffer, Texture};
use crate::types::TextureFormat;

use super::desc::{MaterialDesc, MaterialElement};
use super::shared_values::SharedMaterialValues;
use super::types::{MaterialBinding, MaterialType};
use super::variable_group::ShaderVariableGroup;

/// Values for the material-bound elements of a [`MaterialDesc`].
#[derive(Debug, Clone)]
pub struct Material {
    desc: Arc<MaterialDesc>,
    data: Vec<u8>,
    offsets: Vec<Option<usize>>,
    objects: SharedMaterialValues,
}

impl Material {
    /// Create a material with zeroed primitive values and no objects bound.
    pub fn new(desc: &Arc<MaterialDesc>) -> Self {
        let mut offsets = Vec::with_capacity(desc.elements().len());
        let mut size = 0;
        let mut object_count = 0;
        for element in desc.elements() {
            if element.ty.is_primitive() {
                offsets.push(Some(size));
                size += element.ty.size() * element.count.max(1) as usize;
            } else {
                offsets.push(None);
                if element.binding == MaterialBinding::Material {
                    object_count += 1;
                }
            }
        }

        Self {
            desc: Arc::clone(desc),
            data: vec![0; size],
            offsets,
            objects: SharedMaterialValues::new(object_count),
        }
    }

    /// Get the material description.
    pub fn description(&self) -> &Arc<MaterialDesc> {
        &self.desc
    }

    /// Textures, buffers and variable groups bound to object elements.
    pub fn objects(&self) -> &SharedMaterialValues {
        &self.objects
    }

    fn element(&self, element: usize) -> Result<&MaterialElement, GraphicsError> {
        self.desc.elements().get(element).ok_or_else(|| {
            reject!(
                OutOfRange,
                "element index {} is out of range for a material with {} elements",
                element,
                self.desc.elements().len()
            )
        })
    }

    fn object_element(
        &self,
        element: usize,
        allowed: &[MaterialType],
    ) -> Result<&MaterialElement, GraphicsError> {
        let info = self.element(element)?;
        if !allowed.contains(&info.ty) {
            return Err(reject!(
                InvalidArgument,
                "element '{}' of type {} can't be set to a {:?} value",
                info.name,
                info.ty,
                allowed
            ));
        }
        if info.binding != MaterialBinding::Material {
            return Err(reject!(
                InvalidArgument,
                "element '{}' uses the {:?} binding and is set through shared values",
                info.name,
                info.binding
            ));
        }
        Ok(info)
    }

    /// Set array values `first_index..` of a primitive, vector or matrix element.
    ///
    /// `data` holds tightly packed values of `ty`.
    pub fn set_element_data(
        &mut self,
        element: usize,
        ty: MaterialType,
        first_index: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let info = self.element(element)?;
        if info.ty != ty || !ty.is_primitive() {
            return Err(reject!(
                InvalidArgument,
                "type {} doesn't match element '{}' of type {}",
                ty,
                info.name,
                info.ty
            ));
        }
        let value_size = ty.size();
        if data.is_empty() || data.len() % value_size != 0 {
            return Err(reject!(
                InvalidArgument,
                "data size {} for element '{}' isn't a non-zero multiple of {}",
                data.len(),
                info.name,
                value_size
            ));
        }
        let count = data.len() / value_size;
        let available = info.count.max(1) as usize;
        if first_index as usize + count > available {
            return Err(reject!(
                OutOfRange,
                "setting {} values at index {} is out of range for element '{}' with {} values",
                count,
                first_index,
                info.name,
                available
            ));
        }

        let Some(offset) = self.offsets[element] else {
            return Err(reject!(Internal, "primitive element without data offset"));
        };
        let start = offset + first_index as usize * value_size;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Typed version of [`Material::set_element_data`].
    pub fn set_element_data_typed<T: bytemuck::Pod>(
        &mut self,
        element: usize,
        ty: MaterialType,
        first_index: u32,
        data: &[T],
    ) -> Result<(), GraphicsError> {
        self.set_element_data(element, ty, first_index, bytemuck::cast_slice(data))
    }

    /// Tightly packed values of a primitive element.
    pub fn element_data(&self, element: usize) -> Option<&[u8]> {
        let info = self.desc.elements().get(element)?;
        let offset = (*self.offsets.get(element)?)?;
        let size = info.ty.size() * info.count.max(1) as usize;
        self.data.get(offset..offset + size)
    }

    /// Bind a texture to a texture, image or subpass input element.
    pub fn set_texture(&mut self, element: usize, texture: &Texture) -> Result<(), GraphicsError> {
        let info = self.object_element(
            element,
            &[MaterialType::Texture, MaterialType::Image, MaterialType::SubpassInput],
        )?;
        let name = info.name.clone();
        self.objects.set_texture(&name, texture)
    }

    /// Bind a buffer range to a uniform block, uniform buffer or variable group element.
    pub fn set_buffer(
        &mut self,
        element: usize,
        buffer: &GfxBuffer,
        offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        let info = self.object_element(
            element,
            &[
                MaterialType::UniformBlock,
                MaterialType::UniformBuffer,
                MaterialType::VariableGroup,
            ],
        )?;
        let name = info.name.clone();
        self.objects.set_buffer(&name, buffer, offset, size)
    }

    /// Bind a shader variable group to a variable group element.
    pub fn set_variable_group(
        &mut self,
        element: usize,
        group: &ShaderVariableGroup,
    ) -> Result<(), GraphicsError> {
        let info = self.object_element(element, &[MaterialType::VariableGroup])?;
        let matches = info
            .variable_group
            .as_ref()
            .is_some_and(|desc| Arc::ptr_eq(desc, group.description()));
        if !matches {
            return Err(reject!(
                InvalidArgument,
                "variable group description doesn't match element '{}'",
                info.name
            ));
        }
        let name = info.name.clone();
        self.objects.set_variable_group(&name, group)
    }

    /// View a buffer as a texture buffer or image buffer element.
    pub fn set_texture_buffer(
        &mut self,
        element: usize,
        buffer: &GfxBuffer,
        format: TextureFormat,
        offset: usize,
        count: usize,
    ) -> Result<(), GraphicsError> {
        let info = self.object_element(
            element,
            &[MaterialType::TextureBuffer, MaterialType::ImageBuffer],
        )?;
        let name = info.name.clone();
        self.objects
            .set_texture_buffer(&name, buffer, format, offset, count)
    }

    /// Check that every material-bound object element has a usable value.
    pub fn verify_objects(&self) -> Result<(), GraphicsError> {
        self.objects
            .verify(&self.desc, MaterialBinding::Material, "material")
    }
}
