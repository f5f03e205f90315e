//! Shader variable groups: named, ordered sets of primitive uniform values.
//!
//! A [`ShaderVariableGroupDesc`] describes the members and computes their
//! positions with the std140 block layout. A [`ShaderVariableGroup`] holds the
//! values for one description and, when the backend supports uniform blocks,
//! a GPU buffer they are committed to.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::command_buffer::CommandBuffer;
use crate::error::{DestroyError, GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;
use crate::resources::GfxBuffer;
use crate::types::{BufferUsage, MemoryHints};

use super::types::MaterialType;

/// Member of a shader variable group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderVariableElement {
    /// Name of the member within the group.
    pub name: String,
    /// Type of the member. Must be a scalar, vector or matrix.
    pub ty: MaterialType,
    /// Array length, or 0 if the member isn't an array.
    pub count: u32,
}

impl ShaderVariableElement {
    /// Create a member that isn't an array.
    pub fn new(name: impl Into<String>, ty: MaterialType) -> Self {
        Self {
            name: name.into(),
            ty,
            count: 0,
        }
    }

    /// Make the member an array of `count` values.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Position of a member within the group's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderVariablePos {
    /// Byte offset of the first value.
    pub offset: usize,
    /// Distance between array values. Equal to the value size for non-arrays.
    pub stride: usize,
    /// Distance between matrix columns, or 0 for non-matrix types.
    pub matrix_col_stride: usize,
}

fn round_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Base alignment of a scalar or vector with the std140 rules.
fn vector_alignment(ty: MaterialType) -> usize {
    let scalar = ty.scalar_size();
    match ty.matrix_rows() {
        1 => scalar,
        2 => scalar * 2,
        _ => scalar * 4,
    }
}

/// Compute std140 positions for `elements` and the total block size.
pub fn std140_layout(elements: &[ShaderVariableElement]) -> (Vec<ShaderVariablePos>, usize) {
    let mut positions = Vec::with_capacity(elements.len());
    let mut cur = 0usize;
    for element in elements {
        let ty = element.ty;
        let (mut alignment, single_size, matrix_col_stride) = match ty.matrix_column_type() {
            Some(column) => {
                let col_stride = round_up(vector_alignment(column), 16);
                (col_stride, col_stride * ty.matrix_columns() as usize, col_stride)
            }
            None => (vector_alignment(ty), ty.size(), 0),
        };

        let stride = if element.count > 0 {
            alignment = round_up(alignment, 16);
            round_up(single_size, alignment)
        } else {
            single_size
        };

        let offset = round_up(cur, alignment);
        cur = offset + stride * (element.count.max(1) as usize);
        positions.push(ShaderVariablePos {
            offset,
            stride,
            matrix_col_stride,
        });
    }
    (positions, round_up(cur, 16))
}

/// Description of the members of a shader variable group.
///
/// Shared as `Arc<ShaderVariableGroupDesc>`. Material elements and groups keep
/// the description alive, and two descriptions are the same only if they are
/// the same `Arc`.
pub struct ShaderVariableGroupDesc {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    elements: Vec<ShaderVariableElement>,
    positions: Vec<ShaderVariablePos>,
    size: usize,
}

impl ShaderVariableGroupDesc {
    /// Create a shader variable group description.
    pub fn create(
        manager: &Arc<ResourceManager>,
        elements: &[ShaderVariableElement],
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_scope!("ShaderVariableGroupDesc::create");
        manager.require(
            BackendOperations::VARIABLE_GROUP_DESC_CREATE
                | BackendOperations::VARIABLE_GROUP_DESC_DESTROY,
            "shader variable group descriptions",
        )?;

        if elements.is_empty() {
            return Err(reject!(
                InvalidArgument,
                "shader variable group description must have at least one element"
            ));
        }

        let mut names = HashSet::with_capacity(elements.len());
        for element in elements {
            if element.name.is_empty() {
                return Err(reject!(
                    InvalidArgument,
                    "shader variable group element names must not be empty"
                ));
            }
            if !names.insert(element.name.as_str()) {
                return Err(reject!(
                    InvalidArgument,
                    "shader variable group description contains duplicate element '{}'",
                    element.name
                ));
            }
            if !element.ty.is_primitive() {
                return Err(reject!(
                    InvalidArgument,
                    "shader variable group element '{}' has type {}, only primitive, vector and matrix types are allowed",
                    element.name,
                    element.ty
                ));
            }
        }

        manager.ensure_context()?;
        let handle = manager.backend().create_variable_group_desc(elements)?;
        manager
            .counters
            .variable_group_descs
            .fetch_add(1, Ordering::AcqRel);

        let (positions, size) = std140_layout(elements);
        let desc = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            elements: elements.to_vec(),
            positions,
            size,
        };
        log::trace!(
            "ShaderVariableGroupDesc: created {} ({} elements, {} bytes)",
            desc.id,
            desc.elements.len(),
            desc.size
        );
        Ok(Arc::new(desc))
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Unique identifier of the description.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Backend handle of the description.
    pub fn handle(&self) -> BackendHandle {
        self.handle
    }

    /// Get the elements in declaration order.
    pub fn elements(&self) -> &[ShaderVariableElement] {
        &self.elements
    }

    /// Get the std140 position of each element.
    pub fn positions(&self) -> &[ShaderVariablePos] {
        &self.positions
    }

    /// Size in bytes of the group's data.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Find the index of an element by name.
    pub fn find_element(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|element| element.name == name)
    }

    /// Destroy the description.
    ///
    /// Fails with [`GraphicsError::InvalidState`] while any material description
    /// or group still references it.
    pub fn destroy(desc: Arc<Self>) -> Result<(), DestroyError<Arc<Self>>> {
        profile_scope!("ShaderVariableGroupDesc::destroy");
        let desc = match Arc::try_unwrap(desc) {
            Ok(desc) => desc,
            Err(shared) => {
                let err = reject!(
                    InvalidState,
                    "shader variable group description {} is still referenced by {} owners",
                    shared.id,
                    Arc::strong_count(&shared) - 1
                );
                return Err(DestroyError::new(shared, err));
            }
        };

        if let Err(err) = desc.manager.ensure_context() {
            return Err(DestroyError::new(Arc::new(desc), err));
        }
        if let Err(err) = desc.manager.backend().destroy_variable_group_desc(&desc) {
            return Err(DestroyError::new(Arc::new(desc), err));
        }

        desc.manager
            .counters
            .variable_group_descs
            .fetch_sub(1, Ordering::AcqRel);
        log::trace!("ShaderVariableGroupDesc: destroyed {}", desc.id);
        Ok(())
    }
}

impl fmt::Debug for ShaderVariableGroupDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderVariableGroupDesc")
            .field("id", &self.id)
            .field("elements", &self.elements)
            .field("size", &self.size)
            .finish()
    }
}

/// Values of a shader variable group.
///
/// Values are kept on the CPU in the std140 layout of the description and
/// uploaded by [`ShaderVariableGroup::commit`].
pub struct ShaderVariableGroup {
    manager: Arc<ResourceManager>,
    id: u64,
    desc: Arc<ShaderVariableGroupDesc>,
    data: Vec<u8>,
    buffer: Option<GfxBuffer>,
    dirty: bool,
}

impl ShaderVariableGroup {
    /// Create a group with zeroed values.
    ///
    /// A uniform block buffer backs the group when the backend supports them.
    pub fn create(
        manager: &Arc<ResourceManager>,
        desc: &Arc<ShaderVariableGroupDesc>,
    ) -> Result<Self, GraphicsError> {
        profile_scope!("ShaderVariableGroup::create");
        if !Arc::ptr_eq(manager, desc.manager()) {
            return Err(reject!(
                InvalidArgument,
                "shader variable group description was created with a different resource manager"
            ));
        }
        manager.ensure_context()?;

        let wants_buffer = manager
            .capabilities()
            .supported_buffers
            .contains(BufferUsage::UNIFORM_BLOCK | BufferUsage::COPY_TO)
            && manager.operations().contains(
                BackendOperations::BUFFER_LIFECYCLE | BackendOperations::BUFFER_COPY_DATA,
            );
        let buffer = if wants_buffer {
            Some(GfxBuffer::create(
                manager,
                BufferUsage::UNIFORM_BLOCK | BufferUsage::COPY_TO,
                MemoryHints::DRAW | MemoryHints::DYNAMIC,
                desc.size(),
                None,
            )?)
        } else {
            None
        };

        manager.counters.variable_groups.fetch_add(1, Ordering::AcqRel);
        let group = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            desc: Arc::clone(desc),
            data: vec![0; desc.size()],
            buffer,
            dirty: true,
        };
        log::trace!(
            "ShaderVariableGroup: created {} for description {} (buffer backed: {})",
            group.id,
            desc.id(),
            group.buffer.is_some()
        );
        Ok(group)
    }

    /// Unique identifier of the group.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the description.
    pub fn description(&self) -> &Arc<ShaderVariableGroupDesc> {
        &self.desc
    }

    /// Get the buffer backing the group, if any.
    pub fn buffer(&self) -> Option<&GfxBuffer> {
        self.buffer.as_ref()
    }

    /// Values in the std140 layout of the description.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether values changed since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set array values `first_index..` of an element.
    ///
    /// `data` holds tightly packed values of `ty`, which must match the
    /// element's type. Matrix columns and array values are spread to the
    /// element's strides.
    pub fn set_element_data(
        &mut self,
        element: usize,
        ty: MaterialType,
        first_index: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let desc = &self.desc;
        let Some(info) = desc.elements().get(element) else {
            return Err(reject!(
                OutOfRange,
                "element index {} is out of range for a group with {} elements",
                element,
                desc.elements().len()
            ));
        };
        if info.ty != ty {
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

        let pos = desc.positions()[element];
        let start = pos.offset + pos.stride * first_index as usize;
        if pos.matrix_col_stride > 0 {
            let columns = ty.matrix_columns() as usize;
            let column_size = value_size / columns;
            for (value, chunk) in data.chunks_exact(value_size).enumerate() {
                let value_start = start + pos.stride * value;
                for (column, bytes) in chunk.chunks_exact(column_size).enumerate() {
                    let dst = value_start + pos.matrix_col_stride * column;
                    self.data[dst..dst + column_size].copy_from_slice(bytes);
                }
            }
        } else if pos.stride == value_size {
            self.data[start..start + data.len()].copy_from_slice(data);
        } else {
            for (value, chunk) in data.chunks_exact(value_size).enumerate() {
                let dst = start + pos.stride * value;
                self.data[dst..dst + value_size].copy_from_slice(chunk);
            }
        }

        self.dirty = true;
        Ok(())
    }

    /// Typed version of [`ShaderVariableGroup::set_element_data`].
    pub fn set_element_data_typed<T: bytemuck::Pod>(
        &mut self,
        element: usize,
        ty: MaterialType,
        first_index: u32,
        data: &[T],
    ) -> Result<(), GraphicsError> {
        self.set_element_data(element, ty, first_index, bytemuck::cast_slice(data))
    }

    /// Set values of an element looked up by name.
    pub fn set_element_data_by_name(
        &mut self,
        name: &str,
        ty: MaterialType,
        first_index: u32,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let Some(element) = self.desc.find_element(name) else {
            return Err(reject!(NotFound, "shader variable group has no element '{}'", name));
        };
        self.set_element_data(element, ty, first_index, data)
    }

    /// Raw std140 bytes of a single array value of an element.
    pub fn element_data(&self, element: usize, index: u32) -> Option<&[u8]> {
        let info = self.desc.elements().get(element)?;
        if index >= info.count.max(1) {
            return None;
        }
        let pos = self.desc.positions()[element];
        let start = pos.offset + pos.stride * index as usize;
        self.data.get(start..start + pos.stride)
    }

    /// Upload changed values to the backing buffer.
    ///
    /// Does nothing for groups without a buffer or without changes.
    pub fn commit(&mut self, command_buffer: &CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("ShaderVariableGroup::commit");
        if !self.dirty {
            return Ok(());
        }
        if let Some(buffer) = &self.buffer {
            buffer.copy_data(command_buffer, 0, &self.data)?;
        }
        self.dirty = false;
        Ok(())
    }

    /// Destroy the group and its buffer.
    pub fn destroy(mut self) -> Result<(), DestroyError<Self>> {
        profile_scope!("ShaderVariableGroup::destroy");
        if let Err(err) = self.manager.ensure_context() {
            return Err(DestroyError::new(self, err));
        }
        if let Some(buffer) = self.buffer.take() {
            if let Err(err) = buffer.destroy() {
                self.buffer = Some(err.resource);
                return Err(DestroyError::new(self, err.error));
            }
        }

        self.manager
            .counters
            .variable_groups
            .fetch_sub(1, Ordering::AcqRel);
        log::trace!("ShaderVariableGroup: destroyed {}", self.id);
        Ok(())
    }
}

impl fmt::Debug for ShaderVariableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderVariableGroup")
            .field("id", &self.id)
            .field("desc", &self.desc.id())
            .field("buffer", &self.buffer)
            .field("dirty", &self.dirty)
            .finish()
    }
}

static_assertions::assert_impl_all!(ShaderVariableGroupDesc: Send, Sync);
static_assertions::assert_impl_all!(ShaderVariableGroup: Send, Sync);
