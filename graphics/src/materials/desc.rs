//! Material descriptions: the named, typed slots a shader is bound against.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::error::{DestroyError, GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;
use crate::types::BufferUsage;

use super::types::{MaterialBinding, MaterialType};
use super::variable_group::ShaderVariableGroupDesc;

/// Element of a material description.
#[derive(Debug, Clone)]
pub struct MaterialElement {
    /// Name matched against the uniforms of a shader.
    pub name: String,
    /// Type of the element.
    pub ty: MaterialType,
    /// Array length, or 0 if the element isn't an array. Only primitive,
    /// vector and matrix types can be arrays.
    pub count: u32,
    /// How often the value changes.
    pub binding: MaterialBinding,
    /// Description of the group for [`MaterialType::VariableGroup`] elements.
    pub variable_group: Option<Arc<ShaderVariableGroupDesc>>,
}

impl MaterialElement {
    /// Create an element with the [`MaterialBinding::Material`] binding.
    pub fn new(name: impl Into<String>, ty: MaterialType) -> Self {
        Self {
            name: name.into(),
            ty,
            count: 0,
            binding: MaterialBinding::Material,
            variable_group: None,
        }
    }

    /// Create a variable group element.
    pub fn variable_group(name: impl Into<String>, desc: &Arc<ShaderVariableGroupDesc>) -> Self {
        Self {
            variable_group: Some(Arc::clone(desc)),
            ..Self::new(name, MaterialType::VariableGroup)
        }
    }

    /// Make the element an array of `count` values.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set how often the value changes.
    pub fn with_binding(mut self, binding: MaterialBinding) -> Self {
        self.binding = binding;
        self
    }
}

/// Ordered list of material elements.
///
/// Shared as `Arc<MaterialDesc>` by the shaders and materials created with it.
/// Two descriptions are the same only if they are the same `Arc`.
pub struct MaterialDesc {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    elements: Vec<MaterialElement>,
}

impl MaterialDesc {
    /// Create a material description.
    ///
    /// Every element is checked and each problem is logged before the
    /// description is rejected.
    pub fn create(
        manager: &Arc<ResourceManager>,
        elements: &[MaterialElement],
    ) -> Result<Arc<Self>, GraphicsError> {
        profile_scope!("MaterialDesc::create");
        manager.require(
            BackendOperations::MATERIAL_DESC_CREATE | BackendOperations::MATERIAL_DESC_DESTROY,
            "material descriptions",
        )?;

        let supported_buffers = manager.capabilities().supported_buffers;
        let mut invalid = Vec::new();
        let mut unsupported = Vec::new();
        let mut names = HashSet::with_capacity(elements.len());
        for element in elements {
            let name = &element.name;
            if name.is_empty() {
                invalid.push("element name not given".to_string());
                continue;
            }
            if !names.insert(name.as_str()) {
                invalid.push(format!("element '{name}' specified multiple times"));
            }
            if element.binding != MaterialBinding::Material && element.ty.is_primitive() {
                invalid.push(format!(
                    "primitive, vector and matrix elements must use the material binding for element '{name}'"
                ));
            }
            match (&element.variable_group, element.ty) {
                (None, MaterialType::VariableGroup) => invalid.push(format!(
                    "variable group element '{name}' is missing its shader variable group description"
                )),
                (Some(group), MaterialType::VariableGroup)
                    if !Arc::ptr_eq(group.manager(), manager) =>
                {
                    invalid.push(format!(
                        "shader variable group description for element '{name}' was created with a different resource manager"
                    ))
                }
                _ => {}
            }
            if element.ty == MaterialType::UniformBlock
                && !supported_buffers.contains(BufferUsage::UNIFORM_BLOCK)
            {
                unsupported.push(format!("target doesn't support uniform blocks for element '{name}'"));
            }
            if element.ty == MaterialType::UniformBuffer
                && !supported_buffers.contains(BufferUsage::UNIFORM_BUFFER)
            {
                unsupported.push(format!("target doesn't support uniform buffers for element '{name}'"));
            }
            if !element.ty.is_primitive() && element.count > 0 {
                invalid.push(format!(
                    "only primitive, vector and matrix types can use arrays for element '{name}'"
                ));
            }
        }

        for issue in invalid.iter().chain(&unsupported) {
            log::error!("MaterialDesc: {}", issue);
        }
        if !invalid.is_empty() {
            invalid.extend(unsupported);
            return Err(GraphicsError::InvalidArgument(invalid.join("; ")));
        }
        if !unsupported.is_empty() {
            return Err(GraphicsError::CapabilityExceeded(unsupported.join("; ")));
        }

        manager.ensure_context()?;
        let handle = manager.backend().create_material_desc(elements)?;
        manager.counters.material_descs.fetch_add(1, Ordering::AcqRel);

        let desc = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            elements: elements.to_vec(),
        };
        log::trace!(
            "MaterialDesc: created {} with {} elements",
            desc.id,
            desc.elements.len()
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
    pub fn elements(&self) -> &[MaterialElement] {
        &self.elements
    }

    /// Find the index of an element by name.
    pub fn find_element(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|element| element.name == name)
    }

    /// Destroy the description.
    ///
    /// Fails with [`GraphicsError::InvalidState`] while any shader or material
    /// still references it.
    pub fn destroy(desc: Arc<Self>) -> Result<(), DestroyError<Arc<Self>>> {
        profile_scope!("MaterialDesc::destroy");
        let desc = match Arc::try_unwrap(desc) {
            Ok(desc) => desc,
            Err(shared) => {
                let err = reject!(
                    InvalidState,
                    "material description {} is still referenced by {} owners",
                    shared.id,
                    Arc::strong_count(&shared) - 1
                );
                return Err(DestroyError::new(shared, err));
            }
        };

        if let Err(err) = desc.manager.ensure_context() {
            return Err(DestroyError::new(Arc::new(desc), err));
        }
        if let Err(err) = desc.manager.backend().destroy_material_desc(&desc) {
            return Err(DestroyError::new(Arc::new(desc), err));
        }

        desc.manager
            .counters
            .material_descs
            .fetch_sub(1, Ordering::AcqRel);
        log::trace!("MaterialDesc: destroyed {}", desc.id);
        Ok(())
    }
}

impl fmt::Debug for MaterialDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialDesc")
            .field("id", &self.id)
            .field("elements", &self.elements)
            .finish()
    }
}

static_assertions::assert_impl_all!(MaterialDesc: Send, Sync);
