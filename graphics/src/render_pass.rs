//! Render passes and subpasses.
//!
//! A render pass is a fixed sequence of subpasses. Beginning a pass on a
//! command buffer activates its first subpass, each call to
//! [`RenderPass::next_subpass`] advances to the next one, and the pass can only
//! be ended once the last subpass is active.

use std::fmt;
use std::sync::Arc;

use crate::backend::BackendOperations;
use crate::command_buffer::{BoundRenderPass, CommandBuffer, CommandBufferUsage};
use crate::error::{GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;
use crate::types::{FormatSupport, TextureFormat};

/// Attachment rendered to by a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentInfo {
    /// Format of the attachment surface.
    pub format: TextureFormat,
    /// Sample count of the attachment surface.
    pub samples: u32,
}

impl AttachmentInfo {
    /// Single-sampled attachment.
    pub fn new(format: TextureFormat) -> Self {
        Self { format, samples: 1 }
    }
}

/// Description of a subpass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderSubpassInfo {
    /// Subpass name, used for diagnostics.
    pub name: String,
    /// Attachments read as subpass inputs.
    pub input_attachments: Vec<u32>,
    /// Attachments written as color outputs.
    pub color_attachments: Vec<u32>,
    /// Attachment used for depth and stencil.
    pub depth_stencil_attachment: Option<u32>,
}

impl RenderSubpassInfo {
    /// Subpass without attachments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the input attachments.
    pub fn with_inputs(mut self, attachments: impl Into<Vec<u32>>) -> Self {
        self.input_attachments = attachments.into();
        self
    }

    /// Set the color attachments.
    pub fn with_colors(mut self, attachments: impl Into<Vec<u32>>) -> Self {
        self.color_attachments = attachments.into();
        self
    }

    /// Set the depth-stencil attachment.
    pub fn with_depth_stencil(mut self, attachment: u32) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }
}

/// A render pass.
pub struct RenderPass {
    manager: Arc<ResourceManager>,
    id: u64,
    name: String,
    attachments: Vec<AttachmentInfo>,
    subpasses: Vec<RenderSubpassInfo>,
}

impl RenderPass {
    /// Create a render pass.
    ///
    /// Render passes can only be created on the main thread.
    pub fn create(
        manager: &Arc<ResourceManager>,
        name: &str,
        attachments: &[AttachmentInfo],
        subpasses: &[RenderSubpassInfo],
    ) -> Result<Self, GraphicsError> {
        profile_scope!("RenderPass::create");
        manager.require(
            BackendOperations::RENDER_PASS_BEGIN
                | BackendOperations::RENDER_PASS_NEXT_SUBPASS
                | BackendOperations::RENDER_PASS_END,
            "render passes",
        )?;

        if subpasses.is_empty() {
            return Err(reject!(InvalidArgument, "render pass '{}' has no subpasses", name));
        }

        for attachment in attachments {
            if !manager
                .format_support(attachment.format)
                .contains(FormatSupport::OFFSCREEN)
            {
                return Err(reject!(
                    CapabilityExceeded,
                    "attachment format {:?} cannot be rendered to",
                    attachment.format
                ));
            }
        }

        let attachment_count = attachments.len() as u32;
        let check_index = |subpass: &RenderSubpassInfo, index: u32, kind: &str| {
            if index >= attachment_count {
                return Err(reject!(
                    OutOfRange,
                    "subpass '{}' {} attachment {} is out of range",
                    subpass.name,
                    kind,
                    index
                ));
            }
            Ok(())
        };

        for subpass in subpasses {
            for &index in &subpass.input_attachments {
                check_index(subpass, index, "input")?;
            }
            for &index in &subpass.color_attachments {
                check_index(subpass, index, "color")?;
                if attachments[index as usize].format.is_depth_stencil() {
                    return Err(reject!(
                        InvalidArgument,
                        "subpass '{}' uses a depth-stencil surface as a color attachment",
                        subpass.name
                    ));
                }
            }
            if let Some(index) = subpass.depth_stencil_attachment {
                check_index(subpass, index, "depth-stencil")?;
                if !attachments[index as usize].format.is_depth_stencil() {
                    return Err(reject!(
                        InvalidArgument,
                        "subpass '{}' uses a color surface as a depth-stencil attachment",
                        subpass.name
                    ));
                }
            }
        }

        if !manager.is_main_thread() {
            return Err(reject!(
                InvalidState,
                "render passes may only be created on the main thread"
            ));
        }

        let render_pass = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            name: name.to_string(),
            attachments: attachments.to_vec(),
            subpasses: subpasses.to_vec(),
        };
        log::trace!(
            "RenderPass: created '{}' with {} subpasses",
            render_pass.name,
            render_pass.subpasses.len()
        );
        Ok(render_pass)
    }

    /// Unique identifier of the render pass.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the render pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the attachments.
    pub fn attachments(&self) -> &[AttachmentInfo] {
        &self.attachments
    }

    /// Get the subpasses.
    pub fn subpasses(&self) -> &[RenderSubpassInfo] {
        &self.subpasses
    }

    /// Number of subpasses.
    pub fn subpass_count(&self) -> u32 {
        self.subpasses.len() as u32
    }

    /// Begin the render pass, activating its first subpass.
    ///
    /// With `secondary` set, the commands of the subpass are expected to come
    /// from secondary command buffers submitted to `command_buffer`.
    pub fn begin(&self, command_buffer: &mut CommandBuffer, secondary: bool) -> Result<(), GraphicsError> {
        profile_scope!("RenderPass::begin");
        if !Arc::ptr_eq(&self.manager, command_buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "render pass and command buffer were created with different resource managers"
            ));
        }
        if command_buffer.usage().contains(CommandBufferUsage::SECONDARY) {
            return Err(reject!(
                InvalidState,
                "render passes cannot be begun on secondary command buffers"
            ));
        }
        if !command_buffer.frame_active {
            return Err(reject!(InvalidState, "render passes must be begun inside of a frame"));
        }
        if command_buffer.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot begin render pass '{}' while another render pass is active",
                self.name
            ));
        }
        if command_buffer.bound_compute_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot begin a render pass while a compute shader is bound"
            ));
        }

        self.manager
            .backend()
            .begin_render_pass(command_buffer, self, secondary)?;
        command_buffer.bound_render_pass = Some(BoundRenderPass {
            id: self.id,
            subpass_count: self.subpass_count(),
            active_subpass: 0,
        });
        command_buffer.secondary_render_pass_commands = secondary;
        log::trace!("RenderPass: began '{}' on {}", self.name, command_buffer.id());
        Ok(())
    }

    fn check_active(&self, command_buffer: &CommandBuffer) -> Result<BoundRenderPass, GraphicsError> {
        match command_buffer.bound_render_pass {
            Some(bound) if bound.id == self.id => Ok(bound),
            Some(_) => Err(reject!(
                InvalidState,
                "render pass '{}' is not the active render pass",
                self.name
            )),
            None => Err(reject!(
                InvalidState,
                "render pass '{}' has not been begun",
                self.name
            )),
        }
    }

    /// Advance to the next subpass.
    pub fn next_subpass(&self, command_buffer: &mut CommandBuffer, secondary: bool) -> Result<(), GraphicsError> {
        profile_scope!("RenderPass::next_subpass");
        let bound = self.check_active(command_buffer)?;
        let next = bound.active_subpass + 1;
        if next >= bound.subpass_count {
            return Err(reject!(
                OutOfRange,
                "render pass '{}' has no subpass after {}",
                self.name,
                bound.active_subpass
            ));
        }
        if command_buffer.bound_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot advance to the next subpass while a shader is bound"
            ));
        }

        self.manager
            .backend()
            .next_render_subpass(command_buffer, self, next, secondary)?;
        command_buffer.bound_render_pass = Some(BoundRenderPass {
            active_subpass: next,
            ..bound
        });
        command_buffer.secondary_render_pass_commands = secondary;
        log::trace!(
            "RenderPass: '{}' advanced to subpass '{}'",
            self.name,
            self.subpasses[next as usize].name
        );
        Ok(())
    }

    /// End the render pass.
    pub fn end(&self, command_buffer: &mut CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("RenderPass::end");
        let bound = self.check_active(command_buffer)?;
        if bound.active_subpass + 1 != bound.subpass_count {
            return Err(reject!(
                InvalidState,
                "render pass '{}' ended before all {} subpasses were drawn",
                self.name,
                bound.subpass_count
            ));
        }
        if command_buffer.bound_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot end a render pass while a shader is bound"
            ));
        }

        self.manager.backend().end_render_pass(command_buffer, self)?;
        command_buffer.bound_render_pass = None;
        command_buffer.secondary_render_pass_commands = false;
        log::trace!("RenderPass: ended '{}' on {}", self.name, command_buffer.id());
        Ok(())
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("attachments", &self.attachments)
            .field("subpasses", &self.subpasses)
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderPass: Send, Sync);
