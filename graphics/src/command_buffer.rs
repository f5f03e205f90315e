//! Command buffer recording state.
//!
//! A [`CommandBuffer`] tracks what is active while commands are recorded: the
//! frame, the render pass and its subpass, and the bound graphics and compute
//! shaders. Every operation that records into a command buffer checks this
//! state before it reaches the backend, and only updates it after the backend
//! succeeded.
//!
//! Command buffers are not synchronized. Each one is recorded by a single thread
//! at a time, which the `&mut` receivers of the state-changing operations
//! enforce.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::backend::BackendOperations;
use crate::error::{GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::render_pass::RenderPass;
use crate::resource_manager::ResourceManager;

bitflags! {
    /// How a command buffer is used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CommandBufferUsage: u32 {
        /// Recorded within a render pass and submitted to another command buffer.
        const SECONDARY = 1 << 0;
        /// Can be submitted multiple times.
        const MULTI_SUBMIT = 1 << 1;
        /// Can be submitted across multiple frames.
        const MULTI_FRAME = 1 << 2;
        /// Only used for resource processing, such as copies.
        const RESOURCE = 1 << 3;
    }
}

/// Render pass currently active on a command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundRenderPass {
    pub(crate) id: u64,
    pub(crate) subpass_count: u32,
    pub(crate) active_subpass: u32,
}

/// Recording context for GPU commands.
pub struct CommandBuffer {
    manager: Arc<ResourceManager>,
    id: u64,
    usage: CommandBufferUsage,
    is_main: bool,
    recording: bool,
    submitted: bool,
    recorded_render_pass: Option<u64>,
    pub(crate) frame_active: bool,
    pub(crate) bound_render_pass: Option<BoundRenderPass>,
    pub(crate) secondary_render_pass_commands: bool,
    pub(crate) bound_shader: Option<u64>,
    pub(crate) bound_compute_shader: Option<u64>,
}

impl CommandBuffer {
    /// Create a command buffer for recording on any thread.
    pub fn new(manager: &Arc<ResourceManager>, usage: CommandBufferUsage) -> Self {
        let command_buffer = Self::with_kind(manager, usage, false);
        log::trace!("CommandBuffer: created {} ({:?})", command_buffer.id, usage);
        command_buffer
    }

    /// Create the main command buffer owned by the renderer.
    pub(crate) fn new_main(manager: &Arc<ResourceManager>) -> Self {
        let mut command_buffer = Self::with_kind(manager, CommandBufferUsage::empty(), true);
        command_buffer.recording = true;
        command_buffer
    }

    fn with_kind(manager: &Arc<ResourceManager>, usage: CommandBufferUsage, is_main: bool) -> Self {
        Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            usage,
            is_main,
            recording: false,
            submitted: false,
            recorded_render_pass: None,
            frame_active: false,
            bound_render_pass: None,
            secondary_render_pass_commands: false,
            bound_shader: None,
            bound_compute_shader: None,
        }
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Unique identifier of the command buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the usage flags.
    pub fn usage(&self) -> CommandBufferUsage {
        self.usage
    }

    /// Whether this is the renderer's main command buffer.
    pub fn is_main(&self) -> bool {
        self.is_main
    }

    /// Whether commands are being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether a frame is active for this command buffer.
    pub fn is_frame_active(&self) -> bool {
        self.frame_active
    }

    /// Whether a render pass is active.
    pub fn has_render_pass(&self) -> bool {
        self.bound_render_pass.is_some()
    }

    /// Index of the active subpass, if a render pass is active.
    pub fn active_subpass(&self) -> Option<u32> {
        self.bound_render_pass.map(|pass| pass.active_subpass)
    }

    /// Whether the active render pass expects its commands from secondary command buffers.
    pub fn has_secondary_render_pass_commands(&self) -> bool {
        self.secondary_render_pass_commands
    }

    /// Whether a graphics shader is bound.
    pub fn has_bound_shader(&self) -> bool {
        self.bound_shader.is_some()
    }

    /// Whether a compute shader is bound.
    pub fn has_bound_compute_shader(&self) -> bool {
        self.bound_compute_shader.is_some()
    }

    pub(crate) fn require_frame_outside_render_pass(&self, operation: &str) -> Result<(), GraphicsError> {
        if !self.frame_active {
            return Err(reject!(InvalidState, "{} must be performed inside of a frame", operation));
        }
        if self.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "{} must be performed outside of a render pass",
                operation
            ));
        }
        Ok(())
    }

    /// Begin recording a primary command buffer.
    pub fn begin(&mut self) -> Result<(), GraphicsError> {
        profile_scope!("CommandBuffer::begin");
        self.check_can_begin()?;
        if self.usage.contains(CommandBufferUsage::SECONDARY) {
            return Err(reject!(
                InvalidState,
                "secondary command buffers must be begun with a render pass"
            ));
        }

        self.manager.backend().begin_command_buffer(self)?;
        self.start_recording();
        log::trace!("CommandBuffer: began {}", self.id);
        Ok(())
    }

    /// Begin recording a secondary command buffer for a subpass of a render pass.
    pub fn begin_secondary(&mut self, render_pass: &RenderPass, subpass: u32) -> Result<(), GraphicsError> {
        profile_scope!("CommandBuffer::begin_secondary");
        self.check_can_begin()?;
        if !self.usage.contains(CommandBufferUsage::SECONDARY) {
            return Err(reject!(
                InvalidState,
                "only secondary command buffers can be begun with a render pass"
            ));
        }
        if subpass >= render_pass.subpass_count() {
            return Err(reject!(
                OutOfRange,
                "subpass {} is out of range for render pass '{}' with {} subpasses",
                subpass,
                render_pass.name(),
                render_pass.subpass_count()
            ));
        }

        self.manager.backend().begin_command_buffer(self)?;
        self.start_recording();
        self.bound_render_pass = Some(BoundRenderPass {
            id: render_pass.id(),
            subpass_count: render_pass.subpass_count(),
            active_subpass: subpass,
        });
        self.recorded_render_pass = Some(render_pass.id());
        log::trace!(
            "CommandBuffer: began secondary {} for subpass {} of '{}'",
            self.id,
            subpass,
            render_pass.name()
        );
        Ok(())
    }

    fn check_can_begin(&self) -> Result<(), GraphicsError> {
        self.manager.require(
            BackendOperations::COMMAND_BUFFER_BEGIN | BackendOperations::COMMAND_BUFFER_END,
            "command buffer recording",
        )?;
        if self.is_main {
            return Err(reject!(
                InvalidState,
                "the main command buffer is begun and ended with the frame"
            ));
        }
        if self.recording {
            return Err(reject!(InvalidState, "command buffer {} is already recording", self.id));
        }
        Ok(())
    }

    fn start_recording(&mut self) {
        self.recording = true;
        self.submitted = false;
        self.frame_active = true;
    }

    /// Finish recording.
    pub fn end(&mut self) -> Result<(), GraphicsError> {
        profile_scope!("CommandBuffer::end");
        self.manager
            .require(BackendOperations::COMMAND_BUFFER_END, "command buffer recording")?;
        if self.is_main {
            return Err(reject!(
                InvalidState,
                "the main command buffer is begun and ended with the frame"
            ));
        }
        if !self.recording {
            return Err(reject!(InvalidState, "command buffer {} is not recording", self.id));
        }
        let secondary = self.usage.contains(CommandBufferUsage::SECONDARY);
        if !secondary && self.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot end a command buffer while a render pass is active"
            ));
        }
        if self.bound_shader.is_some() || self.bound_compute_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot end a command buffer while a shader is bound"
            ));
        }

        self.manager.backend().end_command_buffer(self)?;
        self.recording = false;
        self.frame_active = false;
        self.bound_render_pass = None;
        log::trace!("CommandBuffer: ended {}", self.id);
        Ok(())
    }

    /// Submit the commands recorded in another command buffer to this one.
    ///
    /// Secondary command buffers can only be submitted while this command
    /// buffer is inside the render pass they were recorded for, and that render
    /// pass was begun for secondary commands.
    pub fn submit(&self, submit: &mut CommandBuffer) -> Result<(), GraphicsError> {
        profile_scope!("CommandBuffer::submit");
        self.manager
            .require(BackendOperations::COMMAND_BUFFER_SUBMIT, "command buffer submission")?;
        if !Arc::ptr_eq(&self.manager, &submit.manager) {
            return Err(reject!(
                InvalidArgument,
                "command buffers were created with different resource managers"
            ));
        }
        if self.usage.contains(CommandBufferUsage::SECONDARY) {
            return Err(reject!(
                InvalidState,
                "cannot submit to a secondary command buffer"
            ));
        }
        if submit.is_main {
            return Err(reject!(InvalidState, "cannot submit the main command buffer"));
        }
        if submit.recording {
            return Err(reject!(
                InvalidState,
                "command buffer {} must be ended before it is submitted",
                submit.id
            ));
        }
        if submit.submitted && !submit.usage.contains(CommandBufferUsage::MULTI_SUBMIT) {
            return Err(reject!(
                InvalidState,
                "command buffer {} can only be submitted once",
                submit.id
            ));
        }
        if !self.frame_active {
            return Err(reject!(
                InvalidState,
                "command buffers must be submitted inside of a frame"
            ));
        }
        if self.bound_shader.is_some() || self.bound_compute_shader.is_some() {
            return Err(reject!(
                InvalidState,
                "cannot submit a command buffer while a shader is bound"
            ));
        }

        if submit.usage.contains(CommandBufferUsage::SECONDARY) {
            if !self.secondary_render_pass_commands {
                return Err(reject!(
                    InvalidState,
                    "secondary command buffers can only be submitted inside a render pass begun for secondary commands"
                ));
            }
            if submit.recorded_render_pass != self.bound_render_pass.map(|pass| pass.id) {
                return Err(reject!(
                    InvalidState,
                    "secondary command buffer was recorded for a different render pass"
                ));
            }
        } else if self.bound_render_pass.is_some() {
            return Err(reject!(
                InvalidState,
                "primary command buffers must be submitted outside of a render pass"
            ));
        }

        self.manager.backend().submit_command_buffer(self, submit)?;
        submit.submitted = true;
        log::trace!("CommandBuffer: submitted {} to {}", submit.id, self.id);
        Ok(())
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("id", &self.id)
            .field("usage", &self.usage)
            .field("is_main", &self.is_main)
            .field("recording", &self.recording)
            .field("frame_active", &self.frame_active)
            .field("bound_render_pass", &self.bound_render_pass)
            .field("bound_shader", &self.bound_shader)
            .field("bound_compute_shader", &self.bound_compute_shader)
            .finish()
    }
}

static_assertions::assert_impl_all!(CommandBuffer: Send, Sync);
