//! Graphics error types.

use std::fmt;

/// Errors that can occur in the graphics system.
///
/// Every rejected operation leaves the resource manager, the resource and the
/// command buffer exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// A missing, zero-sized or mismatched input.
    InvalidArgument(String),
    /// The backend does not implement the operation at all.
    Unsupported(String),
    /// The request exceeds a backend-declared limit or needs a missing feature.
    CapabilityExceeded(String),
    /// The operation was attempted in the wrong command buffer or frame state.
    InvalidState(String),
    /// A shader program and a material description do not agree.
    Incompatible(String),
    /// Addressing beyond a resource's mip, layer or dimension extent.
    OutOfRange(String),
    /// No resource context is current on the calling thread.
    NoContext,
    /// A named element or pipeline does not exist.
    NotFound(String),
    /// The backend failed to create a resource.
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// An internal error occurred.
    Internal(String),
}

impl GraphicsError {
    /// Whether the error is systemic and retrying the same call cannot succeed.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::NoContext)
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Unsupported(msg) => write!(f, "operation not supported by backend: {msg}"),
            Self::CapabilityExceeded(msg) => write!(f, "capability exceeded: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Incompatible(msg) => write!(f, "incompatible: {msg}"),
            Self::OutOfRange(msg) => write!(f, "out of range: {msg}"),
            Self::NoContext => write!(f, "resources can only be used on the main thread or threads with a resource context"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

/// A failed destroy, handing the resource back so it can be destroyed later.
pub struct DestroyError<T> {
    /// The resource that was not destroyed.
    pub resource: T,
    /// Why destruction failed.
    pub error: GraphicsError,
}

impl<T> DestroyError<T> {
    pub(crate) fn new(resource: T, error: GraphicsError) -> Self {
        Self { resource, error }
    }

    /// Take back the resource, dropping the error.
    pub fn into_resource(self) -> T {
        self.resource
    }
}

impl<T> fmt::Debug for DestroyError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for DestroyError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destroy failed: {}", self.error)
    }
}

impl<T> std::error::Error for DestroyError<T> {}

impl<T> From<DestroyError<T>> for GraphicsError {
    fn from(err: DestroyError<T>) -> Self {
        err.error
    }
}

/// Log an error message and build the matching [`GraphicsError`].
///
/// ```ignore
/// return Err(reject!(InvalidState, "texture copying must be performed inside of a frame"));
/// ```
macro_rules! reject {
    ($kind:ident, $($arg:tt)+) => {{
        let msg = format!($($arg)+);
        log::error!("{}", msg);
        $crate::error::GraphicsError::$kind(msg)
    }};
}

pub(crate) use reject;
