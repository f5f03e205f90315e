//! GPU resources.
//!
//! This module contains the resource types created through the [`ResourceManager`]:
//! - [`Texture`] - GPU texture, image or offscreen
//! - [`GfxBuffer`] - GPU memory buffer
//!
//! Resources keep their [`ResourceManager`] alive through an [`Arc`] and are
//! destroyed explicitly, so the manager can account for every byte it handed out.
//! A resource dropped without being destroyed is reported as leaked when the
//! manager shuts down.
//!
//! [`ResourceManager`]: crate::ResourceManager
//! [`Arc`]: std::sync::Arc

mod buffer;
mod texture;

pub use buffer::GfxBuffer;
pub use texture::Texture;
