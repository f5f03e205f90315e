//! GPU buffer resource.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::backend::{BackendHandle, BackendOperations};
use crate::command_buffer::CommandBuffer;
use crate::error::{DestroyError, GraphicsError, reject};
use crate::profiling::profile_scope;
use crate::resource_manager::ResourceManager;
use crate::types::{
    BufferMapFlags, BufferMapSupport, BufferMapping, BufferUsage, MAP_FULL_BUFFER, MemoryHints,
    is_buffer_range_valid,
};

/// A GPU buffer resource.
///
/// Buffers are created by [`GfxBuffer::create`] and destroyed explicitly with
/// [`GfxBuffer::destroy`].
///
/// # Example
///
/// ```ignore
/// let buffer = GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::STATIC, 1024, None)?;
/// println!("Buffer size: {}", buffer.size());
/// ```
pub struct GfxBuffer {
    manager: Arc<ResourceManager>,
    id: u64,
    handle: BackendHandle,
    usage: BufferUsage,
    memory_hints: MemoryHints,
    size: usize,
}

impl GfxBuffer {
    /// Create a buffer, optionally with its initial contents.
    pub fn create(
        manager: &Arc<ResourceManager>,
        usage: BufferUsage,
        memory_hints: MemoryHints,
        size: usize,
        data: Option<&[u8]>,
    ) -> Result<Self, GraphicsError> {
        profile_scope!("GfxBuffer::create");
        manager.require(BackendOperations::BUFFER_LIFECYCLE, "buffer creation")?;

        let supported = manager.capabilities().supported_buffers;
        if usage.is_empty() || !supported.contains(usage) {
            return Err(reject!(
                InvalidArgument,
                "requested buffer usage {:?} isn't supported, supported usage is {:?}",
                usage,
                supported
            ));
        }
        if memory_hints.is_empty() {
            return Err(reject!(InvalidArgument, "at least one memory hint flag must be set"));
        }
        if size == 0 {
            return Err(reject!(InvalidArgument, "buffer size must be non-zero"));
        }
        if let Some(data) = data {
            if data.len() != size {
                return Err(reject!(
                    InvalidArgument,
                    "buffer data size {} doesn't match the buffer size {}",
                    data.len(),
                    size
                ));
            }
        }

        manager.ensure_context()?;
        let handle = manager
            .backend()
            .create_buffer(usage, memory_hints, size, data)?;

        let counters = &manager.counters;
        counters.buffers.fetch_add(1, Ordering::AcqRel);
        counters.buffer_memory.fetch_add(size, Ordering::AcqRel);

        let buffer = Self {
            manager: Arc::clone(manager),
            id: manager.allocate_id(),
            handle,
            usage,
            memory_hints,
            size,
        };
        log::trace!("GfxBuffer: created {} ({:?}, {} bytes)", buffer.id, usage, size);
        Ok(buffer)
    }

    /// Get the resource manager.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Unique identifier of the buffer.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Backend handle of the buffer.
    pub fn handle(&self) -> BackendHandle {
        self.handle
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Get the memory hints.
    pub fn memory_hints(&self) -> MemoryHints {
        self.memory_hints
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Map a range of the buffer for CPU access.
    ///
    /// Pass [`MAP_FULL_BUFFER`] as the size to map everything from `offset`
    /// on. Backends that can only map whole buffers, or that require aligned
    /// ranges, get a wider range than requested; the returned mapping tells
    /// where the requested data starts within it.
    pub fn map(&self, flags: BufferMapFlags, offset: usize, size: usize) -> Result<BufferMapping, GraphicsError> {
        profile_scope!("GfxBuffer::map");
        self.manager
            .require(BackendOperations::BUFFER_MAP | BackendOperations::BUFFER_UNMAP, "buffer mapping")?;

        let caps = self.manager.capabilities();
        let support = caps.buffer_map_support;
        if support == BufferMapSupport::None {
            return Err(reject!(
                CapabilityExceeded,
                "buffer mapping not supported on the current target"
            ));
        }
        if flags.contains(BufferMapFlags::PERSISTENT) && support != BufferMapSupport::Persistent {
            return Err(reject!(
                CapabilityExceeded,
                "persistent buffer mapping not supported on the current target"
            ));
        }
        if flags.contains(BufferMapFlags::READ) && !self.memory_hints.contains(MemoryHints::READ) {
            return Err(reject!(
                InvalidArgument,
                "attempting to read from a buffer without the read memory hint"
            ));
        }
        if self.memory_hints.contains(MemoryHints::GPU_ONLY) {
            return Err(reject!(
                InvalidArgument,
                "attempting to map a buffer with the GPU only memory hint"
            ));
        }
        if flags.contains(BufferMapFlags::PERSISTENT) && !self.memory_hints.contains(MemoryHints::PERSISTENT) {
            return Err(reject!(
                InvalidArgument,
                "attempting to persistently map a buffer without the persistent memory hint"
            ));
        }
        let in_range = if size == MAP_FULL_BUFFER {
            offset <= self.size
        } else {
            is_buffer_range_valid(offset, size, self.size)
        };
        if !in_range {
            return Err(reject!(
                OutOfRange,
                "attempting to map range ({}, {}) out of a {} byte buffer",
                offset,
                size,
                self.size
            ));
        }
        if flags.is_empty() {
            return Err(reject!(InvalidArgument, "at least one buffer map flag must be set"));
        }
        self.manager.ensure_context()?;

        let mapping = if support == BufferMapSupport::Full {
            BufferMapping {
                backend_offset: 0,
                backend_size: MAP_FULL_BUFFER,
                data_offset: offset,
            }
        } else {
            let alignment = caps.min_mapping_alignment.max(1);
            let padding = offset % alignment;
            BufferMapping {
                backend_offset: offset - padding,
                backend_size: if size == MAP_FULL_BUFFER {
                    MAP_FULL_BUFFER
                } else {
                    size + padding
                },
                data_offset: padding,
            }
        };

        self.manager
            .backend()
            .map_buffer(self, flags, mapping.backend_offset, mapping.backend_size)?;
        log::trace!("GfxBuffer: mapped {} ({:?})", self.id, mapping);
        Ok(mapping)
    }

    /// Unmap the buffer.
    pub fn unmap(&self) -> Result<(), GraphicsError> {
        profile_scope!("GfxBuffer::unmap");
        self.manager
            .require(BackendOperations::BUFFER_UNMAP, "buffer mapping")?;
        self.manager.ensure_context()?;
        self.manager.backend().unmap_buffer(self)
    }

    /// Make CPU writes to a persistently mapped range visible to the GPU.
    pub fn flush(&self, offset: usize, size: usize) -> Result<(), GraphicsError> {
        profile_scope!("GfxBuffer::flush");
        self.manager
            .require(BackendOperations::BUFFER_FLUSH, "buffer flushing")?;
        self.check_persistent_support()?;
        self.manager.ensure_context()?;
        if self.memory_hints.contains(MemoryHints::COHERENT) {
            return Ok(());
        }
        self.manager.backend().flush_buffer(self, offset, size)
    }

    /// Make GPU writes to a persistently mapped range visible to the CPU.
    pub fn invalidate(&self, offset: usize, size: usize) -> Result<(), GraphicsError> {
        profile_scope!("GfxBuffer::invalidate");
        self.manager
            .require(BackendOperations::BUFFER_INVALIDATE, "buffer invalidation")?;
        self.check_persistent_support()?;
        self.manager.ensure_context()?;
        if self.memory_hints.contains(MemoryHints::COHERENT) {
            return Ok(());
        }
        self.manager.backend().invalidate_buffer(self, offset, size)
    }

    fn check_persistent_support(&self) -> Result<(), GraphicsError> {
        if self.manager.capabilities().buffer_map_support != BufferMapSupport::Persistent {
            return Err(reject!(
                CapabilityExceeded,
                "persistent buffer mapping not supported on the current target"
            ));
        }
        Ok(())
    }

    /// Copy data into the buffer.
    pub fn copy_data(&self, command_buffer: &CommandBuffer, offset: usize, data: &[u8]) -> Result<(), GraphicsError> {
        profile_scope!("GfxBuffer::copy_data");
        self.manager
            .require(BackendOperations::BUFFER_COPY_DATA, "buffer data copying")?;
        if !Arc::ptr_eq(&self.manager, command_buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "buffer and command buffer were created with different resource managers"
            ));
        }
        if !self.usage.contains(BufferUsage::COPY_TO) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data to a buffer without the copy to usage flag"
            ));
        }
        if !is_buffer_range_valid(offset, data.len(), self.size) {
            return Err(reject!(
                OutOfRange,
                "attempting to copy {} bytes at offset {} out of range of a {} byte buffer",
                data.len(),
                offset,
                self.size
            ));
        }

        self.manager
            .backend()
            .copy_buffer_data(command_buffer, self, offset, data)
    }

    /// Copy a range from one buffer to another.
    pub fn copy(
        command_buffer: &CommandBuffer,
        src: &GfxBuffer,
        src_offset: usize,
        dst: &GfxBuffer,
        dst_offset: usize,
        size: usize,
    ) -> Result<(), GraphicsError> {
        profile_scope!("GfxBuffer::copy");
        src.manager
            .require(BackendOperations::BUFFER_COPY, "buffer copying")?;
        if !Arc::ptr_eq(&src.manager, &dst.manager) || !Arc::ptr_eq(&src.manager, command_buffer.manager()) {
            return Err(reject!(
                InvalidArgument,
                "buffers were created with different resource managers"
            ));
        }
        if !src.manager.capabilities().can_copy_buffers {
            return Err(reject!(
                CapabilityExceeded,
                "current target doesn't support copying data between buffers"
            ));
        }
        if !src.usage.contains(BufferUsage::COPY_FROM) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data from a buffer without the copy from usage flag"
            ));
        }
        if !dst.usage.contains(BufferUsage::COPY_TO) {
            return Err(reject!(
                InvalidArgument,
                "attempting to copy data to a buffer without the copy to usage flag"
            ));
        }
        if !is_buffer_range_valid(src_offset, size, src.size) || !is_buffer_range_valid(dst_offset, size, dst.size) {
            return Err(reject!(OutOfRange, "attempting to copy buffer data out of range"));
        }

        src.manager
            .backend()
            .copy_buffer(command_buffer, src, src_offset, dst, dst_offset, size)
    }

    /// Destroy the buffer.
    ///
    /// On failure the buffer is handed back with the error.
    pub fn destroy(self) -> Result<(), DestroyError<Self>> {
        profile_scope!("GfxBuffer::destroy");
        if let Err(err) = self.manager.ensure_context() {
            return Err(DestroyError::new(self, err));
        }
        if let Err(err) = self.manager.backend().destroy_buffer(&self) {
            return Err(DestroyError::new(self, err));
        }

        let counters = &self.manager.counters;
        counters.buffers.fetch_sub(1, Ordering::AcqRel);
        counters.buffer_memory.fetch_sub(self.size, Ordering::AcqRel);
        log::trace!("GfxBuffer: destroyed {}", self.id);
        Ok(())
    }
}

impl fmt::Debug for GfxBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfxBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("memory_hints", &self.memory_hints)
            .finish()
    }
}

// Ensure GfxBuffer is Send + Sync
static_assertions::assert_impl_all!(GfxBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::command_buffer::CommandBufferUsage;
    use crate::resource_manager::ResourceCapabilities;

    fn setup_with(caps: ResourceCapabilities) -> (Arc<DummyBackend>, Arc<ResourceManager>) {
        let backend = Arc::new(DummyBackend::new().with_capabilities(caps));
        let manager = ResourceManager::new(backend.clone());
        (backend, manager)
    }

    fn setup() -> (Arc<DummyBackend>, Arc<ResourceManager>) {
        setup_with(ResourceCapabilities::default())
    }

    #[test]
    fn test_create_and_destroy() {
        let (backend, manager) = setup();
        let data: Vec<u8> = (0..64).collect();
        let buffer =
            GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::STATIC, 64, Some(&data)).unwrap();
        assert_eq!(backend.buffer_contents(buffer.handle()), Some(data));
        assert_eq!(manager.statistics().buffers, 1);
        assert_eq!(manager.statistics().buffer_memory, 64);

        buffer.destroy().unwrap();
        assert_eq!(manager.statistics().buffers, 0);
        assert_eq!(manager.statistics().buffer_memory, 0);
    }

    #[test]
    fn test_create_validation() {
        let caps = ResourceCapabilities {
            supported_buffers: BufferUsage::VERTEX | BufferUsage::INDEX,
            ..ResourceCapabilities::default()
        };
        let (_, manager) = setup_with(caps);
        assert!(GfxBuffer::create(&manager, BufferUsage::empty(), MemoryHints::STATIC, 16, None).is_err());
        assert!(GfxBuffer::create(&manager, BufferUsage::UNIFORM_BUFFER, MemoryHints::STATIC, 16, None).is_err());
        assert!(GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::empty(), 16, None).is_err());
        assert!(GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::STATIC, 0, None).is_err());
        assert!(GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::STATIC, 16, Some(&[0; 8])).is_err());
        assert_eq!(manager.statistics().buffers, 0);
    }

    #[test]
    fn test_map_alignment() {
        let (backend, manager) = setup();
        let buffer = GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::DYNAMIC, 256, None).unwrap();

        let mapping = buffer.map(BufferMapFlags::WRITE, 20, 32).unwrap();
        assert_eq!(mapping.backend_offset, 16);
        assert_eq!(mapping.backend_size, 36);
        assert_eq!(mapping.data_offset, 4);
        assert_eq!(backend.mapped_range(buffer.handle()), Some((16, 36)));

        buffer.unmap().unwrap();
        assert_eq!(backend.mapped_range(buffer.handle()), None);

        let full = buffer.map(BufferMapFlags::WRITE, 256, MAP_FULL_BUFFER).unwrap();
        assert_eq!(full.backend_size, MAP_FULL_BUFFER);
        buffer.destroy().unwrap();
    }

    #[test]
    fn test_map_full_buffer_only() {
        let caps = ResourceCapabilities {
            buffer_map_support: BufferMapSupport::Full,
            ..ResourceCapabilities::default()
        };
        let (_, manager) = setup_with(caps);
        let hints = MemoryHints::DYNAMIC | MemoryHints::PERSISTENT;
        let buffer = GfxBuffer::create(&manager, BufferUsage::VERTEX, hints, 128, None).unwrap();

        let mapping = buffer.map(BufferMapFlags::WRITE, 40, 8).unwrap();
        assert_eq!(mapping.backend_offset, 0);
        assert_eq!(mapping.backend_size, MAP_FULL_BUFFER);
        assert_eq!(mapping.data_offset, 40);

        assert!(matches!(
            buffer.map(BufferMapFlags::WRITE | BufferMapFlags::PERSISTENT, 0, 8),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
        assert!(matches!(buffer.flush(0, 8), Err(GraphicsError::CapabilityExceeded(_))));
        buffer.destroy().unwrap();
    }

    #[test]
    fn test_map_validation() {
        let (_, manager) = setup();
        let buffer = GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::DYNAMIC, 64, None).unwrap();
        assert!(matches!(
            buffer.map(BufferMapFlags::READ, 0, 8),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            buffer.map(BufferMapFlags::WRITE | BufferMapFlags::PERSISTENT, 0, 8),
            Err(GraphicsError::InvalidArgument(_))
        ));
        assert!(matches!(
            buffer.map(BufferMapFlags::WRITE, 60, 8),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            buffer.map(BufferMapFlags::WRITE, 65, MAP_FULL_BUFFER),
            Err(GraphicsError::OutOfRange(_))
        ));
        assert!(matches!(
            buffer.map(BufferMapFlags::empty(), 0, 8),
            Err(GraphicsError::InvalidArgument(_))
        ));

        let gpu_only =
            GfxBuffer::create(&manager, BufferUsage::VERTEX, MemoryHints::GPU_ONLY, 64, None).unwrap();
        assert!(gpu_only.map(BufferMapFlags::WRITE, 0, 8).is_err());

        buffer.destroy().unwrap();
        gpu_only.destroy().unwrap();
    }

    #[test]
    fn test_coherent_flush_skips_backend() {
        let (backend, manager) = setup();
        let hints = MemoryHints::DYNAMIC | MemoryHints::PERSISTENT | MemoryHints::COHERENT;
        let buffer = GfxBuffer::create(&manager, BufferUsage::VERTEX, hints, 64, None).unwrap();
        let before = backend.dispatch_count();
        buffer.flush(0, 64).unwrap();
        buffer.invalidate(0, 64).unwrap();
        assert_eq!(backend.dispatch_count(), before);
        buffer.destroy().unwrap();
    }

    #[test]
    fn test_copy_data_and_copy() {
        let (backend, manager) = setup();
        let usage = BufferUsage::VERTEX | BufferUsage::COPY_FROM | BufferUsage::COPY_TO;
        let src = GfxBuffer::create(&manager, usage, MemoryHints::STATIC, 16, None).unwrap();
        let dst = GfxBuffer::create(&manager, usage, MemoryHints::STATIC, 16, None).unwrap();
        let command_buffer = CommandBuffer::new(&manager, CommandBufferUsage::RESOURCE);

        src.copy_data(&command_buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert!(matches!(
            src.copy_data(&command_buffer, 14, &[1, 2, 3, 4]),
            Err(GraphicsError::OutOfRange(_))
        ));

        GfxBuffer::copy(&command_buffer, &src, 4, &dst, 0, 4).unwrap();
        assert_eq!(&backend.buffer_contents(dst.handle()).unwrap()[..4], &[1, 2, 3, 4]);
        assert!(GfxBuffer::copy(&command_buffer, &src, 0, &dst, 8, 9).is_err());

        src.destroy().unwrap();
        dst.destroy().unwrap();
    }

    #[test]
    fn test_copy_requires_capability() {
        let caps = ResourceCapabilities {
            can_copy_buffers: false,
            ..ResourceCapabilities::default()
        };
        let (_, manager) = setup_with(caps);
        let usage = BufferUsage::COPY_FROM | BufferUsage::COPY_TO;
        let src = GfxBuffer::create(&manager, usage, MemoryHints::STATIC, 16, None).unwrap();
        let dst = GfxBuffer::create(&manager, usage, MemoryHints::STATIC, 16, None).unwrap();
        let command_buffer = CommandBuffer::new(&manager, CommandBufferUsage::RESOURCE);
        assert!(matches!(
            GfxBuffer::copy(&command_buffer, &src, 0, &dst, 0, 16),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
        src.destroy().unwrap();
        dst.destroy().unwrap();
    }
}
