//! Resource manager: capability gatekeeping and resource bookkeeping.
//!
//! The [`ResourceManager`] owns the backend, the capability limits the backend
//! declared at construction and the global resource counters. It never performs
//! native work itself: every creation function validates the request, dispatches
//! it to the backend and only updates the counters once the backend succeeded.
//!
//! Counters are plain atomics so that command buffers recorded in parallel on
//! worker threads can create and destroy resources without a lock.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::backend::{BackendOperations, GpuBackend};
use crate::error::{GraphicsError, reject};
use crate::profiling::{profile_plot, profile_scope};
use crate::types::{BufferMapSupport, BufferUsage, FormatSupport, TextureFormat};

/// Capability limits declared by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCapabilities {
    /// Maximum number of resource contexts for threads other than the main thread.
    pub max_resource_contexts: u32,
    /// Alignment of mapped buffer ranges.
    pub min_mapping_alignment: usize,
    /// Buffer usages the device supports.
    pub supported_buffers: BufferUsage,
    /// Level of buffer mapping support.
    pub buffer_map_support: BufferMapSupport,
    /// Whether buffers can be copied between each other.
    pub can_copy_buffers: bool,
    /// Maximum width and height of a texture.
    pub max_texture_size: u32,
    /// Maximum depth of a 3D texture.
    pub max_texture_depth: u32,
    /// Maximum number of array layers.
    pub max_texture_array_levels: u32,
    /// Maximum samples of a multisampled texture that is not resolved.
    pub max_texture_samples: u32,
    /// Maximum samples of a render surface.
    pub max_surface_samples: u32,
    /// Sample count used for offscreens created with the default sample count.
    pub surface_samples: u32,
    /// Whether partial mip chains are allowed.
    pub has_arbitrary_mipmapping: bool,
    /// Whether cube map arrays are supported.
    pub has_cube_arrays: bool,
    /// Whether textures that aren't offscreens can be read back.
    pub textures_readable: bool,
    /// Whether tessellation stages are supported.
    pub has_tessellation_shaders: bool,
    /// Whether geometry shaders are supported.
    pub has_geometry_shaders: bool,
    /// Maximum local work group size per axis.
    pub max_compute_local_work_group_size: [u32; 3],
    /// Maximum invocations in a local work group.
    pub max_compute_local_work_group_invocations: u32,
    /// Maximum number of work groups per dispatch, per axis.
    pub max_compute_work_group_size: [u32; 3],
    /// Maximum clip distances.
    pub max_clip_distances: u32,
    /// Maximum cull distances.
    pub max_cull_distances: u32,
    /// Maximum clip and cull distances combined.
    pub max_combined_clip_and_cull_distances: u32,
    /// Whether more than one instance can be drawn.
    pub has_instanced_drawing: bool,
    /// Whether drawing can start at an instance other than 0.
    pub has_start_instance: bool,
}

impl ResourceCapabilities {
    /// Whether compute shaders can be created and dispatched.
    pub fn has_compute_shaders(&self) -> bool {
        self.max_compute_local_work_group_invocations != 0
            && self.max_compute_work_group_size.iter().all(|&size| size != 0)
    }
}

impl Default for ResourceCapabilities {
    fn default() -> Self {
        Self {
            max_resource_contexts: 1,
            min_mapping_alignment: 16,
            supported_buffers: BufferUsage::all(),
            buffer_map_support: BufferMapSupport::Persistent,
            can_copy_buffers: true,
            max_texture_size: 4096,
            max_texture_depth: 256,
            max_texture_array_levels: 512,
            max_texture_samples: 16,
            max_surface_samples: 16,
            surface_samples: 4,
            has_arbitrary_mipmapping: true,
            has_cube_arrays: true,
            textures_readable: true,
            has_tessellation_shaders: true,
            has_geometry_shaders: true,
            max_compute_local_work_group_size: [1024, 1024, 64],
            max_compute_local_work_group_invocations: 1024,
            max_compute_work_group_size: [65535, 65535, 65535],
            max_clip_distances: 8,
            max_cull_distances: 8,
            max_combined_clip_and_cull_distances: 8,
            has_instanced_drawing: true,
            has_start_instance: true,
        }
    }
}

/// Snapshot of the resource counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceStatistics {
    pub resource_contexts: u32,
    pub buffers: u32,
    pub buffer_memory: usize,
    pub textures: u32,
    pub texture_memory: usize,
    pub shader_modules: u32,
    pub shaders: u32,
    pub material_descs: u32,
    pub variable_group_descs: u32,
    pub variable_groups: u32,
}

/// Resource counters, updated with atomic fetch-and-add only.
#[derive(Default)]
pub(crate) struct ResourceCounters {
    pub(crate) resource_contexts: AtomicU32,
    pub(crate) buffers: AtomicU32,
    pub(crate) buffer_memory: AtomicUsize,
    pub(crate) textures: AtomicU32,
    pub(crate) texture_memory: AtomicUsize,
    pub(crate) shader_modules: AtomicU32,
    pub(crate) shaders: AtomicU32,
    pub(crate) material_descs: AtomicU32,
    pub(crate) variable_group_descs: AtomicU32,
    pub(crate) variable_groups: AtomicU32,
}

impl ResourceCounters {
    fn snapshot(&self) -> ResourceStatistics {
        ResourceStatistics {
            resource_contexts: self.resource_contexts.load(Ordering::Relaxed),
            buffers: self.buffers.load(Ordering::Relaxed),
            buffer_memory: self.buffer_memory.load(Ordering::Relaxed),
            textures: self.textures.load(Ordering::Relaxed),
            texture_memory: self.texture_memory.load(Ordering::Relaxed),
            shader_modules: self.shader_modules.load(Ordering::Relaxed),
            shaders: self.shaders.load(Ordering::Relaxed),
            material_descs: self.material_descs.load(Ordering::Relaxed),
            variable_group_descs: self.variable_group_descs.load(Ordering::Relaxed),
            variable_groups: self.variable_groups.load(Ordering::Relaxed),
        }
    }
}

/// Central registry of capabilities, counters and the backend dispatch table.
///
/// Created once per graphics context and shared as `Arc<ResourceManager>`;
/// every resource keeps the manager alive until the resource is destroyed.
pub struct ResourceManager {
    backend: Arc<dyn GpuBackend>,
    operations: BackendOperations,
    capabilities: ResourceCapabilities,
    main_thread: ThreadId,
    surface_samples: AtomicU32,
    context_threads: Mutex<HashSet<ThreadId>>,
    next_id: AtomicU64,
    pub(crate) counters: ResourceCounters,
}

impl ResourceManager {
    /// Create a resource manager for a backend.
    ///
    /// The calling thread becomes the main thread, which can always use resources.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Arc<Self> {
        let capabilities = backend.capabilities();
        let operations = backend.operations();
        log::info!(
            "ResourceManager: created for {} backend (max texture size {}, max samples {})",
            backend.name(),
            capabilities.max_texture_size,
            capabilities.max_texture_samples
        );

        Arc::new(Self {
            surface_samples: AtomicU32::new(capabilities.surface_samples.max(1)),
            backend,
            operations,
            capabilities,
            main_thread: thread::current().id(),
            context_threads: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            counters: ResourceCounters::default(),
        })
    }

    /// Get the backend.
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    /// Get the capability limits.
    pub fn capabilities(&self) -> &ResourceCapabilities {
        &self.capabilities
    }

    /// Get the operations the backend implements.
    pub fn operations(&self) -> BackendOperations {
        self.operations
    }

    /// What the backend can do with a format.
    pub fn format_support(&self, format: TextureFormat) -> FormatSupport {
        self.backend.format_support(format)
    }

    /// Whether the calling thread is the thread that created the manager.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    /// Current sample count of render surfaces.
    pub fn surface_samples(&self) -> u32 {
        self.surface_samples.load(Ordering::Relaxed)
    }

    /// Change the sample count used for offscreens with the default sample count.
    pub fn set_surface_samples(&self, samples: u32) -> Result<(), GraphicsError> {
        if !self.is_main_thread() {
            return Err(reject!(
                InvalidState,
                "surface samples can only be changed on the main thread"
            ));
        }
        let samples = samples.max(1);
        if samples > self.capabilities.max_surface_samples {
            return Err(reject!(
                CapabilityExceeded,
                "surface samples {} is above the maximum {}",
                samples,
                self.capabilities.max_surface_samples
            ));
        }
        self.surface_samples.store(samples, Ordering::Relaxed);
        Ok(())
    }

    /// Allocate an identifier unique within this manager.
    pub(crate) fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fail unless the backend implements every operation in `required`.
    pub(crate) fn require(
        &self,
        required: BackendOperations,
        operation: &str,
    ) -> Result<(), GraphicsError> {
        if self.operations.contains(required) {
            return Ok(());
        }
        Err(reject!(
            Unsupported,
            "{} is not supported by the {} backend",
            operation,
            self.backend.name()
        ))
    }

    // ========================================================================
    // Resource contexts
    // ========================================================================

    /// Whether resources can be created or destroyed on the calling thread.
    pub fn can_use_resources(&self) -> bool {
        self.is_main_thread() || self.context_threads.lock().contains(&thread::current().id())
    }

    /// Fail with [`GraphicsError::NoContext`] unless resources can be used.
    pub(crate) fn ensure_context(&self) -> Result<(), GraphicsError> {
        if self.can_use_resources() {
            return Ok(());
        }
        log::error!(
            "Resources can only be manipulated on the main thread or threads with a resource context"
        );
        Err(GraphicsError::NoContext)
    }

    /// Acquire a resource context for the calling thread.
    pub fn acquire_resource_context(&self) -> Result<(), GraphicsError> {
        profile_scope!("acquire_resource_context");
        self.require(BackendOperations::RESOURCE_CONTEXT, "resource contexts")?;

        if self.is_main_thread() {
            return Err(reject!(
                InvalidState,
                "the main thread already has a resource context"
            ));
        }

        let current = thread::current().id();
        let mut threads = self.context_threads.lock();
        if threads.contains(&current) {
            return Err(reject!(
                InvalidState,
                "the current thread already has a resource context"
            ));
        }

        let max_contexts = self.capabilities.max_resource_contexts;
        let counter = &self.counters.resource_contexts;
        let mut count = counter.load(Ordering::Relaxed);
        loop {
            if count >= max_contexts {
                return Err(reject!(
                    CapabilityExceeded,
                    "maximum number of resource contexts ({}) has been exceeded",
                    max_contexts
                ));
            }
            match counter.compare_exchange_weak(count, count + 1, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => count = actual,
            }
        }

        if let Err(err) = self.backend.create_resource_context() {
            counter.fetch_sub(1, Ordering::AcqRel);
            return Err(err);
        }

        threads.insert(current);
        log::trace!("ResourceManager: acquired resource context for {:?}", current);
        Ok(())
    }

    /// Release the calling thread's resource context.
    ///
    /// Does nothing on a thread without a resource context.
    pub fn release_resource_context(&self) -> Result<(), GraphicsError> {
        profile_scope!("release_resource_context");
        let current = thread::current().id();
        let mut threads = self.context_threads.lock();
        if !threads.contains(&current) {
            return Ok(());
        }

        self.backend.destroy_resource_context()?;
        threads.remove(&current);
        self.counters.resource_contexts.fetch_sub(1, Ordering::AcqRel);
        log::trace!("ResourceManager: released resource context for {:?}", current);
        Ok(())
    }

    /// Flush work queued on the calling thread's resource context.
    ///
    /// Does nothing on the main thread, whose work is flushed with each frame.
    pub fn flush_resource_context(&self) -> Result<(), GraphicsError> {
        if self.is_main_thread() {
            return Ok(());
        }
        self.ensure_context()?;
        self.backend.flush_resource_context()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Snapshot of the resource counters.
    pub fn statistics(&self) -> ResourceStatistics {
        self.counters.snapshot()
    }

    /// Log and plot the resource counters.
    pub fn report_statistics(&self) {
        let stats = self.statistics();
        log::debug!(
            "ResourceManager: {} textures ({} bytes), {} buffers ({} bytes), {} shaders, {} material descs",
            stats.textures,
            stats.texture_memory,
            stats.buffers,
            stats.buffer_memory,
            stats.shaders,
            stats.material_descs
        );
        profile_plot!("textures", stats.textures);
        profile_plot!("texture_memory", stats.texture_memory);
        profile_plot!("buffers", stats.buffers);
        profile_plot!("buffer_memory", stats.buffer_memory);
        profile_plot!("shaders", stats.shaders);
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("backend", &self.backend.name())
            .field("operations", &self.operations)
            .field("statistics", &self.statistics())
            .finish_non_exhaustive()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        let stats = self.statistics();
        let leaks = [
            ("buffers", stats.buffers),
            ("textures", stats.textures),
            ("shader modules", stats.shader_modules),
            ("shaders", stats.shaders),
            ("material descriptions", stats.material_descs),
            ("shader variable group descriptions", stats.variable_group_descs),
            ("shader variable groups", stats.variable_groups),
            ("resource contexts", stats.resource_contexts),
        ];
        for (kind, count) in leaks {
            if count > 0 {
                log::warn!("ResourceManager: {} {} not destroyed before shutdown", count, kind);
            }
        }
    }
}

static_assertions::assert_impl_all!(ResourceManager: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn manager() -> Arc<ResourceManager> {
        ResourceManager::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_main_thread_can_use_resources() {
        let manager = manager();
        assert!(manager.is_main_thread());
        assert!(manager.can_use_resources());
        assert!(manager.ensure_context().is_ok());
    }

    #[test]
    fn test_main_thread_cannot_acquire_context() {
        let manager = manager();
        assert!(matches!(
            manager.acquire_resource_context(),
            Err(GraphicsError::InvalidState(_))
        ));
        // Releasing without a context is a no-op.
        assert!(manager.release_resource_context().is_ok());
    }

    #[test]
    fn test_worker_thread_context() {
        let manager = manager();
        let worker = Arc::clone(&manager);
        thread::spawn(move || {
            assert!(!worker.can_use_resources());
            assert_eq!(worker.ensure_context(), Err(GraphicsError::NoContext));

            worker.acquire_resource_context().unwrap();
            assert!(worker.can_use_resources());
            assert_eq!(worker.statistics().resource_contexts, 1);
            assert!(matches!(
                worker.acquire_resource_context(),
                Err(GraphicsError::InvalidState(_))
            ));

            worker.release_resource_context().unwrap();
            assert!(!worker.can_use_resources());
        })
        .join()
        .unwrap();
        assert_eq!(manager.statistics().resource_contexts, 0);
    }

    #[test]
    fn test_context_limit() {
        let manager = manager();
        let (hold_tx, hold_rx) = std::sync::mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();

        let first = Arc::clone(&manager);
        let holder = thread::spawn(move || {
            first.acquire_resource_context().unwrap();
            ready_tx.send(()).unwrap();
            hold_rx.recv().unwrap();
            first.release_resource_context().unwrap();
        });
        ready_rx.recv().unwrap();

        let second = Arc::clone(&manager);
        thread::spawn(move || {
            assert!(matches!(
                second.acquire_resource_context(),
                Err(GraphicsError::CapabilityExceeded(_))
            ));
        })
        .join()
        .unwrap();

        hold_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(manager.statistics().resource_contexts, 0);
    }

    #[test]
    fn test_surface_samples() {
        let manager = manager();
        assert_eq!(manager.surface_samples(), 4);
        manager.set_surface_samples(0).unwrap();
        assert_eq!(manager.surface_samples(), 1);
        assert!(matches!(
            manager.set_surface_samples(32),
            Err(GraphicsError::CapabilityExceeded(_))
        ));
        assert_eq!(manager.surface_samples(), 1);
    }

    #[test]
    fn test_unique_ids() {
        let manager = manager();
        let a = manager.allocate_id();
        let b = manager.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_support() {
        let mut caps = ResourceCapabilities::default();
        assert!(caps.has_compute_shaders());
        caps.max_compute_work_group_size[1] = 0;
        assert!(!caps.has_compute_shaders());
    }
}
