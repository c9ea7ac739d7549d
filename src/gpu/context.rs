//! # GPU Device Context
//!
//! Owns the wgpu instance, the selected adapter, the logical device and its
//! queue. One context is created per process run and passed explicitly to
//! every other component of the engine.
//!
//! ## Adapter selection
//! Adapters are enumerated for the configured backends and the **first**
//! adapter that supports compute shaders and both required features is
//! taken:
//! * `MAPPABLE_PRIMARY_BUFFERS` - storage buffers placed in host-visible,
//!   host-coherent memory, so uploads and downloads are plain mapped copies;
//! * `PUSH_CONSTANTS` - parameter blocks travel inline with the dispatch.
//!
//! When no adapter qualifies, the error names what the first
//! compute-capable adapter lacked.
//!
//! There is no fallback device and no CPU-only degrade path. Every failure
//! here is fatal for the run.
//!
//! ## Ownership
//! * Buffer creation and pipeline construction borrow the context shared.
//! * Dispatch borrows it exclusively (`&mut`), so a context never has more
//!   than one submission in flight.
//! * [`GpuContext::cleanup`] consumes the context: the device is released
//!   before the instance, exactly once.

use tracing::{debug, info};

use crate::engine::error::{GpuError, GpuResult};

/// Device creation settings.
#[derive(Clone, Debug)]
pub struct GpuConfig {
    /// Backends the instance may enumerate.
    pub backends: wgpu::Backends,

    /// Kernel entry point used when building compute pipelines.
    pub entry_point: String,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            entry_point: "main".to_string(),
        }
    }
}

/// Device, queue and the handles they were created from.
///
/// Fields are declared in release order: the queue and device drop before
/// the adapter and the instance.
pub struct GpuContext {
    /// Submission queue.
    pub(crate) queue: wgpu::Queue,

    /// Logical device.
    pub(crate) device: wgpu::Device,

    adapter: wgpu::Adapter,
    instance: wgpu::Instance,

    adapter_index: usize,
    info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    entry_point: String,
}

impl GpuContext {
    /// Creates the instance, selects an adapter and opens a device on it.
    ///
    /// ## Errors
    /// * [`GpuError::NoDevice`] - no adapter for the configured backends.
    /// * [`GpuError::NoComputeQueue`] - no adapter supports compute shaders.
    /// * [`GpuError::NoHostVisibleMemory`] - storage buffers cannot be mapped.
    /// * [`GpuError::MissingFeature`] - push constants are unsupported.
    /// * [`GpuError::DeviceRequest`] - the driver refused the device.
    pub fn init(config: &GpuConfig) -> GpuResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapters = instance.enumerate_adapters(config.backends);
        if adapters.is_empty() {
            return Err(GpuError::NoDevice);
        }

        for adapter in &adapters {
            let info = adapter.get_info();
            debug!(name = %info.name, backend = ?info.backend, kind = ?info.device_type, "found adapter");
        }

        let inspected = adapters.len();
        let (adapter_index, adapter) = select_adapter(
            adapters.into_iter().map(|a| {
                let caps = AdapterCaps::of(&a);
                (a, caps)
            }),
            inspected,
        )?;

        let info = adapter.get_info();

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("bench_device"),
            required_features: REQUIRED_FEATURES,
            required_limits: limits.clone(),
            ..Default::default()
        }))
        .map_err(|e| GpuError::DeviceRequest { message: e.to_string() })?;

        info!(
            adapter = %info.name,
            index = adapter_index,
            backend = ?info.backend,
            kind = ?info.device_type,
            max_push_constant_size = limits.max_push_constant_size,
            "gpu context ready"
        );

        Ok(Self {
            queue,
            device,
            adapter,
            instance,
            adapter_index,
            info,
            limits,
            entry_point: config.entry_point.clone(),
        })
    }

    /// Position of the selected adapter in the enumeration order.
    pub fn adapter_index(&self) -> usize {
        self.adapter_index
    }

    /// Description of the selected adapter.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    /// Limits the device was opened with.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Kernel entry point for compute pipelines.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Blocks until every submitted command buffer has finished executing.
    pub fn wait_idle(&self) -> GpuResult<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map(|_| ())
            .map_err(|e| GpuError::api("device_poll", e))
    }

    /// Runs `f` inside validation and out-of-memory error scopes and turns
    /// any captured error into [`GpuError::Api`].
    ///
    /// wgpu reports most creation failures asynchronously through the
    /// device's error sink; scoping each creation call keeps them tied to the
    /// operation that caused them.
    #[track_caller]
    pub(crate) fn scoped<T>(&self, op: &'static str, f: impl FnOnce(&wgpu::Device) -> T) -> GpuResult<T> {
        let location = std::panic::Location::caller();

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            None => Ok(value),
            Some(err) => Err(GpuError::Api {
                op,
                message: err.to_string(),
                location,
            }),
        }
    }

    /// Submits one command buffer inside error scopes.
    #[track_caller]
    pub(crate) fn submit(&self, commands: wgpu::CommandBuffer) -> GpuResult<wgpu::SubmissionIndex> {
        let queue = &self.queue;
        self.scoped("queue_submit", |_| queue.submit(Some(commands)))
    }

    /// Number of buffers still registered with the instance, when the
    /// backend can report it.
    pub fn live_buffers(&self) -> Option<usize> {
        self.instance
            .generate_report()
            .map(|report| report.hub_report().buffers.num_allocated)
    }

    /// Releases the device, then the adapter and the instance.
    ///
    /// Waits for the queue to drain first so no submission outlives its
    /// device.
    pub fn cleanup(self) -> GpuResult<()> {
        let drained = self.wait_idle();

        let GpuContext { queue, device, adapter, instance, info, .. } = self;
        drop(queue);
        drop(device);
        drop(adapter);
        drop(instance);

        debug!(adapter = %info.name, "gpu context released");
        drained
    }
}

const REQUIRED_FEATURES: wgpu::Features =
    wgpu::Features::MAPPABLE_PRIMARY_BUFFERS.union(wgpu::Features::PUSH_CONSTANTS);

/// What adapter selection looks at.
#[derive(Clone, Debug)]
struct AdapterCaps {
    name: String,
    compute: bool,
    features: wgpu::Features,
}

impl AdapterCaps {
    fn of(adapter: &wgpu::Adapter) -> Self {
        Self {
            name: adapter.get_info().name,
            compute: adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            features: adapter.features(),
        }
    }

    fn rejection(&self) -> Option<GpuError> {
        if !self.features.contains(wgpu::Features::MAPPABLE_PRIMARY_BUFFERS) {
            return Some(GpuError::NoHostVisibleMemory { adapter: self.name.clone() });
        }
        if !self.features.contains(wgpu::Features::PUSH_CONSTANTS) {
            return Some(GpuError::MissingFeature {
                adapter: self.name.clone(),
                feature: "push constants",
            });
        }
        None
    }
}

/// Picks the first compute-capable candidate with [`REQUIRED_FEATURES`].
fn select_adapter<A>(
    candidates: impl IntoIterator<Item = (A, AdapterCaps)>,
    inspected: usize,
) -> GpuResult<(usize, A)> {
    let mut first_rejection = None;

    for (index, (adapter, caps)) in candidates.into_iter().enumerate() {
        if !caps.compute {
            debug!(adapter = %caps.name, "skipping adapter without compute shaders");
            continue;
        }
        match caps.rejection() {
            None => return Ok((index, adapter)),
            Some(reason) => {
                debug!(adapter = %caps.name, %reason, "skipping adapter");
                first_rejection.get_or_insert(reason);
            }
        }
    }

    Err(first_rejection.unwrap_or(GpuError::NoComputeQueue { adapters: inspected }))
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.info.name)
            .field("adapter_index", &self.adapter_index)
            .field("backend", &self.info.backend)
            .finish_non_exhaustive()
    }
}
