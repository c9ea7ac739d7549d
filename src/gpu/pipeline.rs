//! # Dispatch Pipeline Builder
//!
//! Wires a kernel module, its buffers and its parameter block together for a
//! **single** dispatch.
//!
//! ## Binding model
//!
//! Pipelines created by this module follow a strict binding convention:
//!
//! * Bindings `0..N-1` - storage buffers for the inputs, in call order
//! * Binding `N` - storage buffer for the output
//! * Push-constant range `0..P` - the parameter block (omitted when `P == 0`)
//!
//! The kernel bytecode must declare exactly this interface. wgpu validates the
//! explicit layout against the shader when the pipeline is created; a mismatch
//! is reported as [`GpuError::Api`] instead of corrupting results.
//!
//! ---
//!
//! ## Lifetime
//!
//! Nothing is cached. Every call builds the full set of objects and
//! [`DispatchPipeline`] owns all of them. Its fields are declared in
//! teardown order, so dropping it releases, in turn:
//!
//! 1. the bind group (descriptor set),
//! 2. the compute pipeline,
//! 3. the pipeline layout,
//! 4. the bind group layout,
//! 5. the shader module,
//! 6. every buffer and its memory.
//!
//! This holds on every exit path, including errors half-way through
//! [`DispatchPipeline::build`]: objects created so far are dropped in reverse
//! creation order.

use tracing::{debug, debug_span};

use crate::engine::error::{GpuError, GpuResult};
use crate::gpu::buffer::{BufferRole, DeviceBuffer};
use crate::gpu::kernel::KernelModule;
use crate::gpu::GpuContext;

/// Checks a parameter block size against the push-constant rules.
pub fn validate_param_block(context: &GpuContext, size: usize) -> GpuResult<()> {
    check_param_block(size, context.limits().max_push_constant_size)
}

pub(crate) fn check_param_block(size: usize, limit: u32) -> GpuResult<()> {
    if size % 4 != 0 {
        return Err(GpuError::ParamBlockMisaligned { size });
    }
    if size > limit as usize {
        return Err(GpuError::ParamBlockTooLarge { size, limit });
    }
    Ok(())
}

pub(crate) fn check_bindings(sizes: impl Iterator<Item = u64>, count: usize, limits: &wgpu::Limits) -> GpuResult<()> {
    let limit = limits.max_storage_buffers_per_shader_stage;
    if count > limit as usize {
        return Err(GpuError::TooManyBindings { count, limit });
    }

    let binding_limit = u64::from(limits.max_storage_buffer_binding_size);
    for size in sizes {
        let allocated = DeviceBuffer::allocation_size(size);
        if allocated > binding_limit {
            return Err(GpuError::BufferTooLarge { size: allocated, limit: binding_limit });
        }
    }
    Ok(())
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Everything a single dispatch binds.
///
/// Field order is teardown order; see the module documentation.
#[derive(Debug)]
pub struct DispatchPipeline {
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::ComputePipeline,
    #[allow(dead_code)]
    pipeline_layout: wgpu::PipelineLayout,
    #[allow(dead_code)]
    bind_group_layout: wgpu::BindGroupLayout,
    module: KernelModule,
    buffers: Vec<DeviceBuffer>,
    params_len: usize,
}

impl DispatchPipeline {
    /// Uploads `inputs`, allocates an `output_len`-byte output buffer and
    /// builds layout, pipeline and bind group around `module`.
    ///
    /// ## Binding order
    /// Inputs occupy slots `0..inputs.len()` in call order; the output is the
    /// last slot.
    ///
    /// ## Errors
    /// * parameter block misaligned or over the push-constant limit,
    /// * too many buffers, or a buffer over the storage-binding limit,
    /// * any wgpu creation call rejected by validation or out of memory.
    ///
    /// Size checks run before anything is allocated.
    pub fn build(
        context: &GpuContext,
        module: KernelModule,
        inputs: &[&[u8]],
        output_len: u64,
        params_len: usize,
    ) -> GpuResult<Self> {
        let _span = debug_span!("build", inputs = inputs.len(), output_len, params_len).entered();

        validate_param_block(context, params_len)?;
        let binding_count = inputs.len() + 1;
        check_bindings(
            inputs.iter().map(|i| i.len() as u64).chain(std::iter::once(output_len)),
            binding_count,
            context.limits(),
        )?;

        // 1. buffers: inputs in call order, output last
        let mut buffers = Vec::with_capacity(binding_count);
        for input in inputs {
            buffers.push(DeviceBuffer::with_contents(context, input)?);
        }
        buffers.push(DeviceBuffer::create(context, output_len, BufferRole::Output)?);

        // 2. one storage slot per buffer
        let entries: Vec<wgpu::BindGroupLayoutEntry> =
            (0..binding_count as u32).map(storage_entry).collect();

        let bind_group_layout = context.scoped("create_bind_group_layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("bench_bgl"),
                entries: &entries,
            })
        })?;

        // 3. layout + push-constant range sized to the parameter block
        let push_constant_ranges: Vec<wgpu::PushConstantRange> = if params_len > 0 {
            vec![wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..params_len as u32,
            }]
        } else {
            Vec::new()
        };

        let pipeline_layout = context.scoped("create_pipeline_layout", |device| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("bench_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &push_constant_ranges,
            })
        })?;

        // 4. compute pipeline
        let entry_point = context.entry_point();
        let pipeline = context.scoped("create_compute_pipeline", |device| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("bench_compute_pipeline"),
                layout: Some(&pipeline_layout),
                module: module.raw(),
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        })?;

        // 5. bind every slot to its buffer's full range
        let bind_entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffer.raw().as_entire_binding(),
            })
            .collect();

        let bind_group = context.scoped("create_bind_group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bench_bind_group"),
                layout: &bind_group_layout,
                entries: &bind_entries,
            })
        })?;

        debug!(kernel = %module.path().display(), bindings = binding_count, "dispatch pipeline built");

        Ok(Self {
            bind_group,
            pipeline,
            pipeline_layout,
            bind_group_layout,
            module,
            buffers,
            params_len,
        })
    }

    /// Number of bound buffers (inputs plus output).
    pub fn binding_count(&self) -> usize {
        self.buffers.len()
    }

    /// Push-constant range size in bytes.
    pub fn params_len(&self) -> usize {
        self.params_len
    }

    /// Input buffers in binding order.
    pub fn inputs(&self) -> &[DeviceBuffer] {
        &self.buffers[..self.buffers.len() - 1]
    }

    /// The output buffer (last binding).
    pub fn output(&self) -> &DeviceBuffer {
        &self.buffers[self.buffers.len() - 1]
    }

    /// The kernel the pipeline was built from.
    pub fn kernel(&self) -> &KernelModule {
        &self.module
    }

    pub(crate) fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

impl Drop for DispatchPipeline {
    fn drop(&mut self) {
        debug!(
            kernel = %self.module.path().display(),
            bindings = self.buffers.len(),
            "releasing dispatch pipeline"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_block_must_be_word_multiple() {
        assert!(matches!(
            check_param_block(6, 128),
            Err(GpuError::ParamBlockMisaligned { size: 6 })
        ));
    }

    #[test]
    fn param_block_respects_push_constant_limit() {
        assert!(check_param_block(128, 128).is_ok());
        assert!(matches!(
            check_param_block(132, 128),
            Err(GpuError::ParamBlockTooLarge { size: 132, limit: 128 })
        ));
        assert!(check_param_block(0, 0).is_ok());
    }

    #[test]
    fn binding_count_limit() {
        let limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: 2,
            ..wgpu::Limits::default()
        };
        let err = check_bindings([4u64, 4, 4].into_iter(), 3, &limits).unwrap_err();
        assert!(matches!(err, GpuError::TooManyBindings { count: 3, limit: 2 }));
    }

    #[test]
    fn binding_size_limit() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 16,
            ..wgpu::Limits::default()
        };
        assert!(check_bindings([16u64, 3].into_iter(), 2, &limits).is_ok());
        let err = check_bindings([17u64].into_iter(), 1, &limits).unwrap_err();
        assert!(matches!(err, GpuError::BufferTooLarge { size: 20, limit: 16 }));
    }
}
