//! # GPU Dispatch Runtime
//!
//! Records, submits and times a single compute dispatch, and offers
//! [`run_kernel`], the one-call entry point of the engine.
//!
//! ## High-level execution flow
//!
//! For each [`run_kernel`] call:
//!
//! 1. Validate the request (workgroups, parameter block) before touching the GPU.
//! 2. Load the kernel bytecode. A missing file fails here, before any buffer
//!    is allocated.
//! 3. Build the [`DispatchPipeline`]: upload inputs, allocate the output,
//!    create layouts, pipeline and bind group.
//! 4. [`execute`]: record one compute pass, submit it, block until the device
//!    is idle.
//! 5. Download the output buffer.
//! 6. Drop everything, consumers before the resources they reference.
//!
//! ## Synchronization
//!
//! * Exactly one submission per call, no fences, no overlap.
//! * [`execute`] waits for the **whole queue** to drain, so the measured time
//!   is the wall-clock cost of one complete kernel execution.
//! * There is no timeout. A submission that never completes blocks the
//!   calling thread indefinitely.
//!
//! ## Zero-sized dispatches
//!
//! A workgroup count of zero in any dimension is rejected with
//! [`GpuError::EmptyDispatch`] before any resource is created.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info_span};

use crate::engine::error::{GpuError, GpuResult};
use crate::engine::types::Workgroups;
use crate::gpu::kernel::KernelModule;
use crate::gpu::pipeline::{validate_param_block, DispatchPipeline};
use crate::gpu::GpuContext;

/// One kernel invocation: bytecode, buffers, parameter block and grid.
#[derive(Clone, Copy, Debug)]
pub struct DispatchRequest<'a> {
    /// SPIR-V kernel file.
    pub kernel: &'a Path,

    /// Input buffers in binding order.
    pub inputs: &'a [&'a [u8]],

    /// Parameter block bytes (pushed as push constants).
    pub params: &'a [u8],

    /// Workgroup counts.
    pub workgroups: Workgroups,
}

/// Rejects empty grids and counts over the per-dimension limit.
pub fn validate_workgroups(workgroups: Workgroups, limit: u32) -> GpuResult<()> {
    if workgroups.is_empty() {
        return Err(GpuError::EmptyDispatch {
            workgroups: workgroups.as_array(),
        });
    }

    for (dimension, count) in ['x', 'y', 'z'].into_iter().zip(workgroups.as_array()) {
        if count > limit {
            return Err(GpuError::WorkgroupLimit { dimension, count, limit });
        }
    }
    Ok(())
}

/// Records one dispatch of `pipeline`, submits it and waits for the queue to
/// drain.
///
/// ## Returns
/// Wall-clock time of submission plus wait. Recording and teardown are
/// excluded.
///
/// ## Side effects
/// On return the pipeline's output buffer holds the kernel's result and can
/// be downloaded.
///
/// ## Errors
/// * [`GpuError::EmptyDispatch`] / [`GpuError::WorkgroupLimit`] - bad grid.
/// * [`GpuError::ParamBlockMismatch`] - `params` differs in size from the
///   pipeline's push-constant range.
/// * [`GpuError::Api`] - recording, submission or the wait failed.
pub fn execute(
    context: &mut GpuContext,
    pipeline: &DispatchPipeline,
    params: &[u8],
    workgroups: Workgroups,
) -> GpuResult<Duration> {
    validate_workgroups(workgroups, context.limits().max_compute_workgroups_per_dimension)?;
    if params.len() != pipeline.params_len() {
        return Err(GpuError::ParamBlockMismatch {
            expected: pipeline.params_len(),
            actual: params.len(),
        });
    }

    let _span = info_span!("execute", x = workgroups.x, y = workgroups.y, z = workgroups.z).entered();

    let commands = context.scoped("record_dispatch", |device| {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("bench_compute_encoder"),
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("bench_compute_pass"),
                timestamp_writes: None,
            });

            pass.set_pipeline(pipeline.pipeline());
            pass.set_bind_group(0, pipeline.bind_group(), &[]);
            if !params.is_empty() {
                pass.set_push_constants(0, params);
            }
            pass.dispatch_workgroups(workgroups.x, workgroups.y, workgroups.z);
        }

        encoder.finish()
    })?;

    let start = Instant::now();
    context.submit(commands)?;
    context.wait_idle()?;
    let elapsed = start.elapsed();

    debug!(elapsed_ms = elapsed.as_secs_f64() * 1e3, "dispatch complete");
    Ok(elapsed)
}

/// Runs `request` end to end and writes the kernel's output into `output`.
///
/// `output.len()` is the output buffer size. Every GPU object created for
/// the call is released before returning, on success and on error.
///
/// ## Returns
/// The elapsed time reported by [`execute`].
pub fn run_kernel(
    context: &mut GpuContext,
    request: &DispatchRequest<'_>,
    output: &mut [u8],
) -> GpuResult<Duration> {
    validate_workgroups(
        request.workgroups,
        context.limits().max_compute_workgroups_per_dimension,
    )?;
    validate_param_block(context, request.params.len())?;

    let module = {
        let _span = info_span!("load", kernel = %request.kernel.display()).entered();
        KernelModule::load(context, request.kernel)?
    };

    let pipeline = {
        let _span = info_span!("upload").entered();
        DispatchPipeline::build(
            context,
            module,
            request.inputs,
            output.len() as u64,
            request.params.len(),
        )?
    };

    let elapsed = execute(context, &pipeline, request.params, request.workgroups)?;

    {
        let _span = info_span!("download", bytes = output.len()).entered();
        pipeline.output().download(context, output)?;
    }

    drop(pipeline);
    Ok(elapsed)
}
