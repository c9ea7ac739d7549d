//! # Verification Harness
//!
//! Runs one kernel on both paths with identical inputs and judges the GPU
//! result against the CPU reference.
//!
//! ## Flow of [`run_benchmark`]
//!
//! 1. Generate inputs once from the seed.
//! 2. Run and time the CPU oracle.
//! 3. Run the GPU kernel through [`crate::gpu::run_kernel`].
//! 4. Compare outputs and derive a [`Verdict`].
//!
//! One trial, no warm-up, no retries, no averaging.
//!
//! ## Provided benchmarks
//!
//! * [`MatmulBench`] - batched `f32` GEMM, compared within an absolute
//!   tolerance.
//! * [`MsmBench`] - BLS12-381 G1 MSM, compared byte-exactly. The shipped GPU
//!   kernel is a placeholder, so its verdict is always
//!   [`Verdict::Unverified`].

pub mod verify;
pub mod matmul;
pub mod msm;

use std::path::Path;

use bytemuck::Pod;

use crate::engine::error::OracleResult;
use crate::engine::random::XorShift64;
use crate::engine::types::Workgroups;

pub use matmul::{MatmulBench, MatmulInputs};
pub use msm::{MsmBench, MsmInputs};
pub use verify::{compare_bytes, compare_f32, BenchReport, Comparison, Mismatch, Verdict};

/// One CPU/GPU kernel pair.
///
/// The GPU side is described by data (kernel path, parameter block, grid,
/// buffer contents); the CPU side by [`Benchmark::oracle`]. Outputs of both
/// sides are raw bytes so they can be compared without re-typing device
/// memory.
pub trait Benchmark {
    /// Parameter block pushed to the kernel.
    type Params: Pod;

    /// Generated input data.
    type Inputs;

    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// SPIR-V kernel file.
    fn kernel_path(&self) -> &Path;

    /// Parameter block value.
    fn params(&self) -> Self::Params;

    /// Dispatch grid.
    fn workgroups(&self) -> Workgroups;

    /// Draws a fresh set of inputs.
    fn generate(&self, rng: &mut XorShift64) -> Self::Inputs;

    /// Input buffers in binding order.
    fn input_bytes<'a>(&self, inputs: &'a Self::Inputs) -> Vec<&'a [u8]>;

    /// Size of the output buffer in bytes.
    fn output_len(&self) -> usize;

    /// Computes the reference output.
    fn oracle(&self, inputs: &Self::Inputs) -> OracleResult<Vec<u8>>;

    /// Compares the reference output with the GPU output.
    fn compare(&self, reference: &[u8], candidate: &[u8]) -> Comparison;

    /// Whether the GPU kernel is trusted to compute the same function as the
    /// oracle. Untrusted kernels are reported as [`Verdict::Unverified`].
    fn gpu_verified(&self) -> bool {
        true
    }
}

/// Maps a comparison onto a verdict.
pub fn judge(verified: bool, comparison: &Comparison) -> Verdict {
    match (verified, comparison.is_match()) {
        (false, _) => Verdict::Unverified,
        (true, true) => Verdict::Pass,
        (true, false) => Verdict::Fail,
    }
}

#[cfg(feature = "gpu")]
pub use runner::run_benchmark;

#[cfg(feature = "gpu")]
mod runner {
    use std::time::Instant;

    use tracing::{info, info_span, warn};

    use super::{judge, BenchReport, Benchmark, Verdict};
    use crate::engine::error::BenchResult;
    use crate::engine::random::XorShift64;
    use crate::gpu::{run_kernel, DispatchRequest, GpuContext};

    /// Runs `bench` once on the CPU and once on the GPU.
    ///
    /// ## Errors
    /// Oracle input errors and every GPU failure are returned. A disagreement
    /// between the two outputs is not an error; it is reported through
    /// [`Verdict::Fail`].
    pub fn run_benchmark<B: Benchmark>(
        context: &mut GpuContext,
        bench: &B,
        seed: u64,
    ) -> BenchResult<BenchReport> {
        let _span = info_span!("benchmark", name = bench.name()).entered();

        let mut rng = XorShift64::new(seed);
        let inputs = bench.generate(&mut rng);

        let start = Instant::now();
        let reference = bench.oracle(&inputs)?;
        let cpu = start.elapsed();
        info!(ms = cpu.as_secs_f64() * 1e3, "cpu reference complete");

        let params = bench.params();
        let buffers = bench.input_bytes(&inputs);
        let request = DispatchRequest {
            kernel: bench.kernel_path(),
            inputs: &buffers,
            params: bytemuck::bytes_of(&params),
            workgroups: bench.workgroups(),
        };

        let mut output = vec![0u8; bench.output_len()];
        let gpu = run_kernel(context, &request, &mut output)?;
        info!(ms = gpu.as_secs_f64() * 1e3, "gpu dispatch complete");

        let comparison = bench.compare(&reference, &output);
        let verdict = judge(bench.gpu_verified(), &comparison);
        match verdict {
            Verdict::Pass => info!("verification passed"),
            Verdict::Fail => warn!(
                mismatches = comparison.mismatches,
                first = ?comparison.first,
                "verification failed"
            ),
            Verdict::Unverified => warn!(
                agrees = comparison.is_match(),
                "gpu kernel is not a verified implementation; result not judged"
            ),
        }

        Ok(BenchReport {
            name: bench.name(),
            cpu,
            gpu,
            verdict,
            comparison,
        })
    }
}
