//! # GPU Kernel Bench
//!
//! Benchmarks and cross-validates compute kernels by running each one on a
//! CPU reference path and on a GPU compute path, then comparing both outputs
//! and both wall-clock times.
//!
//! ## Layout
//! - [`engine`] - parameter blocks, errors, configuration, seeded inputs
//! - [`gpu`] - generic one-shot compute dispatch engine (`feature = "gpu"`)
//! - [`oracle`] - CPU reference kernels (batched matmul, BLS12-381 MSM)
//! - [`bench`] - verification harness and the concrete benchmarks
//!
//! The GPU engine is kernel-agnostic: any SPIR-V compute kernel with storage
//! buffers at bindings `0..=N` and a push-constant parameter block can be
//! run through [`gpu::run_kernel`].

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;
pub mod oracle;
pub mod bench;

#[cfg(feature = "gpu")]
pub mod gpu;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::types::{
    ix3d,
    MatrixParams,
    MsmParams,
    Workgroups,
};

pub use engine::error::{
    GpuResult,
    GpuError,
    OracleResult,
    OracleError,
    BenchResult,
    BenchError,
};

pub use engine::config::{
    BenchConfig,
    MatmulConfig,
    MsmConfig,
};

pub use engine::random::XorShift64;

pub use oracle::{PointRecord, ScalarRecord};

pub use bench::{
    Benchmark,
    BenchReport,
    Verdict,
    MatmulBench,
    MsmBench,
};

#[cfg(feature = "gpu")]
pub use bench::run_benchmark;

#[cfg(feature = "gpu")]
pub use gpu::{
    GpuConfig,
    GpuContext,
    DispatchRequest,
    run_kernel,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use gpu_kernel_bench::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Benchmark,
        BenchConfig,
        BenchReport,
        MatmulBench,
        MatrixParams,
        MsmBench,
        MsmParams,
        Verdict,
        Workgroups,
        XorShift64,
    };

    #[cfg(feature = "gpu")]
    pub use crate::{
        GpuConfig,
        GpuContext,
        run_benchmark,
        run_kernel,
    };
}
