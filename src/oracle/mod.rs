//! # CPU Reference Kernels
//!
//! Ground-truth implementations the GPU results are compared against:
//! - [`matmul`] - row-parallel batched GEMM over flat row-major buffers
//! - [`msm`] - BLS12-381 G1 multi-scalar multiplication (Pippenger)
//!
//! Both use the rayon global pool and need no GPU. They are always built,
//! independent of the `gpu` feature.

pub mod matmul;
pub mod msm;

pub use matmul::matmul;
pub use msm::{msm, PointRecord, ScalarRecord};
