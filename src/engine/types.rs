//! Shared data model for the benchmark harness.
//!
//! This module declares the plain-data types exchanged between the CPU
//! oracles, the GPU dispatch engine and the verification harness:
//!
//! * parameter blocks ([`MatrixParams`], [`MsmParams`]) pushed to kernels as
//!   push constants,
//! * workgroup dispatch counts ([`Workgroups`]),
//! * the shared flat-buffer indexing function [`ix3d`],
//! * and the default problem sizes used by the benchmarks.
//!
//! ## Parameter blocks
//! Parameter blocks are `#[repr(C)]` records of `u32` fields implementing
//! [`bytemuck::Pod`]. Their byte image is what the kernel receives, so field
//! order and width must match the push-constant block declared in the
//! kernel bytecode. Sizes are always a multiple of 4 bytes.

use bytemuck::{Pod, Zeroable};

/// Default batch count for the matmul benchmark.
pub const DEFAULT_BATCH: u32 = 32;

/// Default row count of `A` and `C`.
pub const DEFAULT_M: u32 = 128;

/// Default inner dimension.
pub const DEFAULT_K: u32 = 128;

/// Default column count of `B` and `C`.
pub const DEFAULT_N: u32 = 128;

/// Default number of points in the MSM benchmark (`2^16`).
pub const DEFAULT_MSM_POINTS: u32 = 1 << 16;

/// Square tile edge of the GPU matmul kernel (`@workgroup_size(8, 8, 1)`).
pub const MATMUL_TILE: u32 = 8;

/// Invocations per workgroup of the GPU MSM kernel.
pub const MSM_WORKGROUP_SIZE: u32 = 256;

/// Default absolute tolerance for floating-point output comparison.
pub const DEFAULT_TOLERANCE: f32 = 1e-3;

/// Maps `(batch, row, col)` of a `rows × cols` matrix stack onto a flat
/// row-major index.
///
/// For fixed `rows` and `cols` this is a bijection from
/// `[0, batch) × [0, rows) × [0, cols)` onto `[0, batch·rows·cols)`.
/// The GPU kernels use the same formula.
#[inline]
pub const fn ix3d(b: usize, r: usize, c: usize, rows: usize, cols: usize) -> usize {
    b * rows * cols + r * cols + c
}

/// Parameter block of the batched matmul kernel.
///
/// Layout (16 bytes): `batch`, `m`, `k`, `n`, each a little-endian `u32`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MatrixParams {
    /// Number of independent matrix products.
    pub batch: u32,

    /// Rows of `A` and `C`.
    pub m: u32,

    /// Columns of `A`, rows of `B`.
    pub k: u32,

    /// Columns of `B` and `C`.
    pub n: u32,
}

impl MatrixParams {
    /// Creates a parameter block.
    pub const fn new(batch: u32, m: u32, k: u32, n: u32) -> Self {
        Self { batch, m, k, n }
    }

    /// Element count of the `A` stack (`batch·m·k`).
    #[inline]
    pub fn a_len(&self) -> usize {
        self.batch as usize * self.m as usize * self.k as usize
    }

    /// Element count of the `B` stack (`batch·k·n`).
    #[inline]
    pub fn b_len(&self) -> usize {
        self.batch as usize * self.k as usize * self.n as usize
    }

    /// Element count of the `C` stack (`batch·m·n`).
    #[inline]
    pub fn c_len(&self) -> usize {
        self.batch as usize * self.m as usize * self.n as usize
    }
}

impl Default for MatrixParams {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH, DEFAULT_M, DEFAULT_K, DEFAULT_N)
    }
}

/// Parameter block of the MSM kernel.
///
/// Layout (4 bytes): `points`, a little-endian `u32`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MsmParams {
    /// Number of (point, scalar) pairs to accumulate.
    pub points: u32,
}

impl Default for MsmParams {
    fn default() -> Self {
        Self { points: DEFAULT_MSM_POINTS }
    }
}

/// Three-dimensional workgroup dispatch counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Workgroups {
    /// Workgroups along `x`.
    pub x: u32,

    /// Workgroups along `y`.
    pub y: u32,

    /// Workgroups along `z`.
    pub z: u32,
}

impl Workgroups {
    /// Creates a dispatch grid.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Returns `true` if any dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Counts as an array in `x, y, z` order.
    #[inline]
    pub fn as_array(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    /// Number of workgroups needed to cover `len` items with groups of `size`.
    #[inline]
    pub fn cover(len: u32, size: u32) -> u32 {
        len.div_ceil(size.max(1))
    }

    /// Grid for the matmul kernel: one `8×8` tile of `C` per workgroup in
    /// `x`/`y`, one batch per workgroup in `z`.
    pub fn for_matmul(params: &MatrixParams) -> Self {
        Self::new(
            Self::cover(params.m, MATMUL_TILE),
            Self::cover(params.n, MATMUL_TILE),
            params.batch,
        )
    }

    /// Grid for the MSM kernel: one invocation per point.
    pub fn for_msm(params: &MsmParams) -> Self {
        Self::new(Self::cover(params.points, MSM_WORKGROUP_SIZE), 1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_blocks_have_push_constant_friendly_sizes() {
        assert_eq!(std::mem::size_of::<MatrixParams>(), 16);
        assert_eq!(std::mem::size_of::<MsmParams>(), 4);
    }

    #[test]
    fn matrix_params_bytes_are_field_order() {
        let p = MatrixParams::new(1, 2, 3, 4);
        let bytes = bytemuck::bytes_of(&p);
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        assert_eq!(words, vec![1, 2, 3, 4]);
    }

    #[test]
    fn ix3d_matches_row_major_layout() {
        assert_eq!(ix3d(0, 0, 0, 3, 4), 0);
        assert_eq!(ix3d(0, 0, 3, 3, 4), 3);
        assert_eq!(ix3d(0, 1, 0, 3, 4), 4);
        assert_eq!(ix3d(1, 0, 0, 3, 4), 12);
        assert_eq!(ix3d(1, 2, 3, 3, 4), 23);
    }

    #[test]
    fn workgroups_round_up() {
        let grid = Workgroups::for_matmul(&MatrixParams::new(32, 128, 128, 130));
        assert_eq!(grid, Workgroups::new(16, 17, 32));

        let msm = Workgroups::for_msm(&MsmParams { points: 257 });
        assert_eq!(msm, Workgroups::new(2, 1, 1));
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(Workgroups::new(0, 1, 1).is_empty());
        assert!(Workgroups::new(1, 0, 1).is_empty());
        assert!(Workgroups::new(1, 1, 0).is_empty());
        assert!(!Workgroups::new(1, 1, 1).is_empty());
    }
}
