//! Benchmark configuration.
//!
//! [`BenchConfig`] collects every knob of a harness run. Its `Default`
//! reproduces the stock benchmark: a `32 × 128×128×128` batched matmul and a
//! `2^16`-point MSM, compared at an absolute tolerance of `1e-3`, with kernel
//! bytecode read from `build/`.
//!
//! The binary fills this struct from command-line flags; library users build
//! it directly.

use std::path::PathBuf;

use crate::engine::types::{MatrixParams, MsmParams, DEFAULT_TOLERANCE};

/// Default location of the matmul kernel bytecode.
pub const DEFAULT_MATMUL_KERNEL: &str = "build/vulkan_matmul.spv";

/// Default location of the MSM kernel bytecode.
pub const DEFAULT_MSM_KERNEL: &str = "build/msm.spv";

/// Default input-generation seed.
pub const DEFAULT_SEED: u64 = 0x5EED_0F_BE_4C;

/// Settings of the batched matmul benchmark.
#[derive(Clone, Debug, PartialEq)]
pub struct MatmulConfig {
    /// Problem shape.
    pub params: MatrixParams,

    /// SPIR-V kernel path.
    pub kernel: PathBuf,

    /// Absolute tolerance for element-wise comparison.
    pub tolerance: f32,
}

impl Default for MatmulConfig {
    fn default() -> Self {
        Self {
            params: MatrixParams::default(),
            kernel: PathBuf::from(DEFAULT_MATMUL_KERNEL),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Settings of the MSM benchmark.
#[derive(Clone, Debug, PartialEq)]
pub struct MsmConfig {
    /// Point count.
    pub params: MsmParams,

    /// SPIR-V kernel path.
    pub kernel: PathBuf,
}

impl Default for MsmConfig {
    fn default() -> Self {
        Self {
            params: MsmParams::default(),
            kernel: PathBuf::from(DEFAULT_MSM_KERNEL),
        }
    }
}

/// Complete harness configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    /// Run the matmul benchmark.
    pub run_matmul: bool,

    /// Run the MSM benchmark.
    pub run_msm: bool,

    /// Matmul settings.
    pub matmul: MatmulConfig,

    /// MSM settings.
    pub msm: MsmConfig,

    /// Seed for input generation.
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            run_matmul: true,
            run_msm: true,
            matmul: MatmulConfig::default(),
            msm: MsmConfig::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl BenchConfig {
    /// Applies a benchmark selection. Selecting nothing selects everything.
    pub fn select(&mut self, matmul: bool, msm: bool) {
        if matmul || msm {
            self.run_matmul = matmul;
            self.run_msm = msm;
        } else {
            self.run_matmul = true;
            self.run_msm = true;
        }
    }
}
