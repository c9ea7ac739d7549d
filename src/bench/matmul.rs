//! Batched matmul benchmark.

use std::path::Path;

use crate::bench::verify::{compare_f32, Comparison};
use crate::bench::Benchmark;
use crate::engine::config::MatmulConfig;
use crate::engine::error::OracleResult;
use crate::engine::random::XorShift64;
use crate::engine::types::{MatrixParams, Workgroups};
use crate::oracle;

/// `A` and `B` for every batch, flat row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct MatmulInputs {
    /// `batch × m × k` elements.
    pub a: Vec<f32>,

    /// `batch × k × n` elements.
    pub b: Vec<f32>,
}

/// `C = A · B` on `batch` independent matrix pairs.
///
/// Inputs are uniform in `[0, 1)`. The kernel computes one `8×8` tile of `C`
/// per workgroup, so the grid is `(⌈m/8⌉, ⌈n/8⌉, batch)`.
#[derive(Clone, Debug, Default)]
pub struct MatmulBench {
    config: MatmulConfig,
}

impl MatmulBench {
    /// Creates the benchmark from its settings.
    pub fn new(config: MatmulConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &MatmulConfig {
        &self.config
    }
}

impl Benchmark for MatmulBench {
    type Params = MatrixParams;
    type Inputs = MatmulInputs;

    fn name(&self) -> &'static str {
        "matmul"
    }

    fn kernel_path(&self) -> &Path {
        &self.config.kernel
    }

    fn params(&self) -> MatrixParams {
        self.config.params
    }

    fn workgroups(&self) -> Workgroups {
        Workgroups::for_matmul(&self.config.params)
    }

    fn generate(&self, rng: &mut XorShift64) -> MatmulInputs {
        let p = &self.config.params;
        MatmulInputs {
            a: rng.f32_vec(p.a_len()),
            b: rng.f32_vec(p.b_len()),
        }
    }

    fn input_bytes<'a>(&self, inputs: &'a MatmulInputs) -> Vec<&'a [u8]> {
        vec![bytemuck::cast_slice(&inputs.a), bytemuck::cast_slice(&inputs.b)]
    }

    fn output_len(&self) -> usize {
        self.config.params.c_len() * std::mem::size_of::<f32>()
    }

    fn oracle(&self, inputs: &MatmulInputs) -> OracleResult<Vec<u8>> {
        let c = oracle::matmul(&inputs.a, &inputs.b, &self.config.params)?;
        Ok(bytemuck::cast_slice(&c).to_vec())
    }

    fn compare(&self, reference: &[u8], candidate: &[u8]) -> Comparison {
        // Byte buffers carry no f32 alignment guarantee; copy out.
        let reference: Vec<f32> = bytemuck::pod_collect_to_vec(reference);
        let candidate: Vec<f32> = bytemuck::pod_collect_to_vec(candidate);
        compare_f32(&reference, &candidate, self.config.tolerance)
    }
}
