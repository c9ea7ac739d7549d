//! BLS12-381 G1 multi-scalar multiplication benchmark.

use std::path::Path;

use crate::bench::verify::{compare_bytes, Comparison};
use crate::bench::Benchmark;
use crate::engine::config::MsmConfig;
use crate::engine::error::OracleResult;
use crate::engine::random::XorShift64;
use crate::engine::types::{MsmParams, Workgroups};
use crate::oracle::msm::{self, PointRecord, ScalarRecord, POINT_BYTES};

/// Points and scalars, one record each per term.
#[derive(Clone, Debug, PartialEq)]
pub struct MsmInputs {
    /// `s_i · G`, affine.
    pub points: Vec<PointRecord>,

    /// `s_i`, uniform modulo `r`.
    pub scalars: Vec<ScalarRecord>,
}

/// `Σ s_i · P_i` over `points` terms.
///
/// The output is a single [`PointRecord`]. The GPU kernel shipped with this
/// crate does not implement MSM, so [`Benchmark::gpu_verified`] is `false`
/// and the report verdict is always `Unverified`.
#[derive(Clone, Debug, Default)]
pub struct MsmBench {
    config: MsmConfig,
}

impl MsmBench {
    /// Creates the benchmark from its settings.
    pub fn new(config: MsmConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub fn config(&self) -> &MsmConfig {
        &self.config
    }
}

impl Benchmark for MsmBench {
    type Params = MsmParams;
    type Inputs = MsmInputs;

    fn name(&self) -> &'static str {
        "msm"
    }

    fn kernel_path(&self) -> &Path {
        &self.config.kernel
    }

    fn params(&self) -> MsmParams {
        self.config.params
    }

    fn workgroups(&self) -> Workgroups {
        Workgroups::for_msm(&self.config.params)
    }

    fn generate(&self, rng: &mut XorShift64) -> MsmInputs {
        let (points, scalars) = msm::generate_inputs(rng, self.config.params.points as usize);
        MsmInputs { points, scalars }
    }

    fn input_bytes<'a>(&self, inputs: &'a MsmInputs) -> Vec<&'a [u8]> {
        vec![
            bytemuck::cast_slice(&inputs.points),
            bytemuck::cast_slice(&inputs.scalars),
        ]
    }

    fn output_len(&self) -> usize {
        POINT_BYTES
    }

    fn oracle(&self, inputs: &MsmInputs) -> OracleResult<Vec<u8>> {
        let sum = msm::msm(&inputs.points, &inputs.scalars, &self.config.params)?;
        Ok(bytemuck::bytes_of(&sum).to_vec())
    }

    fn compare(&self, reference: &[u8], candidate: &[u8]) -> Comparison {
        compare_bytes(reference, candidate)
    }

    fn gpu_verified(&self) -> bool {
        false
    }
}
