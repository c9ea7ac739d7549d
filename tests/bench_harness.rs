// Run:
//   cargo test --test bench_harness -- --nocapture

mod common;

use gpu_kernel_bench::bench::{Benchmark, MatmulBench, MsmBench, Verdict};
use gpu_kernel_bench::engine::config::{MatmulConfig, MsmConfig};
use gpu_kernel_bench::engine::error::{BenchError, GpuError};
use gpu_kernel_bench::oracle::msm::POINT_BYTES;
use gpu_kernel_bench::{run_benchmark, MatrixParams, MsmParams};

#[test]
fn matmul_benchmark_passes() {
    let Some(mut context) = common::try_context() else { return };
    let kernel = common::kernel_file(common::MATMUL_WGSL);

    let bench = MatmulBench::new(MatmulConfig {
        params: MatrixParams::new(4, 32, 16, 24),
        kernel: kernel.path().to_path_buf(),
        ..MatmulConfig::default()
    });

    let report = run_benchmark(&mut context, &bench, 1234).unwrap();
    assert_eq!(report.name, "matmul");
    assert_eq!(report.verdict, Verdict::Pass, "{report}");
    assert_eq!(report.comparison.compared, 4 * 32 * 24);
    assert!(report.comparison.first.is_none());
}

#[test]
fn msm_benchmark_is_reported_unverified() {
    let Some(mut context) = common::try_context() else { return };
    let kernel = common::kernel_file(common::MSM_WGSL);

    let bench = MsmBench::new(MsmConfig {
        params: MsmParams { points: 40 },
        kernel: kernel.path().to_path_buf(),
    });
    assert_eq!(bench.output_len(), POINT_BYTES);

    let report = run_benchmark(&mut context, &bench, 99).unwrap();
    assert_eq!(report.name, "msm");
    assert_eq!(report.verdict, Verdict::Unverified);
    assert_eq!(report.comparison.compared, POINT_BYTES);
    // The placeholder kernel returns the point at infinity.
    assert!(!report.comparison.is_match());
}

#[test]
fn missing_kernel_aborts_the_benchmark() {
    let Some(mut context) = common::try_context() else { return };
    let dir = tempfile::tempdir().unwrap();

    let bench = MatmulBench::new(MatmulConfig {
        params: MatrixParams::new(1, 8, 8, 8),
        kernel: common::missing_kernel(dir.path()),
        ..MatmulConfig::default()
    });

    let err = run_benchmark(&mut context, &bench, 1).unwrap_err();
    assert!(matches!(err, BenchError::Gpu(GpuError::KernelOpen { .. })), "{err}");
}

#[test]
fn same_seed_gives_same_cpu_result() {
    let Some(mut context) = common::try_context() else { return };
    let kernel = common::kernel_file(common::MATMUL_WGSL);

    let bench = MatmulBench::new(MatmulConfig {
        params: MatrixParams::new(1, 8, 8, 8),
        kernel: kernel.path().to_path_buf(),
        ..MatmulConfig::default()
    });

    let first = run_benchmark(&mut context, &bench, 5).unwrap();
    let second = run_benchmark(&mut context, &bench, 5).unwrap();
    assert_eq!(first.verdict, Verdict::Pass);
    assert_eq!(first.comparison.compared, second.comparison.compared);
    assert_eq!(first.comparison.max_abs_diff, second.comparison.max_abs_diff);
}
