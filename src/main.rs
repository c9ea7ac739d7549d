use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gpu_kernel_bench::prelude::*;
use gpu_kernel_bench::{BenchError, MatmulConfig, MsmConfig};

/// GPU backend selection, mapped onto `wgpu::Backends`.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
enum BackendArg {
    /// Vulkan, Metal, DX12 and browser WebGPU
    #[default]
    Primary,
    Vulkan,
    Metal,
    Dx12,
    /// Every backend wgpu was built with
    All,
}

impl From<BackendArg> for wgpu::Backends {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Primary => wgpu::Backends::PRIMARY,
            BackendArg::Vulkan => wgpu::Backends::VULKAN,
            BackendArg::Metal => wgpu::Backends::METAL,
            BackendArg::Dx12 => wgpu::Backends::DX12,
            BackendArg::All => wgpu::Backends::all(),
        }
    }
}

/// Runs compute kernels on the CPU and the GPU and compares the results.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Run the batched matmul benchmark
    #[arg(long)]
    matmul: bool,

    /// Run the MSM benchmark
    #[arg(long)]
    msm: bool,

    /// Run every benchmark (the default when none is selected)
    #[arg(long)]
    all: bool,

    /// Matmul batch count
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_BATCH)]
    batch: u32,

    /// Rows of A and C
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_M)]
    m: u32,

    /// Columns of A, rows of B
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_K)]
    k: u32,

    /// Columns of B and C
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_N)]
    n: u32,

    /// MSM term count
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_MSM_POINTS)]
    points: u32,

    /// SPIR-V matmul kernel
    #[arg(long, default_value = gpu_kernel_bench::engine::config::DEFAULT_MATMUL_KERNEL)]
    matmul_kernel: PathBuf,

    /// SPIR-V MSM kernel
    #[arg(long, default_value = gpu_kernel_bench::engine::config::DEFAULT_MSM_KERNEL)]
    msm_kernel: PathBuf,

    /// Absolute tolerance for the matmul comparison
    #[arg(long, default_value_t = gpu_kernel_bench::engine::types::DEFAULT_TOLERANCE)]
    tolerance: f32,

    /// Input generation seed
    #[arg(long, default_value_t = gpu_kernel_bench::engine::config::DEFAULT_SEED)]
    seed: u64,

    /// GPU backends to enumerate
    #[arg(long, value_enum, default_value = "primary")]
    backend: BackendArg,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        let mut config = BenchConfig {
            matmul: MatmulConfig {
                params: MatrixParams::new(self.batch, self.m, self.k, self.n),
                kernel: self.matmul_kernel.clone(),
                tolerance: self.tolerance,
            },
            msm: MsmConfig {
                params: MsmParams { points: self.points },
                kernel: self.msm_kernel.clone(),
            },
            seed: self.seed,
            ..BenchConfig::default()
        };
        if self.all {
            config.select(true, true);
        } else {
            config.select(self.matmul, self.msm);
        }
        config
    }

    fn gpu_config(&self) -> GpuConfig {
        GpuConfig {
            backends: self.backend.into(),
            ..GpuConfig::default()
        }
    }
}

/// Runs the selected benchmarks in order, handing each report to `publish`
/// as soon as it exists. The first error stops the run; reports already
/// published stay published.
fn run(
    context: &mut GpuContext,
    config: &BenchConfig,
    mut publish: impl FnMut(&BenchReport),
) -> Result<(), BenchError> {
    if config.run_matmul {
        let bench = MatmulBench::new(config.matmul.clone());
        publish(&run_benchmark(context, &bench, config.seed)?);
    }

    if config.run_msm {
        let bench = MsmBench::new(config.msm.clone());
        publish(&run_benchmark(context, &bench, config.seed)?);
    }

    Ok(())
}

fn print_report(report: &BenchReport) {
    println!("\n{report}");
    info!(
        name = report.name,
        verdict = %report.verdict,
        speedup = report.speedup(),
        "benchmark finished"
    );
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.bench_config();

    let mut context = match GpuContext::init(&cli.gpu_config()) {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, "gpu initialization failed");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&mut context, &config, print_report);
    let released = context.cleanup();

    if let Err(e) = outcome {
        error!(error = %e, "benchmark aborted");
        return ExitCode::FAILURE;
    }
    if let Err(e) = released {
        error!(error = %e, "gpu teardown failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_selects_everything() {
        let cli = Cli::parse_from(["gpu-kernel-bench"]);
        let config = cli.bench_config();
        assert!(config.run_matmul && config.run_msm);
        assert_eq!(config.matmul.params, MatrixParams::default());
    }

    #[test]
    fn single_selection_and_overrides() {
        let cli = Cli::parse_from([
            "gpu-kernel-bench", "--msm", "--points", "1024", "--backend", "vulkan",
        ]);
        let config = cli.bench_config();
        assert!(!config.run_matmul && config.run_msm);
        assert_eq!(config.msm.params.points, 1024);
        assert_eq!(cli.gpu_config().backends, wgpu::Backends::VULKAN);
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        assert!(Cli::try_parse_from(["gpu-kernel-bench", "--bogus"]).is_err());
    }

    fn matmul_kernel_file() -> tempfile::NamedTempFile {
        use std::io::Write;

        let module = naga::front::wgsl::parse_str(include_str!("../shaders/matmul.wgsl")).unwrap();
        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::PUSH_CONSTANT,
        )
        .validate(&module)
        .unwrap();
        let pipeline = naga::back::spv::PipelineOptions {
            shader_stage: naga::ShaderStage::Compute,
            entry_point: "main".to_string(),
        };
        let words =
            naga::back::spv::write_vec(&module, &info, &naga::back::spv::Options::default(), Some(&pipeline))
                .unwrap();

        let mut file = tempfile::Builder::new().suffix(".spv").tempfile().unwrap();
        file.write_all(bytemuck::cast_slice(&words)).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn finished_report_survives_a_later_failure() {
        let mut context = match GpuContext::init(&GpuConfig::default()) {
            Ok(context) => context,
            Err(e) if e.is_environment() => {
                eprintln!("skipping GPU test: {e}");
                return;
            }
            Err(e) => panic!("unexpected context error: {e}"),
        };

        let kernel = matmul_kernel_file();
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "gpu-kernel-bench", "--all",
            "--batch", "1", "--m", "8", "--k", "8", "--n", "8", "--points", "4",
        ]);
        let mut config = cli.bench_config();
        config.matmul.kernel = kernel.path().to_path_buf();
        config.msm.kernel = dir.path().join("missing.spv");

        let mut published = Vec::new();
        let outcome = run(&mut context, &config, |report| published.push((report.name, report.verdict)));

        assert!(matches!(
            outcome,
            Err(BenchError::Gpu(gpu_kernel_bench::GpuError::KernelOpen { .. }))
        ));
        assert_eq!(published, vec![("matmul", Verdict::Pass)]);
        context.cleanup().unwrap();
    }
}
