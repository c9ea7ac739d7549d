use std::io::Write;

use tempfile::NamedTempFile;

use gpu_kernel_bench::gpu::{GpuConfig, GpuContext};

pub const MATMUL_WGSL: &str = include_str!("../../shaders/matmul.wgsl");

/// Compiles the matmul WGSL kernel into a temporary SPIR-V file.
pub fn matmul_kernel() -> NamedTempFile {
    let module = naga::front::wgsl::parse_str(MATMUL_WGSL).unwrap();
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
    let words = naga::back::spv::write_vec(
        &module,
        &info,
        &naga::back::spv::Options::default(),
        Some(&pipeline),
    )
    .unwrap();

    let mut file = tempfile::Builder::new().suffix(".spv").tempfile().unwrap();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    file.write_all(&bytes).unwrap();
    file
}

/// Opens a context, or `None` when no usable adapter exists.
pub fn context() -> Option<GpuContext> {
    match GpuContext::init(&GpuConfig::default()) {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("skipping GPU benchmarks: {e}");
            None
        }
    }
}
