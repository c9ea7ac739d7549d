//! Shared helpers for GPU integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use gpu_kernel_bench::gpu::{GpuConfig, GpuContext};
use tempfile::NamedTempFile;

pub const MATMUL_WGSL: &str = include_str!("../../shaders/matmul.wgsl");
pub const MSM_WGSL: &str = include_str!("../../shaders/msm.wgsl");

/// Compiles a WGSL compute shader with entry point `main` to SPIR-V words.
pub fn compile_wgsl(source: &str) -> Vec<u32> {
    let module = naga::front::wgsl::parse_str(source).expect("wgsl parses");
    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::PUSH_CONSTANT,
    )
    .validate(&module)
    .expect("wgsl validates");

    let pipeline = naga::back::spv::PipelineOptions {
        shader_stage: naga::ShaderStage::Compute,
        entry_point: "main".to_string(),
    };
    naga::back::spv::write_vec(&module, &info, &naga::back::spv::Options::default(), Some(&pipeline))
        .expect("spir-v written")
}

/// Writes `words` to a temporary `.spv` file that lives as long as the handle.
pub fn write_spirv(words: &[u32]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".spv")
        .tempfile()
        .expect("temp file");
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    file.write_all(&bytes).expect("write spir-v");
    file.flush().expect("flush spir-v");
    file
}

/// Compiles `source` and writes the result to a temporary kernel file.
pub fn kernel_file(source: &str) -> NamedTempFile {
    write_spirv(&compile_wgsl(source))
}

/// Opens a context on the default backends, or `None` when this machine has
/// no adapter the engine can use.
pub fn try_context() -> Option<GpuContext> {
    match GpuContext::init(&GpuConfig::default()) {
        Ok(context) => Some(context),
        Err(e) if e.is_environment() => {
            eprintln!("skipping GPU test: {e}");
            None
        }
        Err(e) => panic!("unexpected context error: {e}"),
    }
}

/// A path that does not exist.
pub fn missing_kernel(dir: &Path) -> std::path::PathBuf {
    dir.join("does_not_exist.spv")
}
