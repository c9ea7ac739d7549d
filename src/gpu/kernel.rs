//! # Kernel Loader
//!
//! Reads precompiled SPIR-V bytecode from storage and turns it into a shader
//! module.
//!
//! Loading is split in two steps:
//! 1. [`KernelBytecode::read`] - pure file I/O plus the word-size check. It
//!    never touches the GPU, so a missing or truncated file is reported before
//!    any device resource exists.
//! 2. [`KernelModule::create`] - hands the words to the device. Malformed
//!    bytecode is rejected here by the shader front-end and surfaces as
//!    [`GpuError::Api`].
//!
//! The loader does not otherwise inspect the bytecode.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::error::{GpuError, GpuResult};
use crate::gpu::GpuContext;

/// Size of one SPIR-V instruction word in bytes.
pub const WORD_SIZE: usize = 4;

/// SPIR-V bytecode read from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelBytecode {
    path: PathBuf,
    words: Vec<u32>,
}

impl KernelBytecode {
    /// Reads the whole file at `path`.
    ///
    /// ## Errors
    /// * [`GpuError::KernelOpen`] - the file cannot be opened or read.
    /// * [`GpuError::EmptyKernel`] - the file is empty.
    /// * [`GpuError::KernelAlignment`] - the length is not a multiple of 4.
    pub fn read(path: impl AsRef<Path>) -> GpuResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| GpuError::KernelOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, &bytes)
    }

    /// Interprets `bytes` as little-endian SPIR-V words. `path` is only used
    /// for diagnostics.
    pub fn from_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> GpuResult<Self> {
        let path = path.as_ref().to_path_buf();
        if bytes.is_empty() {
            return Err(GpuError::EmptyKernel { path });
        }
        if bytes.len() % WORD_SIZE != 0 {
            return Err(GpuError::KernelAlignment { path, len: bytes.len() });
        }

        let words = bytes
            .chunks_exact(WORD_SIZE)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        Ok(Self { path, words })
    }

    /// Where the bytecode came from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytecode words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Bytecode length in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * WORD_SIZE
    }
}

/// A shader module created from [`KernelBytecode`].
#[derive(Debug)]
pub struct KernelModule {
    module: wgpu::ShaderModule,
    path: PathBuf,
}

impl KernelModule {
    /// Creates a shader module from already-read bytecode.
    pub fn create(context: &GpuContext, bytecode: &KernelBytecode) -> GpuResult<Self> {
        let module = context.scoped("create_shader_module", |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("bench_kernel"),
                source: wgpu::ShaderSource::SpirV(Cow::Borrowed(bytecode.words())),
            })
        })?;

        debug!(path = %bytecode.path().display(), bytes = bytecode.byte_len(), "kernel module created");
        Ok(Self {
            module,
            path: bytecode.path().to_path_buf(),
        })
    }

    /// Reads `path` and creates a module from it.
    pub fn load(context: &GpuContext, path: impl AsRef<Path>) -> GpuResult<Self> {
        let bytecode = KernelBytecode::read(path)?;
        Self::create(context, &bytecode)
    }

    /// Source path of the bytecode.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn raw(&self) -> &wgpu::ShaderModule {
        &self.module
    }
}
