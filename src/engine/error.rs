//! Error types for the GPU dispatch engine, the CPU oracles and the harness.
//!
//! Each concern owns a focused error enum carrying enough context to make a
//! failure actionable from a single log line:
//!
//! * [`GpuError`] - environment and API-call failures of the GPU path
//!   (no device, missing features, unreadable kernel bytecode, rejected
//!   dispatch shapes, driver/validation errors).
//! * [`OracleError`] - malformed inputs handed to the CPU reference kernels.
//! * [`BenchError`] - aggregate returned by the verification harness; `From`
//!   conversions let `?` lift either of the above.
//!
//! ## Fatality
//! None of these errors is retried. The binary logs the error and exits
//! non-zero. A verification mismatch is *not* an error; it is reported
//! through [`crate::bench::Verdict::Fail`].
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is short and suitable for operator logs.
//! * [`fmt::Debug`] (derived) keeps the full structure.

use std::fmt;
use std::io;
use std::panic::Location;
use std::path::PathBuf;

/// Result alias for the GPU dispatch engine.
pub type GpuResult<T> = Result<T, GpuError>;

/// Result alias for the CPU reference kernels.
pub type OracleResult<T> = Result<T, OracleError>;

/// Result alias for the verification harness.
pub type BenchResult<T> = Result<T, BenchError>;

/// Failures of the GPU compute path.
///
/// Variants fall into two groups:
/// * **environment errors** - the machine cannot run the harness at all
///   (no adapter, no compute capability, no mappable memory, kernel file
///   missing or malformed),
/// * **request / API errors** - a dispatch request violates a device limit,
///   or a wgpu call reported a validation, out-of-memory or mapping error.
#[derive(Debug)]
pub enum GpuError {
    /// The instance enumerated no adapters for the configured backends.
    NoDevice,

    /// Adapters exist, but none exposes compute shaders.
    NoComputeQueue {
        /// Number of adapters that were inspected.
        adapters: usize,
    },

    /// The selected adapter cannot place storage buffers in host-mappable
    /// memory (`MAPPABLE_PRIMARY_BUFFERS` unsupported).
    NoHostVisibleMemory {
        /// Adapter name.
        adapter: String,
    },

    /// The selected adapter lacks a feature the engine depends on.
    MissingFeature {
        /// Adapter name.
        adapter: String,

        /// Feature name.
        feature: &'static str,
    },

    /// The logical device could not be created.
    DeviceRequest {
        /// Driver message.
        message: String,
    },

    /// The kernel bytecode file could not be opened or read.
    KernelOpen {
        /// Path that was requested.
        path: PathBuf,

        /// Underlying I/O error.
        source: io::Error,
    },

    /// The kernel bytecode file is empty.
    EmptyKernel {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The kernel bytecode length is not a multiple of the 4-byte word size.
    KernelAlignment {
        /// Path that was requested.
        path: PathBuf,

        /// Byte length of the file.
        len: usize,
    },

    /// The parameter block exceeds the device's push-constant limit.
    ParamBlockTooLarge {
        /// Requested block size in bytes.
        size: usize,

        /// Device limit in bytes.
        limit: u32,
    },

    /// The parameter block size is not a multiple of 4 bytes.
    ParamBlockMisaligned {
        /// Requested block size in bytes.
        size: usize,
    },

    /// The parameter bytes passed at execution differ in size from the
    /// push-constant range the pipeline was built with.
    ParamBlockMismatch {
        /// Size the pipeline layout declares.
        expected: usize,

        /// Size supplied at execution.
        actual: usize,
    },

    /// A dispatch with a zero workgroup count in some dimension.
    EmptyDispatch {
        /// Requested `(x, y, z)` counts.
        workgroups: [u32; 3],
    },

    /// A workgroup count exceeds the per-dimension device limit.
    WorkgroupLimit {
        /// Offending dimension (`'x'`, `'y'` or `'z'`).
        dimension: char,

        /// Requested count.
        count: u32,

        /// Device limit.
        limit: u32,
    },

    /// More buffers than the device allows per compute stage.
    TooManyBindings {
        /// Requested slot count.
        count: usize,

        /// Device limit.
        limit: u32,
    },

    /// A buffer exceeds the device's buffer or storage-binding size limit.
    BufferTooLarge {
        /// Requested size in bytes.
        size: u64,

        /// Device limit in bytes.
        limit: u64,
    },

    /// A host slice does not match the device buffer's requested size.
    HostLengthMismatch {
        /// Device buffer size in bytes.
        expected: u64,

        /// Host slice size in bytes.
        actual: usize,
    },

    /// A wgpu call failed.
    Api {
        /// Name of the failing operation.
        op: &'static str,

        /// Driver or validation message.
        message: String,

        /// Engine call site that issued the failing wgpu operation.
        location: &'static Location<'static>,
    },
}

impl GpuError {
    /// Builds an [`GpuError::Api`] recording the caller's source location.
    #[track_caller]
    pub fn api(op: &'static str, message: impl fmt::Display) -> Self {
        GpuError::Api {
            op,
            message: message.to_string(),
            location: Location::caller(),
        }
    }

    /// Returns `true` for errors that describe the machine rather than the
    /// request (no usable GPU).
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            GpuError::NoDevice
                | GpuError::NoComputeQueue { .. }
                | GpuError::NoHostVisibleMemory { .. }
                | GpuError::MissingFeature { .. }
                | GpuError::DeviceRequest { .. }
        )
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoDevice => f.write_str("no GPU adapter found"),
            GpuError::NoComputeQueue { adapters } => write!(
                f,
                "none of {adapters} adapter(s) exposes compute shaders"
            ),
            GpuError::NoHostVisibleMemory { adapter } => write!(
                f,
                "adapter {adapter} cannot map storage buffers into host memory"
            ),
            GpuError::MissingFeature { adapter, feature } => {
                write!(f, "adapter {adapter} does not support {feature}")
            }
            GpuError::DeviceRequest { message } => {
                write!(f, "failed to create logical device: {message}")
            }
            GpuError::KernelOpen { path, source } => {
                write!(f, "failed to open kernel file {}: {source}", path.display())
            }
            GpuError::EmptyKernel { path } => {
                write!(f, "kernel file {} is empty", path.display())
            }
            GpuError::KernelAlignment { path, len } => write!(
                f,
                "kernel file {} has length {len}, not a multiple of 4",
                path.display()
            ),
            GpuError::ParamBlockTooLarge { size, limit } => write!(
                f,
                "parameter block of {size} bytes exceeds push-constant limit of {limit} bytes"
            ),
            GpuError::ParamBlockMisaligned { size } => {
                write!(f, "parameter block of {size} bytes is not a multiple of 4")
            }
            GpuError::ParamBlockMismatch { expected, actual } => write!(
                f,
                "parameter block is {actual} bytes; pipeline expects {expected}"
            ),
            GpuError::EmptyDispatch { workgroups } => write!(
                f,
                "dispatch of {:?} workgroups has an empty dimension",
                workgroups
            ),
            GpuError::WorkgroupLimit { dimension, count, limit } => write!(
                f,
                "{count} workgroups along {dimension} exceeds device limit {limit}"
            ),
            GpuError::TooManyBindings { count, limit } => write!(
                f,
                "{count} storage buffers exceed device limit of {limit} per stage"
            ),
            GpuError::BufferTooLarge { size, limit } => write!(
                f,
                "buffer of {size} bytes exceeds device limit of {limit} bytes"
            ),
            GpuError::HostLengthMismatch { expected, actual } => write!(
                f,
                "host slice is {actual} bytes; device buffer holds {expected}"
            ),
            GpuError::Api { op, message, location } => {
                write!(f, "{op} failed at {location}: {message}")
            }
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::KernelOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Malformed input handed to a CPU reference kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// A flat buffer does not hold the element count the parameter block implies.
    ShapeMismatch {
        /// Which buffer (`"a"`, `"b"`, `"points"`, …).
        buffer: &'static str,

        /// Required element count.
        expected: usize,

        /// Supplied element count.
        actual: usize,
    },

    /// A point record does not decode to a valid curve point.
    InvalidPoint {
        /// Index of the record.
        index: usize,

        /// Why decoding failed.
        reason: &'static str,
    },

    /// A byte buffer is not a whole number of fixed-size records.
    RecordLength {
        /// Record kind.
        record: &'static str,

        /// Buffer length in bytes.
        len: usize,

        /// Record size in bytes.
        size: usize,
    },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::ShapeMismatch { buffer, expected, actual } => write!(
                f,
                "buffer {buffer} holds {actual} elements; {expected} required"
            ),
            OracleError::InvalidPoint { index, reason } => {
                write!(f, "point record {index} is invalid: {reason}")
            }
            OracleError::RecordLength { record, len, size } => write!(
                f,
                "{len} bytes is not a whole number of {size}-byte {record} records"
            ),
        }
    }
}

impl std::error::Error for OracleError {}

/// Aggregate error of the verification harness.
#[derive(Debug)]
pub enum BenchError {
    /// The GPU path failed.
    Gpu(GpuError),

    /// The CPU reference path rejected its input.
    Oracle(OracleError),
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Gpu(e) => write!(f, "gpu: {e}"),
            BenchError::Oracle(e) => write!(f, "cpu oracle: {e}"),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Gpu(e) => Some(e),
            BenchError::Oracle(e) => Some(e),
        }
    }
}

impl From<GpuError> for BenchError {
    fn from(e: GpuError) -> Self { BenchError::Gpu(e) }
}

impl From<OracleError> for BenchError {
    fn from(e: OracleError) -> Self { BenchError::Oracle(e) }
}
