//! # GPU Dispatch Engine
//!
//! A generic, one-shot compute dispatch engine built on `wgpu`. Any kernel
//! that follows the binding convention below can be run with a single call to
//! [`run_kernel`]; the engine knows nothing about the computation itself.
//!
//! The engine is an **optional, feature-gated** part of the crate
//! (`feature = "gpu"`). The CPU oracles build without it.
//!
//! ---
//!
//! ## High-level execution model
//!
//! A kernel run proceeds in **five explicit stages**:
//!
//! 1. **Load**
//!    * SPIR-V bytecode is read from disk and turned into a shader module.
//!
//! 2. **Upload**
//!    * Each input slice is copied into its own host-mappable storage buffer.
//!    * One output buffer of the requested size is allocated.
//!
//! 3. **Build**
//!    * A bind group layout with one storage slot per buffer, a pipeline
//!      layout with a push-constant range for the parameter block, the
//!      compute pipeline and the bind group are created.
//!
//! 4. **Dispatch**
//!    * One compute pass is recorded and submitted; the host blocks until the
//!      queue is idle. Only this stage is timed.
//!
//! 5. **Download**
//!    * The output buffer is mapped and copied back to the caller.
//!
//! Every object is created for the one call and released when it returns.
//!
//! ---
//!
//! ## Binding convention
//!
//! | slot / range       | contents                              |
//! |--------------------|---------------------------------------|
//! | bindings `0..N-1`  | input storage buffers, in call order  |
//! | binding `N`        | output storage buffer                 |
//! | push constants     | parameter block, offset 0             |
//!
//! ---
//!
//! ## Module structure
//!
//! * [`context`] - instance, adapter, device and queue
//! * [`buffer`] - host-mappable storage buffers
//! * [`kernel`] - SPIR-V loading and shader modules
//! * [`pipeline`] - layouts, pipeline and bind group for one dispatch
//! * [`dispatch`] - recording, submission, timing and [`run_kernel`]
//!
//! ---
//!
//! ## Correctness rules
//!
//! * The context is passed explicitly; nothing is global.
//! * Dispatch requires `&mut GpuContext`: at most one submission in flight.
//! * Every wgpu creation call and the queue submission run inside an error
//!   scope, so validation and out-of-memory failures surface as
//!   [`crate::engine::error::GpuError::Api`] naming the failing operation and
//!   the engine line that issued it.
//! * Errors are never retried.

#![cfg(feature = "gpu")]

pub mod context;
pub mod buffer;
pub mod kernel;
pub mod pipeline;
pub mod dispatch;

pub use context::{GpuConfig, GpuContext};
pub use buffer::{BufferRole, DeviceBuffer};
pub use kernel::{KernelBytecode, KernelModule};
pub use pipeline::DispatchPipeline;
pub use dispatch::{execute, run_kernel, validate_workgroups, DispatchRequest};
