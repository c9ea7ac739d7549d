//! # Engine Module
//!
//! Backend-independent building blocks shared by the CPU oracles, the GPU
//! dispatch engine and the verification harness:
//! - Parameter blocks, workgroup grids and indexing (`types`)
//! - Error types (`error`)
//! - Run configuration (`config`)
//! - Seeded input generation (`random`)
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod random;
