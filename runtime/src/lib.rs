//! Runtime for normjit kernels.
//!
//! Builds kernels in two stages. A kernel descriptor validates an operator
//! description once and derives the per-group constants the generated code
//! reads. A kernel compiles one instance per worker thread against a shared
//! descriptor and executes them over disjoint slices of the batch axis.
//!
//! # Usage
//!
//! ```ignore
//! let kd = Arc::new(LayernormBaKd::build(&op_desc)?);
//! let kernel = LayernormBaKernel::with_defaults(kd)?;
//! let ok = unsafe { kernel.execute(&[src.as_ptr().cast(), dst.as_mut_ptr().cast()]) };
//! ```
//!
//! # Benchmarking
//!
//! The `benchmark` module provides timing utilities for comparing kernel
//! configurations built from one descriptor.

pub mod benchmark;
pub mod config;
pub mod cranelift;
pub mod error;
pub mod kernel;
pub mod kernel_cache;
pub mod layernorm_ba;
pub mod partition;


pub use benchmark::{BenchmarkConfig, BenchmarkResult, benchmark_kernel, benchmark_kernel_with_cutoff};
pub use config::{RuntimeConfig, ThreadCountProvider};
pub use cranelift::{CraneliftBackend, CraneliftKernel, OptLevel};
pub use error::*;
pub use kernel::{CompiledKernel, JitBackend, Kernel, KernelDesc};
pub use kernel_cache::{cached_descriptors, clear_all, get_or_build_descriptor};
pub use layernorm_ba::{EpsilonPolicy, LayernormBaKd, LayernormBaKernel, ThreadUnit};
pub use partition::{BatchSlice, effective_threads, partition};
