//! Code generation for normjit kernels.
//!
//! Lowers the static parameters of a kernel family into a shape-specialized
//! Cranelift IR function. Extents, strides and the addresses of the
//! descriptor-owned constant buffers are baked into the generated code; only
//! the runtime-data pointers and the batch slice arrive at call time.
//!
//! # Usage
//!
//! ```ignore
//! use normjit_codegen::cranelift::lower_layernorm_ba;
//!
//! let func = lower_layernorm_ba(&params, "layernorm_ba_t0", call_conv, pointer_type)?;
//! ```

pub mod cranelift;
pub mod error;
pub mod params;

pub use error::*;
pub use params::{ConstAddrs, KernelStatus, LayernormBaParams, RtSlot};
