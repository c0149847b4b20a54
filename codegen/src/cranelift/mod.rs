//! Cranelift IR code generation.
//!
//! Builds Cranelift `Function`s directly with `FunctionBuilder`; the runtime
//! hands them to a JIT module for finalization.

mod helpers;
pub mod layernorm_ba;
pub mod types;

pub use layernorm_ba::lower_layernorm_ba;
