//! Generic kernel interfaces.
//!
//! Two stages, two traits: a [`KernelDesc`] derives everything that depends
//! only on the operator description, a [`Kernel`] owns compiled code built
//! from a shared descriptor and runs it. The JIT backend sits behind
//! [`JitBackend`] and hands out [`CompiledKernel`] instances.

use std::sync::Arc;

use normjit_codegen::LayernormBaParams;
use normjit_ir::{KernelKind, OperatorDesc};

use crate::Result;

/// Immutable, derived state of one operator configuration.
pub trait KernelDesc {
    fn kernel_kind(&self) -> KernelKind;

    fn operator_desc(&self) -> &OperatorDesc;
}

/// Executable kernel built from a shared descriptor.
pub trait Kernel {
    type Desc: KernelDesc;

    fn desc(&self) -> &Arc<Self::Desc>;

    /// Run the kernel once over `rt_data`.
    ///
    /// Returns `true` iff every thread instance completed without a fault.
    ///
    /// # Safety
    ///
    /// Every pointer in `rt_data` must address memory laid out as the kernel
    /// family expects, valid for the whole call, with no other writer.
    unsafe fn execute(&self, rt_data: &[*const u8]) -> bool;
}

/// A compiled kernel instance.
///
/// Instances are thread-affine in the sense that one instance serves one
/// worker slice; they are never invoked concurrently with themselves.
pub trait CompiledKernel: Send + Sync {
    /// Process batch positions `slice_start..slice_start + slice_len`.
    ///
    /// An `Err` is a fault reported by the instance.
    ///
    /// # Safety
    ///
    /// `rt_data` must satisfy the layout contract of the kernel family and
    /// stay valid for the duration of the call.
    unsafe fn invoke(&self, rt_data: &[*const u8], slice_start: usize, slice_len: usize) -> Result<()>;

    /// Get the kernel name for debugging/profiling.
    fn name(&self) -> &str;
}

/// Code generator that turns static kernel parameters into executable code.
///
/// Must be deterministic: identical parameters yield behaviorally identical
/// instances.
pub trait JitBackend: Send + Sync {
    fn compile(&self, params: &LayernormBaParams, name: &str) -> Result<Box<dyn CompiledKernel>>;

    fn name(&self) -> &str;
}
