//! Cranelift JIT compilation and execution.
//!
//! The opt level can be selected via the `NORMJIT_OPT_LEVEL` environment
//! variable ("none", "speed", "speed_and_size").

use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module, default_libcall_names};
use normjit_codegen::{KernelStatus, LayernormBaParams};
use snafu::ResultExt;

use crate::error::CodegenSnafu;
use crate::kernel::{CompiledKernel, JitBackend};
use crate::{Error, Result};

/// Entry point of a compiled layernorm-ba kernel.
type LayernormBaFn = unsafe extern "C" fn(*const *const u8, i64, i64) -> i32;

/// Cranelift optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Select opt level from environment variable NORMJIT_OPT_LEVEL.
    pub fn from_env() -> Self {
        match std::env::var("NORMJIT_OPT_LEVEL").as_deref() {
            Ok("none") | Ok("NONE") => OptLevel::None,
            Ok("speed") | Ok("SPEED") => OptLevel::Speed,
            Ok("speed_and_size") | Ok("SPEED_AND_SIZE") => OptLevel::SpeedAndSize,
            _ => OptLevel::default(),
        }
    }

    fn as_flag(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// JIT backend that lowers kernel parameters through Cranelift for the host.
#[derive(Debug, Clone, Default)]
pub struct CraneliftBackend {
    opt_level: OptLevel,
}

impl CraneliftBackend {
    pub fn new(opt_level: OptLevel) -> Self {
        Self { opt_level }
    }

    pub fn from_env() -> Self {
        Self::new(OptLevel::from_env())
    }

    pub fn opt_level(&self) -> OptLevel {
        self.opt_level
    }

    fn isa(&self) -> Result<OwnedTargetIsa> {
        let mut flag_builder = settings::builder();
        let flags = [("use_colocated_libcalls", "false"), ("is_pic", "false"), ("opt_level", self.opt_level.as_flag())];
        for (flag, value) in flags {
            flag_builder
                .set(flag, value)
                .map_err(|e| Error::JitCompilation { reason: format!("Failed to set cranelift flag {flag}: {e}") })?;
        }

        cranelift_native::builder()
            .map_err(|e| Error::JitCompilation { reason: format!("Failed to create native ISA builder: {e}") })?
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| Error::JitCompilation { reason: format!("Failed to finish ISA: {e}") })
    }
}

impl JitBackend for CraneliftBackend {
    fn compile(&self, params: &LayernormBaParams, name: &str) -> Result<Box<dyn CompiledKernel>> {
        let isa = self.isa()?;
        let func =
            normjit_codegen::cranelift::lower_layernorm_ba(params, name, isa.default_call_conv(), isa.pointer_type())
                .context(CodegenSnafu)?;

        let builder = JITBuilder::with_isa(isa, default_libcall_names());
        let mut module = JITModule::new(builder);

        let func_id = module
            .declare_function(name, Linkage::Local, &func.signature)
            .map_err(|e| Error::JitCompilation { reason: format!("Failed to declare {name}: {e}") })?;

        let mut ctx = module.make_context();
        ctx.func = func;
        module
            .define_function(func_id, &mut ctx)
            .map_err(|e| Error::JitCompilation { reason: format!("Failed to define {name}: {e}") })?;
        module.clear_context(&mut ctx);

        module
            .finalize_definitions()
            .map_err(|e| Error::JitCompilation { reason: format!("Failed to finalize: {e}") })?;

        let func_ptr = module.get_finalized_function(func_id);
        tracing::trace!(kernel.name = %name, opt_level = ?self.opt_level, "Cranelift kernel compiled");

        Ok(Box::new(CraneliftKernel {
            module: Some(module),
            func_ptr,
            slot_count: params.slot_count(),
            name: name.to_string(),
        }))
    }

    fn name(&self) -> &str {
        "cranelift-jit"
    }
}

/// Cranelift JIT-compiled kernel.
pub struct CraneliftKernel {
    /// JIT module containing the compiled code.
    /// Must be kept alive for func_ptr to remain valid; freed on drop.
    module: Option<JITModule>,

    /// Function pointer to the entry point.
    func_ptr: *const u8,

    /// Number of runtime-data slots the code reads.
    slot_count: usize,

    /// Kernel name.
    name: String,
}

// SAFETY: The JITModule owns the compiled code and the function pointer
// points into that code. As long as we keep the module alive, the pointer is valid.
// The generated code keeps no state between calls.
unsafe impl Send for CraneliftKernel {}
unsafe impl Sync for CraneliftKernel {}

impl CompiledKernel for CraneliftKernel {
    unsafe fn invoke(&self, rt_data: &[*const u8], slice_start: usize, slice_len: usize) -> Result<()> {
        if rt_data.len() < self.slot_count {
            return Err(Error::Execution {
                reason: format!("{} expects {} runtime-data slots, got {}", self.name, self.slot_count, rt_data.len()),
            });
        }

        // SAFETY: func_ptr was produced by finalizing a function with this signature.
        let func: LayernormBaFn = unsafe { std::mem::transmute(self.func_ptr) };
        let status = unsafe { func(rt_data.as_ptr(), slice_start as i64, slice_len as i64) };

        match KernelStatus::from_repr(status) {
            Some(KernelStatus::Ok) => Ok(()),
            Some(status) => Err(Error::Execution { reason: format!("{} returned {status}", self.name) }),
            None => Err(Error::Execution { reason: format!("{} returned unknown status {status}", self.name) }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CraneliftKernel {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: func_ptr is only reachable through self, which is being dropped.
            unsafe { module.free_memory() };
        }
    }
}
