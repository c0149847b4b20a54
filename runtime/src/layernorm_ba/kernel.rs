//! Layernorm-ba kernel: per-thread compiled instances and parallel dispatch.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use snafu::ResultExt;
use tracing::{debug, trace, warn};

use normjit_codegen::RtSlot;

use super::LayernormBaKd;
use crate::config::{RuntimeConfig, ThreadCountProvider};
use crate::cranelift::CraneliftBackend;
use crate::error::{CompilationFailedSnafu, ThreadPoolSnafu};
use crate::kernel::{CompiledKernel, JitBackend, Kernel};
use crate::partition::{BatchSlice, effective_threads, partition};
use crate::{Error, Result};

/// One worker's share of a kernel: its compiled instance and the batch
/// positions it owns.
pub struct ThreadUnit {
    pub slice: BatchSlice,
    pub kernel: Box<dyn CompiledKernel>,
}

impl fmt::Debug for ThreadUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadUnit").field("slice", &self.slice).field("kernel", &self.kernel.name()).finish()
    }
}

/// Executable layernorm-ba kernel built from a shared [`LayernormBaKd`].
///
/// Holds one [`ThreadUnit`] per worker and, when more than one worker is
/// used, a fixed rayon pool of that size. Concurrent `execute` calls on the
/// same kernel are serialized.
pub struct LayernormBaKernel {
    // Fields drop in order: compiled instances go before the descriptor
    // whose constant buffers they address.
    units: Vec<ThreadUnit>,
    pool: Option<rayon::ThreadPool>,
    exec_lock: Mutex<()>,
    kd: Arc<LayernormBaKd>,
}

impl LayernormBaKernel {
    /// Compile one instance per worker thread.
    ///
    /// The thread count is `threads.available_parallelism()` capped by the
    /// batch extent. If any instance fails to compile, the instances already
    /// built are dropped and the whole build fails.
    pub fn build(kd: Arc<LayernormBaKd>, backend: &dyn JitBackend, threads: &dyn ThreadCountProvider) -> Result<Self> {
        let requested = threads.available_parallelism();
        let nthr = effective_threads(requested, kd.group_count());
        let slices = partition(kd.group_count(), nthr);

        debug!(
            backend = backend.name(),
            threads.requested = requested,
            threads.effective = nthr,
            batch = kd.group_count(),
            "building layernorm_ba kernel"
        );

        let pool = if nthr > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(nthr)
                    .thread_name(|i| format!("normjit-worker-{i}"))
                    .build()
                    .context(ThreadPoolSnafu)?,
            )
        } else {
            None
        };

        let params = kd.params();
        let compile = |slice: BatchSlice| -> Result<ThreadUnit> {
            let name = format!("layernorm_ba_t{}", slice.thread);
            let kernel = backend.compile(&params, &name).context(CompilationFailedSnafu { thread: slice.thread })?;
            trace!(kernel.name = %name, slice.start = slice.start, slice.len = slice.len, "thread instance compiled");
            Ok(ThreadUnit { slice, kernel })
        };

        let units = match &pool {
            Some(pool) => pool.install(|| slices.into_par_iter().map(compile).collect::<Result<Vec<_>>>())?,
            None => slices.into_iter().map(compile).collect::<Result<Vec<_>>>()?,
        };

        Ok(Self { units, pool, exec_lock: Mutex::new(()), kd })
    }

    /// Build with the Cranelift backend and thread count taken from the
    /// environment.
    pub fn with_defaults(kd: Arc<LayernormBaKd>) -> Result<Self> {
        Self::build(kd, &CraneliftBackend::from_env(), &RuntimeConfig::from_env())
    }

    /// Number of worker threads.
    pub fn nthr(&self) -> usize {
        self.units.len()
    }

    pub fn slices(&self) -> Vec<BatchSlice> {
        self.units.iter().map(|u| u.slice).collect()
    }

    pub fn units(&self) -> &[ThreadUnit] {
        &self.units
    }

    pub fn descriptor(&self) -> &Arc<LayernormBaKd> {
        &self.kd
    }

    /// Run every thread instance once over `rt_data`.
    ///
    /// Fails with [`Error::ExecutionFault`] naming every faulted thread.
    /// Slices that completed keep their output; nothing is rolled back.
    ///
    /// # Safety
    ///
    /// `rt_data` must follow the [`RtSlot`] layout: `src` and `dst` point to
    /// buffers of the descriptor's shape and dtypes, `alpha`/`beta` to
    /// `group_size` f32 values when affine. No other writer may touch `dst`
    /// during the call.
    pub unsafe fn execute_checked(&self, rt_data: &[*const u8]) -> Result<()> {
        let _guard = self.exec_lock.lock();

        let slots = RtSlot::count(self.kd.is_affine());
        if rt_data.len() < slots {
            return Err(Error::Execution {
                reason: format!("expected {slots} runtime-data slots, got {}", rt_data.len()),
            });
        }

        trace!(threads = self.units.len(), slots = rt_data.len(), "executing layernorm_ba kernel");

        let mut faulted: Vec<usize> = match &self.pool {
            None => self.units.iter().filter_map(|unit| unsafe { run_unit(unit, rt_data) }).collect(),
            Some(pool) => {
                // *const u8 is not Sync, so &[*const u8] cannot cross into the
                // pool. usize has the same size and alignment.
                debug_assert_eq!(std::mem::size_of::<*const u8>(), std::mem::size_of::<usize>());
                let addrs: &[usize] = unsafe { std::mem::transmute::<&[*const u8], &[usize]>(rt_data) };
                let faulted = Mutex::new(Vec::new());

                pool.scope(|s| {
                    for unit in &self.units {
                        let faulted = &faulted;
                        s.spawn(move |_| {
                            let ptrs: &[*const u8] = unsafe { std::mem::transmute::<&[usize], &[*const u8]>(addrs) };
                            if let Some(thread) = unsafe { run_unit(unit, ptrs) } {
                                faulted.lock().push(thread);
                            }
                        });
                    }
                });

                faulted.into_inner()
            }
        };

        if faulted.is_empty() {
            return Ok(());
        }
        faulted.sort_unstable();
        Err(Error::ExecutionFault { faulted })
    }
}

/// Invoke one instance over its slice, returning its thread index on fault.
unsafe fn run_unit(unit: &ThreadUnit, rt_data: &[*const u8]) -> Option<usize> {
    match unsafe { unit.kernel.invoke(rt_data, unit.slice.start, unit.slice.len) } {
        Ok(()) => None,
        Err(e) => {
            warn!(
                thread = unit.slice.thread,
                kernel.name = unit.kernel.name(),
                slice.start = unit.slice.start,
                slice.len = unit.slice.len,
                error = %e,
                "thread instance faulted"
            );
            Some(unit.slice.thread)
        }
    }
}

impl Kernel for LayernormBaKernel {
    type Desc = LayernormBaKd;

    fn desc(&self) -> &Arc<LayernormBaKd> {
        &self.kd
    }

    unsafe fn execute(&self, rt_data: &[*const u8]) -> bool {
        match unsafe { self.execute_checked(rt_data) } {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "layernorm_ba execute failed");
                false
            }
        }
    }
}

impl fmt::Debug for LayernormBaKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayernormBaKernel")
            .field("nthr", &self.units.len())
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}
