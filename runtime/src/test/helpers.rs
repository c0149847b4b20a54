//! Test utilities for runtime tests.
//!
//! Operator-description builders, a scalar reference implementation, bf16
//! conversion and a mock JIT backend with fault injection.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use normjit_codegen::LayernormBaParams;
use normjit_dtype::DType;
use normjit_ir::{AxisSplit, KernelKind, OperatorDesc, TensorDesc};
use parking_lot::Mutex;

use crate::config::ThreadCountProvider;
use crate::kernel::{CompiledKernel, JitBackend};
use crate::layernorm_ba::LayernormBaKd;
use crate::{Error, Result};

/// Thread-count provider returning a fixed value.
pub struct FixedThreads(pub usize);

impl ThreadCountProvider for FixedThreads {
    fn available_parallelism(&self) -> usize {
        self.0
    }
}

/// Layernorm-ba description with f32 src, `dst` output and optional alpha/beta.
pub fn layernorm_desc(shape: &[usize], batch_axis: usize, dst: DType, affine: bool) -> OperatorDesc {
    let mut tensors = vec![TensorDesc::new(shape, DType::Float32), TensorDesc::new(shape, dst)];
    if affine {
        let group_size = AxisSplit::new(shape, batch_axis).map(|s| s.group_size()).unwrap_or(1);
        tensors.push(TensorDesc::new(vec![group_size], DType::Float32));
        tensors.push(TensorDesc::new(vec![group_size], DType::Float32));
    }
    OperatorDesc::builder().kind(KernelKind::LayernormBa).tensor_descs(tensors).batch_axis(batch_axis).build()
}

/// Deterministic, non-constant input data.
pub fn sample_input(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.37).sin() * 3.0 + (i % 7) as f32 * 0.25).collect()
}

/// Scalar layernorm-ba with the same operation order as the generated code.
pub fn reference_layernorm(
    src: &[f32],
    split: &AxisSplit,
    eps: &[f32],
    affine: Option<(&[f32], &[f32])>,
) -> Vec<f32> {
    let n = split.group_size();
    let rc = (1.0f64 / n as f64) as f32;
    let mut out = vec![0.0f32; src.len()];
    for b in 0..split.batch {
        let mut sum = 0.0f32;
        for k in 0..n {
            sum += src[split.offset(b, k)];
        }
        let mean = sum * rc;
        let mut sq_sum = 0.0f32;
        for k in 0..n {
            let d = src[split.offset(b, k)] - mean;
            sq_sum += d * d;
        }
        let inv_std = 1.0 / (sq_sum * rc + eps[b]).sqrt();
        for k in 0..n {
            let mut y = (src[split.offset(b, k)] - mean) * inv_std;
            if let Some((alpha, beta)) = affine {
                y = y * alpha[k] + beta[k];
            }
            out[split.offset(b, k)] = y;
        }
    }
    out
}

/// f32 to bf16 bits, round to nearest even.
pub fn f32_to_bf16(x: f32) -> u16 {
    let bits = x.to_bits();
    let bias = 0x7fff + ((bits >> 16) & 1);
    (bits.wrapping_add(bias) >> 16) as u16
}

pub fn bf16_to_f32(x: u16) -> f32 {
    f32::from_bits((x as u32) << 16)
}

pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tol, "element {i}: got {a}, expected {e}");
    }
}

/// Runtime-data array for plain or affine kernels.
pub fn rt_data(src: &[f32], dst: *mut u8, affine: Option<(&[f32], &[f32])>) -> Vec<*const u8> {
    let mut data = vec![src.as_ptr().cast::<u8>(), dst.cast_const()];
    if let Some((alpha, beta)) = affine {
        data.push(alpha.as_ptr().cast());
        data.push(beta.as_ptr().cast());
    }
    data
}

/// Shared observation state of a [`MockBackend`].
#[derive(Default)]
pub struct MockState {
    /// Compiled instances currently alive.
    pub live: AtomicUsize,
    pub compiled: AtomicUsize,
    /// `(thread, start, len)` of every invocation.
    pub invocations: Mutex<Vec<(usize, usize, usize)>>,
    /// Invocations running right now, across all instances.
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Invocations that found their own instance already running.
    pub reentered: AtomicUsize,
    /// Descriptor the instances were compiled against, if tracked.
    pub descriptor: Mutex<Option<Weak<LayernormBaKd>>>,
    /// Instances dropped after that descriptor was already gone.
    pub outlived_descriptor: AtomicUsize,
}

/// Backend whose instances record their invocations instead of running code.
#[derive(Default)]
pub struct MockBackend {
    pub state: Arc<MockState>,
    /// Thread whose compilation fails.
    pub fail_compile: Option<usize>,
    /// Threads whose instances report a fault.
    pub faulty: BTreeSet<usize>,
    /// Time each invocation takes.
    pub delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_compile(thread: usize) -> Self {
        Self { fail_compile: Some(thread), ..Self::default() }
    }

    pub fn faulting(threads: impl IntoIterator<Item = usize>) -> Self {
        Self { faulty: threads.into_iter().collect(), ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    /// Record `kd` so dropped instances can check it is still alive.
    pub fn track_descriptor(&self, kd: &Arc<LayernormBaKd>) {
        *self.state.descriptor.lock() = Some(Arc::downgrade(kd));
    }

    pub fn invocations(&self) -> Vec<(usize, usize, usize)> {
        let mut calls = self.state.invocations.lock().clone();
        calls.sort_unstable();
        calls
    }
}

fn thread_of(name: &str) -> usize {
    name.strip_prefix("layernorm_ba_t").and_then(|t| t.parse().ok()).unwrap_or(usize::MAX)
}

impl JitBackend for MockBackend {
    fn compile(&self, params: &LayernormBaParams, name: &str) -> Result<Box<dyn CompiledKernel>> {
        let thread = thread_of(name);
        if self.fail_compile == Some(thread) {
            return Err(Error::JitCompilation { reason: format!("injected failure for {name}") });
        }
        self.state.compiled.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockKernel {
            thread,
            name: name.to_string(),
            slot_count: params.slot_count(),
            faulty: self.faulty.contains(&thread),
            delay: self.delay,
            busy: AtomicBool::new(false),
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockKernel {
    thread: usize,
    name: String,
    slot_count: usize,
    faulty: bool,
    delay: Duration,
    busy: AtomicBool,
    state: Arc<MockState>,
}

impl CompiledKernel for MockKernel {
    unsafe fn invoke(&self, rt_data: &[*const u8], slice_start: usize, slice_len: usize) -> Result<()> {
        assert!(rt_data.len() >= self.slot_count);
        if self.busy.swap(true, Ordering::SeqCst) {
            self.state.reentered.fetch_add(1, Ordering::SeqCst);
        }
        let running = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);

        self.state.invocations.lock().push((self.thread, slice_start, slice_len));
        if self.faulty {
            return Err(Error::Execution { reason: format!("injected fault in {}", self.name) });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockKernel {
    fn drop(&mut self) {
        let tracked = self.state.descriptor.lock().clone();
        if tracked.is_some_and(|kd| kd.upgrade().is_none()) {
            self.state.outlived_descriptor.fetch_add(1, Ordering::SeqCst);
        }
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}
