//! Kernel benchmarking.
//!
//! Times repeated `execute` calls of a built kernel, e.g. to compare thread
//! counts or opt levels for one descriptor.

use std::time::{Duration, Instant};

use crate::kernel::Kernel;
use crate::{Error, Result};

/// Configuration for kernel benchmarking.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of warmup runs (not timed).
    pub warmup_runs: usize,
    /// Number of timing runs.
    pub timing_runs: usize,
    /// Whether to return minimum time (true) or mean (false).
    pub take_minimum: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self { warmup_runs: 1, timing_runs: 3, take_minimum: true }
    }
}

/// Result of kernel benchmarking.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub min: Duration,
    pub mean: Duration,
    /// All timing measurements.
    pub runs: Vec<Duration>,
}

impl BenchmarkResult {
    /// Get the timing value based on config preference.
    pub fn timing(&self, take_minimum: bool) -> Duration {
        if take_minimum { self.min } else { self.mean }
    }
}

unsafe fn run_once(kernel: &impl Kernel, rt_data: &[*const u8]) -> Result<()> {
    if unsafe { kernel.execute(rt_data) } { Ok(()) } else { Err(Error::ExecutionFault { faulted: Vec::new() }) }
}

fn summarize(runs: Vec<Duration>) -> BenchmarkResult {
    let min = runs.iter().copied().min().unwrap_or(Duration::ZERO);
    let total: Duration = runs.iter().sum();
    let mean = total / runs.len().max(1) as u32;
    BenchmarkResult { min, mean, runs }
}

/// Benchmark a kernel's execution time.
///
/// Runs warmup iterations (discarded), then timing iterations. An execute
/// that reports failure aborts the benchmark with [`Error::ExecutionFault`];
/// per-thread attribution is in the kernel's own `warn!` output.
///
/// # Safety
///
/// `rt_data` must satisfy the kernel's runtime-data contract for every run.
///
/// # Example
///
/// ```ignore
/// let result = unsafe { benchmark_kernel(&kernel, &rt_data, &BenchmarkConfig::default())? };
/// println!("Min time: {:?}", result.min);
/// ```
pub unsafe fn benchmark_kernel(
    kernel: &impl Kernel,
    rt_data: &[*const u8],
    config: &BenchmarkConfig,
) -> Result<BenchmarkResult> {
    for _ in 0..config.warmup_runs {
        unsafe { run_once(kernel, rt_data)? };
    }

    let mut runs = Vec::with_capacity(config.timing_runs);
    for _ in 0..config.timing_runs {
        let start = Instant::now();
        unsafe { run_once(kernel, rt_data)? };
        runs.push(start.elapsed());
    }

    Ok(summarize(runs))
}

/// Benchmark with early stopping once the first timed run exceeds three
/// times `cutoff`.
///
/// # Safety
///
/// Same safety requirements as `benchmark_kernel`.
pub unsafe fn benchmark_kernel_with_cutoff(
    kernel: &impl Kernel,
    rt_data: &[*const u8],
    config: &BenchmarkConfig,
    cutoff: Duration,
) -> Result<Option<BenchmarkResult>> {
    for _ in 0..config.warmup_runs {
        unsafe { run_once(kernel, rt_data)? };
    }

    let start = Instant::now();
    unsafe { run_once(kernel, rt_data)? };
    let first = start.elapsed();

    if first > cutoff * 3 {
        return Ok(None);
    }

    let mut runs = vec![first];
    for _ in 1..config.timing_runs {
        let start = Instant::now();
        unsafe { run_once(kernel, rt_data)? };
        runs.push(start.elapsed());
    }

    Ok(Some(summarize(runs)))
}
