use std::sync::Arc;
use std::time::Duration;

use normjit_dtype::DType;

use crate::Error;
use crate::benchmark::{BenchmarkConfig, benchmark_kernel, benchmark_kernel_with_cutoff};
use crate::kernel::Kernel;
use crate::layernorm_ba::{LayernormBaKd, LayernormBaKernel};
use crate::test::helpers::{FixedThreads, MockBackend, layernorm_desc};

struct SleepKernel {
    kd: Arc<LayernormBaKd>,
    sleep_micros: u64,
    ok: bool,
}

impl SleepKernel {
    fn new(sleep_micros: u64, ok: bool) -> Self {
        let kd = LayernormBaKd::build(&layernorm_desc(&[4, 4], 0, DType::Float32, false)).unwrap();
        Self { kd: Arc::new(kd), sleep_micros, ok }
    }
}

impl Kernel for SleepKernel {
    type Desc = LayernormBaKd;

    fn desc(&self) -> &Arc<LayernormBaKd> {
        &self.kd
    }

    unsafe fn execute(&self, _rt_data: &[*const u8]) -> bool {
        std::thread::sleep(Duration::from_micros(self.sleep_micros));
        self.ok
    }
}

#[test]
fn test_benchmark_basic() {
    let kernel = SleepKernel::new(100, true);
    let config = BenchmarkConfig { warmup_runs: 1, timing_runs: 3, take_minimum: true };

    let result = unsafe { benchmark_kernel(&kernel, &[], &config) }.unwrap();

    assert_eq!(result.runs.len(), 3);
    assert!(result.min >= Duration::from_micros(100));
    assert!(result.min <= result.mean);
    assert_eq!(result.timing(true), result.min);
}

#[test]
fn test_benchmark_fault_aborts() {
    let kernel = SleepKernel::new(0, false);
    let result = unsafe { benchmark_kernel(&kernel, &[], &BenchmarkConfig::default()) };
    assert!(matches!(result, Err(Error::ExecutionFault { .. })));
}

#[test]
fn test_benchmark_with_cutoff_passes() {
    let kernel = SleepKernel::new(50, true);
    let result =
        unsafe { benchmark_kernel_with_cutoff(&kernel, &[], &BenchmarkConfig::default(), Duration::from_millis(1)) }
            .unwrap();
    assert!(result.is_some());
}

#[test]
fn test_benchmark_with_cutoff_fails() {
    let kernel = SleepKernel::new(10000, true);
    let result =
        unsafe { benchmark_kernel_with_cutoff(&kernel, &[], &BenchmarkConfig::default(), Duration::from_micros(100)) }
            .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_benchmark_built_kernel() {
    let kd = Arc::new(LayernormBaKd::build(&layernorm_desc(&[8, 4], 0, DType::Float32, false)).unwrap());
    let backend = MockBackend::new();
    let kernel = LayernormBaKernel::build(kd, &backend, &FixedThreads(2)).unwrap();
    let rt_data = [64 as *const u8, 128 as *const u8];

    let config = BenchmarkConfig { warmup_runs: 2, timing_runs: 4, take_minimum: false };
    let result = unsafe { benchmark_kernel(&kernel, &rt_data, &config) }.unwrap();
    assert_eq!(result.runs.len(), 4);
    // Two instances per execute, six executes.
    assert_eq!(backend.invocations().len(), 12);
}
