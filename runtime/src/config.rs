//! Runtime configuration.
//!
//! # Environment Variables
//!
//! * `NORMJIT_THREADS` - Maximum worker thread count per kernel (default: available_parallelism)

use bon::bon;

/// Source of the desired execution parallelism.
///
/// Kernels never use more threads than their batch axis has positions, so
/// this is an upper bound rather than an exact count.
pub trait ThreadCountProvider {
    fn available_parallelism(&self) -> usize;
}

/// Get default thread count from system (used by Default and builder).
fn default_thread_count() -> usize {
    std::thread::available_parallelism().map(|p| p.get()).unwrap_or(8)
}

/// Execution configuration shared by kernel builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum thread count for a kernel. Set to 1 to disable threading.
    pub thread_count: usize,
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let thread_count = std::env::var("NORMJIT_THREADS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or_else(default_thread_count);
        Self { thread_count }
    }
}

#[bon]
impl RuntimeConfig {
    /// Create a runtime configuration with builder pattern.
    #[builder]
    pub fn new(#[builder(default = default_thread_count())] thread_count: usize) -> Self {
        Self { thread_count }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { thread_count: default_thread_count() }
    }
}

impl ThreadCountProvider for RuntimeConfig {
    fn available_parallelism(&self) -> usize {
        self.thread_count
    }
}
