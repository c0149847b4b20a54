//! Error types for kernel construction and execution.

use snafu::Snafu;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while building or executing kernels.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operator shape does not decompose into a batch axis and non-empty groups.
    #[snafu(display("invalid shape: {source}"))]
    InvalidShape { source: normjit_ir::Error },

    /// Kind, dtype or attribute combination this kernel family cannot express.
    #[snafu(display("unsupported configuration: {reason}"))]
    UnsupportedConfig { reason: String },

    /// The JIT backend rejected the parameters for one thread instance.
    #[snafu(display("compilation failed for thread {thread}: {source}"))]
    CompilationFailed {
        thread: usize,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    /// One or more thread instances reported a fault during execution.
    #[snafu(display("execution fault in thread(s) {faulted:?}"))]
    ExecutionFault { faulted: Vec<usize> },

    /// Codegen error occurred.
    #[snafu(display("codegen error: {source}"))]
    Codegen { source: normjit_codegen::Error },

    /// JIT compilation failed.
    #[snafu(display("JIT compilation failed: {reason}"))]
    JitCompilation { reason: String },

    /// A compiled instance returned a non-success status.
    #[snafu(display("execution error: {reason}"))]
    Execution { reason: String },

    /// Worker pool could not be created.
    #[snafu(display("failed to build worker pool: {source}"))]
    ThreadPool { source: rayon::ThreadPoolBuildError },
}
