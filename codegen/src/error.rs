//! Error types for code generation.

use normjit_dtype::DType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur during code generation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Element type cannot be loaded or stored for the given tensor role.
    #[snafu(display("dtype {dtype} is not supported for {role}"))]
    UnsupportedDType { role: &'static str, dtype: DType },

    /// Target pointer width other than 64 bits.
    #[snafu(display("unsupported target: {pointer_bits}-bit pointers"))]
    UnsupportedTarget { pointer_bits: u32 },

    /// Parameters that no descriptor would produce.
    #[snafu(display("invalid kernel parameters: {reason}"))]
    InvalidParams { reason: String },

    /// Extent does not fit in a 64-bit immediate.
    #[snafu(display("{what} = {value} does not fit in an i64 immediate"))]
    ImmediateOverflow { what: &'static str, value: usize },
}
