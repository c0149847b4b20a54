//! Cranelift type mappings.

use cranelift_codegen::ir::Type;
use cranelift_codegen::ir::types;
use normjit_dtype::DType;

/// Cranelift type used to load or store an element of `dtype` from memory.
///
/// BFloat16 has no native Cranelift type and travels as its raw `i16` bits.
/// Returns `None` for dtypes the generated kernels cannot touch.
pub fn storage_type(dtype: DType) -> Option<Type> {
    match dtype {
        DType::Float32 => Some(types::F32),
        DType::BFloat16 => Some(types::I16),
        _ => None,
    }
}
