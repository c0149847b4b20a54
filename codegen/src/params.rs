//! Static parameters a kernel instance is compiled from.

use normjit_dtype::DType;
use normjit_ir::AxisSplit;

/// Role of each entry of the runtime-data array handed to a compiled
/// layernorm-ba kernel.
///
/// The layout is private to this crate and the runtime; it stays fixed for
/// every kernel built from one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum RtSlot {
    Src = 0,
    Dst = 1,
    Alpha = 2,
    Beta = 3,
}

impl RtSlot {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of runtime-data entries a kernel reads.
    pub const fn count(affine: bool) -> usize {
        if affine { 4 } else { 2 }
    }
}

/// Addresses of the constant buffers owned by a kernel descriptor.
///
/// Generated code loads from these addresses directly, so the buffers must
/// outlive every kernel compiled from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstAddrs {
    /// `1 / group_size`, one f32 per group.
    pub one_div_n: usize,
    /// Epsilon, one f32 per group.
    pub eps: usize,
    /// `1.0`, one f32 per group.
    pub one: usize,
}

/// Status word returned by generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum KernelStatus {
    Ok = 0,
    /// A required runtime-data pointer was null.
    NullPointer = 1,
    /// `start + len` ran past the batch axis.
    SliceOutOfBounds = 2,
}

/// Shape, dtype and constant addresses of one layernorm-ba kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayernormBaParams {
    pub split: AxisSplit,
    pub src_dtype: DType,
    pub dst_dtype: DType,
    /// Whether alpha/beta runtime slots are present.
    pub affine: bool,
    pub consts: ConstAddrs,
}

impl LayernormBaParams {
    pub const fn slot_count(&self) -> usize {
        RtSlot::count(self.affine)
    }
}
