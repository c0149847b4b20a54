//! Tensor descriptors.

use normjit_dtype::DType;

use crate::shape::{Shape, numel};

/// Shape and element type of one tensor argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    pub shape: Shape,
    pub dtype: DType,
}

impl TensorDesc {
    pub fn new(shape: impl Into<Shape>, dtype: DType) -> Self {
        Self { shape: shape.into(), dtype }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Element count, `None` on overflow.
    pub fn numel(&self) -> Option<usize> {
        numel(&self.shape)
    }
}

/// Position of a tensor in [`crate::OperatorDesc::tensor_descs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TensorRole {
    Src = 0,
    Dst = 1,
    /// Per-element scale applied after normalization.
    Alpha = 2,
    /// Per-element shift applied after scaling.
    Beta = 3,
}

impl TensorRole {
    pub const fn index(self) -> usize {
        self as usize
    }
}
