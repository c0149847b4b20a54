use snafu::Snafu;

use crate::shape::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Shape has no axis left to normalize over once the batch axis is removed.
    #[snafu(display("rank {rank} is too small: need a batch axis and at least one normalized axis"))]
    RankTooSmall { rank: usize },

    /// Batch axis index does not name an axis of the shape.
    #[snafu(display("batch axis {axis} is out of range for rank {rank}"))]
    BatchAxisOutOfRange { axis: usize, rank: usize },

    /// Some axis has zero extent, which leaves a group (or the batch) empty.
    #[snafu(display("axis {axis} of shape {shape:?} has zero extent"))]
    ZeroExtent { axis: usize, shape: Shape },

    /// Element count does not fit in the address space.
    #[snafu(display("element count of shape {shape:?} overflows"))]
    ShapeOverflow { shape: Shape },

    /// Two tensors that must agree in shape do not.
    #[snafu(display("shape mismatch: expected {expected:?}, got {actual:?}"))]
    ShapeMismatch { expected: Shape, actual: Shape },
}
