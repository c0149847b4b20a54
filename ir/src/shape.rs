//! Shape utilities and the batch-axis decomposition.

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;

/// Row-major tensor extents.
pub type Shape = SmallVec<[usize; 4]>;

/// Product of all extents, `None` on overflow.
pub fn numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A row-major shape viewed as `[outer, batch, inner]` around its batch axis.
///
/// Every position along the batch axis is one normalization group. The group
/// for batch index `b` holds `outer * inner` elements, strided `batch * inner`
/// apart between outer rows and contiguous within an inner run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisSplit {
    /// Product of the extents before the batch axis.
    pub outer: usize,
    /// Extent of the batch axis (number of groups).
    pub batch: usize,
    /// Product of the extents after the batch axis.
    pub inner: usize,
}

impl AxisSplit {
    /// Decompose `shape` around `batch_axis`.
    ///
    /// Fails unless the shape has rank >= 2, the axis exists, no extent is
    /// zero and the element count fits in `usize`.
    pub fn new(shape: &[usize], batch_axis: usize) -> Result<Self> {
        let rank = shape.len();
        ensure!(rank >= 2, RankTooSmallSnafu { rank });
        ensure!(batch_axis < rank, BatchAxisOutOfRangeSnafu { axis: batch_axis, rank });
        if let Some(axis) = shape.iter().position(|&d| d == 0) {
            return ZeroExtentSnafu { axis, shape: Shape::from_slice(shape) }.fail();
        }
        numel(shape).context(ShapeOverflowSnafu { shape: Shape::from_slice(shape) })?;

        let outer = shape[..batch_axis].iter().product();
        let inner = shape[batch_axis + 1..].iter().product();
        Ok(Self { outer, batch: shape[batch_axis], inner })
    }

    /// Number of normalization groups.
    pub const fn group_count(&self) -> usize {
        self.batch
    }

    /// Number of elements in each normalization group.
    pub const fn group_size(&self) -> usize {
        self.outer * self.inner
    }

    pub const fn numel(&self) -> usize {
        self.outer * self.batch * self.inner
    }

    /// Flat offset of element `k` of group `b`.
    pub const fn offset(&self, b: usize, k: usize) -> usize {
        let o = k / self.inner;
        let i = k % self.inner;
        (o * self.batch + b) * self.inner + i
    }
}
