//! Normalization along a batch axis.
//!
//! [`LayernormBaKd`] validates an operator description and owns the per-group
//! constants; [`LayernormBaKernel`] compiles one instance per worker thread
//! against those constants and runs them over disjoint batch slices.

mod desc;
mod kernel;

pub use desc::{EpsilonPolicy, LayernormBaKd};
pub use kernel::{LayernormBaKernel, ThreadUnit};

#[cfg(test)]
pub(crate) use desc::reciprocal_count;
