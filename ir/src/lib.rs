//! Structured operator descriptions for normjit kernels.
//!
//! This crate holds the validated-by-construction input a kernel descriptor
//! consumes: which operator is requested, the tensors it touches, the batch
//! axis and the free-form attributes.
//!
//! # Module Organization
//!
//! - [`kind`] - Kernel kind, propagation kind and engine tags
//! - [`tensor`] - Tensor descriptors (shape + dtype) and tensor roles
//! - [`operator`] - The operator description and its attributes
//! - [`shape`] - Shape utilities and the batch-axis decomposition
//! - [`error`] - Error types and result handling

pub mod error;
pub mod kind;
pub mod operator;
pub mod shape;
pub mod tensor;

pub use error::{Error, Result};
pub use kind::{EngineKind, KernelKind, KernelProp};
pub use operator::{DEFAULT_EPSILON, OperatorDesc, attr};
pub use shape::{AxisSplit, Shape};
pub use tensor::{TensorDesc, TensorRole};
