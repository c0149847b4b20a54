//! Operator description consumed by kernel descriptors.

use std::collections::BTreeMap;

use bon::bon;

use crate::kind::{EngineKind, KernelKind, KernelProp};
use crate::tensor::{TensorDesc, TensorRole};

/// Epsilon used when an operator description carries no `epsilon` attribute.
pub const DEFAULT_EPSILON: f32 = 1e-5;

/// Well-known attribute names.
pub mod attr {
    /// Numerical-stability constant: one float, or one float per group
    /// separated by commas.
    pub const EPSILON: &str = "epsilon";
}

/// Description of one operator instance: kind, tensors, batch axis and
/// free-form string attributes.
///
/// Descriptions are plain values. They compare and hash structurally so equal
/// descriptions can share derived state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperatorDesc {
    kind: KernelKind,
    prop: KernelProp,
    engine: EngineKind,
    tensor_descs: Vec<TensorDesc>,
    batch_axis: usize,
    attrs: BTreeMap<String, String>,
}

#[bon]
impl OperatorDesc {
    /// Create an operator description with builder pattern.
    #[builder]
    pub fn new(
        kind: KernelKind,
        #[builder(default)] prop: KernelProp,
        #[builder(default)] engine: EngineKind,
        tensor_descs: Vec<TensorDesc>,
        batch_axis: usize,
        #[builder(default)] attrs: BTreeMap<String, String>,
    ) -> Self {
        Self { kind, prop, engine, tensor_descs, batch_axis, attrs }
    }
}

impl OperatorDesc {
    /// Return a copy with `name` set to `value`.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn prop(&self) -> KernelProp {
        self.prop
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn tensor_descs(&self) -> &[TensorDesc] {
        &self.tensor_descs
    }

    pub fn tensor(&self, role: TensorRole) -> Option<&TensorDesc> {
        self.tensor_descs.get(role.index())
    }

    pub fn batch_axis(&self) -> usize {
        self.batch_axis
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}
