//! Kernel family tags.

/// Kernel family an operator description asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum KernelKind {
    SparseMatmul,
    Eltwiseop,
    /// Normalization along a batch axis; each batch position is one group.
    LayernormBa,
    Softmax,
    Transpose,
}

/// Propagation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum KernelProp {
    #[default]
    ForwardInference,
    ForwardTraining,
}

/// Engine the kernel runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Cpu,
}
