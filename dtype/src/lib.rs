//! Element data types understood by normjit kernels.
//!
//! Tags follow the short names used by operator descriptions (`fp32`, `bf16`,
//! `s8`, ...) and parse from them through [`std::str::FromStr`].

#[cfg(any(test, feature = "proptest"))]
pub mod proptest_gen;

/// Scalar element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter, strum::EnumCount, strum::IntoStaticStr)]
pub enum DType {
    #[strum(serialize = "s8")]
    Int8,
    #[strum(serialize = "u8")]
    UInt8,
    #[strum(serialize = "s32")]
    Int32,
    #[strum(serialize = "fp16")]
    Float16,
    #[strum(serialize = "bf16")]
    BFloat16,
    #[strum(serialize = "fp32")]
    Float32,
    #[strum(serialize = "fp64")]
    Float64,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    pub const fn is_int(&self) -> bool {
        !self.is_float()
    }

    pub const fn is_signed(&self) -> bool {
        !matches!(self, Self::UInt8)
    }

    /// Short descriptor name (`fp32`, `bf16`, ...).
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
