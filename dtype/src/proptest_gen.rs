use proptest::prelude::*;

use crate::DType;

#[rustfmt::skip]
impl DType {
    pub fn float_generator() -> impl Strategy<Value = Self> {
        prop_oneof![
            Just(DType::Float16), Just(DType::BFloat16),
            Just(DType::Float32), Just(DType::Float64)
        ]
    }

    pub fn any_generator() -> impl Strategy<Value = Self> {
        prop_oneof![
            Just(DType::Int8), Just(DType::UInt8), Just(DType::Int32),
            Just(DType::Float16), Just(DType::BFloat16),
            Just(DType::Float32), Just(DType::Float64)
        ]
    }
}
