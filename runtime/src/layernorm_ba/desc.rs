//! Layernorm-ba kernel descriptor: validation and per-group constants.

use normjit_codegen::{ConstAddrs, LayernormBaParams};
use normjit_dtype::DType;
use normjit_ir::{
    AxisSplit, DEFAULT_EPSILON, EngineKind, KernelKind, KernelProp, OperatorDesc, Shape, TensorRole, attr,
    error::ShapeMismatchSnafu,
};
use snafu::{ResultExt, ensure};

use crate::error::{InvalidShapeSnafu, UnsupportedConfigSnafu};
use crate::kernel::KernelDesc;
use crate::Result;

/// How the `epsilon` attribute was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsilonPolicy {
    /// Attribute absent, [`DEFAULT_EPSILON`] everywhere.
    Default,
    /// One value for every group.
    Uniform,
    /// One value per group.
    PerGroup,
}

/// Immutable descriptor of one layernorm-ba configuration.
///
/// Holds the operator description and three constant buffers with one `f32`
/// per group. Compiled kernels read the buffers through their raw addresses,
/// so a descriptor is shared behind an `Arc` and outlives every kernel built
/// from it.
#[derive(Debug)]
pub struct LayernormBaKd {
    op_desc: OperatorDesc,
    split: AxisSplit,
    dst_dtype: DType,
    affine: bool,
    epsilon_policy: EpsilonPolicy,
    one_div_n: Box<[f32]>,
    eps: Box<[f32]>,
    one: Box<[f32]>,
}

impl LayernormBaKd {
    /// Validate `op_desc` and derive the per-group constants.
    ///
    /// Nothing is allocated until every check has passed.
    pub fn build(op_desc: &OperatorDesc) -> Result<Self> {
        ensure!(
            op_desc.kind() == KernelKind::LayernormBa,
            UnsupportedConfigSnafu { reason: format!("kernel kind {} is not layernorm_ba", op_desc.kind()) }
        );
        ensure!(
            op_desc.prop() == KernelProp::ForwardInference && op_desc.engine() == EngineKind::Cpu,
            UnsupportedConfigSnafu {
                reason: format!("{}/{} is not supported, only forward_inference/cpu", op_desc.prop(), op_desc.engine())
            }
        );

        let tensors = op_desc.tensor_descs();
        ensure!(
            matches!(tensors.len(), 2 | 4),
            UnsupportedConfigSnafu { reason: format!("expected 2 or 4 tensor descriptors, got {}", tensors.len()) }
        );
        let affine = tensors.len() == 4;

        let src = &tensors[TensorRole::Src.index()];
        let dst = &tensors[TensorRole::Dst.index()];
        let split = AxisSplit::new(&src.shape, op_desc.batch_axis()).context(InvalidShapeSnafu)?;
        if dst.shape != src.shape {
            return ShapeMismatchSnafu { expected: src.shape.clone(), actual: dst.shape.clone() }
                .fail()
                .context(InvalidShapeSnafu);
        }

        ensure!(
            src.dtype == DType::Float32,
            UnsupportedConfigSnafu { reason: format!("src dtype {} is not supported", src.dtype) }
        );
        ensure!(
            matches!(dst.dtype, DType::Float32 | DType::BFloat16),
            UnsupportedConfigSnafu { reason: format!("dst dtype {} is not supported", dst.dtype) }
        );

        if affine {
            for role in [TensorRole::Alpha, TensorRole::Beta] {
                let t = &tensors[role.index()];
                if t.numel() != Some(split.group_size()) {
                    let expected = Shape::from_slice(&[split.group_size()]);
                    return ShapeMismatchSnafu { expected, actual: t.shape.clone() }.fail().context(InvalidShapeSnafu);
                }
                ensure!(
                    t.dtype == DType::Float32,
                    UnsupportedConfigSnafu { reason: format!("{role} dtype {} is not supported", t.dtype) }
                );
            }
        }

        let (epsilon_policy, eps) = parse_epsilon(op_desc.attr(attr::EPSILON), split.group_count())?;

        let groups = split.group_count();
        let rc = reciprocal_count(split.group_size());
        let kd = Self {
            op_desc: op_desc.clone(),
            split,
            dst_dtype: dst.dtype,
            affine,
            epsilon_policy,
            one_div_n: vec![rc; groups].into_boxed_slice(),
            eps,
            one: vec![1.0; groups].into_boxed_slice(),
        };

        tracing::debug!(
            groups,
            group.size = split.group_size(),
            epsilon = ?epsilon_policy,
            affine,
            dst.dtype = %kd.dst_dtype,
            "layernorm_ba descriptor built"
        );
        Ok(kd)
    }

    /// Parameter template shared by every thread instance.
    pub fn params(&self) -> LayernormBaParams {
        LayernormBaParams {
            split: self.split,
            src_dtype: DType::Float32,
            dst_dtype: self.dst_dtype,
            affine: self.affine,
            consts: ConstAddrs {
                one_div_n: self.one_div_n.as_ptr() as usize,
                eps: self.eps.as_ptr() as usize,
                one: self.one.as_ptr() as usize,
            },
        }
    }

    pub fn split(&self) -> AxisSplit {
        self.split
    }

    pub fn group_count(&self) -> usize {
        self.split.group_count()
    }

    pub fn group_size(&self) -> usize {
        self.split.group_size()
    }

    pub fn is_affine(&self) -> bool {
        self.affine
    }

    pub fn dst_dtype(&self) -> DType {
        self.dst_dtype
    }

    pub fn epsilon_policy(&self) -> EpsilonPolicy {
        self.epsilon_policy
    }

    /// `1 / group_size` per group.
    pub fn one_div_n(&self) -> &[f32] {
        &self.one_div_n
    }

    pub fn eps(&self) -> &[f32] {
        &self.eps
    }

    pub fn one(&self) -> &[f32] {
        &self.one
    }

    pub fn one_div_n_ptr(&self) -> *const f32 {
        self.one_div_n.as_ptr()
    }

    pub fn eps_ptr(&self) -> *const f32 {
        self.eps.as_ptr()
    }

    pub fn one_ptr(&self) -> *const f32 {
        self.one.as_ptr()
    }
}

impl KernelDesc for LayernormBaKd {
    fn kernel_kind(&self) -> KernelKind {
        KernelKind::LayernormBa
    }

    fn operator_desc(&self) -> &OperatorDesc {
        &self.op_desc
    }
}

/// `1 / n` rounded once from double precision.
pub(crate) fn reciprocal_count(n: usize) -> f32 {
    (1.0f64 / n as f64) as f32
}

fn parse_epsilon(raw: Option<&str>, groups: usize) -> Result<(EpsilonPolicy, Box<[f32]>)> {
    let Some(raw) = raw else {
        return Ok((EpsilonPolicy::Default, vec![DEFAULT_EPSILON; groups].into_boxed_slice()));
    };

    let values = raw
        .split(',')
        .map(|s| {
            let s = s.trim();
            s.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| crate::Error::UnsupportedConfig { reason: format!("invalid epsilon value {s:?}") })
        })
        .collect::<Result<Vec<f32>>>()?;

    match values.as_slice() {
        [v] => Ok((EpsilonPolicy::Uniform, vec![*v; groups].into_boxed_slice())),
        _ if values.len() == groups => Ok((EpsilonPolicy::PerGroup, values.into_boxed_slice())),
        _ => UnsupportedConfigSnafu {
            reason: format!("epsilon has {} values, expected 1 or {groups}", values.len()),
        }
        .fail(),
    }
}
