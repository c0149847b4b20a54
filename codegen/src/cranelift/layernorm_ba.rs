//! Layernorm-ba lowering.
//!
//! Generated signature (target default calling convention):
//!
//! ```text
//! fn(rt_data: *const *const u8, start: i64, len: i64) -> i32
//! ```
//!
//! For every group `b` in `start..start + len` the function computes
//!
//! ```text
//! mean = sum(x) * one_div_n[b]
//! var  = sum((x - mean)^2) * one_div_n[b]
//! y    = (x - mean) * one[b] / sqrt(var + eps[b])
//! y    = y * alpha[k] + beta[k]            (affine only)
//! ```
//!
//! and stores `y` in the dst dtype. The return value is a [`KernelStatus`].

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{
    AbiParam, Function, InstBuilder, MemFlags, Signature, Type, UserFuncName, Value, types as cl_types,
};
use cranelift_codegen::isa::CallConv;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use normjit_dtype::DType;
use snafu::{OptionExt, ensure};

use super::helpers::{GroupWalk, NO_ARGS, RangeLoop};
use super::types::storage_type;
use crate::error::*;
use crate::params::{KernelStatus, LayernormBaParams, RtSlot};

const F32_SHIFT: i64 = 2;
const BF16_SHIFT: i64 = 1;

/// Lower `params` into a Cranelift function named `name`.
pub fn lower_layernorm_ba(
    params: &LayernormBaParams,
    name: &str,
    call_conv: CallConv,
    pointer_type: Type,
) -> Result<Function> {
    ensure!(pointer_type == cl_types::I64, UnsupportedTargetSnafu { pointer_bits: pointer_type.bits() });
    ensure!(params.src_dtype == DType::Float32, UnsupportedDTypeSnafu { role: "src", dtype: params.src_dtype });
    let dst_type =
        storage_type(params.dst_dtype).context(UnsupportedDTypeSnafu { role: "dst", dtype: params.dst_dtype })?;
    check_extents(params)?;

    let mut sig = Signature::new(call_conv);
    sig.params.push(AbiParam::new(cl_types::I64)); // rt_data
    sig.params.push(AbiParam::new(cl_types::I64)); // start
    sig.params.push(AbiParam::new(cl_types::I64)); // len
    sig.returns.push(AbiParam::new(cl_types::I32));

    let mut func = Function::with_name_signature(UserFuncName::testcase(name), sig);
    let mut func_ctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut func, &mut func_ctx);
        emit_body(&mut builder, params, dst_type);
        builder.seal_all_blocks();
        builder.finalize();
    }

    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(kernel.name = name, clif = %func.display(), "lowered layernorm_ba");
    }

    Ok(func)
}

fn check_extents(params: &LayernormBaParams) -> Result<()> {
    let split = &params.split;
    ensure!(
        split.outer > 0 && split.batch > 0 && split.inner > 0,
        InvalidParamsSnafu { reason: format!("empty extent in {split:?}") }
    );
    let numel = split
        .outer
        .checked_mul(split.batch)
        .and_then(|n| n.checked_mul(split.inner))
        .context(InvalidParamsSnafu { reason: format!("element count of {split:?} overflows") })?;
    // Byte offsets are formed as `elem << 2`.
    ensure!(numel <= (i64::MAX >> F32_SHIFT) as usize, ImmediateOverflowSnafu { what: "numel", value: numel });
    Ok(())
}

fn return_status(builder: &mut FunctionBuilder<'_>, status: KernelStatus) {
    let code = builder.ins().iconst(cl_types::I32, status as i64);
    builder.ins().return_(&[code]);
}

/// Address of f32 element `index` in the buffer at `base`.
fn f32_addr(builder: &mut FunctionBuilder<'_>, base: Value, index: Value) -> Value {
    let bytes = builder.ins().ishl_imm(index, F32_SHIFT);
    builder.ins().iadd(base, bytes)
}

fn load_f32(builder: &mut FunctionBuilder<'_>, base: Value, index: Value) -> Value {
    let addr = f32_addr(builder, base, index);
    builder.ins().load(cl_types::F32, MemFlags::trusted(), addr, 0)
}

fn emit_body(builder: &mut FunctionBuilder<'_>, params: &LayernormBaParams, dst_type: Type) {
    let split = params.split;

    let entry_block = builder.create_block();
    builder.append_block_params_for_function_params(entry_block);
    builder.switch_to_block(entry_block);
    builder.seal_block(entry_block);

    let rt_data = builder.block_params(entry_block)[0];
    let start = builder.block_params(entry_block)[1];
    let len = builder.block_params(entry_block)[2];

    // start + len must neither wrap nor run past the batch axis.
    let end = builder.ins().iadd(start, len);
    let no_wrap = builder.ins().icmp(IntCC::UnsignedLessThanOrEqual, start, end);
    let in_range = builder.ins().icmp_imm(IntCC::UnsignedLessThanOrEqual, end, split.batch as i64);
    let slice_ok = builder.ins().band(no_wrap, in_range);

    let load_block = builder.create_block();
    let out_of_bounds_block = builder.create_block();
    builder.ins().brif(slice_ok, load_block, NO_ARGS, out_of_bounds_block, NO_ARGS);

    builder.switch_to_block(out_of_bounds_block);
    builder.seal_block(out_of_bounds_block);
    return_status(builder, KernelStatus::SliceOutOfBounds);

    builder.switch_to_block(load_block);
    builder.seal_block(load_block);
    let slots: Vec<Value> = (0..params.slot_count())
        .map(|slot| builder.ins().load(cl_types::I64, MemFlags::trusted(), rt_data, (slot * 8) as i32))
        .collect();
    let mut any_null = builder.ins().icmp_imm(IntCC::Equal, slots[0], 0);
    for &ptr in &slots[1..] {
        let is_null = builder.ins().icmp_imm(IntCC::Equal, ptr, 0);
        any_null = builder.ins().bor(any_null, is_null);
    }

    let null_block = builder.create_block();
    let compute_block = builder.create_block();
    builder.ins().brif(any_null, null_block, NO_ARGS, compute_block, NO_ARGS);

    builder.switch_to_block(null_block);
    builder.seal_block(null_block);
    return_status(builder, KernelStatus::NullPointer);

    builder.switch_to_block(compute_block);
    builder.seal_block(compute_block);

    let src = slots[RtSlot::Src.index()];
    let dst = slots[RtSlot::Dst.index()];
    let affine = params.affine.then(|| (slots[RtSlot::Alpha.index()], slots[RtSlot::Beta.index()]));

    // Constant buffer addresses travel as immediates.
    let one_div_n_base = builder.ins().iconst(cl_types::I64, params.consts.one_div_n as i64);
    let eps_base = builder.ins().iconst(cl_types::I64, params.consts.eps as i64);
    let one_base = builder.ins().iconst(cl_types::I64, params.consts.one as i64);

    let groups = RangeLoop::begin(builder, start, end);
    let b = groups.index;
    let one_div_n = load_f32(builder, one_div_n_base, b);
    let eps = load_f32(builder, eps_base, b);
    let one = load_f32(builder, one_base, b);
    let zero = builder.ins().f32const(0.0);

    // Pass 1: mean.
    let sum = builder.declare_var(cl_types::F32);
    builder.def_var(sum, zero);
    let walk = GroupWalk::begin(builder, &split, b);
    let x = load_f32(builder, src, walk.elem);
    let acc = builder.use_var(sum);
    let acc = builder.ins().fadd(acc, x);
    builder.def_var(sum, acc);
    walk.end(builder);
    let total = builder.use_var(sum);
    let mean = builder.ins().fmul(total, one_div_n);

    // Pass 2: variance.
    let sq_sum = builder.declare_var(cl_types::F32);
    builder.def_var(sq_sum, zero);
    let walk = GroupWalk::begin(builder, &split, b);
    let x = load_f32(builder, src, walk.elem);
    let dev = builder.ins().fsub(x, mean);
    let sq = builder.ins().fmul(dev, dev);
    let acc = builder.use_var(sq_sum);
    let acc = builder.ins().fadd(acc, sq);
    builder.def_var(sq_sum, acc);
    walk.end(builder);
    let sq_total = builder.use_var(sq_sum);
    let var = builder.ins().fmul(sq_total, one_div_n);
    let var_eps = builder.ins().fadd(var, eps);
    let std_dev = builder.ins().sqrt(var_eps);
    let inv_std = builder.ins().fdiv(one, std_dev);

    // Pass 3: normalize and store.
    let walk = GroupWalk::begin(builder, &split, b);
    let x = load_f32(builder, src, walk.elem);
    let dev = builder.ins().fsub(x, mean);
    let mut y = builder.ins().fmul(dev, inv_std);
    if let Some((alpha, beta)) = affine {
        let scale = load_f32(builder, alpha, walk.pos);
        let shift = load_f32(builder, beta, walk.pos);
        y = builder.ins().fmul(y, scale);
        y = builder.ins().fadd(y, shift);
    }
    store_dst(builder, dst, walk.elem, y, dst_type);
    walk.end(builder);

    groups.end(builder);
    return_status(builder, KernelStatus::Ok);
}

fn store_dst(builder: &mut FunctionBuilder<'_>, dst: Value, elem: Value, y: Value, dst_type: Type) {
    if dst_type == cl_types::F32 {
        let addr = f32_addr(builder, dst, elem);
        builder.ins().store(MemFlags::trusted(), y, addr, 0);
        return;
    }

    // f32 -> bf16, round to nearest even: bits + 0x7fff + ((bits >> 16) & 1), keep high half.
    let bits = builder.ins().bitcast(cl_types::I32, MemFlags::new(), y);
    let lsb = builder.ins().ushr_imm(bits, 16);
    let lsb = builder.ins().band_imm(lsb, 1);
    let bias = builder.ins().iadd_imm(lsb, 0x7fff);
    let rounded = builder.ins().iadd(bits, bias);
    let high = builder.ins().ushr_imm(rounded, 16);
    let half = builder.ins().ireduce(cl_types::I16, high);
    let bytes = builder.ins().ishl_imm(elem, BF16_SHIFT);
    let addr = builder.ins().iadd(dst, bytes);
    builder.ins().store(MemFlags::trusted(), half, addr, 0);
}
