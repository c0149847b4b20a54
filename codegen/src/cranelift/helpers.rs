//! Helper structures for Cranelift code generation.

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::instructions::BlockArg;
use cranelift_codegen::ir::{Block, InstBuilder, Value, types as cl_types};
use cranelift_frontend::FunctionBuilder;

use normjit_ir::AxisSplit;

pub(crate) const NO_ARGS: &[BlockArg] = &[];

/// Counted loop `for index in start..end` over i64 values.
///
/// `begin` leaves the builder positioned in the loop body; `end` closes the
/// back edge and leaves it in the exit block.
pub(crate) struct RangeLoop {
    header_block: Block,
    exit_block: Block,
    pub index: Value,
}

impl RangeLoop {
    pub fn begin(builder: &mut FunctionBuilder<'_>, start: Value, end: Value) -> Self {
        let header_block = builder.create_block();
        let body_block = builder.create_block();
        let exit_block = builder.create_block();

        builder.append_block_param(header_block, cl_types::I64);
        let start_arg: BlockArg = start.into();
        builder.ins().jump(header_block, &[start_arg]);

        builder.switch_to_block(header_block);
        let index = builder.block_params(header_block)[0];
        let cond = builder.ins().icmp(IntCC::UnsignedLessThan, index, end);
        builder.ins().brif(cond, body_block, NO_ARGS, exit_block, NO_ARGS);

        // Only predecessor is the header.
        builder.switch_to_block(body_block);
        builder.seal_block(body_block);

        Self { header_block, exit_block, index }
    }

    pub fn end(self, builder: &mut FunctionBuilder<'_>) {
        let next = builder.ins().iadd_imm(self.index, 1);
        let next_arg: BlockArg = next.into();
        builder.ins().jump(self.header_block, &[next_arg]);

        // Header predecessors: loop entry + back edge.
        builder.seal_block(self.header_block);

        builder.switch_to_block(self.exit_block);
        builder.seal_block(self.exit_block);
    }
}

/// Walk over every element of one normalization group.
///
/// Emits `for o in 0..outer { for i in 0..inner { .. } }` and exposes the flat
/// tensor offset of the current element (`elem`) and its position inside the
/// group (`pos`, the index into per-element alpha/beta).
pub(crate) struct GroupWalk {
    outer: RangeLoop,
    inner: RangeLoop,
    pub elem: Value,
    pub pos: Value,
}

impl GroupWalk {
    pub fn begin(builder: &mut FunctionBuilder<'_>, split: &AxisSplit, group: Value) -> Self {
        let zero = builder.ins().iconst(cl_types::I64, 0);
        let outer_end = builder.ins().iconst(cl_types::I64, split.outer as i64);
        let outer = RangeLoop::begin(builder, zero, outer_end);

        // (o * batch + b) * inner
        let row = builder.ins().imul_imm(outer.index, split.batch as i64);
        let row = builder.ins().iadd(row, group);
        let row = builder.ins().imul_imm(row, split.inner as i64);
        let pos_row = builder.ins().imul_imm(outer.index, split.inner as i64);

        let inner_end = builder.ins().iconst(cl_types::I64, split.inner as i64);
        let inner = RangeLoop::begin(builder, zero, inner_end);
        let elem = builder.ins().iadd(row, inner.index);
        let pos = builder.ins().iadd(pos_row, inner.index);

        Self { outer, inner, elem, pos }
    }

    pub fn end(self, builder: &mut FunctionBuilder<'_>) {
        self.inner.end(builder);
        self.outer.end(builder);
    }
}
