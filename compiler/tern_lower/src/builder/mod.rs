//! Basic-block builder.
//!
//! [`IrBuilder`] owns the blocks, variables and insertion point of one
//! function while it is being lowered, and is consumed by
//! [`finish`](IrBuilder::finish) to produce a [`Function`].
//!
//! # Insertion point
//!
//! The insertion point is the open block that receives new instructions.
//! Every `terminate_*` call clears it: once a block ends in a return, jump,
//! branch or `unreachable`, there is nowhere to emit until the caller
//! positions the builder at another block. Callers test
//! [`has_insertion_point`](IrBuilder::has_insertion_point) to learn whether
//! control can still fall through to the current position.
//!
//! Emitting with no insertion point opens a detached block so the
//! instruction has somewhere to go. Such blocks are recorded in
//! [`detached_blocks`](IrBuilder::detached_blocks) and the function that
//! produced them is rejected when it closes.

use tern_ast::Name;
use tern_ir::{
    Block, BlockId, Constant, FnType, Function, Instr, IrType, Literal, Terminator, Value, VarId,
};

/// In-progress basic block.
struct BlockBuilder {
    id: BlockId,
    params: Vec<(VarId, IrType)>,
    body: Vec<Instr>,
    terminator: Option<Terminator>,
}

impl BlockBuilder {
    fn new(id: BlockId) -> Self {
        Self {
            id,
            params: Vec::new(),
            body: Vec::new(),
            terminator: None,
        }
    }
}

/// Builder for a single function body.
///
/// Follows the "position at a block, emit instructions, terminate" pattern
/// of LLVM's `IRBuilder`, with block parameters in place of phi nodes.
pub struct IrBuilder {
    blocks: Vec<BlockBuilder>,
    insertion: Option<BlockId>,
    var_types: Vec<IrType>,
    /// Blocks opened by emitting with no insertion point.
    detached: Vec<BlockId>,
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IrBuilder {
    /// Create a builder positioned at a fresh entry block.
    pub fn new() -> Self {
        Self {
            blocks: vec![BlockBuilder::new(BlockId::new(0))],
            insertion: Some(BlockId::new(0)),
            var_types: Vec::new(),
            detached: Vec::new(),
        }
    }

    // Block management

    /// Allocate a new empty block and return its ID.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "block indices never exceed u32"
    )]
    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BlockBuilder::new(id));
        id
    }

    /// Make `block` the insertion point.
    pub fn position_at(&mut self, block: BlockId) {
        debug_assert!(
            block.index() < self.blocks.len(),
            "BlockId {} out of bounds (have {} blocks)",
            block.raw(),
            self.blocks.len(),
        );
        debug_assert!(
            self.blocks[block.index()].terminator.is_none(),
            "positioned at terminated block {}",
            block.raw()
        );
        self.insertion = Some(block);
    }

    /// The block receiving new instructions, if control can reach here.
    #[inline]
    pub fn insertion_point(&self) -> Option<BlockId> {
        self.insertion
    }

    #[inline]
    pub fn has_insertion_point(&self) -> bool {
        self.insertion.is_some()
    }

    /// Blocks opened because code was emitted after a terminator.
    pub fn detached_blocks(&self) -> &[BlockId] {
        &self.detached
    }

    /// Get the entry block (always block 0).
    #[inline]
    pub fn entry_block(&self) -> BlockId {
        BlockId::new(0)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `block` already has a terminator.
    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.blocks
            .get(block.index())
            .is_some_and(|bb| bb.terminator.is_some())
    }

    /// Instructions emitted into `block` so far.
    pub fn block_body(&self, block: BlockId) -> &[Instr] {
        self.blocks
            .get(block.index())
            .map_or(&[], |bb| bb.body.as_slice())
    }

    /// Terminator of `block`, if it has one.
    pub fn block_terminator(&self, block: BlockId) -> Option<&Terminator> {
        self.blocks
            .get(block.index())
            .and_then(|bb| bb.terminator.as_ref())
    }

    // Variable allocation

    /// Allocate a fresh variable with the given type.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "variable indices never exceed u32"
    )]
    pub fn fresh_var(&mut self, ty: IrType) -> VarId {
        let id = VarId::new(self.var_types.len() as u32);
        self.var_types.push(ty);
        id
    }

    /// Add a block parameter and return the variable bound to it.
    pub fn add_block_param(&mut self, block: BlockId, ty: IrType) -> VarId {
        let var = self.fresh_var(ty.clone());
        self.blocks[block.index()].params.push((var, ty));
        var
    }

    pub fn var_type(&self, var: VarId) -> Option<&IrType> {
        self.var_types.get(var.index())
    }

    // Instruction emission

    /// The open block at the insertion point.
    ///
    /// Emitting with no insertion point is a lowering bug. The instruction
    /// goes into a fresh block with no predecessors so the function stays
    /// well formed.
    fn current(&mut self) -> &mut BlockBuilder {
        let block = match self.insertion {
            Some(block) => block,
            None => {
                tracing::warn!("emitting without an insertion point; opening a detached block");
                let block = self.new_block();
                self.insertion = Some(block);
                self.detached.push(block);
                block
            }
        };
        &mut self.blocks[block.index()]
    }

    fn push(&mut self, instr: Instr) {
        self.current().body.push(instr);
    }

    /// Emit a `Let` instruction binding a value to a fresh variable.
    pub fn emit_let(&mut self, ty: IrType, value: Value) -> VarId {
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::Let { dst, ty, value });
        dst
    }

    pub fn emit_literal(&mut self, lit: Literal) -> VarId {
        self.emit_let(lit.ty(), Value::Literal(lit))
    }

    /// Emit the unit value `()`.
    pub fn emit_unit(&mut self) -> VarId {
        self.emit_literal(Literal::Unit)
    }

    /// Emit a direct call.
    pub fn emit_apply(&mut self, ty: IrType, func: Constant, args: Vec<VarId>) -> VarId {
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::Apply {
            dst,
            ty,
            func,
            args,
        });
        dst
    }

    /// Emit a call through a function value.
    pub fn emit_apply_indirect(&mut self, ty: IrType, callee: VarId, args: Vec<VarId>) -> VarId {
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::ApplyIndirect {
            dst,
            ty,
            callee,
            args,
        });
        dst
    }

    pub fn emit_function_ref(&mut self, sig: FnType, func: Constant) -> VarId {
        let ty = IrType::Func(Box::new(sig));
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::FunctionRef { dst, ty, func });
        dst
    }

    pub fn emit_alloc(&mut self, ty: IrType) -> VarId {
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::Alloc { dst, ty });
        dst
    }

    /// Emit a field read.
    pub fn emit_project(&mut self, ty: IrType, value: VarId, field: u32) -> VarId {
        let dst = self.fresh_var(ty.clone());
        self.push(Instr::Project {
            dst,
            ty,
            value,
            field,
        });
        dst
    }

    pub fn emit_set(&mut self, base: VarId, field: u32, value: VarId) {
        self.push(Instr::Set { base, field, value });
    }

    pub fn emit_retain(&mut self, var: VarId) {
        self.push(Instr::Retain { var });
    }

    pub fn emit_release(&mut self, var: VarId) {
        self.push(Instr::Release { var });
    }

    // Terminators

    fn terminate(&mut self, terminator: Terminator) {
        let block = self.current();
        debug_assert!(
            block.terminator.is_none(),
            "block {} already terminated",
            block.id.raw()
        );
        block.terminator = Some(terminator);
        self.insertion = None;
    }

    /// Terminate with `Return`.
    pub fn terminate_return(&mut self, value: VarId) {
        self.terminate(Terminator::Return { value });
    }

    /// Terminate with unconditional `Jump`.
    pub fn terminate_jump(&mut self, target: BlockId, args: Vec<VarId>) {
        self.terminate(Terminator::Jump { target, args });
    }

    /// Terminate with conditional `Branch`.
    pub fn terminate_branch(&mut self, cond: VarId, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
    }

    /// Terminate with `Unreachable`.
    pub fn terminate_unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    // Finalization

    /// Consume the builder and produce a [`Function`].
    ///
    /// Open blocks are kept open; the verifier reports them.
    pub fn finish(self, name: Name, sig: FnType, params: Vec<VarId>) -> Function {
        let entry = self.entry_block();
        let blocks = self
            .blocks
            .into_iter()
            .map(|bb| Block {
                id: bb.id,
                params: bb.params,
                body: bb.body,
                terminator: bb.terminator,
            })
            .collect();

        Function {
            name,
            sig,
            params,
            blocks,
            entry,
            var_types: self.var_types,
        }
    }
}
