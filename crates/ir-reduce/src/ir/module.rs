// Arena-based program representation.
//
// Functions own their instructions and blocks in slot arenas indexed by
// stable handles; erasing a node leaves a `None` slot so every other handle
// stays valid. Predecessor lists are derived from terminator successor
// lists on demand rather than stored as back-pointers.

use super::instruction::{Inst, Operand, Ty, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A basic block: an ordered list of instruction handles. The last
/// instruction of a well-formed block is its only terminator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    insts: Vec<InstId>,
}

impl Block {
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    insts: Vec<Option<Inst>>,
    blocks: Vec<Option<Block>>,
    layout: Vec<BlockId>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Ty>, ret: Ty) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            insts: Vec::new(),
            blocks: Vec::new(),
            layout: Vec::new(),
        }
    }

    /// Append a new empty block to the layout and return its handle.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(Some(Block::default()));
        self.layout.push(id);
        id
    }

    /// The entry block, `layout[0]`. `None` only for a function with no body.
    pub fn entry(&self) -> Option<BlockId> {
        self.layout.first().copied()
    }

    pub fn layout(&self) -> &[BlockId] {
        &self.layout
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())?.as_ref()
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())?.as_mut()
    }

    pub fn inst(&self, id: InstId) -> Option<&Inst> {
        self.insts.get(id.index())?.as_ref()
    }

    pub fn inst_mut(&mut self, id: InstId) -> Option<&mut Inst> {
        self.insts.get_mut(id.index())?.as_mut()
    }

    /// Append an instruction to a block. Appending to an erased block leaves
    /// the instruction unplaced, which the verifier reports.
    pub fn push_inst(&mut self, block: BlockId, inst: Inst) -> InstId {
        let id = InstId(u32::try_from(self.insts.len()).unwrap_or(u32::MAX));
        self.insts.push(Some(inst));
        if let Some(b) = self.block_mut(block) {
            b.insts.push(id);
        }
        id
    }

    /// Replace an instruction in place, keeping its handle and block slot.
    pub fn replace_inst(&mut self, id: InstId, inst: Inst) {
        if let Some(slot) = self.insts.get_mut(id.index())
            && slot.is_some()
        {
            *slot = Some(inst);
        }
    }

    /// Erase an instruction from its block and from the arena.
    pub fn erase_inst(&mut self, id: InstId) {
        if let Some(slot) = self.insts.get_mut(id.index()) {
            *slot = None;
        }
        for block in self.blocks.iter_mut().flatten() {
            block.insts.retain(|i| *i != id);
        }
    }

    /// Erase a block, its instructions, and its layout entry.
    pub fn erase_block(&mut self, id: BlockId) {
        let Some(block) = self.blocks.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        for inst in block.insts {
            if let Some(slot) = self.insts.get_mut(inst.index()) {
                *slot = None;
            }
        }
        self.layout.retain(|b| *b != id);
    }

    /// Splice `block`'s instructions onto the end of `pred`, dropping
    /// `pred`'s terminator and erasing `block`. The caller must have checked
    /// that `pred` ends in an unconditional branch to `block`.
    pub fn merge_block_into(&mut self, pred: BlockId, block: BlockId) {
        let Some(moved) = self.blocks.get_mut(block.index()).and_then(Option::take) else {
            return;
        };
        self.layout.retain(|b| *b != block);
        let term = self.block_mut(pred).and_then(|b| b.insts.pop());
        if let Some(term) = term
            && let Some(slot) = self.insts.get_mut(term.index())
        {
            *slot = None;
        }
        if let Some(b) = self.block_mut(pred) {
            b.insts.extend(moved.insts);
        }
    }

    /// The block's terminator, if the block is live, non-empty, and ends in
    /// one.
    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        let id = *self.block(block)?.insts().last()?;
        if self.inst(id)?.is_terminator() {
            Some(id)
        } else {
            None
        }
    }

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        self.terminator(block)
            .and_then(|id| self.inst(id))
            .map(Inst::successors)
            .unwrap_or_default()
    }

    /// Predecessors of `target`, derived from terminator successor lists.
    /// Each predecessor block appears once, in layout order.
    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.layout
            .iter()
            .copied()
            .filter(|block| self.successors(*block).contains(&target))
            .collect()
    }

    /// Rewrite every use of `from` to `with`, across all live instructions.
    pub fn replace_all_uses(&mut self, from: ValueId, with: Operand) {
        for inst in self.insts.iter_mut().flatten() {
            for op in inst.operands_mut() {
                if *op == Operand::Value(from) {
                    *op = with;
                }
            }
        }
    }

    /// All live instruction handles, functions-blocks-instructions traversal
    /// order (blocks in layout order, instructions in block order).
    pub fn inst_ids(&self) -> Vec<InstId> {
        self.layout
            .iter()
            .filter_map(|block| self.block(*block))
            .flat_map(|block| block.insts().iter().copied())
            .collect()
    }

    pub fn num_insts(&self) -> usize {
        self.insts.iter().flatten().count()
    }

    pub fn num_blocks(&self) -> usize {
        self.layout.len()
    }

    pub fn value_ty(&self, value: ValueId) -> Option<Ty> {
        match value {
            ValueId::Param(i) => self.params.get(i as usize).copied(),
            ValueId::Inst(id) => self.inst(id).map(Inst::result_ty),
        }
    }

    /// Type of an operand, if statically known. Constants are untyped.
    pub fn operand_ty(&self, op: Operand) -> Option<Ty> {
        match op {
            Operand::Value(v) => self.value_ty(v),
            Operand::Const(_) => None,
            Operand::FuncAddr(_) => Some(Ty::I64),
        }
    }
}

/// A whole program: a slot arena of functions. `FuncId`s stay stable across
/// function erasure; the first live function is the entry point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    functions: Vec<Option<Function>>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_function(&mut self, func: Function) -> FuncId {
        let id = FuncId(u32::try_from(self.functions.len()).unwrap_or(u32::MAX));
        self.functions.push(Some(func));
        id
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())?.as_ref()
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.functions.get_mut(id.index())?.as_mut()
    }

    /// Replace a live function in place, keeping its handle.
    pub fn replace_function(&mut self, id: FuncId, func: Function) {
        if let Some(slot) = self.functions.get_mut(id.index())
            && slot.is_some()
        {
            *slot = Some(func);
        }
    }

    pub fn erase_function(&mut self, id: FuncId) {
        if let Some(slot) = self.functions.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// The entry function: the first live one.
    pub fn entry(&self) -> Option<FuncId> {
        self.func_ids().first().copied()
    }

    /// All live function handles, in module order.
    pub fn func_ids(&self) -> Vec<FuncId> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| FuncId(u32::try_from(i).unwrap_or(u32::MAX)))
            .collect()
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((FuncId(u32::try_from(i).ok()?), slot.as_ref()?)))
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions().find(|(_, f)| f.name == name).map(|(id, _)| id)
    }

    pub fn function_count(&self) -> usize {
        self.functions.iter().flatten().count()
    }

    pub fn block_count(&self) -> usize {
        self.functions.iter().flatten().map(Function::num_blocks).sum()
    }

    pub fn inst_count(&self) -> usize {
        self.functions.iter().flatten().map(Function::num_insts).sum()
    }
}
