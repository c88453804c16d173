/// IR instruction set: a small, self-contained representation of the
/// structural categories the reducer mutates.
///
/// Each variant covers one shape of instruction (binary arithmetic, address
/// computation, call, select, and the four terminators). The reducer matches
/// on these exhaustively; there is no open-ended dispatch.
use super::module::{BlockId, FuncId, InstId};

/// Value types. `Void` only appears as a call/function result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    I32,
    I64,
    Void,
}

impl Ty {
    pub fn is_void(self) -> bool {
        self == Ty::Void
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Ty::I32 | Ty::I64)
    }
}

/// A defined value: either a function parameter or an instruction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueId {
    Param(u32),
    Inst(InstId),
}

/// A non-owning reference to a value used by an instruction.
///
/// Block labels are not operands here: terminators carry their target
/// `BlockId`s directly, so label uses can never be zeroed by operand
/// reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(ValueId),
    Const(i64),
    FuncAddr(FuncId),
}

impl Operand {
    pub fn as_value(self) -> Option<ValueId> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Const(_) | Operand::FuncAddr(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    DivU,
    DivS,
    And,
    Or,
    Xor,
    Shl,
    ShrU,
    ShrS,
    Eq,
    Ne,
    LtU,
    LtS,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::DivU => "div_u",
            BinOp::DivS => "div_s",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::ShrU => "shr_u",
            BinOp::ShrS => "shr_s",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::LtU => "lt_u",
            BinOp::LtS => "lt_s",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    // === Value-producing ===
    Binary {
        op: BinOp,
        ty: Ty,
        lhs: Operand,
        rhs: Operand,
    },
    Select {
        ty: Ty,
        cond: Operand,
        on_true: Operand,
        on_false: Operand,
    },
    /// Address computation: a base plus a list of structural indices.
    /// The index list encodes structure, so operand reduction exempts it.
    Address {
        base: Operand,
        indices: Vec<Operand>,
    },
    Call {
        callee: FuncId,
        ty: Ty,
        args: Vec<Operand>,
    },

    // === Terminators ===
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Operand,
        on_true: BlockId,
        on_false: BlockId,
    },
    Switch {
        value: Operand,
        cases: Vec<(i64, BlockId)>,
        default: BlockId,
    },
    Ret {
        value: Option<Operand>,
    },
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Inst::Br { .. } | Inst::CondBr { .. } | Inst::Switch { .. } | Inst::Ret { .. }
        )
    }

    /// Result type of this instruction. Terminators produce no value.
    pub fn result_ty(&self) -> Ty {
        match self {
            Inst::Binary { ty, .. } | Inst::Select { ty, .. } | Inst::Call { ty, .. } => *ty,
            Inst::Address { .. } => Ty::I64,
            Inst::Br { .. } | Inst::CondBr { .. } | Inst::Switch { .. } | Inst::Ret { .. } => {
                Ty::Void
            }
        }
    }

    /// Successor blocks of a terminator, in successor-list order.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Inst::Br { target } => vec![*target],
            Inst::CondBr {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
            Inst::Switch { cases, default, .. } => {
                let mut succs: Vec<BlockId> = cases.iter().map(|(_, block)| *block).collect();
                succs.push(*default);
                succs
            }
            _ => Vec::new(),
        }
    }

    /// All value operands, in operand order.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Inst::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Inst::Select {
                cond,
                on_true,
                on_false,
                ..
            } => vec![*cond, *on_true, *on_false],
            Inst::Address { base, indices } => {
                let mut ops = vec![*base];
                ops.extend(indices.iter().copied());
                ops
            }
            Inst::Call { args, .. } => args.clone(),
            Inst::Br { .. } => Vec::new(),
            Inst::CondBr { cond, .. } => vec![*cond],
            Inst::Switch { value, .. } => vec![*value],
            Inst::Ret { value } => value.iter().copied().collect(),
        }
    }

    /// Mutable references to all value operands, in operand order.
    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Inst::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Inst::Select {
                cond,
                on_true,
                on_false,
                ..
            } => vec![cond, on_true, on_false],
            Inst::Address { base, indices } => {
                let mut ops = vec![base];
                ops.extend(indices.iter_mut());
                ops
            }
            Inst::Call { args, .. } => args.iter_mut().collect(),
            Inst::Br { .. } => Vec::new(),
            Inst::CondBr { cond, .. } => vec![cond],
            Inst::Switch { value, .. } => vec![value],
            Inst::Ret { value } => value.iter_mut().collect(),
        }
    }
}
