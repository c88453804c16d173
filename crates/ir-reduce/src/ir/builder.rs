use super::instruction::{BinOp, Inst, Operand, Ty, ValueId};
use super::module::{BlockId, FuncId, Function};

/// Programmatic function construction.
///
/// Creates the entry block up front and appends instructions to a current
/// block; value-producing helpers return the result as an `Operand` so it
/// can be fed straight into later instructions. The builder does not check
/// well-formedness; run the verifier on the finished module.
pub struct FunctionBuilder {
    func: Function,
    current: BlockId,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, params: Vec<Ty>, ret: Ty) -> Self {
        let mut func = Function::new(name, params, ret);
        let entry = func.add_block();
        Self {
            func,
            current: entry,
        }
    }

    pub fn add_block(&mut self) -> BlockId {
        self.func.add_block()
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn param(&self, index: u32) -> Operand {
        Operand::Value(ValueId::Param(index))
    }

    fn push_value(&mut self, inst: Inst) -> Operand {
        let id = self.func.push_inst(self.current, inst);
        Operand::Value(ValueId::Inst(id))
    }

    fn push(&mut self, inst: Inst) {
        self.func.push_inst(self.current, inst);
    }

    pub fn binary(&mut self, op: BinOp, ty: Ty, lhs: Operand, rhs: Operand) -> Operand {
        self.push_value(Inst::Binary { op, ty, lhs, rhs })
    }

    pub fn select(&mut self, ty: Ty, cond: Operand, on_true: Operand, on_false: Operand) -> Operand {
        self.push_value(Inst::Select {
            ty,
            cond,
            on_true,
            on_false,
        })
    }

    pub fn address(&mut self, base: Operand, indices: Vec<Operand>) -> Operand {
        self.push_value(Inst::Address { base, indices })
    }

    /// Emit a call. The returned operand is only meaningful for non-void
    /// callees; using a void call's result is rejected by the verifier.
    pub fn call(&mut self, callee: FuncId, ty: Ty, args: Vec<Operand>) -> Operand {
        self.push_value(Inst::Call { callee, ty, args })
    }

    pub fn br(&mut self, target: BlockId) {
        self.push(Inst::Br { target });
    }

    pub fn cond_br(&mut self, cond: Operand, on_true: BlockId, on_false: BlockId) {
        self.push(Inst::CondBr {
            cond,
            on_true,
            on_false,
        });
    }

    pub fn switch(&mut self, value: Operand, cases: Vec<(i64, BlockId)>, default: BlockId) {
        self.push(Inst::Switch {
            value,
            cases,
            default,
        });
    }

    pub fn ret(&mut self, value: Option<Operand>) {
        self.push(Inst::Ret { value });
    }

    pub fn finish(self) -> Function {
        self.func
    }
}
