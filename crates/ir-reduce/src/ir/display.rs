use std::fmt;

use super::instruction::{Inst, Operand, Ty, ValueId};
use super::module::{FuncId, Function, Module};

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::I32 => write!(f, "i32"),
            Ty::I64 => write!(f, "i64"),
            Ty::Void => write!(f, "void"),
        }
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueId::Param(i) => write!(f, "%p{i}"),
            ValueId::Inst(id) => write!(f, "%{}", id.0),
        }
    }
}

/// Operand formatting needs the module to resolve function names.
struct OperandFmt<'a> {
    module: &'a Module,
    op: Operand,
}

impl fmt::Display for OperandFmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Const(c) => write!(f, "{c}"),
            Operand::FuncAddr(id) => write!(f, "@{}", func_name(self.module, id)),
        }
    }
}

fn func_name(module: &Module, id: FuncId) -> &str {
    module.function(id).map_or("<erased>", |f| f.name.as_str())
}

fn write_args(
    f: &mut fmt::Formatter<'_>,
    module: &Module,
    args: &[Operand],
) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", OperandFmt { module, op: *arg })?;
    }
    Ok(())
}

fn write_inst(f: &mut fmt::Formatter<'_>, module: &Module, id: u32, inst: &Inst) -> fmt::Result {
    let op = |op: Operand| OperandFmt { module, op };
    match inst {
        Inst::Binary {
            op: bin,
            ty,
            lhs,
            rhs,
        } => writeln!(
            f,
            "  %{id} = {ty}.{} {}, {}",
            bin.mnemonic(),
            op(*lhs),
            op(*rhs)
        ),
        Inst::Select {
            ty,
            cond,
            on_true,
            on_false,
        } => writeln!(
            f,
            "  %{id} = {ty}.select {}, {}, {}",
            op(*cond),
            op(*on_true),
            op(*on_false)
        ),
        Inst::Address { base, indices } => {
            write!(f, "  %{id} = addr {}, [", op(*base))?;
            write_args(f, module, indices)?;
            writeln!(f, "]")
        }
        Inst::Call { callee, ty, args } => {
            if ty.is_void() {
                write!(f, "  call @{}(", func_name(module, *callee))?;
            } else {
                write!(f, "  %{id} = {ty}.call @{}(", func_name(module, *callee))?;
            }
            write_args(f, module, args)?;
            writeln!(f, ")")
        }
        Inst::Br { target } => writeln!(f, "  br b{}", target.0),
        Inst::CondBr {
            cond,
            on_true,
            on_false,
        } => writeln!(f, "  condbr {}, b{}, b{}", op(*cond), on_true.0, on_false.0),
        Inst::Switch {
            value,
            cases,
            default,
        } => {
            write!(f, "  switch {}, [", op(*value))?;
            for (i, (case, block)) in cases.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{case}: b{}", block.0)?;
            }
            writeln!(f, "], b{}", default.0)
        }
        Inst::Ret { value: Some(v) } => writeln!(f, "  ret {}", op(*v)),
        Inst::Ret { value: None } => writeln!(f, "  ret"),
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, module: &Module, func: &Function) -> fmt::Result {
    write!(f, "func @{}(", func.name)?;
    for (i, ty) in func.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{ty}")?;
    }
    writeln!(f, ") -> {} {{", func.ret)?;
    for block in func.layout() {
        writeln!(f, "b{}:", block.0)?;
        let Some(body) = func.block(*block) else {
            continue;
        };
        for id in body.insts() {
            if let Some(inst) = func.inst(*id) {
                write_inst(f, module, id.0, inst)?;
            }
        }
    }
    writeln!(f, "}}")
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (_, func)) in self.functions().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write_function(f, self, func)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, FunctionBuilder};

    #[test]
    fn prints_a_small_function() {
        let mut b = FunctionBuilder::new("main", vec![Ty::I32, Ty::I32], Ty::I32);
        let exit = b.add_block();
        let sum = b.binary(BinOp::Add, Ty::I32, b.param(0), b.param(1));
        b.br(exit);
        b.switch_to(exit);
        b.ret(Some(sum));
        let mut module = Module::new();
        module.push_function(b.finish());

        let text = module.to_string();
        assert_eq!(
            text,
            "func @main(i32, i32) -> i32 {\n\
             b0:\n\
             \x20 %0 = i32.add %p0, %p1\n\
             \x20 br b1\n\
             b1:\n\
             \x20 ret %0\n\
             }\n"
        );
    }

    #[test]
    fn prints_calls_and_switches_by_name() {
        let mut module = Module::new();
        let mut callee = FunctionBuilder::new("helper", vec![Ty::I64], Ty::Void);
        callee.ret(None);
        let helper = module.push_function(callee.finish());

        let mut b = FunctionBuilder::new("main", vec![Ty::I64], Ty::Void);
        let other = b.add_block();
        b.call(helper, Ty::Void, vec![b.param(0)]);
        b.switch(b.param(0), vec![(0, other)], other);
        b.switch_to(other);
        b.ret(None);
        module.push_function(b.finish());

        let text = module.to_string();
        assert!(text.contains("call @helper(%p0)"));
        assert!(text.contains("switch %p0, [0: b1], b1"));
    }
}
