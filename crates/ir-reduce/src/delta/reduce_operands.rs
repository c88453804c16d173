// Operand reduction: rewrite dropped operands to the zero constant.
//
// Operand kinds that encode structure are exempt rather than enumerated:
// branch targets are not operands at all in this IR, and address-computation
// index lists and multi-way branch scrutinees would stop being well-formed
// selectors if zeroed, so whole `Address` and `Switch` instructions are
// skipped. Operands that are already zero are not features either; count and
// reduce share one predicate so the oracle stays aligned.

use crate::Result;
use crate::ir::{Inst, Module, Operand};

use super::driver::DeltaPass;
use super::oracle::Oracle;

pub struct ReduceOperands;

fn is_exempt(inst: &Inst) -> bool {
    matches!(inst, Inst::Address { .. } | Inst::Switch { .. })
}

fn is_reducible(op: Operand) -> bool {
    !matches!(op, Operand::Const(0))
}

impl DeltaPass for ReduceOperands {
    fn name(&self) -> &'static str {
        "reduce-operands"
    }

    fn count(&self, module: &Module) -> usize {
        module
            .functions()
            .map(|(_, func)| {
                func.inst_ids()
                    .into_iter()
                    .filter_map(|id| func.inst(id))
                    .filter(|inst| !is_exempt(inst))
                    .flat_map(Inst::operands)
                    .filter(|op| is_reducible(*op))
                    .count()
            })
            .sum()
    }

    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
        for fid in module.func_ids() {
            let Some(func) = module.function_mut(fid) else {
                continue;
            };
            for id in func.inst_ids() {
                let Some(inst) = func.inst_mut(id) else {
                    continue;
                };
                if is_exempt(inst) {
                    continue;
                }
                for op in inst.operands_mut() {
                    if is_reducible(*op) && !oracle.should_keep() {
                        *op = Operand::Const(0);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{TestRunner, run_delta_pass};
    use crate::ir::{BinOp, FunctionBuilder, Ty, verify_module};

    #[test]
    fn zeroes_the_droppable_operand_of_an_add() {
        // r = add x, y with y droppable reduces to r = add x, 0.
        let mut b = FunctionBuilder::new("main", vec![Ty::I32, Ty::I32], Ty::I32);
        let r = b.binary(BinOp::Add, Ty::I32, b.param(0), b.param(1));
        b.ret(Some(r));
        let mut module = Module::new();
        module.push_function(b.finish());

        let mut runner = TestRunner::new(module, |m: &Module| {
            // x must survive for the case to stay interesting
            m.to_string().contains("%p0")
        })
        .expect("well-formed");
        run_delta_pass(&mut runner, &ReduceOperands).expect("driver succeeds");

        let text = runner.program().to_string();
        assert!(text.contains("%0 = i32.add %p0, 0"));
        assert!(text.contains("ret 0"));
        assert!(verify_module(runner.program()).is_ok());
    }

    #[test]
    fn address_indices_and_switch_scrutinees_are_not_features() {
        let mut b = FunctionBuilder::new("main", vec![Ty::I64, Ty::I32], Ty::I64);
        let other = b.add_block();
        let addr = b.address(b.param(0), vec![Operand::Const(4), b.param(1)]);
        b.switch(b.param(1), vec![(1, other)], other);
        b.switch_to(other);
        b.ret(Some(addr));
        let mut module = Module::new();
        module.push_function(b.finish());

        // Only the ret operand is reducible.
        assert_eq!(ReduceOperands.count(&module), 1);

        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &ReduceOperands).expect("driver succeeds");
        let text = runner.program().to_string();
        assert!(text.contains("addr %p0, [4, %p1]"));
        assert!(text.contains("switch %p1"));
        assert!(text.contains("ret 0"));
    }

    #[test]
    fn already_zero_operands_are_not_recounted() {
        let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
        let r = b.binary(BinOp::Add, Ty::I32, b.param(0), Operand::Const(0));
        b.ret(Some(r));
        let mut module = Module::new();
        module.push_function(b.finish());

        assert_eq!(ReduceOperands.count(&module), 2); // %p0 and the ret value

        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &ReduceOperands).expect("driver succeeds");
        assert_eq!(ReduceOperands.count(runner.program()), 0);
        assert!(verify_module(runner.program()).is_ok());
    }
}
