// Return reduction: in functions nothing calls directly, rewrite dropped
// returns to a zero default so the values they returned go dead.
//
// The first return keeps its real value either way; rewriting it would just
// trade one live value for another. Functions with direct callers are left
// alone so call-site contracts stay intact; address-taken references do not
// disqualify a function. Non-integer return shapes are skipped entirely.

use crate::Result;
use crate::ir::{FuncId, Inst, InstId, Module, Operand, optimizer};

use super::driver::DeltaPass;
use super::oracle::Oracle;

pub struct ReduceReturns;

fn is_directly_called(module: &Module, fid: FuncId) -> bool {
    module.functions().any(|(_, func)| {
        func.inst_ids()
            .into_iter()
            .filter_map(|id| func.inst(id))
            .any(|inst| matches!(inst, Inst::Call { callee, .. } if *callee == fid))
    })
}

fn is_eligible(module: &Module, fid: FuncId) -> bool {
    module
        .function(fid)
        .is_some_and(|func| func.ret.is_integer() && !is_directly_called(module, fid))
}

fn value_returns(module: &Module, fid: FuncId) -> Vec<InstId> {
    let Some(func) = module.function(fid) else {
        return Vec::new();
    };
    func.inst_ids()
        .into_iter()
        .filter(|id| matches!(func.inst(*id), Some(Inst::Ret { value: Some(_) })))
        .collect()
}

impl DeltaPass for ReduceReturns {
    fn name(&self) -> &'static str {
        "reduce-returns"
    }

    fn count(&self, module: &Module) -> usize {
        module
            .func_ids()
            .into_iter()
            .filter(|fid| is_eligible(module, *fid))
            .map(|fid| value_returns(module, fid).len())
            .sum()
    }

    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
        for fid in module.func_ids() {
            if !is_eligible(module, fid) {
                continue;
            }
            let rets = value_returns(module, fid);
            let first = rets.first().copied();
            let to_rewrite: Vec<InstId> = rets
                .into_iter()
                .filter(|_| !oracle.should_keep())
                .collect();
            if to_rewrite.is_empty() {
                continue;
            }
            let Some(func) = module.function_mut(fid) else {
                continue;
            };
            for id in to_rewrite {
                if Some(id) == first {
                    continue;
                }
                func.replace_inst(
                    id,
                    Inst::Ret {
                        value: Some(Operand::Const(0)),
                    },
                );
            }
            // Sweep values the rewritten returns no longer keep alive.
            optimizer::dce_function(func);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{TestRunner, run_delta_pass};
    use crate::ir::{BinOp, Function, FunctionBuilder, Ty, verify_module};

    /// An uncalled function with two returns computing different values.
    fn two_return_module() -> Module {
        let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
        let a = b.add_block();
        let other = b.add_block();
        b.cond_br(b.param(0), a, other);
        b.switch_to(a);
        let x = b.binary(BinOp::Add, Ty::I32, b.param(0), Operand::Const(1));
        b.ret(Some(x));
        b.switch_to(other);
        let y = b.binary(BinOp::Mul, Ty::I32, b.param(0), Operand::Const(3));
        b.ret(Some(y));
        let mut module = Module::new();
        module.push_function(b.finish());
        module
    }

    #[test]
    fn later_returns_become_zero_and_their_values_die() {
        let module = two_return_module();
        assert_eq!(ReduceReturns.count(&module), 2);

        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &ReduceReturns).expect("driver succeeds");

        let reduced = runner.program();
        assert!(verify_module(reduced).is_ok());
        let text = reduced.to_string();
        // first return keeps its value, the second went to zero and its
        // multiply got swept
        assert!(text.contains("i32.add"));
        assert!(!text.contains("i32.mul"));
        assert!(text.contains("ret 0"));
    }

    #[test]
    fn directly_called_functions_are_skipped() {
        let mut module = Module::new();
        let main = module.push_function(Function::new("main", vec![Ty::I32], Ty::I32));
        let callee = module.push_function(Function::new("callee", vec![], Ty::I32));

        let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
        let v = b.call(callee, Ty::I32, vec![]);
        b.ret(Some(v));
        module.replace_function(main, b.finish());

        let mut b = FunctionBuilder::new("callee", vec![], Ty::I32);
        let v = b.binary(BinOp::Add, Ty::I32, Operand::Const(20), Operand::Const(22));
        b.ret(Some(v));
        module.replace_function(callee, b.finish());

        // callee is called, so only main's return is a feature
        assert_eq!(ReduceReturns.count(&module), 1);
    }

    #[test]
    fn void_functions_have_no_features() {
        let mut b = FunctionBuilder::new("main", vec![], Ty::Void);
        b.ret(None);
        let mut module = Module::new();
        module.push_function(b.finish());
        assert_eq!(ReduceReturns.count(&module), 0);
    }
}
