// Instructions-to-arguments: hoist dropped instruction results into new
// trailing function parameters.
//
// The function is cloned with a widened signature, every use of a dropped
// result is rewritten to the new parameter, the instruction is erased, and
// every call site module-wide passes a zero default in the new slot. The
// original function is replaced in place, so its handle and name survive.

use crate::ir::{FuncId, Inst, InstId, Module, Operand, Ty, ValueId};
use crate::{Error, Result};

use super::driver::DeltaPass;
use super::oracle::Oracle;

pub struct InstsToArgs;

impl DeltaPass for InstsToArgs {
    fn name(&self) -> &'static str {
        "insts-to-args"
    }

    fn count(&self, module: &Module) -> usize {
        module
            .functions()
            .map(|(_, func)| {
                func.inst_ids()
                    .into_iter()
                    .filter_map(|id| func.inst(id))
                    .filter(|inst| !inst.result_ty().is_void())
                    .count()
            })
            .sum()
    }

    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
        // Consult the oracle over the whole module first; signatures change
        // below and must not disturb the enumeration.
        let mut hoists: Vec<(FuncId, Vec<InstId>)> = Vec::new();
        for fid in module.func_ids() {
            let Some(func) = module.function(fid) else {
                continue;
            };
            let mut to_hoist = Vec::new();
            for id in func.inst_ids() {
                let Some(inst) = func.inst(id) else { continue };
                if !inst.result_ty().is_void() && !oracle.should_keep() {
                    to_hoist.push(id);
                }
            }
            if !to_hoist.is_empty() {
                hoists.push((fid, to_hoist));
            }
        }

        for (fid, to_hoist) in hoists {
            let Some(original) = module.function(fid) else {
                continue;
            };
            let mut rewritten = original.clone();

            let mut added: Vec<Ty> = Vec::new();
            for id in &to_hoist {
                let ty = rewritten
                    .inst(*id)
                    .map(Inst::result_ty)
                    .ok_or_else(|| Error::Internal(format!("hoisted %{} vanished", id.0)))?;
                let param_index = u32::try_from(rewritten.params.len() + added.len())
                    .map_err(|_| Error::Internal("parameter index overflow".into()))?;
                added.push(ty);
                rewritten.replace_all_uses(
                    ValueId::Inst(*id),
                    Operand::Value(ValueId::Param(param_index)),
                );
                rewritten.erase_inst(*id);
            }
            rewritten.params.extend(added.iter().copied());
            let added = added.len();
            module.replace_function(fid, rewritten);

            // Call sites everywhere, including recursive ones in the
            // rewritten body, pass a zero default for each new slot.
            for caller in module.func_ids() {
                let Some(caller_fn) = module.function_mut(caller) else {
                    continue;
                };
                for id in caller_fn.inst_ids() {
                    if let Some(Inst::Call { callee, args, .. }) = caller_fn.inst_mut(id)
                        && *callee == fid
                    {
                        args.extend(std::iter::repeat_n(Operand::Const(0), added));
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
    use crate::ir::{BinOp, Function, FunctionBuilder, verify_module};

    /// main calls helper(x); helper computes (x + 1) * 2.
    fn call_module() -> Module {
        let mut module = Module::new();
        let main = module.push_function(Function::new("main", vec![Ty::I32], Ty::I32));
        let helper = module.push_function(Function::new("helper", vec![Ty::I32], Ty::I32));

        let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
        let v = b.call(helper, Ty::I32, vec![b.param(0)]);
        b.ret(Some(v));
        module.replace_function(main, b.finish());

        let mut b = FunctionBuilder::new("helper", vec![Ty::I32], Ty::I32);
        let inc = b.binary(BinOp::Add, Ty::I32, b.param(0), Operand::Const(1));
        let dbl = b.binary(BinOp::Mul, Ty::I32, inc, Operand::Const(2));
        b.ret(Some(dbl));
        module.replace_function(helper, b.finish());
        module
    }

    #[test]
    fn hoists_results_and_rewrites_call_sites() {
        let module = call_module();
        assert_eq!(InstsToArgs.count(&module), 3); // call, add, mul

        let mut runner = TestRunner::new(module, |m: &Module| {
            // keep the call edge; everything inside helper may go
            m.to_string().contains("call @helper")
        })
        .expect("well-formed");
        run_delta_pass(&mut runner, &InstsToArgs).expect("driver succeeds");

        let reduced = runner.program();
        assert!(verify_module(reduced).is_ok());
        let text = reduced.to_string();
        // helper's body collapsed into parameters, call site padded with zeros
        assert!(text.contains("func @helper(i32, i32, i32) -> i32"));
        assert!(text.contains("call @helper(%p0, 0, 0)"));
        assert!(text.contains("ret %p1")); // the hoisted multiply result
    }

    #[test]
    fn argument_order_is_preserved() {
        let mut module = Module::new();
        let main = module.push_function(Function::new("main", vec![Ty::I32, Ty::I64], Ty::I64));

        let mut b = FunctionBuilder::new("main", vec![Ty::I32, Ty::I64], Ty::I64);
        let wide = b.binary(BinOp::Add, Ty::I64, b.param(1), Operand::Const(1));
        let narrow = b.binary(BinOp::Add, Ty::I32, b.param(0), Operand::Const(2));
        let ext = b.select(Ty::I64, narrow, wide, Operand::Const(0));
        b.ret(Some(ext));
        module.replace_function(main, b.finish());

        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &InstsToArgs).expect("driver succeeds");

        let reduced = runner.program();
        assert!(verify_module(reduced).is_ok());
        // hoisted params follow the original ones, typed in traversal order
        let Some(func) = reduced.entry().and_then(|id| reduced.function(id)) else {
            panic!("entry function missing");
        };
        assert_eq!(func.params[..2], [Ty::I32, Ty::I64]);
        assert!(func.params.len() > 2);
    }

    #[test]
    fn recursive_call_sites_get_the_default_too() {
        let mut module = Module::new();
        let rec = module.push_function(Function::new("rec", vec![Ty::I32], Ty::I32));

        let mut b = FunctionBuilder::new("rec", vec![Ty::I32], Ty::I32);
        let base = b.add_block();
        b.cond_br(b.param(0), base, base);
        b.switch_to(base);
        let again = b.call(rec, Ty::I32, vec![Operand::Const(0)]);
        let sum = b.binary(BinOp::Add, Ty::I32, again, b.param(0));
        b.ret(Some(sum));
        module.replace_function(rec, b.finish());

        let mut runner =
            TestRunner::new(module, |m: &Module| m.to_string().contains("call @rec"))
                .expect("well-formed");
        run_delta_pass(&mut runner, &InstsToArgs).expect("driver succeeds");

        let reduced = runner.program();
        assert!(verify_module(reduced).is_ok());
        let Some(func) = reduced.entry().and_then(|id| reduced.function(id)) else {
            panic!("entry function missing");
        };
        // whatever got hoisted, every remaining call matches the signature
        for id in func.inst_ids() {
            if let Some(Inst::Call { args, .. }) = func.inst(id) {
                assert_eq!(args.len(), func.params.len());
            }
        }
    }
}
