// Reduction via the cleanup pass registry: each named optimizer pass is one
// feature, and a dropped feature means the pass participates in a single
// pipeline run over the module. Well-formedness is the optimizer's problem,
// not ours; there is no custom repair logic here.

use crate::Result;
use crate::ir::{Module, optimizer};

use super::driver::DeltaPass;
use super::oracle::Oracle;

pub struct ReducePasses;

impl DeltaPass for ReducePasses {
    fn name(&self) -> &'static str {
        "reduce-passes"
    }

    fn count(&self, _module: &Module) -> usize {
        optimizer::REGISTRY.len()
    }

    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
        let mut pipeline: Vec<optimizer::OptPass> = Vec::new();
        for (name, pass) in optimizer::REGISTRY {
            if !oracle.should_keep() {
                tracing::debug!(pass = name, "pipeline includes cleanup pass");
                pipeline.push(*pass);
            }
        }
        for pass in pipeline {
            pass(module);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{TestRunner, run_delta_pass};
    use crate::ir::{BinOp, FunctionBuilder, Operand, Ty, verify_module};

    #[test]
    fn feature_count_is_the_registry_size() {
        let module = Module::new();
        assert_eq!(ReducePasses.count(&module), optimizer::REGISTRY.len());
    }

    #[test]
    fn pipeline_run_shrinks_foldable_code() {
        let mut b = FunctionBuilder::new("main", vec![], Ty::I32);
        let t = b.add_block();
        let f = b.add_block();
        let c = b.binary(BinOp::Eq, Ty::I32, Operand::Const(1), Operand::Const(1));
        b.cond_br(c, t, f);
        b.switch_to(t);
        b.ret(Some(Operand::Const(7)));
        b.switch_to(f);
        b.ret(Some(Operand::Const(8)));
        let mut module = Module::new();
        module.push_function(b.finish());
        let before = module.inst_count();

        let mut runner =
            TestRunner::new(module, |m: &Module| m.to_string().contains("ret 7"))
                .expect("well-formed");
        run_delta_pass(&mut runner, &ReducePasses).expect("driver succeeds");

        let reduced = runner.program();
        assert!(verify_module(reduced).is_ok());
        assert!(reduced.inst_count() < before);
        assert!(reduced.to_string().contains("ret 7"));
        assert!(!reduced.to_string().contains("condbr"));
    }
}
