//! End-to-end reduction scenarios over the default pass pipeline.

use ir_reduce::test_harness::*;
use ir_reduce::{
    FunctionBuilder, InterestingnessTest, Module, Operand, Result, TestRunner, Ty,
    default_passes, run_reduction,
};

/// Conditional branch to block A (returns 1, interesting) or B (returns 2).
fn branchy_module() -> Module {
    let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
    let a = b.add_block();
    let other = b.add_block();
    b.cond_br(b.param(0), a, other);
    b.switch_to(a);
    b.ret(Some(Operand::Const(1)));
    b.switch_to(other);
    b.ret(Some(Operand::Const(2)));
    single_function_module(b.finish())
}

#[test]
fn branch_scenario_converges_to_the_interesting_target() {
    let mut runner = TestRunner::new(branchy_module(), |m: &Module| {
        m.to_string().contains("ret 1")
    })
    .expect("well-formed");
    runner.ensure_interesting().expect("starts interesting");
    run_reduction(&mut runner, &default_passes()).expect("reduction succeeds");

    let reduced = runner.program();
    assert_well_formed(reduced);
    let text = reduced.to_string();
    assert!(text.contains("ret 1"));
    assert!(!text.contains("condbr"));
    assert!(!text.contains("ret 2"));
    // the cleanup pipeline merges the redirected chain into the entry block
    assert_eq!(reduced.block_count(), 1);
}

#[test]
fn full_pipeline_preserves_the_required_value() {
    let module = add_chain(6);
    let initial_insts = module.inst_count();
    let mut runner = TestRunner::new(module, |m: &Module| m.to_string().contains("%p0"))
        .expect("well-formed");
    runner.ensure_interesting().expect("starts interesting");
    run_reduction(&mut runner, &default_passes()).expect("reduction succeeds");

    let reduced = runner.program();
    assert_well_formed(reduced);
    assert!(reduced.to_string().contains("%p0"));
    assert!(reduced.inst_count() <= initial_insts);
}

/// Fails its first invocation, then reports everything interesting.
struct FlakyOnFirstCall {
    calls: usize,
}

impl InterestingnessTest for FlakyOnFirstCall {
    fn is_interesting(&mut self, _module: &Module) -> Result<bool> {
        self.calls += 1;
        if self.calls == 1 {
            Err(ir_reduce::Error::Test("reproduction script crashed".into()))
        } else {
            Ok(true)
        }
    }
}

#[test]
fn a_failing_pass_keeps_the_baseline_and_later_passes_still_run() {
    let mut runner =
        TestRunner::new(branchy_module(), FlakyOnFirstCall { calls: 0 }).expect("well-formed");
    run_reduction(&mut runner, &default_passes()).expect("reduction continues past the failure");

    // The first pass aborted, but later passes reduced under the
    // always-interesting answers that followed.
    let reduced = runner.program();
    assert_well_formed(reduced);
    assert!(runner.stats().commits > 0);
    assert!(reduced.inst_count() < branchy_module().inst_count());
}
