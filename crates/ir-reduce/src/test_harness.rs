//! Test harness for ir-reduce unit and integration tests.
//!
//! Provides ready-made modules with known reducible structure, so tests can
//! focus on driver and pass behavior instead of IR plumbing.

#![allow(clippy::missing_panics_doc, clippy::must_use_candidate)]

use crate::ir::{BinOp, Function, FunctionBuilder, Module, Operand, Ty, verify_module};

/// Wrap a single function into a module.
pub fn single_function_module(func: Function) -> Module {
    let mut module = Module::new();
    module.push_function(func);
    module
}

/// A function with `n` conditional branches in a straight chain; both edges
/// of every branch lead to the next block, so each branch can be dropped
/// independently without structural fallout.
pub fn branch_chain(n: usize) -> Module {
    let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
    for _ in 0..n {
        let next = b.add_block();
        b.cond_br(b.param(0), next, next);
        b.switch_to(next);
    }
    b.ret(Some(b.param(0)));
    single_function_module(b.finish())
}

/// A function computing a chain of `n` additions over its argument.
pub fn add_chain(n: usize) -> Module {
    let mut b = FunctionBuilder::new("main", vec![Ty::I32], Ty::I32);
    let mut acc = b.param(0);
    for i in 0..n {
        let step = i64::try_from(i).expect("chain length fits in i64") + 1;
        acc = b.binary(BinOp::Add, Ty::I32, acc, Operand::Const(step));
    }
    b.ret(Some(acc));
    single_function_module(b.finish())
}

/// Count the conditional branches left in a module.
pub fn cond_branch_count(module: &Module) -> usize {
    module
        .functions()
        .map(|(_, func)| {
            func.inst_ids()
                .into_iter()
                .filter_map(|id| func.inst(id))
                .filter(|inst| matches!(inst, crate::ir::Inst::CondBr { .. }))
                .count()
        })
        .sum()
}

/// Panic with the verifier's complaint if the module is malformed.
pub fn assert_well_formed(module: &Module) {
    if let Err(err) = verify_module(module) {
        panic!("module failed verification: {err}\n{module}");
    }
}
