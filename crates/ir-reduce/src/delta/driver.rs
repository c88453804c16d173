// Generic delta-debugging driver.
//
// One pass attempt = clone the current best program, mutate it with a
// chunked keep set, verify, test. Only an interesting, well-formed candidate
// replaces the baseline, so the driver always has a known-good program to
// fall back to.

use crate::ir::{Module, verify_module};
use crate::{Error, Result};

use super::oracle::{Chunk, Oracle, partition};

/// One full reduction strategy, applied to convergence via chunked binary
/// search.
///
/// The two-phase contract: `count` enumerates the pass's reducible features
/// over the program, and `mutate` must re-enumerate them in exactly the same
/// order, consulting the oracle once per feature.
pub trait DeltaPass {
    fn name(&self) -> &'static str;

    /// Count reducible features, in the fixed traversal order that `mutate`
    /// will use.
    fn count(&self, module: &Module) -> usize;

    /// Apply one full rewrite attempt. An `Err` rejects this candidate only;
    /// it never aborts the surrounding reduction.
    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()>;
}

/// External predicate deciding whether a candidate still reproduces the
/// condition under investigation. Potentially expensive; assumed
/// deterministic.
pub trait InterestingnessTest {
    /// `Err` signals a failure unrelated to interestingness (the test could
    /// not run at all), which aborts the current pass.
    fn is_interesting(&mut self, module: &Module) -> Result<bool>;
}

impl<F> InterestingnessTest for F
where
    F: FnMut(&Module) -> bool,
{
    fn is_interesting(&mut self, module: &Module) -> Result<bool> {
        Ok(self(module))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub tests_run: usize,
    pub commits: usize,
    pub rejected_malformed: usize,
    pub rejected_unsupported: usize,
}

/// Owns the canonical current-best program and the interestingness test.
/// Only `run_delta_pass` replaces the program, and only after the test
/// accepted a mutated clone.
pub struct TestRunner<T> {
    program: Module,
    test: T,
    stats: Stats,
}

impl<T: InterestingnessTest> TestRunner<T> {
    /// Rejects an ill-formed starting program up front; reduction must start
    /// from a known-good baseline.
    pub fn new(program: Module, test: T) -> Result<Self> {
        verify_module(&program)?;
        Ok(Self {
            program,
            test,
            stats: Stats::default(),
        })
    }

    /// Check that the starting program is interesting at all.
    pub fn ensure_interesting(&mut self) -> Result<()> {
        self.stats.tests_run += 1;
        if self.test.is_interesting(&self.program)? {
            Ok(())
        } else {
            Err(Error::Test("initial program is not interesting".into()))
        }
    }

    pub fn program(&self) -> &Module {
        &self.program
    }

    pub fn into_program(self) -> Module {
        self.program
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }
}

/// Run one delta pass to convergence.
///
/// Binary chop over the feature space: partition into ever finer chunks,
/// try dropping one chunk at a time, and on success restart from one chunk
/// over the shrunken program. The pass is exhausted when the chunk count
/// exceeds the feature count.
pub fn run_delta_pass<T: InterestingnessTest>(
    runner: &mut TestRunner<T>,
    pass: &dyn DeltaPass,
) -> Result<()> {
    let mut feature_count = pass.count(runner.program());
    tracing::info!(pass = pass.name(), features = feature_count, "running delta pass");
    if feature_count == 0 {
        return Ok(());
    }

    let mut chunk_count = 1usize;
    'granularity: while chunk_count <= feature_count {
        let chunks = partition(feature_count, chunk_count);
        for dropped in 0..chunks.len() {
            let keep: Vec<Chunk> = chunks
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != dropped)
                .map(|(_, c)| *c)
                .collect();

            let mut candidate = runner.program.clone();
            let mut oracle = Oracle::new(keep);
            if let Err(err) = pass.mutate(&mut oracle, &mut candidate) {
                tracing::debug!(pass = pass.name(), %err, "candidate rejected: mutation failed");
                runner.stats.rejected_unsupported += 1;
                continue;
            }
            if oracle.calls() != feature_count {
                // A pass that enumerates a different feature set than it
                // counted has desynchronized chunk indices; this is a pass
                // bug, not a rejectable candidate.
                return Err(Error::OracleMismatch {
                    expected: feature_count,
                    actual: oracle.calls(),
                });
            }
            if let Err(err) = verify_module(&candidate) {
                tracing::debug!(pass = pass.name(), %err, "candidate rejected: malformed");
                runner.stats.rejected_malformed += 1;
                continue;
            }
            if candidate == runner.program {
                tracing::trace!(pass = pass.name(), "candidate identical to baseline, skipping");
                continue;
            }

            runner.stats.tests_run += 1;
            if runner.test.is_interesting(&candidate)? {
                runner.program = candidate;
                runner.stats.commits += 1;
                feature_count = pass.count(&runner.program);
                tracing::debug!(
                    pass = pass.name(),
                    features = feature_count,
                    instructions = runner.program.inst_count(),
                    "committed reduction"
                );
                if feature_count == 0 {
                    break 'granularity;
                }
                chunk_count = 1;
                continue 'granularity;
            }
        }
        chunk_count *= 2;
    }
    Ok(())
}

/// Run a sequence of delta passes over the shared work item.
///
/// An external test failure aborts only the pass it happened in; the last
/// committed baseline is preserved and the next pass still runs. An oracle
/// mismatch is a pass bug and stops everything.
pub fn run_reduction<T: InterestingnessTest>(
    runner: &mut TestRunner<T>,
    passes: &[Box<dyn DeltaPass>],
) -> Result<()> {
    for pass in passes {
        match run_delta_pass(runner, pass.as_ref()) {
            Ok(()) => {}
            Err(err @ Error::OracleMismatch { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!(pass = pass.name(), %err, "pass aborted, keeping last baseline");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, FunctionBuilder, Inst, Operand, Ty};
    use std::cell::Cell;
    use std::rc::Rc;

    /// A toy pass: features are the operands of binary instructions that are
    /// not yet zero; dropping one zeroes it.
    struct ZeroBinaryOperands;

    impl DeltaPass for ZeroBinaryOperands {
        fn name(&self) -> &'static str {
            "zero-binary-operands"
        }

        fn count(&self, module: &Module) -> usize {
            module
                .functions()
                .flat_map(|(_, f)| {
                    f.inst_ids().into_iter().filter_map(move |id| f.inst(id))
                })
                .filter(|inst| matches!(inst, Inst::Binary { .. }))
                .flat_map(Inst::operands)
                .filter(|op| !matches!(op, Operand::Const(0)))
                .count()
        }

        fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
            for fid in module.func_ids() {
                let Some(func) = module.function_mut(fid) else { continue };
                for id in func.inst_ids() {
                    let Some(inst) = func.inst_mut(id) else { continue };
                    if !matches!(inst, Inst::Binary { .. }) {
                        continue;
                    }
                    for op in inst.operands_mut() {
                        if !matches!(op, Operand::Const(0)) && !oracle.should_keep() {
                            *op = Operand::Const(0);
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn sum_chain(n: usize) -> Module {
        let mut b = FunctionBuilder::new("f", vec![Ty::I32], Ty::I32);
        let mut acc = b.param(0);
        for i in 0..n {
            acc = b.binary(BinOp::Add, Ty::I32, acc, Operand::Const(i64::try_from(i).unwrap() + 1));
        }
        b.ret(Some(acc));
        let mut module = Module::new();
        module.push_function(b.finish());
        module
    }

    #[test]
    fn zero_features_is_a_no_op() {
        let mut b = FunctionBuilder::new("f", vec![], Ty::Void);
        b.ret(None);
        let mut module = Module::new();
        module.push_function(b.finish());

        let tests = Rc::new(Cell::new(0usize));
        let seen = Rc::clone(&tests);
        let mut runner = TestRunner::new(module, move |_: &Module| {
            seen.set(seen.get() + 1);
            true
        })
        .expect("well-formed");
        run_delta_pass(&mut runner, &ZeroBinaryOperands).expect("driver succeeds");
        assert_eq!(tests.get(), 0);
    }

    #[test]
    fn always_interesting_drops_every_feature() {
        let module = sum_chain(5);
        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &ZeroBinaryOperands).expect("driver succeeds");
        assert_eq!(ZeroBinaryOperands.count(runner.program()), 0);
        assert!(verify_module(runner.program()).is_ok());
    }

    #[test]
    fn never_interesting_leaves_baseline_untouched() {
        let module = sum_chain(4);
        let before = module.clone();
        let mut runner =
            TestRunner::new(module, |_: &Module| false).expect("well-formed");
        run_delta_pass(&mut runner, &ZeroBinaryOperands).expect("driver succeeds");
        assert_eq!(*runner.program(), before);
    }

    #[test]
    fn oracle_mismatch_is_fatal() {
        /// Claims one more feature than it enumerates.
        struct LyingPass;
        impl DeltaPass for LyingPass {
            fn name(&self) -> &'static str {
                "lying-pass"
            }
            fn count(&self, module: &Module) -> usize {
                ZeroBinaryOperands.count(module) + 1
            }
            fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
                ZeroBinaryOperands.mutate(oracle, module)
            }
        }

        let module = sum_chain(3);
        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        let err = run_delta_pass(&mut runner, &LyingPass);
        assert!(matches!(err, Err(Error::OracleMismatch { .. })));
    }

    #[test]
    fn mutation_error_rejects_candidate_only() {
        struct FailingPass;
        impl DeltaPass for FailingPass {
            fn name(&self) -> &'static str {
                "failing-pass"
            }
            fn count(&self, _: &Module) -> usize {
                1
            }
            fn mutate(&self, _: &mut Oracle, _: &mut Module) -> Result<()> {
                Err(Error::Unsupported("no idea how to reduce this".into()))
            }
        }

        let module = sum_chain(2);
        let before = module.clone();
        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &FailingPass).expect("rejection is not fatal");
        assert_eq!(*runner.program(), before);
        assert_eq!(runner.stats().rejected_unsupported, 1);
    }

    #[test]
    fn malformed_candidate_never_reaches_the_test() {
        /// Erases the function's terminator when told to drop its feature.
        struct BreakingPass;
        impl DeltaPass for BreakingPass {
            fn name(&self) -> &'static str {
                "breaking-pass"
            }
            fn count(&self, _: &Module) -> usize {
                1
            }
            fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
                let keep = oracle.should_keep();
                if keep {
                    return Ok(());
                }
                for fid in module.func_ids() {
                    let Some(func) = module.function_mut(fid) else { continue };
                    if let Some(&id) = func.inst_ids().last() {
                        func.erase_inst(id);
                    }
                }
                Ok(())
            }
        }

        let module = sum_chain(2);
        let tested_malformed = Rc::new(Cell::new(false));
        let seen = Rc::clone(&tested_malformed);
        let mut runner = TestRunner::new(module, move |m: &Module| {
            if verify_module(m).is_err() {
                seen.set(true);
            }
            true
        })
        .expect("well-formed");
        run_delta_pass(&mut runner, &BreakingPass).expect("driver succeeds");
        assert!(!tested_malformed.get());
        assert!(runner.stats().rejected_malformed > 0);
    }

    #[test]
    fn rerunning_at_fixed_point_changes_nothing() {
        let module = sum_chain(6);
        let mut runner =
            TestRunner::new(module, |_: &Module| true).expect("well-formed");
        run_delta_pass(&mut runner, &ZeroBinaryOperands).expect("driver succeeds");
        let reduced = runner.program().clone();
        run_delta_pass(&mut runner, &ZeroBinaryOperands).expect("driver succeeds");
        assert_eq!(*runner.program(), reduced);
    }
}
