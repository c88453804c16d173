// Branch reduction: rewrite conditional branches into unconditional ones.
//
// Two variants, one per fixed successor. Redirecting a branch abandons the
// other successor edge; blocks left with no predecessors at the end of the
// sweep are deleted outright.

use crate::Result;
use crate::ir::{BlockId, Inst, Module};

use super::driver::DeltaPass;
use super::oracle::Oracle;

#[derive(Debug, Clone, Copy)]
enum KeptSuccessor {
    OnTrue,
    OnFalse,
}

pub struct ReduceBranches {
    kept: KeptSuccessor,
}

impl ReduceBranches {
    /// Redirect dropped conditional branches to their true successor.
    pub fn to_true() -> Self {
        Self {
            kept: KeptSuccessor::OnTrue,
        }
    }

    /// Redirect dropped conditional branches to their false successor.
    pub fn to_false() -> Self {
        Self {
            kept: KeptSuccessor::OnFalse,
        }
    }
}

impl DeltaPass for ReduceBranches {
    fn name(&self) -> &'static str {
        match self.kept {
            KeptSuccessor::OnTrue => "reduce-branches-true",
            KeptSuccessor::OnFalse => "reduce-branches-false",
        }
    }

    fn count(&self, module: &Module) -> usize {
        module
            .functions()
            .map(|(_, func)| {
                func.layout()
                    .iter()
                    .filter(|block| {
                        func.terminator(**block)
                            .and_then(|id| func.inst(id))
                            .is_some_and(|inst| matches!(inst, Inst::CondBr { .. }))
                    })
                    .count()
            })
            .sum()
    }

    fn mutate(&self, oracle: &mut Oracle, module: &mut Module) -> Result<()> {
        for fid in module.func_ids() {
            let Some(func) = module.function_mut(fid) else {
                continue;
            };
            let mut abandoned: Vec<BlockId> = Vec::new();
            for block in func.layout().to_vec() {
                let Some(term_id) = func.terminator(block) else {
                    continue;
                };
                let Some(&Inst::CondBr {
                    on_true, on_false, ..
                }) = func.inst(term_id)
                else {
                    continue;
                };
                if oracle.should_keep() {
                    continue;
                }
                let (kept, other) = match self.kept {
                    KeptSuccessor::OnTrue => (on_true, on_false),
                    KeptSuccessor::OnFalse => (on_false, on_true),
                };
                func.replace_inst(term_id, Inst::Br { target: kept });
                if other != kept {
                    abandoned.push(other);
                }
            }

            // Delete abandoned successors only once no predecessor is left.
            abandoned.sort_unstable();
            abandoned.dedup();
            let entry = func.entry();
            for block in abandoned {
                if Some(block) != entry && func.predecessors(block).is_empty() {
                    func.erase_block(block);
                }
            }
        }
        Ok(())
    }
}
