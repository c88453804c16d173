// Cleanup passes over whole modules.
//
// These are deliberately simple canonicalizations. The reducer uses them in
// two places: the `reduce-passes` delta pass toggles them chunk-wise, and
// return rewriting runs `dce` to sweep values it made dead. They may change
// program semantics; they must never break well-formedness.

use std::collections::{HashMap, HashSet, VecDeque};

use super::instruction::{BinOp, Inst, Operand, Ty, ValueId};
use super::module::{BlockId, Function, InstId, Module};

pub type OptPass = fn(&mut Module);

/// Named passes in fixed pipeline order. The `reduce-passes` delta pass
/// enumerates this table, so its length is that pass's feature count.
pub const REGISTRY: &[(&str, OptPass)] = &[
    ("constant-fold", constant_fold),
    ("dce", dce),
    ("simplify-cfg", simplify_cfg),
    ("dead-function-elim", dead_function_elim),
];

/// Fold instructions whose inputs are all constants, replacing their uses.
pub fn constant_fold(module: &mut Module) {
    for fid in module.func_ids() {
        let Some(func) = module.function_mut(fid) else {
            continue;
        };
        loop {
            let mut folded = false;
            for id in func.inst_ids() {
                let Some(inst) = func.inst(id) else { continue };
                let replacement = match inst {
                    Inst::Binary {
                        op,
                        ty,
                        lhs: Operand::Const(a),
                        rhs: Operand::Const(b),
                    } => eval_binary(*op, *ty, *a, *b).map(Operand::Const),
                    Inst::Select {
                        cond: Operand::Const(c),
                        on_true,
                        on_false,
                        ..
                    } => Some(if *c == 0 { *on_false } else { *on_true }),
                    _ => None,
                };
                if let Some(value) = replacement {
                    func.replace_all_uses(ValueId::Inst(id), value);
                    func.erase_inst(id);
                    folded = true;
                }
            }
            if !folded {
                break;
            }
        }
    }
}

fn eval_binary(op: BinOp, ty: Ty, a: i64, b: i64) -> Option<i64> {
    match ty {
        Ty::I32 => {
            let (a, b) = (a as i32, b as i32);
            let r: i32 = match op {
                BinOp::Add => a.wrapping_add(b),
                BinOp::Sub => a.wrapping_sub(b),
                BinOp::Mul => a.wrapping_mul(b),
                BinOp::DivS => a.checked_div(b)?,
                BinOp::DivU => ((a as u32).checked_div(b as u32)?) as i32,
                BinOp::And => a & b,
                BinOp::Or => a | b,
                BinOp::Xor => a ^ b,
                BinOp::Shl => a.wrapping_shl(b as u32),
                BinOp::ShrU => ((a as u32).wrapping_shr(b as u32)) as i32,
                BinOp::ShrS => a.wrapping_shr(b as u32),
                BinOp::Eq => i32::from(a == b),
                BinOp::Ne => i32::from(a != b),
                BinOp::LtU => i32::from((a as u32) < (b as u32)),
                BinOp::LtS => i32::from(a < b),
            };
            Some(i64::from(r))
        }
        Ty::I64 => Some(match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::DivS => a.checked_div(b)?,
            BinOp::DivU => ((a as u64).checked_div(b as u64)?) as i64,
            BinOp::And => a & b,
            BinOp::Or => a | b,
            BinOp::Xor => a ^ b,
            BinOp::Shl => a.wrapping_shl(b as u32),
            BinOp::ShrU => ((a as u64).wrapping_shr(b as u32)) as i64,
            BinOp::ShrS => a.wrapping_shr(b as u32),
            BinOp::Eq => i64::from(a == b),
            BinOp::Ne => i64::from(a != b),
            BinOp::LtU => i64::from((a as u64) < (b as u64)),
            BinOp::LtS => i64::from(a < b),
        }),
        Ty::Void => None,
    }
}

/// Erase pure instructions with no remaining uses, to a fixpoint.
pub fn dce(module: &mut Module) {
    for fid in module.func_ids() {
        if let Some(func) = module.function_mut(fid) {
            dce_function(func);
        }
    }
}

pub(crate) fn dce_function(func: &mut Function) {
    loop {
        let mut use_counts: HashMap<InstId, usize> = HashMap::new();
        for id in func.inst_ids() {
            let Some(inst) = func.inst(id) else { continue };
            for op in inst.operands() {
                if let Operand::Value(ValueId::Inst(def)) = op {
                    *use_counts.entry(def).or_insert(0) += 1;
                }
            }
        }
        let dead: Vec<InstId> = func
            .inst_ids()
            .into_iter()
            .filter(|id| {
                func.inst(*id).is_some_and(is_pure) && !use_counts.contains_key(id)
            })
            .collect();
        if dead.is_empty() {
            break;
        }
        for id in dead {
            func.erase_inst(id);
        }
    }
}

fn is_pure(inst: &Inst) -> bool {
    matches!(
        inst,
        Inst::Binary { .. } | Inst::Select { .. } | Inst::Address { .. }
    )
}

/// Fold trivial terminators, drop unreachable blocks, and merge
/// single-predecessor straight-line blocks, to a fixpoint.
pub fn simplify_cfg(module: &mut Module) {
    for fid in module.func_ids() {
        if let Some(func) = module.function_mut(fid) {
            simplify_cfg_function(func);
        }
    }
}

fn simplify_cfg_function(func: &mut Function) {
    loop {
        let mut changed = false;

        // Constant or same-target conditional branches become unconditional.
        for block in func.layout().to_vec() {
            let Some(term_id) = func.terminator(block) else {
                continue;
            };
            let folded = match func.inst(term_id) {
                Some(Inst::CondBr {
                    cond: Operand::Const(c),
                    on_true,
                    on_false,
                }) => Some(if *c == 0 { *on_false } else { *on_true }),
                Some(Inst::CondBr {
                    on_true, on_false, ..
                }) if on_true == on_false => Some(*on_true),
                Some(Inst::Switch {
                    value: Operand::Const(c),
                    cases,
                    default,
                }) => Some(
                    cases
                        .iter()
                        .find(|(case, _)| case == c)
                        .map_or(*default, |(_, block)| *block),
                ),
                _ => None,
            };
            if let Some(target) = folded {
                func.replace_inst(term_id, Inst::Br { target });
                changed = true;
            }
        }

        // Drop blocks unreachable from the entry.
        if let Some(entry) = func.entry() {
            let reachable = reachable_blocks(func, entry);
            for block in func.layout().to_vec() {
                if !reachable.contains(&block) {
                    func.erase_block(block);
                    changed = true;
                }
            }
        }

        // Merge a block into its unique predecessor when that predecessor
        // just falls through to it.
        for block in func.layout().to_vec() {
            if func.block(block).is_none() || Some(block) == func.entry() {
                continue;
            }
            let preds = func.predecessors(block);
            let [pred] = preds.as_slice() else { continue };
            let pred = *pred;
            if pred == block {
                continue;
            }
            let Some(term_id) = func.terminator(pred) else {
                continue;
            };
            if matches!(func.inst(term_id), Some(Inst::Br { target }) if *target == block) {
                func.merge_block_into(pred, block);
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
}

fn reachable_blocks(func: &Function, entry: BlockId) -> HashSet<BlockId> {
    let mut reachable = HashSet::new();
    let mut worklist = VecDeque::from([entry]);
    while let Some(block) = worklist.pop_front() {
        if !reachable.insert(block) {
            continue;
        }
        for succ in func.successors(block) {
            if !reachable.contains(&succ) {
                worklist.push_back(succ);
            }
        }
    }
    reachable
}

/// Erase functions unreachable from the entry function.
///
/// BFS from the entry, following direct calls and address-taken references
/// transitively.
pub fn dead_function_elim(module: &mut Module) {
    let Some(entry) = module.entry() else { return };
    let mut reachable = HashSet::new();
    let mut worklist = VecDeque::from([entry]);

    while let Some(fid) = worklist.pop_front() {
        if !reachable.insert(fid) {
            continue;
        }
        let Some(func) = module.function(fid) else {
            continue;
        };
        for id in func.inst_ids() {
            let Some(inst) = func.inst(id) else { continue };
            if let Inst::Call { callee, .. } = inst
                && !reachable.contains(callee)
            {
                worklist.push_back(*callee);
            }
            for op in inst.operands() {
                if let Operand::FuncAddr(target) = op
                    && !reachable.contains(&target)
                {
                    worklist.push_back(target);
                }
            }
        }
    }

    let total = module.function_count();
    for fid in module.func_ids() {
        if !reachable.contains(&fid) {
            module.erase_function(fid);
        }
    }
    tracing::debug!(
        "Dead function elimination: {}/{} functions reachable",
        reachable.len(),
        total
    );
}
