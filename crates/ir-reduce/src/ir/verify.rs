// Structural well-formedness checks.
//
// A module that passes here is safe to hand to the interestingness test:
// every block ends in exactly one terminator, every operand resolves to a
// visible definition, every branch target and call signature is valid.
// The delta driver rejects any candidate that fails these checks.

use std::collections::{HashMap, HashSet, VecDeque};

use super::instruction::{Inst, Operand, Ty, ValueId};
use super::module::{BlockId, Function, InstId, Module};
use crate::{Error, Result};

pub fn verify_module(module: &Module) -> Result<()> {
    if module.entry().is_none() {
        return Err(Error::Malformed("module has no functions".into()));
    }
    for (_, func) in module.functions() {
        verify_function(module, func)
            .map_err(|e| Error::Malformed(format!("in @{}: {e}", func.name)))?;
    }
    Ok(())
}

pub fn verify_function(module: &Module, func: &Function) -> Result<()> {
    let Some(entry) = func.entry() else {
        return Err(Error::Malformed("function has no blocks".into()));
    };

    // Block layout: every layout entry live and unique.
    let mut seen_blocks = HashSet::new();
    for block in func.layout() {
        if func.block(*block).is_none() {
            return Err(Error::Malformed(format!("layout references erased b{}", block.0)));
        }
        if !seen_blocks.insert(*block) {
            return Err(Error::Malformed(format!("b{} appears twice in layout", block.0)));
        }
    }

    // Instruction placement: each block non-empty, exactly one terminator at
    // the end, every handle live and placed exactly once.
    let mut placement: HashMap<InstId, BlockId> = HashMap::new();
    for block in func.layout() {
        let Some(body) = func.block(*block) else {
            continue;
        };
        if body.insts().is_empty() {
            return Err(Error::Malformed(format!("b{} is empty", block.0)));
        }
        for (pos, id) in body.insts().iter().enumerate() {
            let Some(inst) = func.inst(*id) else {
                return Err(Error::Malformed(format!("b{} references erased %{}", block.0, id.0)));
            };
            if placement.insert(*id, *block).is_some() {
                return Err(Error::Malformed(format!("%{} placed in two blocks", id.0)));
            }
            let last = pos + 1 == body.insts().len();
            if inst.is_terminator() != last {
                return Err(Error::Malformed(format!(
                    "b{} must end in exactly one terminator (at %{})",
                    block.0, id.0
                )));
            }
        }
    }
    let placed = placement.len();
    if placed != func.num_insts() {
        return Err(Error::Malformed(format!(
            "{} live instructions but {placed} placed in blocks",
            func.num_insts()
        )));
    }

    // Branch targets.
    for block in func.layout() {
        for succ in func.successors(*block) {
            if func.block(succ).is_none() {
                return Err(Error::Malformed(format!(
                    "b{} branches to erased b{}",
                    block.0, succ.0
                )));
            }
        }
    }

    let doms = dominators(func, entry);
    let block_pos: HashMap<BlockId, usize> = func
        .layout()
        .iter()
        .enumerate()
        .map(|(i, b)| (*b, i))
        .collect();

    // Operand resolution and dominance; call and return signatures.
    for block in func.layout() {
        let Some(body) = func.block(*block) else {
            continue;
        };
        let mut defined_above: HashSet<InstId> = HashSet::new();
        for id in body.insts() {
            let Some(inst) = func.inst(*id) else {
                continue;
            };
            for op in inst.operands() {
                verify_operand(module, func, op)?;
                if let Operand::Value(ValueId::Inst(def)) = op {
                    let Some(def_block) = placement.get(&def) else {
                        return Err(Error::Malformed(format!(
                            "%{} uses erased value %{}",
                            id.0, def.0
                        )));
                    };
                    let visible = if def_block == block {
                        defined_above.contains(&def)
                    } else {
                        let (Some(&def_pos), Some(&use_pos)) =
                            (block_pos.get(def_block), block_pos.get(block))
                        else {
                            return Err(Error::Internal("block missing from layout".into()));
                        };
                        doms[use_pos].contains(&def_pos)
                    };
                    if !visible {
                        return Err(Error::Malformed(format!(
                            "%{} does not dominate its use in %{}",
                            def.0, id.0
                        )));
                    }
                }
            }
            verify_signature(module, func, inst)?;
            defined_above.insert(*id);
        }
    }
    Ok(())
}

fn verify_operand(module: &Module, func: &Function, op: Operand) -> Result<()> {
    match op {
        Operand::Value(ValueId::Param(i)) => {
            if (i as usize) < func.params.len() {
                Ok(())
            } else {
                Err(Error::Malformed(format!("parameter %p{i} out of range")))
            }
        }
        Operand::Value(ValueId::Inst(id)) => {
            match func.inst(id).map(Inst::result_ty) {
                Some(Ty::Void) => Err(Error::Malformed(format!("use of void value %{}", id.0))),
                Some(_) => Ok(()),
                None => Err(Error::Malformed(format!("use of erased value %{}", id.0))),
            }
        }
        Operand::FuncAddr(id) => {
            if module.function(id).is_some() {
                Ok(())
            } else {
                Err(Error::FunctionNotFound(id.0))
            }
        }
        Operand::Const(_) => Ok(()),
    }
}

fn verify_signature(module: &Module, func: &Function, inst: &Inst) -> Result<()> {
    match inst {
        Inst::Call { callee, ty, args } => {
            let Some(target) = module.function(*callee) else {
                return Err(Error::FunctionNotFound(callee.0));
            };
            if args.len() != target.params.len() {
                return Err(Error::Malformed(format!(
                    "call to @{} passes {} arguments, expected {}",
                    target.name,
                    args.len(),
                    target.params.len()
                )));
            }
            if *ty != target.ret {
                return Err(Error::Malformed(format!(
                    "call to @{} typed {ty}, function returns {}",
                    target.name, target.ret
                )));
            }
            for (arg, param) in args.iter().zip(&target.params) {
                if let Some(arg_ty) = func.operand_ty(*arg)
                    && arg_ty != *param
                {
                    return Err(Error::Malformed(format!(
                        "argument type {arg_ty} does not match parameter type {param} in call to @{}",
                        target.name
                    )));
                }
            }
            Ok(())
        }
        Inst::Ret { value } => match (func.ret, value) {
            (Ty::Void, None) => Ok(()),
            (Ty::Void, Some(_)) => Err(Error::Malformed("void function returns a value".into())),
            (_, None) => Err(Error::Malformed(format!(
                "function returning {} has a bare ret",
                func.ret
            ))),
            (ret, Some(v)) => {
                if let Some(ty) = func.operand_ty(*v)
                    && ty != ret
                {
                    return Err(Error::Malformed(format!(
                        "returned value typed {ty}, function returns {ret}"
                    )));
                }
                Ok(())
            }
        },
        _ => Ok(()),
    }
}

/// Dominator sets per layout position, computed by iterative intersection.
/// Unreachable blocks keep the full set, exempting their bodies from
/// dominance complaints the same way dead code is exempt in most verifiers.
fn dominators(func: &Function, entry: BlockId) -> Vec<HashSet<usize>> {
    let layout = func.layout();
    let n = layout.len();
    let pos: HashMap<BlockId, usize> = layout.iter().enumerate().map(|(i, b)| (*b, i)).collect();

    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, block) in layout.iter().enumerate() {
        for succ in func.successors(*block) {
            if let Some(&s) = pos.get(&succ) {
                preds[s].push(i);
            }
        }
    }

    let reachable = reachable_positions(func, entry, &pos);
    let all: HashSet<usize> = (0..n).collect();
    let mut doms: Vec<HashSet<usize>> = vec![all; n];
    if let Some(&e) = pos.get(&entry) {
        doms[e] = HashSet::from([e]);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..n {
            if Some(&i) == pos.get(&entry) || !reachable.contains(&i) {
                continue;
            }
            let mut new: Option<HashSet<usize>> = None;
            for &p in &preds[i] {
                if !reachable.contains(&p) {
                    continue;
                }
                new = Some(match new {
                    None => doms[p].clone(),
                    Some(acc) => acc.intersection(&doms[p]).copied().collect(),
                });
            }
            let mut new = new.unwrap_or_default();
            new.insert(i);
            if new != doms[i] {
                doms[i] = new;
                changed = true;
            }
        }
    }
    doms
}

fn reachable_positions(
    func: &Function,
    entry: BlockId,
    pos: &HashMap<BlockId, usize>,
) -> HashSet<usize> {
    let mut reachable = HashSet::new();
    let mut worklist = VecDeque::from([entry]);
    while let Some(block) = worklist.pop_front() {
        let Some(&p) = pos.get(&block) else { continue };
        if !reachable.insert(p) {
            continue;
        }
        for succ in func.successors(block) {
            worklist.push_back(succ);
        }
    }
    reachable
}
