//! Line-based parser for the textual module format.
//!
//! The format is exactly what `Module`'s `Display` impl prints: one function
//! per `func @name(...) -> ty { ... }` block, labels as `bN:` lines, and one
//! instruction per indented line. Printed value and block numbers are raw
//! arena indices and may have gaps after a reduction; the parser treats them
//! as opaque labels and renumbers densely, so parse-then-print normalizes a
//! module without changing its structure.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use ir_reduce::ir::{
    BinOp, BlockId, FuncId, Function, FunctionBuilder, InstId, Module, Operand, Ty, ValueId,
};

/// One function's header plus its body lines, with 1-based source line
/// numbers kept for error reporting.
struct RawFunction<'a> {
    name: &'a str,
    params: Vec<Ty>,
    ret: Ty,
    body: Vec<(usize, &'a str)>,
}

pub fn parse_module(text: &str) -> Result<Module> {
    let raws = split_functions(text)?;
    if raws.is_empty() {
        bail!("input contains no functions");
    }

    // Declare every signature first so calls can reference functions that
    // appear later in the file.
    let mut module = Module::new();
    let mut funcs = HashMap::new();
    for raw in &raws {
        let placeholder = FunctionBuilder::new(raw.name, raw.params.clone(), raw.ret).finish();
        let id = module.push_function(placeholder);
        if funcs.insert(raw.name.to_string(), id).is_some() {
            bail!("duplicate function @{}", raw.name);
        }
    }
    for raw in &raws {
        let body = parse_function(raw, &funcs)?;
        module.replace_function(funcs[raw.name], body);
    }
    Ok(module)
}

fn split_functions(text: &str) -> Result<Vec<RawFunction<'_>>> {
    let mut raws = Vec::new();
    let mut current: Option<RawFunction> = None;
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix("func @") {
            if current.is_some() {
                bail!("line {line_no}: function header inside an open function");
            }
            current = Some(parse_header(header, line_no)?);
        } else if line == "}" {
            let func = current
                .take()
                .ok_or_else(|| anyhow!("line {line_no}: closing brace outside any function"))?;
            raws.push(func);
        } else if let Some(func) = current.as_mut() {
            func.body.push((line_no, line));
        } else {
            bail!("line {line_no}: expected a function header, found '{line}'");
        }
    }
    if let Some(func) = current {
        bail!("function @{} is missing its closing brace", func.name);
    }
    Ok(raws)
}

fn parse_header(header: &str, line_no: usize) -> Result<RawFunction<'_>> {
    let (name, rest) = header
        .split_once('(')
        .ok_or_else(|| anyhow!("line {line_no}: malformed function header"))?;
    let (params_text, rest) = rest
        .split_once(')')
        .ok_or_else(|| anyhow!("line {line_no}: unclosed parameter list"))?;
    let ret_text = rest
        .strip_prefix(" -> ")
        .and_then(|r| r.strip_suffix(" {"))
        .ok_or_else(|| anyhow!("line {line_no}: malformed return type"))?;

    let params = if params_text.trim().is_empty() {
        Vec::new()
    } else {
        params_text
            .split(',')
            .map(|t| parse_ty(t.trim(), line_no))
            .collect::<Result<Vec<_>>>()?
    };
    Ok(RawFunction {
        name,
        params,
        ret: parse_ty(ret_text.trim(), line_no)?,
        body: Vec::new(),
    })
}

fn parse_ty(text: &str, line_no: usize) -> Result<Ty> {
    match text {
        "i32" => Ok(Ty::I32),
        "i64" => Ok(Ty::I64),
        "void" => Ok(Ty::Void),
        other => bail!("line {line_no}: unknown type '{other}'"),
    }
}

fn parse_function(raw: &RawFunction<'_>, funcs: &HashMap<String, FuncId>) -> Result<Function> {
    // Pre-scan the body so labels and results can be referenced before their
    // defining line. Arena slots are handed out in line order, matching the
    // order the builder below pushes them.
    let mut blocks: HashMap<&str, BlockId> = HashMap::new();
    let mut values: HashMap<&str, InstId> = HashMap::new();
    let mut next_inst = 0u32;
    for &(line_no, line) in &raw.body {
        if let Some(label) = line.strip_suffix(':') {
            let slot = u32::try_from(blocks.len())
                .map_err(|_| anyhow!("line {line_no}: too many blocks"))?;
            if blocks.insert(label, BlockId(slot)).is_some() {
                bail!("line {line_no}: duplicate label '{label}'");
            }
        } else {
            if let Some((result, _)) = line.split_once(" = ") {
                let result = result.trim();
                if values.insert(result, InstId(next_inst)).is_some() {
                    bail!("line {line_no}: duplicate result '{result}'");
                }
            }
            next_inst += 1;
        }
    }
    if !raw.body.is_empty() && !raw.body[0].1.ends_with(':') {
        let (line_no, line) = raw.body[0];
        bail!("line {line_no}: expected a block label, found '{line}'");
    }

    let mut b = FunctionBuilder::new(raw.name, raw.params.clone(), raw.ret);
    for _ in 1..blocks.len() {
        b.add_block();
    }
    let refs = Refs { blocks: &blocks, values: &values, funcs };
    for &(line_no, line) in &raw.body {
        if let Some(label) = line.strip_suffix(':') {
            b.switch_to(refs.block(label, line_no)?);
        } else {
            parse_inst(&mut b, line, line_no, &refs)?;
        }
    }
    Ok(b.finish())
}

/// Name resolution context shared by the operand and instruction parsers.
struct Refs<'a> {
    blocks: &'a HashMap<&'a str, BlockId>,
    values: &'a HashMap<&'a str, InstId>,
    funcs: &'a HashMap<String, FuncId>,
}

impl Refs<'_> {
    fn block(&self, label: &str, line_no: usize) -> Result<BlockId> {
        self.blocks
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("line {line_no}: unknown block '{label}'"))
    }

    fn func(&self, name: &str, line_no: usize) -> Result<FuncId> {
        self.funcs
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("line {line_no}: unknown function '@{name}'"))
    }

    fn operand(&self, token: &str, line_no: usize) -> Result<Operand> {
        let token = token.trim();
        if let Some(index) = token.strip_prefix("%p") {
            let index: u32 = index
                .parse()
                .with_context(|| format!("line {line_no}: bad parameter '{token}'"))?;
            Ok(Operand::Value(ValueId::Param(index)))
        } else if token.starts_with('%') {
            let id = self
                .values
                .get(token)
                .ok_or_else(|| anyhow!("line {line_no}: unknown value '{token}'"))?;
            Ok(Operand::Value(ValueId::Inst(*id)))
        } else if let Some(name) = token.strip_prefix('@') {
            Ok(Operand::FuncAddr(self.func(name, line_no)?))
        } else {
            token
                .parse::<i64>()
                .map(Operand::Const)
                .with_context(|| format!("line {line_no}: expected an operand, found '{token}'"))
        }
    }

    fn operand_list(&self, text: &str, line_no: usize) -> Result<Vec<Operand>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        text.split(',')
            .map(|t| self.operand(t, line_no))
            .collect()
    }
}

fn parse_inst(b: &mut FunctionBuilder, line: &str, line_no: usize, refs: &Refs<'_>) -> Result<()> {
    if let Some(rest) = line.strip_prefix("br ") {
        b.br(refs.block(rest.trim(), line_no)?);
    } else if let Some(rest) = line.strip_prefix("condbr ") {
        let mut parts = rest.splitn(3, ',');
        let cond = parts
            .next()
            .ok_or_else(|| anyhow!("line {line_no}: condbr needs a condition"))?;
        let (on_true, on_false) = match (parts.next(), parts.next()) {
            (Some(t), Some(f)) => (t.trim(), f.trim()),
            _ => bail!("line {line_no}: condbr needs two targets"),
        };
        b.cond_br(
            refs.operand(cond, line_no)?,
            refs.block(on_true, line_no)?,
            refs.block(on_false, line_no)?,
        );
    } else if let Some(rest) = line.strip_prefix("switch ") {
        let (value, rest) = rest
            .split_once(", [")
            .ok_or_else(|| anyhow!("line {line_no}: switch needs a case list"))?;
        let (cases_text, default) = rest
            .split_once("], ")
            .ok_or_else(|| anyhow!("line {line_no}: switch needs a default target"))?;
        let mut cases = Vec::new();
        if !cases_text.trim().is_empty() {
            for case in cases_text.split(',') {
                let (literal, target) = case
                    .split_once(':')
                    .ok_or_else(|| anyhow!("line {line_no}: malformed switch case '{case}'"))?;
                let literal: i64 = literal
                    .trim()
                    .parse()
                    .with_context(|| format!("line {line_no}: bad case literal '{literal}'"))?;
                cases.push((literal, refs.block(target.trim(), line_no)?));
            }
        }
        b.switch(
            refs.operand(value, line_no)?,
            cases,
            refs.block(default.trim(), line_no)?,
        );
    } else if line == "ret" {
        b.ret(None);
    } else if let Some(rest) = line.strip_prefix("ret ") {
        b.ret(Some(refs.operand(rest, line_no)?));
    } else if let Some(rest) = line.strip_prefix("call @") {
        let (name, args) = split_call(rest, line_no)?;
        let args = refs.operand_list(args, line_no)?;
        b.call(refs.func(name, line_no)?, Ty::Void, args);
    } else if let Some((_, rhs)) = line.split_once(" = ") {
        parse_value_inst(b, rhs, line_no, refs)?;
    } else {
        bail!("line {line_no}: unrecognized instruction '{line}'");
    }
    Ok(())
}

fn parse_value_inst(
    b: &mut FunctionBuilder,
    rhs: &str,
    line_no: usize,
    refs: &Refs<'_>,
) -> Result<()> {
    if let Some(rest) = rhs.strip_prefix("addr ") {
        let (base, rest) = rest
            .split_once(", [")
            .ok_or_else(|| anyhow!("line {line_no}: addr needs an index list"))?;
        let indices = rest
            .strip_suffix(']')
            .ok_or_else(|| anyhow!("line {line_no}: unclosed index list"))?;
        let indices = refs.operand_list(indices, line_no)?;
        b.address(refs.operand(base, line_no)?, indices);
        return Ok(());
    }

    let (ty, rest) = rhs
        .split_once('.')
        .ok_or_else(|| anyhow!("line {line_no}: expected a typed instruction, found '{rhs}'"))?;
    let ty = parse_ty(ty, line_no)?;
    if let Some(rest) = rest.strip_prefix("select ") {
        let ops = refs.operand_list(rest, line_no)?;
        let [cond, on_true, on_false] = ops.as_slice() else {
            bail!("line {line_no}: select needs exactly three operands");
        };
        b.select(ty, *cond, *on_true, *on_false);
    } else if let Some(rest) = rest.strip_prefix("call @") {
        let (name, args) = split_call(rest, line_no)?;
        let args = refs.operand_list(args, line_no)?;
        b.call(refs.func(name, line_no)?, ty, args);
    } else {
        let (mnemonic, operands) = rest
            .split_once(' ')
            .ok_or_else(|| anyhow!("line {line_no}: missing operands in '{rest}'"))?;
        let op = binop_from_mnemonic(mnemonic)
            .ok_or_else(|| anyhow!("line {line_no}: unknown instruction '{mnemonic}'"))?;
        let ops = refs.operand_list(operands, line_no)?;
        let [lhs, rhs] = ops.as_slice() else {
            bail!("line {line_no}: {mnemonic} needs exactly two operands");
        };
        b.binary(op, ty, *lhs, *rhs);
    }
    Ok(())
}

/// Split `name(arg, arg)` into the name and the raw argument text.
fn split_call(text: &str, line_no: usize) -> Result<(&str, &str)> {
    let (name, rest) = text
        .split_once('(')
        .ok_or_else(|| anyhow!("line {line_no}: malformed call"))?;
    let args = rest
        .strip_suffix(')')
        .ok_or_else(|| anyhow!("line {line_no}: unclosed argument list"))?;
    Ok((name, args))
}

fn binop_from_mnemonic(mnemonic: &str) -> Option<BinOp> {
    Some(match mnemonic {
        "add" => BinOp::Add,
        "sub" => BinOp::Sub,
        "mul" => BinOp::Mul,
        "div_u" => BinOp::DivU,
        "div_s" => BinOp::DivS,
        "and" => BinOp::And,
        "or" => BinOp::Or,
        "xor" => BinOp::Xor,
        "shl" => BinOp::Shl,
        "shr_u" => BinOp::ShrU,
        "shr_s" => BinOp::ShrS,
        "eq" => BinOp::Eq,
        "ne" => BinOp::Ne,
        "lt_u" => BinOp::LtU,
        "lt_s" => BinOp::LtS,
        _ => return None,
    })
}
