//! Weft's entry-points for turning compiled code and assembly text into editable programs.

use crate::function::CodeObject;
use crate::instruction::{Arg, Instruction, Label};
use crate::opcode::{CompareOp, OperandKind, Opcode};
use crate::program::Program;
use crate::result::{Error, Result};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Converts installed code back into an editable program.
///
/// Every concrete jump offset becomes a label placed in front of the instruction it names;
/// slot and pool indices become names and values again.
pub fn decode(code: &CodeObject) -> Result<Program> {
    let mut program = Program::new(&*code.name, code.argnames.iter());

    let mut labels: BTreeMap<usize, Label> = BTreeMap::new();
    for ins in &code.code {
        if ins.op.is_jump() {
            let offset = ins.arg as usize;
            if offset > code.code.len() {
                return Err(Error::InvalidJumpTarget(offset));
            }
            if !labels.contains_key(&offset) {
                labels.insert(offset, program.new_label());
            }
        }
    }

    for (pc, ins) in code.code.iter().enumerate() {
        if let Some(label) = labels.get(&pc) {
            program.push(*label);
        }
        let arg = decode_operand(code, ins.op, ins.arg, &labels)?;
        program.push(Instruction::new(ins.op, arg));
    }
    if let Some(label) = labels.get(&code.code.len()) {
        program.push(*label);
    }

    tracing::debug!(
        "Decoded {} ({} instructions, {} labels)",
        code.name,
        code.code.len(),
        labels.len()
    );
    Ok(program)
}

fn decode_operand(
    code: &CodeObject,
    op: Opcode,
    raw: u32,
    labels: &BTreeMap<usize, Label>,
) -> Result<Arg> {
    let index = raw as usize;
    let out_of_range = |pool: &str| Error::InvalidOperand {
        op: op.to_string(),
        msg: format!("{pool} index {index} out of range"),
    };

    Ok(match op.operand() {
        OperandKind::None => Arg::None,
        OperandKind::Count => Arg::Count(raw),
        OperandKind::Const => Arg::Const(
            code.consts
                .get(index)
                .cloned()
                .ok_or_else(|| out_of_range("constant"))?,
        ),
        OperandKind::Local => Arg::Local(
            code.varnames
                .get(index)
                .cloned()
                .ok_or_else(|| out_of_range("local"))?,
        ),
        OperandKind::Name => Arg::Name(
            code.names
                .get(index)
                .cloned()
                .ok_or_else(|| out_of_range("name"))?,
        ),
        OperandKind::Label => Arg::Label(
            labels
                .get(&index)
                .copied()
                .ok_or(Error::InvalidJumpTarget(index))?,
        ),
        OperandKind::Compare => {
            Arg::Compare(CompareOp::from_index(raw).ok_or_else(|| out_of_range("comparison"))?)
        }
    })
}

/// Parses textual assembly into a program.
///
/// ```text
/// fn clamp(a)
///     LOAD_FAST a
///     LOAD_CONST 10
///     COMPARE_OP >
///     POP_JUMP_IF_FALSE @keep
///     LOAD_CONST 10
///     RETURN_VALUE
/// keep:
///     LOAD_FAST a
///     RETURN_VALUE
/// ```
pub fn parse_assembly(asm: &str) -> Result<Program> {
    // Fail on empty assembly
    if asm.trim().is_empty() {
        return Err(Error::ParseError {
            line: 0,
            msg: "empty assembly".into(),
            raw: asm.to_string(),
        });
    }

    let mut program: Option<Program> = None;
    let mut labels: HashMap<String, Label> = HashMap::new();
    let mut bound: HashMap<String, usize> = HashMap::new();

    for (line_no, raw) in asm.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue; // Skip blank and comment-only lines
        }

        let parse_err = |msg: String| Error::ParseError {
            line: line_no + 1,
            msg,
            raw: raw.to_string(),
        };

        let Some(program) = program.as_mut() else {
            program = Some(parse_signature(line).map_err(parse_err)?);
            continue;
        };

        if let Some(name) = line.strip_suffix(':') {
            if !is_identifier(name) {
                return Err(parse_err(format!("invalid label name '{name}'")));
            }
            if bound.insert(name.to_string(), line_no + 1).is_some() {
                return Err(Error::DuplicateLabel(name.to_string()));
            }
            let label = *labels
                .entry(name.to_string())
                .or_insert_with(|| program.new_label());
            program.push(label);
            continue;
        }

        let (mnemonic, operand) = match line.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, Some(rest.trim())),
            None => (line, None),
        };
        let op = Opcode::from_str(mnemonic)?;
        let arg = parse_operand(op, operand, program, &mut labels).map_err(parse_err)?;
        program.push(Instruction::new(op, arg));
    }

    let program = program.ok_or_else(|| Error::ParseError {
        line: 0,
        msg: "missing function signature".into(),
        raw: asm.to_string(),
    })?;

    if let Some(name) = labels.keys().find(|name| !bound.contains_key(*name)) {
        return Err(Error::UndefinedLabel(name.clone()));
    }

    Ok(program)
}

fn parse_signature(line: &str) -> std::result::Result<Program, String> {
    let rest = line
        .strip_prefix("fn ")
        .ok_or_else(|| "expected `fn name(args)`".to_string())?;
    let (name, params) = rest
        .split_once('(')
        .ok_or_else(|| "missing parameter list".to_string())?;
    let params = params
        .strip_suffix(')')
        .ok_or_else(|| "unterminated parameter list".to_string())?;

    let name = name.trim();
    if !is_identifier(name) {
        return Err(format!("invalid function name '{name}'"));
    }
    let params: Vec<&str> = params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if let Some(bad) = params.iter().find(|p| !is_identifier(p)) {
        return Err(format!("invalid parameter name '{bad}'"));
    }
    Ok(Program::new(name, params))
}

fn parse_operand(
    op: Opcode,
    operand: Option<&str>,
    program: &mut Program,
    labels: &mut HashMap<String, Label>,
) -> std::result::Result<Arg, String> {
    let kind = op.operand();
    let Some(text) = operand else {
        return match kind {
            OperandKind::None => Ok(Arg::None),
            _ => Err(format!("{op} requires an operand")),
        };
    };

    match kind {
        OperandKind::None => Err(format!("{op} takes no operand")),
        OperandKind::Count => text
            .parse::<u32>()
            .map(Arg::Count)
            .map_err(|_| format!("invalid count '{text}'")),
        OperandKind::Const => parse_constant(text).map(Arg::Const),
        OperandKind::Local | OperandKind::Name => {
            if !is_identifier(text) {
                return Err(format!("invalid name '{text}'"));
            }
            Ok(if kind == OperandKind::Local {
                Arg::Local(text.into())
            } else {
                Arg::Name(text.into())
            })
        }
        OperandKind::Label => {
            let name = text
                .strip_prefix('@')
                .filter(|name| is_identifier(name))
                .ok_or_else(|| format!("invalid jump target '{text}'"))?;
            let label = *labels
                .entry(name.to_string())
                .or_insert_with(|| program.new_label());
            Ok(Arg::Label(label))
        }
        OperandKind::Compare => CompareOp::from_str(text)
            .map(Arg::Compare)
            .map_err(|e| e.to_string()),
    }
}

fn parse_constant(text: &str) -> std::result::Result<Value, String> {
    match text {
        "None" => return Ok(Value::None),
        "True" => return Ok(Value::Bool(true)),
        "False" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Value::Int(int));
    }
    if let Some(body) = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return unescape(body).map(Value::str);
    }
    Err(format!("invalid constant '{text}'"))
}

fn unescape(body: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            other => return Err(format!("invalid escape '\\{}'", other.unwrap_or(' '))),
        }
    }
    Ok(out)
}

/// Drops a trailing `#` comment unless the `#` sits inside a string constant.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
