//! One-level rewrite rules.
//!
//! `expand_once` rewrites one synthetic instruction into instructions of
//! lower degree. The synthetic instruction's own label is carried by the
//! first generated instruction; fresh labels and work variables come from
//! the generation's `NameAllocator`. Identity and origin of the generated
//! instructions are assigned by the degree engine, not here.

use semu_ir::{
    FunctionCall, FunctionResolver, Instruction, LabelRef, NameAllocator, Op, VariableRef,
};

use crate::splice::expand_quote;
use crate::ExpandError;

/// Rewrite `instruction` one level down.
///
/// Basic instructions come back unchanged as a single-element list.
pub fn expand_once(
    instruction: &Instruction,
    names: &mut NameAllocator,
    functions: &dyn FunctionResolver,
) -> Result<Vec<Instruction>, ExpandError> {
    let v = instruction.variable;
    let own = instruction.label;

    let generated = match &instruction.op {
        Op::Increase | Op::Decrease | Op::JumpNotZero { .. } | Op::Neutral => {
            return Ok(vec![instruction.clone()]);
        }
        Op::ZeroVariable => return zero_variable(v, own, names),
        Op::GotoLabel { target } => goto_label(*target, names)?,
        Op::Assignment { source } => assignment(v, *source, names)?,
        Op::ConstantAssignment { constant } => constant_assignment(v, *constant),
        Op::JumpZero { target } => jump_zero(v, *target, names)?,
        Op::JumpEqualConstant { constant, target } => {
            jump_equal_constant(v, *constant, *target, names)?
        }
        Op::JumpEqualVariable { other, target } => {
            jump_equal_variable(v, *other, *target, names)?
        }
        Op::Quote { call } => expand_quote(v, call, names, functions)?,
        Op::JumpEqualFunction { call, target } => jump_equal_function(v, call, *target, names)?,
    };
    Ok(attach_label(generated, own))
}

/// Give the first generated instruction the synthetic instruction's label.
///
/// If that instruction already carries a label, a `NEUTRAL` holding the
/// label is prepended instead.
fn attach_label(mut generated: Vec<Instruction>, label: LabelRef) -> Vec<Instruction> {
    if label.is_empty() {
        return generated;
    }
    match generated.first_mut() {
        Some(first) if first.label.is_empty() => first.label = label,
        _ => generated.insert(
            0,
            Instruction::new(VariableRef::RESULT, Op::Neutral).labeled(label),
        ),
    }
    generated
}

fn inc(v: VariableRef) -> Instruction {
    Instruction::new(v, Op::Increase)
}

fn dec(v: VariableRef) -> Instruction {
    Instruction::new(v, Op::Decrease)
}

fn jnz(v: VariableRef, target: LabelRef) -> Instruction {
    Instruction::new(v, Op::JumpNotZero { target })
}

fn neutral(v: VariableRef) -> Instruction {
    Instruction::new(v, Op::Neutral)
}

fn goto(target: LabelRef) -> Instruction {
    Instruction::new(VariableRef::RESULT, Op::GotoLabel { target })
}

/// `Lp: v <- v - 1; IF v != 0 GOTO Lp`, reusing the own label as `Lp`.
fn zero_variable(
    v: VariableRef,
    own: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let lp = if own.is_empty() {
        names.fresh_label()?
    } else {
        own
    };
    Ok(vec![dec(v).labeled(lp), jnz(v, lp)])
}

fn goto_label(
    target: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let z = names.fresh_work()?;
    Ok(vec![inc(z), jnz(z, target)])
}

fn assignment(
    v: VariableRef,
    w: VariableRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    if v == w {
        return Ok(vec![neutral(v)]);
    }
    let l1 = names.fresh_label()?;
    let l2 = names.fresh_label()?;
    let l3 = names.fresh_label()?;
    let z = names.fresh_work()?;
    Ok(vec![
        Instruction::new(v, Op::ZeroVariable),
        jnz(w, l1),
        goto(l3),
        dec(w).labeled(l1),
        inc(z),
        jnz(w, l1),
        dec(z).labeled(l2),
        inc(v),
        inc(w),
        jnz(z, l2),
        neutral(v).labeled(l3),
    ])
}

fn constant_assignment(v: VariableRef, k: u64) -> Vec<Instruction> {
    let mut out = vec![Instruction::new(v, Op::ZeroVariable)];
    for _ in 0..k {
        out.push(inc(v));
    }
    out
}

fn jump_zero(
    v: VariableRef,
    target: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let l1 = names.fresh_label()?;
    Ok(vec![
        jnz(v, l1),
        goto(target),
        neutral(VariableRef::RESULT).labeled(l1),
    ])
}

fn jump_equal_constant(
    v: VariableRef,
    k: u64,
    target: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let l1 = names.fresh_label()?;
    let z = names.fresh_work()?;
    let mut out = vec![Instruction::new(z, Op::Assignment { source: v })];
    for _ in 0..k {
        out.push(Instruction::new(z, Op::JumpZero { target: l1 }));
        out.push(dec(z));
    }
    out.push(jnz(z, l1));
    out.push(goto(target));
    out.push(neutral(VariableRef::RESULT).labeled(l1));
    Ok(out)
}

fn jump_equal_variable(
    v: VariableRef,
    w: VariableRef,
    target: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let l1 = names.fresh_label()?;
    let l2 = names.fresh_label()?;
    let l3 = names.fresh_label()?;
    let z1 = names.fresh_work()?;
    let z2 = names.fresh_work()?;
    Ok(vec![
        Instruction::new(z1, Op::Assignment { source: v }),
        Instruction::new(z2, Op::Assignment { source: w }),
        Instruction::new(z1, Op::JumpZero { target: l3 }).labeled(l2),
        Instruction::new(z2, Op::JumpZero { target: l1 }),
        dec(z1),
        dec(z2),
        goto(l2),
        Instruction::new(z2, Op::JumpZero { target }).labeled(l3),
        neutral(VariableRef::RESULT).labeled(l1),
    ])
}

fn jump_equal_function(
    v: VariableRef,
    call: &FunctionCall,
    target: LabelRef,
    names: &mut NameAllocator,
) -> Result<Vec<Instruction>, ExpandError> {
    let z = names.fresh_work()?;
    Ok(vec![
        Instruction::new(z, Op::Quote { call: call.clone() }),
        Instruction::new(v, Op::JumpEqualVariable { other: z, target }),
    ])
}
