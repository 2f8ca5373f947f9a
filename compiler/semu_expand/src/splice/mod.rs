//! Callee splicing.
//!
//! Re-addresses a callee's degree-0 body into the caller's name space:
//! every callee variable gets a fresh work variable of the caller and every
//! callee label a fresh label. The result is used two ways:
//!
//! - by the `QUOTE` rule, which wraps the body in a prologue binding the
//!   arguments and an epilogue copying the result out (`EXIT` redirected
//!   to a fresh end label);
//! - by the inlining call strategy at run time, which executes the body on
//!   its own with `EXIT` kept as a real exit.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use semu_ir::{
    Argument, FunctionCall, FunctionResolver, Instruction, LabelRef, NameAllocator, Op, Program,
    VariableRef,
};

use crate::ExpandError;

/// What a spliced body does with jumps to `EXIT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitMode {
    /// Jump to a fresh end label placed after the body.
    Redirect,
    /// Keep `EXIT`; the body runs as a standalone program.
    Keep,
}

/// A callee body re-addressed into fresh caller names.
#[derive(Clone, Debug)]
pub struct CalleeFrame {
    pub callee: Arc<Program>,
    /// Slot holding the callee's `y`.
    pub result: VariableRef,
    /// Slot for callee input `x(i+1)` at index `i`.
    pub inputs: Vec<VariableRef>,
    /// Slots for the callee's work variables, in serial order.
    pub works: Vec<VariableRef>,
    pub body: Vec<Instruction>,
    /// Fresh label `EXIT` was redirected to, if the body jumps to `EXIT`.
    pub end_label: Option<LabelRef>,
}

/// Splice the degree-0 body of `call.function`.
///
/// Inputs cover positions `1..=max(argument count, callee arity)`. Fresh
/// names are taken in a fixed order: result, inputs, work variables,
/// labels, end label.
pub fn splice_callee(
    call: &FunctionCall,
    names: &mut NameAllocator,
    functions: &dyn FunctionResolver,
    exit: ExitMode,
) -> Result<CalleeFrame, ExpandError> {
    let callee =
        functions
            .resolve_function(&call.function)
            .ok_or_else(|| ExpandError::UnknownFunction {
                function: call.function.clone(),
            })?;

    let mut vars: FxHashMap<VariableRef, VariableRef> = FxHashMap::default();
    let result = names.fresh_work()?;
    vars.insert(VariableRef::RESULT, result);

    let arity = u32::try_from(call.args.len())
        .unwrap_or(u32::MAX)
        .max(callee.arity());
    let mut inputs = Vec::new();
    for serial in 1..=arity {
        let slot = names.fresh_work()?;
        vars.insert(VariableRef::input(serial), slot);
        inputs.push(slot);
    }
    let mut works = Vec::new();
    for work in callee.work_vars() {
        let slot = names.fresh_work()?;
        vars.insert(work, slot);
        works.push(slot);
    }

    let mut labels: FxHashMap<LabelRef, LabelRef> = FxHashMap::default();
    let mut end_label = None;
    for label in callee.labels() {
        match label {
            LabelRef::Numbered(_) => {
                labels.insert(label, names.fresh_label()?);
            }
            LabelRef::Exit if exit == ExitMode::Redirect => {
                let end = names.fresh_label()?;
                labels.insert(label, end);
                end_label = Some(end);
            }
            LabelRef::Exit | LabelRef::Empty => {}
        }
    }

    let rename_var = |var: VariableRef| vars.get(&var).copied().unwrap_or(var);
    let rename_label = |label: LabelRef| labels.get(&label).copied().unwrap_or(label);
    let body = callee
        .instructions()
        .iter()
        .map(|instruction| {
            let renamed = instruction.renamed(&rename_var, &rename_label);
            Instruction::new(renamed.variable, renamed.op).labeled(renamed.label)
        })
        .collect();

    Ok(CalleeFrame {
        callee,
        result,
        inputs,
        works,
        body,
        end_label,
    })
}

/// One-level expansion of `target <- (F, args)`.
///
/// Prologue: zero the result slot, bind each argument into its input slot
/// (`ASSIGNMENT` for a variable, `QUOTE` for a nested call), zero the
/// remaining input slots and the work slots. Then the spliced body and the
/// epilogue `[Lend:] target <- result`.
pub fn expand_quote(
    target: VariableRef,
    call: &FunctionCall,
    names: &mut NameAllocator,
    functions: &dyn FunctionResolver,
) -> Result<Vec<Instruction>, ExpandError> {
    let frame = splice_callee(call, names, functions, ExitMode::Redirect)?;

    let mut out = Vec::with_capacity(frame.body.len() + frame.inputs.len() + frame.works.len() + 2);
    out.push(Instruction::new(frame.result, Op::ZeroVariable));
    for (index, slot) in frame.inputs.iter().enumerate() {
        let bind = match call.args.get(index) {
            Some(Argument::Variable(source)) => Op::Assignment { source: *source },
            Some(Argument::Call(nested)) => Op::Quote {
                call: nested.clone(),
            },
            None => Op::ZeroVariable,
        };
        out.push(Instruction::new(*slot, bind));
    }
    for slot in &frame.works {
        out.push(Instruction::new(*slot, Op::ZeroVariable));
    }
    out.extend(frame.body);

    let epilogue = Instruction::new(
        target,
        Op::Assignment {
            source: frame.result,
        },
    );
    out.push(match frame.end_label {
        Some(end) => epilogue.labeled(end),
        None => epilogue,
    });
    Ok(out)
}
