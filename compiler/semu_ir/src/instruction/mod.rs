//! The instruction model.
//!
//! `Op` is the closed set of instruction kinds with their kind-specific
//! payloads; `Instruction` adds the fields every kind shares (target
//! variable, own label, identity, origin and position).
//!
//! Per-kind facts (record name, basic/synthetic, base cycle cost, required
//! architecture) live on the fieldless `InstructionKind` so they can be
//! queried without a payload.

use std::fmt;

use crate::{FunctionCall, LabelRef, VariableRef};

/// Identity of an instruction inside one expansion arena.
///
/// Degree-0 instructions get ids `0..n` at load time; every instruction
/// generated by expansion gets the next free id. `origin` links use these
/// ids, never references.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct InstructionId(u32);

impl InstructionId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        InstructionId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fieldless instruction kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionKind {
    Increase,
    Decrease,
    JumpNotZero,
    Neutral,
    ZeroVariable,
    GotoLabel,
    Assignment,
    ConstantAssignment,
    JumpZero,
    JumpEqualConstant,
    JumpEqualVariable,
    Quote,
    JumpEqualFunction,
}

impl InstructionKind {
    /// Every kind, basic kinds first.
    pub const ALL: [InstructionKind; 13] = [
        InstructionKind::Increase,
        InstructionKind::Decrease,
        InstructionKind::JumpNotZero,
        InstructionKind::Neutral,
        InstructionKind::ZeroVariable,
        InstructionKind::GotoLabel,
        InstructionKind::Assignment,
        InstructionKind::ConstantAssignment,
        InstructionKind::JumpZero,
        InstructionKind::JumpEqualConstant,
        InstructionKind::JumpEqualVariable,
        InstructionKind::Quote,
        InstructionKind::JumpEqualFunction,
    ];

    /// Name used in instruction records.
    pub const fn name(self) -> &'static str {
        match self {
            InstructionKind::Increase => "INCREASE",
            InstructionKind::Decrease => "DECREASE",
            InstructionKind::JumpNotZero => "JUMP_NOT_ZERO",
            InstructionKind::Neutral => "NEUTRAL",
            InstructionKind::ZeroVariable => "ZERO_VARIABLE",
            InstructionKind::GotoLabel => "GOTO_LABEL",
            InstructionKind::Assignment => "ASSIGNMENT",
            InstructionKind::ConstantAssignment => "CONSTANT_ASSIGNMENT",
            InstructionKind::JumpZero => "JUMP_ZERO",
            InstructionKind::JumpEqualConstant => "JUMP_EQUAL_CONSTANT",
            InstructionKind::JumpEqualVariable => "JUMP_EQUAL_VARIABLE",
            InstructionKind::Quote => "QUOTE",
            InstructionKind::JumpEqualFunction => "JUMP_EQUAL_FUNCTION",
        }
    }

    /// Look up a kind by record name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Basic kinds cannot be expanded further.
    #[inline]
    pub const fn is_basic(self) -> bool {
        matches!(
            self,
            InstructionKind::Increase
                | InstructionKind::Decrease
                | InstructionKind::JumpNotZero
                | InstructionKind::Neutral
        )
    }

    /// Fixed cycle cost of executing one instruction of this kind.
    ///
    /// For `Quote` and `JumpEqualFunction` this is only the base; the
    /// callee's cycles are added at run time.
    pub const fn base_cycles(self) -> u64 {
        match self {
            InstructionKind::Neutral => 0,
            InstructionKind::Increase
            | InstructionKind::Decrease
            | InstructionKind::ZeroVariable
            | InstructionKind::GotoLabel => 1,
            InstructionKind::JumpNotZero
            | InstructionKind::ConstantAssignment
            | InstructionKind::JumpZero
            | InstructionKind::JumpEqualConstant
            | InstructionKind::JumpEqualVariable => 2,
            InstructionKind::Assignment => 4,
            InstructionKind::Quote => 5,
            InstructionKind::JumpEqualFunction => 6,
        }
    }

    /// Oldest architecture generation able to execute this kind.
    pub const fn architecture(self) -> Architecture {
        match self {
            InstructionKind::Increase
            | InstructionKind::Decrease
            | InstructionKind::JumpNotZero
            | InstructionKind::Neutral => Architecture::I,
            InstructionKind::ZeroVariable
            | InstructionKind::GotoLabel
            | InstructionKind::ConstantAssignment => Architecture::II,
            InstructionKind::Assignment
            | InstructionKind::JumpZero
            | InstructionKind::JumpEqualConstant
            | InstructionKind::JumpEqualVariable => Architecture::III,
            InstructionKind::Quote | InstructionKind::JumpEqualFunction => Architecture::IV,
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Execution architecture generation.
///
/// Each generation can execute its own instruction kinds and those of all
/// older generations. Starting a run on an architecture costs a fixed
/// number of credits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Architecture {
    #[default]
    I,
    II,
    III,
    IV,
}

impl Architecture {
    pub const ALL: [Architecture; 4] = [
        Architecture::I,
        Architecture::II,
        Architecture::III,
        Architecture::IV,
    ];

    /// Credits charged once when a run or debug session starts.
    pub const fn run_cost(self) -> u64 {
        match self {
            Architecture::I => 5,
            Architecture::II => 100,
            Architecture::III => 500,
            Architecture::IV => 1000,
        }
    }

    #[inline]
    pub fn supports(self, kind: InstructionKind) -> bool {
        kind.architecture() <= self
    }

    pub const fn name(self) -> &'static str {
        match self {
            Architecture::I => "I",
            Architecture::II => "II",
            Architecture::III => "III",
            Architecture::IV => "IV",
        }
    }

    /// Position in `ALL`.
    #[inline]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|arch| arch.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction operation with its kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// `v <- v + 1`
    Increase,
    /// `v <- v - 1`, floored at 0.
    Decrease,
    /// `IF v != 0 GOTO target`
    JumpNotZero { target: LabelRef },
    /// `v <- v`
    Neutral,
    /// `v <- 0`
    ZeroVariable,
    /// `GOTO target`
    GotoLabel { target: LabelRef },
    /// `v <- source`
    Assignment { source: VariableRef },
    /// `v <- constant`
    ConstantAssignment { constant: u64 },
    /// `IF v = 0 GOTO target`
    JumpZero { target: LabelRef },
    /// `IF v = constant GOTO target`
    JumpEqualConstant { constant: u64, target: LabelRef },
    /// `IF v = other GOTO target`
    JumpEqualVariable { other: VariableRef, target: LabelRef },
    /// `v <- (F, args)`
    Quote { call: FunctionCall },
    /// `IF v = (F, args) GOTO target`
    JumpEqualFunction { call: FunctionCall, target: LabelRef },
}

impl Op {
    pub const fn kind(&self) -> InstructionKind {
        match self {
            Op::Increase => InstructionKind::Increase,
            Op::Decrease => InstructionKind::Decrease,
            Op::JumpNotZero { .. } => InstructionKind::JumpNotZero,
            Op::Neutral => InstructionKind::Neutral,
            Op::ZeroVariable => InstructionKind::ZeroVariable,
            Op::GotoLabel { .. } => InstructionKind::GotoLabel,
            Op::Assignment { .. } => InstructionKind::Assignment,
            Op::ConstantAssignment { .. } => InstructionKind::ConstantAssignment,
            Op::JumpZero { .. } => InstructionKind::JumpZero,
            Op::JumpEqualConstant { .. } => InstructionKind::JumpEqualConstant,
            Op::JumpEqualVariable { .. } => InstructionKind::JumpEqualVariable,
            Op::Quote { .. } => InstructionKind::Quote,
            Op::JumpEqualFunction { .. } => InstructionKind::JumpEqualFunction,
        }
    }

    /// Label this operation may jump to.
    pub const fn jump_target(&self) -> Option<LabelRef> {
        match self {
            Op::JumpNotZero { target }
            | Op::GotoLabel { target }
            | Op::JumpZero { target }
            | Op::JumpEqualConstant { target, .. }
            | Op::JumpEqualVariable { target, .. }
            | Op::JumpEqualFunction { target, .. } => Some(*target),
            Op::Increase
            | Op::Decrease
            | Op::Neutral
            | Op::ZeroVariable
            | Op::Assignment { .. }
            | Op::ConstantAssignment { .. }
            | Op::Quote { .. } => None,
        }
    }

    /// Function call carried by this operation.
    pub const fn call(&self) -> Option<&FunctionCall> {
        match self {
            Op::Quote { call } | Op::JumpEqualFunction { call, .. } => Some(call),
            _ => None,
        }
    }
}

/// One instruction of a program generation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub op: Op,
    /// Target variable (the variable the command is written about).
    pub variable: VariableRef,
    /// Own label, `LabelRef::Empty` when unlabeled.
    pub label: LabelRef,
    pub id: InstructionId,
    /// Synthetic instruction this one was expanded from.
    pub origin: Option<InstructionId>,
    /// 1-based position in its generation, assigned by `Program::assemble`.
    pub number: usize,
}

impl Instruction {
    /// New unlabeled, unnumbered instruction with no origin.
    pub fn new(variable: VariableRef, op: Op) -> Self {
        Instruction {
            op,
            variable,
            label: LabelRef::Empty,
            id: InstructionId::default(),
            origin: None,
            number: 0,
        }
    }

    #[must_use]
    pub fn labeled(mut self, label: LabelRef) -> Self {
        self.label = label;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: InstructionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: InstructionId) -> Self {
        self.origin = Some(origin);
        self
    }

    #[inline]
    pub const fn kind(&self) -> InstructionKind {
        self.op.kind()
    }

    #[inline]
    pub const fn is_basic(&self) -> bool {
        self.kind().is_basic()
    }

    #[inline]
    pub const fn base_cycles(&self) -> u64 {
        self.kind().base_cycles()
    }

    #[inline]
    pub const fn jump_target(&self) -> Option<LabelRef> {
        self.op.jump_target()
    }

    /// Every variable this instruction reads or writes.
    pub fn for_each_variable(&self, f: &mut impl FnMut(VariableRef)) {
        f(self.variable);
        match &self.op {
            Op::Assignment { source } => f(*source),
            Op::JumpEqualVariable { other, .. } => f(*other),
            Op::Quote { call } | Op::JumpEqualFunction { call, .. } => call.for_each_variable(f),
            _ => {}
        }
    }

    /// Whether the instruction mentions `var` anywhere.
    pub fn uses_variable(&self, var: VariableRef) -> bool {
        let mut found = false;
        self.for_each_variable(&mut |v| found |= v == var);
        found
    }

    /// One listing line: `#<n> (B|S) [<label>] <command> (<cycles>)`.
    pub fn render_line(&self) -> String {
        let class = if self.is_basic() { 'B' } else { 'S' };
        format!(
            "#{} ({}) [{:^5}] {} ({})",
            self.number,
            class,
            self.label.to_string(),
            self,
            self.base_cycles()
        )
    }

    /// Whether the instruction defines or jumps to `label`.
    pub fn uses_label(&self, label: LabelRef) -> bool {
        !label.is_empty() && (self.label == label || self.jump_target() == Some(label))
    }

    /// Copy with every variable and label passed through the renaming maps.
    ///
    /// Identity, origin and number are kept; callers reassign them.
    #[must_use]
    pub fn renamed(
        &self,
        var: &impl Fn(VariableRef) -> VariableRef,
        label: &impl Fn(LabelRef) -> LabelRef,
    ) -> Instruction {
        let op = match &self.op {
            Op::Increase => Op::Increase,
            Op::Decrease => Op::Decrease,
            Op::Neutral => Op::Neutral,
            Op::ZeroVariable => Op::ZeroVariable,
            Op::JumpNotZero { target } => Op::JumpNotZero {
                target: label(*target),
            },
            Op::GotoLabel { target } => Op::GotoLabel {
                target: label(*target),
            },
            Op::Assignment { source } => Op::Assignment {
                source: var(*source),
            },
            Op::ConstantAssignment { constant } => Op::ConstantAssignment {
                constant: *constant,
            },
            Op::JumpZero { target } => Op::JumpZero {
                target: label(*target),
            },
            Op::JumpEqualConstant { constant, target } => Op::JumpEqualConstant {
                constant: *constant,
                target: label(*target),
            },
            Op::JumpEqualVariable { other, target } => Op::JumpEqualVariable {
                other: var(*other),
                target: label(*target),
            },
            Op::Quote { call } => Op::Quote {
                call: call.map_variables(var),
            },
            Op::JumpEqualFunction { call, target } => Op::JumpEqualFunction {
                call: call.map_variables(var),
                target: label(*target),
            },
        };
        Instruction {
            op,
            variable: var(self.variable),
            label: if self.label.is_empty() {
                LabelRef::Empty
            } else {
                label(self.label)
            },
            id: self.id,
            origin: self.origin,
            number: self.number,
        }
    }
}

/// Command text, e.g. `x1 <- x1 + 1` or `IF z2 = 5 GOTO L3`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.variable;
        match &self.op {
            Op::Increase => write!(f, "{v} <- {v} + 1"),
            Op::Decrease => write!(f, "{v} <- {v} - 1"),
            Op::JumpNotZero { target } => write!(f, "IF {v} != 0 GOTO {target}"),
            Op::Neutral => write!(f, "{v} <- {v}"),
            Op::ZeroVariable => write!(f, "{v} <- 0"),
            Op::GotoLabel { target } => write!(f, "GOTO {target}"),
            Op::Assignment { source } => write!(f, "{v} <- {source}"),
            Op::ConstantAssignment { constant } => write!(f, "{v} <- {constant}"),
            Op::JumpZero { target } => write!(f, "IF {v} = 0 GOTO {target}"),
            Op::JumpEqualConstant { constant, target } => {
                write!(f, "IF {v} = {constant} GOTO {target}")
            }
            Op::JumpEqualVariable { other, target } => write!(f, "IF {v} = {other} GOTO {target}"),
            Op::Quote { call } => write!(f, "{v} <- {call}"),
            Op::JumpEqualFunction { call, target } => write!(f, "IF {v} = {call} GOTO {target}"),
        }
    }
}
